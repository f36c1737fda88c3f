//! Auth handlers and supporting modules.
//!
//! This module owns the full account lifecycle: signup, OTP email
//! verification, login, and password reset, plus stateless session
//! tokens.
//!
//! ## One-time passcodes
//!
//! Codes are 6 digits, valid for 10 minutes from issuance, and
//! single-use: consumption happens through a store-level conditional
//! update, so concurrent verification attempts cannot both succeed.
//! Resending immediately invalidates the previous code.
//!
//! ## Enumeration resistance
//!
//! `resend-verification` and `forgot-password` answer `204` regardless
//! of account state, and login reports one uniform error for unknown
//! accounts and wrong passwords, doing equivalent hashing work on both
//! paths. Responses stay identical whether or not the address is known.

pub(crate) mod error;
pub(crate) mod login;
pub(crate) mod password_reset;
pub(crate) mod service;
pub(crate) mod session;
pub(crate) mod signup;
pub(crate) mod types;
pub(crate) mod verification;

mod otp;
mod password;
mod rate_limit;
mod state;
mod store;
mod token;
mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use error::AuthError;
pub use rate_limit::{NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimiter};
pub use service::{AuthService, SessionOutput, SignupInput, SignupOutput};
pub use state::{AuthConfig, AuthState};
pub use store::{Account, AccountStore, NewAccount, PgAccountStore, StoreError};
pub use token::{SessionClaims, TokenError};
