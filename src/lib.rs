//! # Folioforge Accounts Service
//!
//! `folioforge` is the account and authentication authority for the
//! Folioforge portfolio builder. It owns signup, email verification,
//! login, and password reset, and issues the stateless session tokens
//! the rest of the platform trusts.
//!
//! ## Email verification (OTP)
//!
//! New accounts start unverified. Signup stores a 6-digit one-time
//! passcode with a 10-minute expiry and emails it to the user; the code
//! is consumed with a conditional update so only one verification
//! attempt can ever succeed for a given code. Resending always
//! supersedes the previous code.
//!
//! ## Sessions
//!
//! Sessions are signed HS256 tokens with a 7-day expiry, carried in an
//! `HttpOnly` cookie (or a bearer header). Nothing is persisted
//! server-side; logout clears the cookie and nothing else.
//!
//! ## Enumeration resistance
//!
//! Resend-verification and forgot-password always answer `204` no
//! matter whether the address is known, pending, or verified. Login
//! returns one uniform error for unknown accounts and wrong passwords,
//! and performs equivalent hashing work on both paths.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
