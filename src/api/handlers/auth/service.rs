//! Account lifecycle orchestration.
//!
//! Composes the password hasher, OTP generator, token issuer, account
//! store, and email sender into the six auth flows. Generic over the
//! store implementation so the flows can be exercised against the
//! in-memory store without a database.

use std::sync::Arc;

use chrono::{Duration, Utc};
use secrecy::SecretString;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::email::{EmailMessage, EmailSender, reset_message, verification_message};

use super::error::AuthError;
use super::state::AuthConfig;
use super::store::{Account, AccountStore, NewAccount, StoreError};
use super::token::{self, SessionClaims, TokenError};
use super::utils::normalize_email;
use super::{otp, password};

/// Input for the signup flow.
#[derive(Debug)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// Successful signup result.
#[derive(Debug)]
pub struct SignupOutput {
    pub account_id: Uuid,
    /// False when the verification email could not be handed off; the
    /// code is persisted either way and resend is the retry path.
    pub email_dispatched: bool,
}

/// Successful login or verification result.
#[derive(Debug)]
pub struct SessionOutput {
    /// Signed session token (7-day expiry by default).
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
}

/// Auth orchestrator.
///
/// Generic over the account store so the flows have no dependency on
/// Postgres; the email sender stays a trait object because delivery is
/// swapped per environment (SMTP, logging, recording).
pub struct AuthService<S> {
    store: S,
    sender: Arc<dyn EmailSender>,
    config: AuthConfig,
    signing_key: SecretString,
    /// Digest verified against when no account matches a login, so the
    /// unknown-email and wrong-password paths cost the same.
    dummy_hash: String,
}

impl<S: AccountStore> AuthService<S> {
    /// Build the service.
    ///
    /// # Errors
    /// Returns an error if the decoy digest cannot be prepared, which is
    /// unexpected under normal operation.
    pub fn new(
        store: S,
        sender: Arc<dyn EmailSender>,
        config: AuthConfig,
        signing_key: SecretString,
    ) -> anyhow::Result<Self> {
        let dummy_hash = password::hash_password("folioforge-decoy-credential")?;
        Ok(Self {
            store,
            sender,
            config,
            signing_key,
            dummy_hash,
        })
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create an account and send its verification code.
    ///
    /// The account and code are persisted before the email is handed
    /// off; a delivery failure is reported in the output, never rolled
    /// back.
    ///
    /// # Errors
    /// `DuplicateAccount` if the email is taken; store/crypto failures
    /// propagate.
    pub async fn signup(&self, input: SignupInput) -> Result<SignupOutput, AuthError> {
        let email = normalize_email(&input.email);
        let password_hash =
            password::hash_password(&input.password).map_err(AuthError::Crypto)?;

        let code = otp::generate();
        let expires_at = Utc::now() + Duration::seconds(self.config.otp_ttl_seconds());

        let account = self
            .store
            .insert(NewAccount {
                email: email.clone(),
                password_hash,
                name: input.name.clone(),
                verification_otp: code.clone(),
                verification_otp_expires: expires_at,
            })
            .await
            .map_err(|err| match err {
                StoreError::Duplicate => AuthError::DuplicateAccount,
                StoreError::Backend(e) => AuthError::Store(e),
            })?;

        let message = verification_message(&email, input.name.as_deref(), &code);
        let email_dispatched = self.dispatch(message).await;

        info!(account_id = %account.id, email_dispatched, "account created");

        Ok(SignupOutput {
            account_id: account.id,
            email_dispatched,
        })
    }

    /// Consume a verification code and issue a session.
    ///
    /// # Errors
    /// `NotFound` when no pending account matches (unknown email,
    /// already verified, or a concurrent attempt won the race);
    /// `InvalidCode` / `ExpiredCode` per the stored code state.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<SessionOutput, AuthError> {
        let email = normalize_email(email);
        let account = self.pending_account(&email).await?;

        match account.verification_otp.as_deref() {
            Some(stored) if stored == code => {}
            Some(_) => return Err(AuthError::InvalidCode),
            None => return Err(AuthError::NotFound),
        }

        if !is_live(account.verification_otp_expires) {
            return Err(AuthError::ExpiredCode);
        }

        // Conditional update: only the first concurrent attempt flips the
        // row; losers fall out here as no-longer-pending.
        let consumed = self
            .store
            .consume_verification_otp(account.id, code)
            .await
            .map_err(store_failure)?;
        if !consumed {
            return Err(AuthError::NotFound);
        }

        info!(account_id = %account.id, "email verified");
        self.session_for(account.id, &account.email)
    }

    /// Re-issue a verification code.
    ///
    /// Always succeeds from the caller's perspective; only a pending
    /// account actually gets a new code (the previous one becomes
    /// invalid immediately) and an email.
    ///
    /// # Errors
    /// Store failures propagate; unknown or already-verified accounts
    /// are a silent no-op.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let Some(account) = self.store.find_by_email(&email).await.map_err(store_failure)? else {
            return Ok(());
        };
        if account.email_verified {
            return Ok(());
        }

        let code = otp::generate();
        let expires_at = Utc::now() + Duration::seconds(self.config.otp_ttl_seconds());
        let updated = self
            .store
            .set_verification_otp(account.id, &code, expires_at)
            .await
            .map_err(store_failure)?;
        if !updated {
            // Verified between lookup and update; nothing to send.
            return Ok(());
        }

        let message = verification_message(&email, account.name.as_deref(), &code);
        self.dispatch(message).await;
        Ok(())
    }

    /// Authenticate with email and password and issue a session.
    ///
    /// Unverified accounts may log in; the signup flow's own gating
    /// drives users through verification before the dashboard.
    ///
    /// # Errors
    /// One uniform `InvalidCredentials` for unknown email and wrong
    /// password.
    pub async fn login(&self, email: &str, password_input: &str) -> Result<SessionOutput, AuthError> {
        let email = normalize_email(email);
        let account = self.store.find_by_email(&email).await.map_err(store_failure)?;

        let Some(account) = account else {
            // Equivalent hashing work on the unknown-email path.
            let _ = password::verify_password(password_input, &self.dummy_hash);
            return Err(AuthError::InvalidCredentials);
        };

        let valid = password::verify_password(password_input, &account.password_hash)
            .map_err(AuthError::Crypto)?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        self.session_for(account.id, &account.email)
    }

    /// Start a password reset.
    ///
    /// Always succeeds from the caller's perspective; only existing
    /// accounts get a reset code and an email.
    ///
    /// # Errors
    /// Store failures propagate; unknown accounts are a silent no-op.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let Some(account) = self.store.find_by_email(&email).await.map_err(store_failure)? else {
            return Ok(());
        };

        let code = otp::generate();
        let expires_at = Utc::now() + Duration::seconds(self.config.otp_ttl_seconds());
        self.store
            .set_reset_otp(account.id, &code, expires_at)
            .await
            .map_err(store_failure)?;

        let message = reset_message(&email, account.name.as_deref(), &code);
        self.dispatch(message).await;
        Ok(())
    }

    /// Consume a reset code and store a new password.
    ///
    /// Does not log the user in; the caller logs in with the new
    /// password afterwards.
    ///
    /// # Errors
    /// `NotFound` when no account or no pending reset matches;
    /// `InvalidCode` / `ExpiredCode` per the stored code state.
    pub async fn reset_password(
        &self,
        email: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let Some(account) = self.store.find_by_email(&email).await.map_err(store_failure)? else {
            return Err(AuthError::NotFound);
        };

        match account.reset_otp.as_deref() {
            Some(stored) if stored == code => {}
            Some(_) => return Err(AuthError::InvalidCode),
            None => return Err(AuthError::NotFound),
        }

        if !is_live(account.reset_otp_expires) {
            return Err(AuthError::ExpiredCode);
        }

        let new_hash = password::hash_password(new_password).map_err(AuthError::Crypto)?;
        let consumed = self
            .store
            .consume_reset_otp(account.id, code, &new_hash)
            .await
            .map_err(store_failure)?;
        if !consumed {
            return Err(AuthError::NotFound);
        }

        info!(account_id = %account.id, "password reset");
        Ok(())
    }

    /// Verify a presented session token.
    ///
    /// # Errors
    /// Typed failure for malformed, tampered, or expired tokens.
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        token::verify(token, &self.signing_key)
    }

    fn session_for(&self, user_id: Uuid, email: &str) -> Result<SessionOutput, AuthError> {
        let token = token::issue(
            user_id,
            email,
            &self.signing_key,
            self.config.session_ttl_seconds(),
        )
        .map_err(AuthError::Token)?;
        Ok(SessionOutput {
            token,
            user_id,
            email: email.to_string(),
        })
    }

    async fn pending_account(&self, email: &str) -> Result<Account, AuthError> {
        let account = self.store.find_by_email(email).await.map_err(store_failure)?;
        match account {
            Some(account) if !account.email_verified => Ok(account),
            // Unknown email and already-verified collapse into one answer.
            _ => Err(AuthError::NotFound),
        }
    }

    /// Hand a message to the sender off the async runtime; delivery
    /// failures are logged and reported, never propagated.
    async fn dispatch(&self, message: EmailMessage) -> bool {
        let sender = Arc::clone(&self.sender);
        let to_email = message.to_email.clone();
        let result = tokio::task::spawn_blocking(move || sender.send(&message)).await;
        match result {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                error!(to_email = %to_email, "failed to send email: {err}");
                false
            }
            Err(err) => {
                error!(to_email = %to_email, "email send task failed: {err}");
                false
            }
        }
    }
}

fn store_failure(err: StoreError) -> AuthError {
    match err {
        StoreError::Duplicate => AuthError::Store(anyhow::anyhow!("unexpected duplicate")),
        StoreError::Backend(e) => AuthError::Store(e),
    }
}

fn is_live(expires_at: Option<chrono::DateTime<Utc>>) -> bool {
    expires_at.is_some_and(|at| Utc::now() < at)
}
