//! In-memory test doubles for the account store and email sender.
//!
//! Available under the default `test-utils` feature so integration
//! tests and local tooling can exercise the full auth flows without a
//! database or an SMTP relay.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::email::{EmailMessage, EmailSender};

use super::store::{Account, AccountStore, NewAccount, StoreError};

/// Account store backed by a `Vec` behind a mutex.
///
/// Mirrors the conditional-update semantics of the Postgres store: the
/// `consume_*` operations apply only while the stored code matches and
/// report whether a row changed.
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: Mutex<Vec<Account>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite the verification expiry for an account (test hook).
    pub fn set_verification_expiry(&self, email: &str, expires_at: DateTime<Utc>) {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        if let Some(account) = accounts.iter_mut().find(|a| a.email == email) {
            account.verification_otp_expires = Some(expires_at);
        }
    }

    /// Rewrite the reset expiry for an account (test hook).
    pub fn set_reset_expiry(&self, email: &str, expires_at: DateTime<Utc>) {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        if let Some(account) = accounts.iter_mut().find(|a| a.email == email) {
            account.reset_otp_expires = Some(expires_at);
        }
    }
}

impl AccountStore for MemoryAccountStore {
    async fn insert(&self, input: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        if accounts.iter().any(|a| a.email == input.email) {
            return Err(StoreError::Duplicate);
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: input.email,
            password_hash: input.password_hash,
            name: input.name,
            email_verified: false,
            verification_otp: Some(input.verification_otp),
            verification_otp_expires: Some(input.verification_otp_expires),
            reset_otp: None,
            reset_otp_expires: None,
            created_at: now,
            updated_at: now,
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().expect("account store poisoned");
        Ok(accounts.iter().find(|a| a.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.lock().expect("account store poisoned");
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn set_verification_otp(
        &self,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        let Some(account) = accounts
            .iter_mut()
            .find(|a| a.id == id && !a.email_verified)
        else {
            return Ok(false);
        };
        account.verification_otp = Some(otp.to_string());
        account.verification_otp_expires = Some(expires_at);
        account.updated_at = Utc::now();
        Ok(true)
    }

    async fn consume_verification_otp(&self, id: Uuid, otp: &str) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        let Some(account) = accounts.iter_mut().find(|a| {
            a.id == id && !a.email_verified && a.verification_otp.as_deref() == Some(otp)
        }) else {
            return Ok(false);
        };
        account.email_verified = true;
        account.verification_otp = None;
        account.verification_otp_expires = None;
        account.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_reset_otp(
        &self,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        let Some(account) = accounts.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        account.reset_otp = Some(otp.to_string());
        account.reset_otp_expires = Some(expires_at);
        account.updated_at = Utc::now();
        Ok(true)
    }

    async fn consume_reset_otp(
        &self,
        id: Uuid,
        otp: &str,
        new_password_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.lock().expect("account store poisoned");
        let Some(account) = accounts
            .iter_mut()
            .find(|a| a.id == id && a.reset_otp.as_deref() == Some(otp))
        else {
            return Ok(false);
        };
        account.password_hash = new_password_hash.to_string();
        account.reset_otp = None;
        account.reset_otp_expires = None;
        account.updated_at = Utc::now();
        Ok(true)
    }
}

/// Sender that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingEmailSender {
    messages: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
}

impl RecordingEmailSender {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages recorded so far.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.messages.lock().expect("sender poisoned").clone()
    }
}

impl EmailSender for RecordingEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("recording sender configured to fail"));
        }
        self.messages
            .lock()
            .expect("sender poisoned")
            .push(message.clone());
        Ok(())
    }
}
