//! Account model and store abstraction.
//!
//! The auth flows never touch rows directly; they go through
//! [`AccountStore`], whose conditional updates carry the single-use
//! guarantees. Under concurrent verification attempts the store-level
//! `WHERE` precondition ensures only the first clears the code; the
//! second no longer matches and fails lookup.

use std::future::Future;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use super::utils::is_unique_violation;

/// One account row, keyed by normalized email.
#[derive(Clone, Debug)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub verification_otp: Option<String>,
    pub verification_otp_expires: Option<DateTime<Utc>>,
    pub reset_otp: Option<String>,
    pub reset_otp_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an account with its initial verification code.
#[derive(Debug)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub verification_otp: String,
    pub verification_otp_expires: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("account already exists")]
    Duplicate,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Persistence seam for account rows.
///
/// The `consume_*` operations are conditional updates: they apply only
/// while the stored code still matches, and report whether a row was
/// updated. That report is what makes codes single-use under races.
pub trait AccountStore: Send + Sync {
    fn insert(&self, input: NewAccount)
    -> impl Future<Output = Result<Account, StoreError>> + Send;

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    fn find_by_id(&self, id: Uuid)
    -> impl Future<Output = Result<Option<Account>, StoreError>> + Send;

    /// Replace the pending verification code; applies only while unverified.
    fn set_verification_otp(
        &self,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Mark the account verified and clear the code, only if the stored
    /// code still matches and the account is still unverified.
    fn consume_verification_otp(
        &self,
        id: Uuid,
        otp: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Set or replace the pending reset code.
    fn set_reset_otp(
        &self,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Store the new password hash and clear the reset code, only if the
    /// stored code still matches.
    fn consume_reset_otp(
        &self,
        id: Uuid,
        otp: &str,
        new_password_hash: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;
}

impl<S: AccountStore> AccountStore for std::sync::Arc<S> {
    fn insert(
        &self,
        input: NewAccount,
    ) -> impl Future<Output = Result<Account, StoreError>> + Send {
        (**self).insert(input)
    }

    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send {
        (**self).find_by_email(email)
    }

    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Account>, StoreError>> + Send {
        (**self).find_by_id(id)
    }

    fn set_verification_otp(
        &self,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).set_verification_otp(id, otp, expires_at)
    }

    fn consume_verification_otp(
        &self,
        id: Uuid,
        otp: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).consume_verification_otp(id, otp)
    }

    fn set_reset_otp(
        &self,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).set_reset_otp(id, otp, expires_at)
    }

    fn consume_reset_otp(
        &self,
        id: Uuid,
        otp: &str,
        new_password_hash: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send {
        (**self).consume_reset_otp(id, otp, new_password_hash)
    }
}

/// Postgres-backed account store.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, name, email_verified, \
     verification_otp, verification_otp_expires, reset_otp, reset_otp_expires, \
     created_at, updated_at";

fn account_from_row(row: &PgRow) -> Account {
    Account {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        name: row.get("name"),
        email_verified: row.get("email_verified"),
        verification_otp: row.get("verification_otp"),
        verification_otp_expires: row.get("verification_otp_expires"),
        reset_otp: row.get("reset_otp"),
        reset_otp_expires: row.get("reset_otp_expires"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl AccountStore for PgAccountStore {
    async fn insert(&self, input: NewAccount) -> Result<Account, StoreError> {
        let query = format!(
            r"
            INSERT INTO accounts
                (email, password_hash, name, verification_otp, verification_otp_expires)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
        "
        );
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.name)
            .bind(&input.verification_otp)
            .bind(input.verification_otp_expires)
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(account_from_row(&row)),
            Err(err) if is_unique_violation(&err) => Err(StoreError::Duplicate),
            Err(err) => Err(StoreError::Backend(
                anyhow::Error::new(err).context("failed to insert account"),
            )),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by email")?;
        Ok(row.map(|row| account_from_row(&row)))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = %query
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup account by id")?;
        Ok(row.map(|row| account_from_row(&row)))
    }

    async fn set_verification_otp(
        &self,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let query = r"
            UPDATE accounts
            SET verification_otp = $2,
                verification_otp_expires = $3,
                updated_at = NOW()
            WHERE id = $1
              AND email_verified = FALSE
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(otp)
            .bind(expires_at)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to set verification code")?;
        Ok(row.is_some())
    }

    async fn consume_verification_otp(&self, id: Uuid, otp: &str) -> Result<bool, StoreError> {
        let query = r"
            UPDATE accounts
            SET email_verified = TRUE,
                verification_otp = NULL,
                verification_otp_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND email_verified = FALSE
              AND verification_otp = $2
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(otp)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to consume verification code")?;
        Ok(row.is_some())
    }

    async fn set_reset_otp(
        &self,
        id: Uuid,
        otp: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let query = r"
            UPDATE accounts
            SET reset_otp = $2,
                reset_otp_expires = $3,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(otp)
            .bind(expires_at)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to set reset code")?;
        Ok(row.is_some())
    }

    async fn consume_reset_otp(
        &self,
        id: Uuid,
        otp: &str,
        new_password_hash: &str,
    ) -> Result<bool, StoreError> {
        let query = r"
            UPDATE accounts
            SET password_hash = $3,
                reset_otp = NULL,
                reset_otp_expires = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND reset_otp = $2
            RETURNING id
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(otp)
            .bind(new_password_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to consume reset code")?;
        Ok(row.is_some())
    }
}
