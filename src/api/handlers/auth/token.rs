//! Session token issuance and verification.
//!
//! Sessions are stateless HS256 tokens binding a user id and email to
//! an expiry. Nothing is persisted server-side; every privileged
//! request re-verifies the token signature and expiry.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: account ID (UUID string).
    pub sub: String,
    /// Account email at issuance time.
    pub email: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed session token")]
    Malformed,
    #[error("invalid session token signature")]
    InvalidSignature,
    #[error("session token expired")]
    Expired,
    #[error("failed to sign session token")]
    Signing,
}

/// Issue a signed session token for an account.
///
/// # Errors
/// Returns [`TokenError::Signing`] if encoding fails, which is
/// unexpected with an HMAC key.
pub(crate) fn issue(
    user_id: Uuid,
    email: &str,
    secret: &SecretString,
    ttl_seconds: i64,
) -> Result<String, TokenError> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now,
        exp: now + ttl_seconds,
    };

    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|_| TokenError::Signing)
}

/// Decode and verify a session token (signature + expiry).
///
/// # Errors
/// Returns a typed error for malformed input, a bad signature, or an
/// expired token.
pub(crate) fn verify(token: &str, secret: &SecretString) -> Result<SessionClaims, TokenError> {
    let key = DecodingKey::from_secret(secret.expose_secret().as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["sub", "exp"]);

    jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> SecretString {
        SecretString::from("unit-test-signing-secret".to_string())
    }

    #[test]
    fn token_round_trip() -> Result<(), TokenError> {
        let user_id = Uuid::new_v4();
        let token = issue(user_id, "ann@example.com", &test_secret(), 3600)?;
        let claims = verify(&token, &test_secret())?;

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "ann@example.com");
        assert!(claims.exp - claims.iat == 3600);
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> Result<(), TokenError> {
        let token = issue(Uuid::new_v4(), "ann@example.com", &test_secret(), -60)?;
        let result = verify(&token, &test_secret());
        assert!(matches!(result, Err(TokenError::Expired)));
        Ok(())
    }

    #[test]
    fn wrong_secret_is_rejected() -> Result<(), TokenError> {
        let token = issue(Uuid::new_v4(), "ann@example.com", &test_secret(), 3600)?;
        let other = SecretString::from("a-different-secret".to_string());
        let result = verify(&token, &other);
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn garbage_token_is_malformed() {
        let result = verify("not-a-token", &test_secret());
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn seven_day_expiry_is_encoded() -> Result<(), TokenError> {
        let ttl = 7 * 24 * 60 * 60;
        let token = issue(Uuid::new_v4(), "ann@example.com", &test_secret(), ttl)?;
        let claims = verify(&token, &test_secret())?;
        assert_eq!(claims.exp - claims.iat, ttl);
        Ok(())
    }
}
