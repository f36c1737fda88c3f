//! Typed auth failures and their HTTP mapping.

use axum::http::StatusCode;
use thiserror::Error;

use super::token::TokenError;

/// Failures the auth flows can surface.
///
/// Store and crypto failures are deliberately opaque at the HTTP layer;
/// everything else maps to a short human-readable message.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    DuplicateAccount,
    #[error("no pending account for this email")]
    NotFound,
    #[error("invalid code")]
    InvalidCode,
    #[error("code expired, request a new one")]
    ExpiredCode,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account store failure")]
    Store(#[source] anyhow::Error),
    #[error("credential processing failure")]
    Crypto(#[source] anyhow::Error),
    #[error("failed to issue session token")]
    Token(#[source] TokenError),
}

/// Map an auth failure to a response status and user-safe body.
pub(super) fn error_response(err: &AuthError) -> (StatusCode, String) {
    match err {
        AuthError::DuplicateAccount => (StatusCode::CONFLICT, err.to_string()),
        AuthError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
        AuthError::InvalidCode | AuthError::ExpiredCode => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, err.to_string()),
        AuthError::Store(_) | AuthError::Crypto(_) | AuthError::Token(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "request failed".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn distinct_codes_get_distinct_messages() {
        let (invalid_status, invalid_body) = error_response(&AuthError::InvalidCode);
        let (expired_status, expired_body) = error_response(&AuthError::ExpiredCode);
        assert_eq!(invalid_status, StatusCode::BAD_REQUEST);
        assert_eq!(expired_status, StatusCode::BAD_REQUEST);
        assert_ne!(invalid_body, expired_body);
    }

    #[test]
    fn internal_failures_are_opaque() {
        let (status, body) = error_response(&AuthError::Store(anyhow!("connection refused")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("connection"));
    }

    #[test]
    fn credentials_error_is_uniform() {
        let (status, body) = error_response(&AuthError::InvalidCredentials);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "invalid email or password");
    }
}
