//! Email verification endpoints.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::error::{AuthError, error_response};
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::service::AuthService;
use super::session::session_cookie;
use super::state::AuthState;
use super::store::PgAccountStore;
use super::types::{ResendVerificationRequest, SessionTokenResponse, VerifyEmailRequest};
use super::utils::{extract_client_ip, normalize_email, valid_email};

/// Verify a pending account by consuming its one-time code.
#[utoipa::path(
    post,
    path = "/v1/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified, session issued", body = SessionTokenResponse),
        (status = 400, description = "Invalid or expired code", body = String),
        (status = 404, description = "No pending account for this email", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn verify_email(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgAccountStore>>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyEmailRequest>>,
) -> impl IntoResponse {
    let request: VerifyEmailRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let otp = request.otp.trim();
    if otp.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing code".to_string()).into_response();
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    // Rate limits are enforced before any stored-code work to avoid amplification.
    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::VerifyEmail)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }
    if auth_state
        .rate_limiter()
        .check_email(&email, RateLimitAction::VerifyEmail)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match service.verify_email(&email, otp).await {
        Ok(output) => {
            let mut response_headers = HeaderMap::new();
            if let Ok(cookie) = session_cookie(auth_state.config(), &output.token) {
                response_headers.insert(SET_COOKIE, cookie);
            }
            let response = SessionTokenResponse {
                token: output.token,
                user_id: output.user_id.to_string(),
                email: output.email,
            };
            (StatusCode::OK, response_headers, Json(response)).into_response()
        }
        Err(err) => {
            if matches!(err, AuthError::Store(_) | AuthError::Token(_)) {
                error!("Verification failed: {err}");
            }
            error_response(&err).into_response()
        }
    }
}

/// Resend a verification code (always returns 204 to avoid user enumeration).
#[utoipa::path(
    post,
    path = "/v1/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 204, description = "Resend accepted")
    ),
    tag = "auth"
)]
pub async fn resend_verification(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgAccountStore>>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResendVerificationRequest>>,
) -> impl IntoResponse {
    let request: ResendVerificationRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        // Always return 204 for invalid emails to avoid account probing.
        return StatusCode::NO_CONTENT.into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ResendVerification)
        == RateLimitDecision::Limited
    {
        // Resend is intentionally opaque; rate limits still return 204.
        return StatusCode::NO_CONTENT.into_response();
    }
    if auth_state
        .rate_limiter()
        .check_email(&email, RateLimitAction::ResendVerification)
        == RateLimitDecision::Limited
    {
        return StatusCode::NO_CONTENT.into_response();
    }

    match service.resend_verification(&email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to resend verification: {err}");
            // Avoid leaking failures; always return 204 to callers.
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::state::{AuthConfig, AuthState};
    use super::super::{NoopRateLimiter, RateLimiter};
    use super::*;
    use crate::api::email::LogEmailSender;
    use anyhow::Result;
    use axum::Json;
    use axum::http::StatusCode;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn service() -> Result<Arc<AuthService<PgAccountStore>>> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        Ok(Arc::new(AuthService::new(
            PgAccountStore::new(pool),
            Arc::new(LogEmailSender),
            AuthConfig::new("https://folioforge.dev".to_string()),
            SecretString::from("handler-test-secret".to_string()),
        )?))
    }

    fn auth_state() -> Arc<AuthState> {
        let config = AuthConfig::new("https://folioforge.dev".to_string());
        let limiter: Arc<dyn RateLimiter> = Arc::new(NoopRateLimiter);
        Arc::new(AuthState::new(config, limiter))
    }

    #[tokio::test]
    async fn verify_email_missing_payload() -> Result<()> {
        let response = verify_email(
            HeaderMap::new(),
            Extension(service()?),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_email_empty_code() -> Result<()> {
        let response = verify_email(
            HeaderMap::new(),
            Extension(service()?),
            Extension(auth_state()),
            Some(Json(VerifyEmailRequest {
                email: "a@x.com".to_string(),
                otp: " ".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn resend_verification_missing_payload() -> Result<()> {
        let response = resend_verification(
            HeaderMap::new(),
            Extension(service()?),
            Extension(auth_state()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn resend_verification_invalid_email_is_opaque() -> Result<()> {
        let response = resend_verification(
            HeaderMap::new(),
            Extension(service()?),
            Extension(auth_state()),
            Some(Json(ResendVerificationRequest {
                email: "not-an-email".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        Ok(())
    }
}
