//! Forgot-password and reset-password endpoints.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::error;

use super::error::{AuthError, error_response};
use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::service::AuthService;
use super::state::AuthState;
use super::store::PgAccountStore;
use super::types::{ForgotPasswordRequest, ResetPasswordRequest};
use super::utils::{extract_client_ip, normalize_email, valid_email};

/// Start a password reset (always returns 204 to avoid user enumeration).
#[utoipa::path(
    post,
    path = "/v1/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 204, description = "Reset accepted")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgAccountStore>>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> impl IntoResponse {
    let request: ForgotPasswordRequest = match payload {
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
        .check_ip(client_ip.as_deref(), RateLimitAction::ForgotPassword)
        == RateLimitDecision::Limited
    {
        return StatusCode::NO_CONTENT.into_response();
    }
    if auth_state
        .rate_limiter()
        .check_email(&email, RateLimitAction::ForgotPassword)
        == RateLimitDecision::Limited
    {
        return StatusCode::NO_CONTENT.into_response();
    }

    match service.forgot_password(&email).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to start password reset: {err}");
            // Avoid leaking failures; always return 204 to callers.
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

/// Consume a reset code and store a new password.
#[utoipa::path(
    post,
    path = "/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 204, description = "Password reset"),
        (status = 400, description = "Invalid or expired code", body = String),
        (status = 404, description = "No pending reset for this email", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgAccountStore>>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let otp = request.otp.trim();
    if otp.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing code".to_string()).into_response();
    }
    if request.new_password.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing password".to_string()).into_response();
    }

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::ResetPassword)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }
    if auth_state
        .rate_limiter()
        .check_email(&email, RateLimitAction::ResetPassword)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match service.reset_password(&email, otp, &request.new_password).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            if matches!(err, AuthError::Store(_) | AuthError::Crypto(_)) {
                error!("Password reset failed: {err}");
            }
            error_response(&err).into_response()
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
    async fn forgot_password_missing_payload() -> Result<()> {
        let response = forgot_password(
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
    async fn forgot_password_invalid_email_is_opaque() -> Result<()> {
        let response = forgot_password(
            HeaderMap::new(),
            Extension(service()?),
            Extension(auth_state()),
            Some(Json(ForgotPasswordRequest {
                email: "not-an-email".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_rejects_empty_fields() -> Result<()> {
        let response = reset_password(
            HeaderMap::new(),
            Extension(service()?),
            Extension(auth_state()),
            Some(Json(ResetPasswordRequest {
                email: "a@x.com".to_string(),
                otp: " ".to_string(),
                new_password: "newpass1".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
