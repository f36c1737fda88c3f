//! Signup endpoint.

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
use super::service::{AuthService, SignupInput};
use super::state::AuthState;
use super::store::PgAccountStore;
use super::types::{SignupRequest, SignupResponse};
use super::utils::{extract_client_ip, normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created, verification code sent", body = SignupResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 409, description = "Account already exists", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn signup(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgAccountStore>>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    let request: SignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }
    if request.password.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing password".to_string()).into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Signup)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }
    if auth_state
        .rate_limiter()
        .check_email(&email, RateLimitAction::Signup)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    let input = SignupInput {
        email,
        password: request.password,
        name: request.name,
    };

    match service.signup(input).await {
        Ok(_output) => {
            // A failed send is already logged; the code is persisted and
            // resend covers delivery, so the account is still created.
            let response = SignupResponse {
                message: "verification code sent".to_string(),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Err(err) => {
            if matches!(err, AuthError::Store(_) | AuthError::Crypto(_)) {
                error!("Signup failed: {err}");
            }
            error_response(&err).into_response()
        }
    }
}
