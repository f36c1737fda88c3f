//! Login endpoint.

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
use super::types::{LoginRequest, SessionTokenResponse};
use super::utils::{extract_client_ip, normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = SessionTokenResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid email or password", body = String),
        (status = 429, description = "Rate limited", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    service: Extension<Arc<AuthService<PgAccountStore>>>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }

    let client_ip = extract_client_ip(&headers);
    if auth_state
        .rate_limiter()
        .check_ip(client_ip.as_deref(), RateLimitAction::Login)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }
    if auth_state
        .rate_limiter()
        .check_email(&email, RateLimitAction::Login)
        == RateLimitDecision::Limited
    {
        return (StatusCode::TOO_MANY_REQUESTS, "Rate limited".to_string()).into_response();
    }

    match service.login(&email, &request.password).await {
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
            if matches!(err, AuthError::Store(_) | AuthError::Crypto(_) | AuthError::Token(_)) {
                error!("Login failed: {err}");
            }
            error_response(&err).into_response()
        }
    }
}
