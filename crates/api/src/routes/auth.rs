//! Registration, login and logout.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::CookieJar;
use domain::models::{AuthResponse, LoginRequest, RegisterRequest};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::AuthOutcome;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn session_response(state: &AppState, outcome: AuthOutcome) -> (HeaderMap, Json<AuthResponse>) {
    let mut headers = HeaderMap::new();
    state.cookies.set(&mut headers, &outcome.session.token);
    (
        headers,
        Json(AuthResponse {
            user: outcome.user,
            expires_at: outcome.session.expires_at,
        }),
    )
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let outcome = state.auth.register(request).await?;
    let (headers, body) = session_response(&state, outcome);
    Ok((StatusCode::CREATED, headers, body))
}

/// POST /api/v1/auth/login
///
/// Accepts `identifier` (or `email`/`username`) and `password`.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    request.validate()?;

    let outcome = state.auth.login(&request.identifier, &request.password).await?;
    Ok(session_response(&state, outcome))
}

/// POST /api/v1/auth/logout
///
/// Always clears the cookie, even when no session was presented.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (HeaderMap, Json<MessageResponse>) {
    if let Some(token) = state.cookies.token(&jar) {
        state.auth.logout(token);
    }

    let mut headers = HeaderMap::new();
    state.cookies.clear(&mut headers);
    (
        headers,
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}
