//! Session cookie extractor.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use domain::{services::SessionLookup, UserId};

use crate::app::AppState;
use crate::error::ApiError;

/// The user behind the request's session cookie.
///
/// Rejects with 401 when the cookie is missing, unknown or expired. The
/// two failure cases are indistinguishable to the client.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub token: String,
}

impl CurrentUser {
    pub fn from_headers(headers: &HeaderMap, state: &AppState) -> Result<Self, ApiError> {
        let jar = CookieJar::from_headers(headers);
        let token = state
            .cookies
            .token(&jar)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        match state.sessions.resolve(token) {
            SessionLookup::Active(user_id) => Ok(Self {
                user_id,
                token: token.to_string(),
            }),
            SessionLookup::Expired => {
                tracing::debug!("Expired session presented");
                Err(ApiError::Unauthorized("Authentication required".to_string()))
            }
            SessionLookup::NotFound => Err(ApiError::Unauthorized("Authentication required".to_string())),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // The admin guard has already resolved the session.
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        Self::from_headers(&parts.headers, state)
    }
}
