//! Admin guard for the `/api/v1/admin` routes.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

/// Requires a live session whose user is an administrator.
///
/// No session is 401; a non-admin session is 403. The resolved
/// [`CurrentUser`] is stored in request extensions for the handler.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let user = match CurrentUser::from_headers(req.headers(), &state) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match state.identity.is_admin(user.user_id).await {
        Ok(true) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(false) => {
            tracing::warn!(user_id = user.user_id, "Admin access denied");
            ApiError::Forbidden("Admin access required".to_string()).into_response()
        }
        Err(err) => ApiError::from(err).into_response(),
    }
}
