//! Favorite posts of the caller.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::{FavoriteListResponse, FavoriteRequest, FavoriteStatus};
use tracing::debug;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

/// POST /api/v1/favorites
///
/// Adding a post that is already a favorite succeeds unchanged.
pub async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<FavoriteRequest>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    request.validate()?;

    let added = state
        .favorites
        .add_favorite(user.user_id, request.post_id)
        .await?;
    debug!(user_id = user.user_id, post_id = request.post_id, added, "Favorite added");
    Ok(Json(FavoriteStatus {
        post_id: request.post_id,
        is_favorite: true,
    }))
}

/// DELETE /api/v1/favorites/:post_id
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    state.favorites.remove_favorite(user.user_id, post_id).await?;
    Ok(Json(FavoriteStatus {
        post_id,
        is_favorite: false,
    }))
}

/// GET /api/v1/favorites/:post_id
pub async fn status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<FavoriteStatus>, ApiError> {
    let is_favorite = state.favorites.is_favorite(user.user_id, post_id).await?;
    Ok(Json(FavoriteStatus {
        post_id,
        is_favorite,
    }))
}

/// GET /api/v1/favorites
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<FavoriteListResponse>, ApiError> {
    let favorites = state.favorites.favorites(user.user_id).await?;
    Ok(Json(FavoriteListResponse {
        count: favorites.len(),
        favorites,
    }))
}
