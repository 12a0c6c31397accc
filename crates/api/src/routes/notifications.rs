//! Notification mailbox.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{ListNotificationsQuery, NotificationListResponse, NotificationSummary};
use serde::Serialize;
use shared::pagination::PageRequest;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

/// GET /api/v1/notifications?limit&offset
///
/// Newest first; expired entries are never listed.
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let page = PageRequest::new(query.limit, query.offset);
    let notifications = state.notifications.list_for_user(user.user_id, page).await?;

    Ok(Json(NotificationListResponse {
        notifications,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// GET /api/v1/notifications/summary
pub async fn summary(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<NotificationSummary>, ApiError> {
    Ok(Json(state.notifications.summary(user.user_id).await?))
}

/// POST /api/v1/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.notifications.mark_read(id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = state.notifications.mark_all_read(user.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

/// DELETE /api/v1/notifications/:id
pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.notifications.delete(id, user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
