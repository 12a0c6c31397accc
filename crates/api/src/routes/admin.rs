//! Administration: users, content moderation and bans.
//!
//! Every handler here runs behind `require_admin`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use domain::{
    models::{BanHistoryEntry, BanListItem, BanStats, BanUserRequest, UnbanUserRequest, User, UserBan},
    ports::PostStats,
    DomainError, UserId,
};
use serde::Serialize;
use tracing::{info, warn};
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct ToggleStatusResponse {
    pub user_id: UserId,
    pub is_active: bool,
}

/// Identity counters merged with the post service's content counters.
#[derive(Debug, Serialize)]
pub struct PlatformStatsResponse {
    pub total_users: i64,
    #[serde(flatten)]
    pub content: PostStats,
    /// False when the post service could not be reached and its
    /// counters are reported as zero.
    pub content_available: bool,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub id: i64,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct BanListResponse {
    pub bans: Vec<BanListItem>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct UserBanStatusResponse {
    pub user_id: UserId,
    pub is_banned: bool,
    pub ban: Option<UserBan>,
}

#[derive(Debug, Serialize)]
pub struct BanHistoryResponse {
    pub user_id: UserId,
    pub history: Vec<BanHistoryEntry>,
}

/// GET /api/v1/admin/users
pub async fn list_users(State(state): State<AppState>) -> Result<Json<UserListResponse>, ApiError> {
    let users = state.identity.list_users().await?;
    Ok(Json(UserListResponse {
        count: users.len(),
        users,
    }))
}

/// POST /api/v1/admin/users/:id/toggle-status
///
/// Admins cannot deactivate themselves, and a banned user stays inactive
/// until the ban is lifted.
pub async fn toggle_user_status(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ToggleStatusResponse>, ApiError> {
    if admin.user_id == user_id {
        return Err(DomainError::SelfReference("You cannot change your own account status".into()).into());
    }

    let is_active = state.identity.toggle_active(user_id).await?;
    info!(user_id = user_id, admin_id = admin.user_id, is_active = is_active, "User status toggled");

    Ok(Json(ToggleStatusResponse { user_id, is_active }))
}

/// GET /api/v1/admin/stats
pub async fn platform_stats(
    State(state): State<AppState>,
) -> Result<Json<PlatformStatsResponse>, ApiError> {
    let total_users = state.identity.count_users().await?;

    let (content, content_available) = match state.posts.stats().await {
        Ok(stats) => (stats, true),
        Err(e) => {
            warn!(error = %e, "Post service stats unavailable");
            (PostStats::default(), false)
        }
    };

    Ok(Json(PlatformStatsResponse {
        total_users,
        content,
        content_available,
        generated_at: Utc::now(),
    }))
}

/// DELETE /api/v1/admin/posts/:id
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(post_id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.posts.delete_post(post_id).await?;
    info!(post_id = post_id, admin_id = admin.user_id, "Post deleted");
    Ok(Json(DeletedResponse {
        id: post_id,
        deleted: true,
    }))
}

/// DELETE /api/v1/admin/comments/:id
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(comment_id): Path<i64>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.posts.delete_comment(comment_id).await?;
    info!(comment_id = comment_id, admin_id = admin.user_id, "Comment deleted");
    Ok(Json(DeletedResponse {
        id: comment_id,
        deleted: true,
    }))
}

/// POST /api/v1/admin/bans
pub async fn ban_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Json(request): Json<BanUserRequest>,
) -> Result<(StatusCode, Json<UserBan>), ApiError> {
    request.validate()?;

    let ban = state
        .bans
        .ban(admin.user_id, request.user_id, request.reason, request.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(ban)))
}

/// POST /api/v1/admin/bans/:user_id/unban
///
/// The body is optional.
pub async fn unban_user(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(user_id): Path<UserId>,
    request: Option<Json<UnbanUserRequest>>,
) -> Result<Json<UserBan>, ApiError> {
    let reason = match request {
        Some(Json(request)) => {
            request.validate()?;
            request.reason
        }
        None => None,
    };

    Ok(Json(state.bans.unban(admin.user_id, user_id, reason).await?))
}

/// GET /api/v1/admin/bans
pub async fn list_bans(State(state): State<AppState>) -> Result<Json<BanListResponse>, ApiError> {
    let bans = state.bans.active_bans().await?;
    Ok(Json(BanListResponse {
        count: bans.len(),
        bans,
    }))
}

/// GET /api/v1/admin/bans/stats
pub async fn ban_stats(State(state): State<AppState>) -> Result<Json<BanStats>, ApiError> {
    Ok(Json(state.bans.stats().await?))
}

/// GET /api/v1/admin/bans/:user_id
pub async fn user_ban(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserBanStatusResponse>, ApiError> {
    let ban = state.bans.active_ban(user_id).await?;
    Ok(Json(UserBanStatusResponse {
        user_id,
        is_banned: ban.is_some(),
        ban,
    }))
}

/// GET /api/v1/admin/bans/:user_id/history
pub async fn ban_history(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<BanHistoryResponse>, ApiError> {
    let history = state.bans.history(user_id).await?;
    Ok(Json(BanHistoryResponse { user_id, history }))
}
