//! Event invitations and participation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{
    EventInvite, EventInviteInfo, EventParticipant, ParticipantsResponse,
    ParticipationStatusResponse, SendEventInviteRequest, UserProfile,
};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
pub struct InviteListResponse {
    pub invites: Vec<EventInviteInfo>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct AvailableFriendsResponse {
    pub post_id: i64,
    pub friends: Vec<UserProfile>,
}

/// POST /api/v1/events/invites
pub async fn send_invite(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SendEventInviteRequest>,
) -> Result<(StatusCode, Json<EventInvite>), ApiError> {
    request.validate()?;

    let invite = state
        .events
        .send_invite(user.user_id, request.post_id, &request.friend_email, request.message)
        .await?;
    Ok((StatusCode::CREATED, Json(invite)))
}

/// GET /api/v1/events/invites
pub async fn pending_invites(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<InviteListResponse>, ApiError> {
    let invites = state.events.pending_invites(user.user_id).await?;
    Ok(Json(InviteListResponse {
        count: invites.len(),
        invites,
    }))
}

/// POST /api/v1/events/invites/:id/accept
///
/// Accepting also registers the caller as a participant.
pub async fn accept_invite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(invite_id): Path<i64>,
) -> Result<Json<EventInvite>, ApiError> {
    Ok(Json(state.events.accept(invite_id, user.user_id).await?))
}

/// POST /api/v1/events/invites/:id/reject
pub async fn reject_invite(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(invite_id): Path<i64>,
) -> Result<Json<EventInvite>, ApiError> {
    Ok(Json(state.events.reject(invite_id, user.user_id).await?))
}

/// POST /api/v1/events/:post_id/join
pub async fn join(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<(StatusCode, Json<EventParticipant>), ApiError> {
    let participant = state.events.join(user.user_id, post_id).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

/// DELETE /api/v1/events/:post_id/join
pub async fn leave(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.events.leave(user.user_id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/events/:post_id/participants
pub async fn participants(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ParticipantsResponse>, ApiError> {
    let participants = state.events.participants(post_id).await?;
    Ok(Json(ParticipantsResponse {
        post_id,
        count: participants.len(),
        participants,
    }))
}

/// GET /api/v1/events/:post_id/participation
pub async fn participation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<ParticipationStatusResponse>, ApiError> {
    let is_participant = state.events.is_participant(user.user_id, post_id).await?;
    Ok(Json(ParticipationStatusResponse {
        post_id,
        is_participant,
    }))
}

/// GET /api/v1/events/:post_id/available-friends
pub async fn available_friends(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<i64>,
) -> Result<Json<AvailableFriendsResponse>, ApiError> {
    let friends = state.events.available_friends(user.user_id, post_id).await?;
    Ok(Json(AvailableFriendsResponse { post_id, friends }))
}
