//! Friend requests and friendships.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::{
    models::{
        FriendListResponse, FriendRequest, FriendRequestInfo, FriendshipStatusResponse,
        SendFriendRequestRequest, UserProfile,
    },
    UserId,
};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
pub struct RequestListResponse {
    pub requests: Vec<FriendRequestInfo>,
    pub count: usize,
}

impl From<Vec<FriendRequestInfo>> for RequestListResponse {
    fn from(requests: Vec<FriendRequestInfo>) -> Self {
        Self {
            count: requests.len(),
            requests,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MutualFriendsResponse {
    pub user_id: UserId,
    pub mutual_friends: Vec<UserProfile>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct FriendCountResponse {
    pub count: i64,
}

/// POST /api/v1/friends/requests
pub async fn send_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SendFriendRequestRequest>,
) -> Result<(StatusCode, Json<FriendRequest>), ApiError> {
    request.validate()?;

    let created = state.friendships.send_request(user.user_id, &request.email).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/friends/requests
pub async fn incoming_requests(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<RequestListResponse>, ApiError> {
    Ok(Json(state.friendships.incoming(user.user_id).await?.into()))
}

/// GET /api/v1/friends/requests/sent
pub async fn outgoing_requests(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<RequestListResponse>, ApiError> {
    Ok(Json(state.friendships.outgoing(user.user_id).await?.into()))
}

/// POST /api/v1/friends/requests/:id/accept
pub async fn accept_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(request_id): Path<i64>,
) -> Result<Json<FriendRequest>, ApiError> {
    Ok(Json(state.friendships.accept(request_id, user.user_id).await?))
}

/// POST /api/v1/friends/requests/:id/reject
pub async fn reject_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(request_id): Path<i64>,
) -> Result<Json<FriendRequest>, ApiError> {
    Ok(Json(state.friendships.reject(request_id, user.user_id).await?))
}

/// POST /api/v1/friends/requests/:id/cancel
pub async fn cancel_request(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(request_id): Path<i64>,
) -> Result<Json<FriendRequest>, ApiError> {
    Ok(Json(state.friendships.cancel(request_id, user.user_id).await?))
}

/// GET /api/v1/friends
pub async fn list_friends(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<FriendListResponse>, ApiError> {
    let friends = state.friendships.friends(user.user_id).await?;
    Ok(Json(FriendListResponse {
        count: friends.len(),
        friends,
    }))
}

/// GET /api/v1/friends/count
pub async fn friend_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<FriendCountResponse>, ApiError> {
    let count = state.friendships.friend_count(user.user_id).await?;
    Ok(Json(FriendCountResponse { count }))
}

/// DELETE /api/v1/friends/:user_id
pub async fn remove_friend(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(friend_id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    state.friendships.remove_friend(user.user_id, friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/friends/:user_id/status
pub async fn friendship_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(other): Path<UserId>,
) -> Result<Json<FriendshipStatusResponse>, ApiError> {
    let are_friends = state.friendships.are_friends(user.user_id, other).await?;
    Ok(Json(FriendshipStatusResponse {
        user_id: other,
        are_friends,
    }))
}

/// GET /api/v1/friends/:user_id/mutual
pub async fn mutual_friends(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(other): Path<UserId>,
) -> Result<Json<MutualFriendsResponse>, ApiError> {
    let mutual_friends = state.friendships.mutual_friends(user.user_id, other).await?;
    Ok(Json(MutualFriendsResponse {
        user_id: other,
        count: mutual_friends.len(),
        mutual_friends,
    }))
}
