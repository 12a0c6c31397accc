//! Caller profile, password, participations and user lookup.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::{
    models::{
        ChangePasswordRequest, EmailLookupQuery, EventParticipant, SearchQuery, User,
        UserProfile,
    },
    DomainError, UserId,
};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

#[derive(Debug, Serialize)]
pub struct ParticipationsResponse {
    pub participations: Vec<EventParticipant>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub users: Vec<UserProfile>,
}

/// GET /api/v1/users/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<User>, ApiError> {
    Ok(Json(state.auth.me(user.user_id).await?))
}

#[derive(Debug, Serialize)]
pub struct PasswordChangedResponse {
    pub message: String,
    pub revoked_sessions: usize,
}

/// POST /api/v1/users/me/password
///
/// A wrong current password is a 401. Other sessions of the caller are
/// revoked; the one making the request stays valid.
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<PasswordChangedResponse>, ApiError> {
    request.validate()?;

    let revoked_sessions = state
        .auth
        .change_password(user.user_id, &user.token, request)
        .await?;
    Ok(Json(PasswordChangedResponse {
        message: "Password changed".to_string(),
        revoked_sessions,
    }))
}

/// GET /api/v1/users/:user_id
pub async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserProfile>, ApiError> {
    let found = state
        .identity
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("User not found"))?;
    Ok(Json(found.profile()))
}

/// GET /api/v1/users/by-email?email=
pub async fn find_by_email(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<EmailLookupQuery>,
) -> Result<Json<UserProfile>, ApiError> {
    query.validate()?;

    let found = state
        .identity
        .find_by_email(query.email.trim())
        .await?
        .ok_or_else(|| DomainError::not_found("User not found"))?;
    Ok(Json(found.profile()))
}

/// GET /api/v1/users/me/participations
pub async fn participations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ParticipationsResponse>, ApiError> {
    let participations = state.events.participations(user.user_id).await?;
    Ok(Json(ParticipationsResponse {
        count: participations.len(),
        participations,
    }))
}

/// GET /api/v1/users/search?q=
///
/// Excludes the caller, their friends and anyone with a pending request
/// either way.
pub async fn search(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let users = state.friendships.search(user.user_id, &query.q).await?;
    Ok(Json(SearchResponse { users }))
}
