//! Friend request and friendship entities.

use chrono::{DateTime, Utc};
use domain::models::{FriendInfo, FriendRequest, FriendRequestInfo, FriendRequestStatus, UserProfile};
use sqlx::FromRow;

/// Maps to the `friend_request_status` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "friend_request_status", rename_all = "lowercase")]
pub enum FriendRequestStatusDb {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl From<FriendRequestStatusDb> for FriendRequestStatus {
    fn from(db: FriendRequestStatusDb) -> Self {
        match db {
            FriendRequestStatusDb::Pending => FriendRequestStatus::Pending,
            FriendRequestStatusDb::Accepted => FriendRequestStatus::Accepted,
            FriendRequestStatusDb::Rejected => FriendRequestStatus::Rejected,
            FriendRequestStatusDb::Cancelled => FriendRequestStatus::Cancelled,
        }
    }
}

impl From<FriendRequestStatus> for FriendRequestStatusDb {
    fn from(status: FriendRequestStatus) -> Self {
        match status {
            FriendRequestStatus::Pending => FriendRequestStatusDb::Pending,
            FriendRequestStatus::Accepted => FriendRequestStatusDb::Accepted,
            FriendRequestStatus::Rejected => FriendRequestStatusDb::Rejected,
            FriendRequestStatus::Cancelled => FriendRequestStatusDb::Cancelled,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct FriendRequestEntity {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: FriendRequestStatusDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<FriendRequestEntity> for FriendRequest {
    fn from(entity: FriendRequestEntity) -> Self {
        Self {
            id: entity.id,
            sender_id: entity.sender_id,
            receiver_id: entity.receiver_id,
            status: entity.status.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Request joined with the counterpart's profile.
#[derive(Debug, Clone, FromRow)]
pub struct FriendRequestInfoEntity {
    pub id: i64,
    pub status: FriendRequestStatusDb,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<FriendRequestInfoEntity> for FriendRequestInfo {
    fn from(entity: FriendRequestInfoEntity) -> Self {
        Self {
            id: entity.id,
            user: UserProfile {
                id: entity.user_id,
                username: entity.username,
                first_name: entity.first_name,
                last_name: entity.last_name,
                email: entity.email,
            },
            status: entity.status.into(),
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct FriendEntity {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub friends_since: DateTime<Utc>,
}

impl From<FriendEntity> for FriendInfo {
    fn from(entity: FriendEntity) -> Self {
        Self {
            user: UserProfile {
                id: entity.id,
                username: entity.username,
                first_name: entity.first_name,
                last_name: entity.last_name,
                email: entity.email,
            },
            friends_since: entity.friends_since,
        }
    }
}
