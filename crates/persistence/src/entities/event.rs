//! Event invite and participant entities.

use chrono::{DateTime, Utc};
use domain::models::{
    EventInvite, EventInviteInfo, EventParticipant, InviteStatus, ParticipantInfo, UserProfile,
};
use sqlx::FromRow;

/// Maps to the `invite_status` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "invite_status", rename_all = "lowercase")]
pub enum InviteStatusDb {
    Pending,
    Accepted,
    Rejected,
}

impl From<InviteStatusDb> for InviteStatus {
    fn from(db: InviteStatusDb) -> Self {
        match db {
            InviteStatusDb::Pending => InviteStatus::Pending,
            InviteStatusDb::Accepted => InviteStatus::Accepted,
            InviteStatusDb::Rejected => InviteStatus::Rejected,
        }
    }
}

impl From<InviteStatus> for InviteStatusDb {
    fn from(status: InviteStatus) -> Self {
        match status {
            InviteStatus::Pending => InviteStatusDb::Pending,
            InviteStatus::Accepted => InviteStatusDb::Accepted,
            InviteStatus::Rejected => InviteStatusDb::Rejected,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EventInviteEntity {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub post_id: i64,
    pub message: String,
    pub status: InviteStatusDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventInviteEntity> for EventInvite {
    fn from(entity: EventInviteEntity) -> Self {
        Self {
            id: entity.id,
            sender_id: entity.sender_id,
            receiver_id: entity.receiver_id,
            post_id: entity.post_id,
            message: entity.message,
            status: entity.status.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Invite joined with the sender's profile.
#[derive(Debug, Clone, FromRow)]
pub struct EventInviteInfoEntity {
    pub id: i64,
    pub post_id: i64,
    pub message: String,
    pub status: InviteStatusDb,
    pub created_at: DateTime<Utc>,
    pub sender_id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<EventInviteInfoEntity> for EventInviteInfo {
    fn from(entity: EventInviteInfoEntity) -> Self {
        Self {
            id: entity.id,
            post_id: entity.post_id,
            sender: UserProfile {
                id: entity.sender_id,
                username: entity.username,
                first_name: entity.first_name,
                last_name: entity.last_name,
                email: entity.email,
            },
            message: entity.message,
            status: entity.status.into(),
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EventParticipantEntity {
    pub user_id: i64,
    pub post_id: i64,
    pub registered_at: DateTime<Utc>,
}

impl From<EventParticipantEntity> for EventParticipant {
    fn from(entity: EventParticipantEntity) -> Self {
        Self {
            user_id: entity.user_id,
            post_id: entity.post_id,
            registered_at: entity.registered_at,
        }
    }
}

/// Participant joined with the user's profile.
#[derive(Debug, Clone, FromRow)]
pub struct ParticipantEntity {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registered_at: DateTime<Utc>,
}

impl From<ParticipantEntity> for ParticipantInfo {
    fn from(entity: ParticipantEntity) -> Self {
        Self {
            user: UserProfile {
                id: entity.id,
                username: entity.username,
                first_name: entity.first_name,
                last_name: entity.last_name,
                email: entity.email,
            },
            registered_at: entity.registered_at,
        }
    }
}
