//! Notification entities.

use chrono::{DateTime, Utc};
use domain::models::{
    Notification, NotificationStats, NotificationStatus, NotificationSummary, NotificationType,
};
use sqlx::FromRow;

/// Maps to the `notification_type` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
pub enum NotificationTypeDb {
    FriendRequest,
    EventInvite,
    PostComment,
    General,
}

impl From<NotificationTypeDb> for NotificationType {
    fn from(db: NotificationTypeDb) -> Self {
        match db {
            NotificationTypeDb::FriendRequest => NotificationType::FriendRequest,
            NotificationTypeDb::EventInvite => NotificationType::EventInvite,
            NotificationTypeDb::PostComment => NotificationType::PostComment,
            NotificationTypeDb::General => NotificationType::General,
        }
    }
}

impl From<NotificationType> for NotificationTypeDb {
    fn from(kind: NotificationType) -> Self {
        match kind {
            NotificationType::FriendRequest => NotificationTypeDb::FriendRequest,
            NotificationType::EventInvite => NotificationTypeDb::EventInvite,
            NotificationType::PostComment => NotificationTypeDb::PostComment,
            NotificationType::General => NotificationTypeDb::General,
        }
    }
}

/// Maps to the `notification_status` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_status", rename_all = "lowercase")]
pub enum NotificationStatusDb {
    Unread,
    Read,
}

impl From<NotificationStatusDb> for NotificationStatus {
    fn from(db: NotificationStatusDb) -> Self {
        match db {
            NotificationStatusDb::Unread => NotificationStatus::Unread,
            NotificationStatusDb::Read => NotificationStatus::Read,
        }
    }
}

/// Notification row with the sender's username.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: i64,
    pub user_id: i64,
    pub notification_type: NotificationTypeDb,
    pub title: String,
    pub message: String,
    pub related_id: Option<i64>,
    pub sender_id: Option<i64>,
    pub sender_username: Option<String>,
    pub status: NotificationStatusDb,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<NotificationEntity> for Notification {
    fn from(entity: NotificationEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            notification_type: entity.notification_type.into(),
            title: entity.title,
            message: entity.message,
            related_id: entity.related_id,
            sender_id: entity.sender_id,
            sender_username: entity.sender_username,
            status: entity.status.into(),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
            expires_at: entity.expires_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationSummaryEntity {
    pub unread_count: i64,
    pub friend_requests: i64,
    pub event_invites: i64,
    pub comments: i64,
}

impl From<NotificationSummaryEntity> for NotificationSummary {
    fn from(entity: NotificationSummaryEntity) -> Self {
        Self {
            unread_count: entity.unread_count,
            friend_requests: entity.friend_requests,
            event_invites: entity.event_invites,
            comments: entity.comments,
            has_notifications: entity.unread_count > 0,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct NotificationStatsEntity {
    pub total: i64,
    pub unread: i64,
    pub expired: i64,
}

impl From<NotificationStatsEntity> for NotificationStats {
    fn from(entity: NotificationStatsEntity) -> Self {
        Self {
            total: entity.total,
            unread: entity.unread,
            expired: entity.expired,
        }
    }
}
