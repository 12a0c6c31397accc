//! Recipient-scoped notification mailbox entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    FriendRequest,
    EventInvite,
    PostComment,
    General,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::FriendRequest => write!(f, "friend_request"),
            NotificationType::EventInvite => write!(f, "event_invite"),
            NotificationType::PostComment => write!(f, "post_comment"),
            NotificationType::General => write!(f, "general"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Unread,
    Read,
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationStatus::Unread => write!(f, "unread"),
            NotificationStatus::Read => write!(f, "read"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<i64>,
    pub sender_id: Option<UserId>,
    pub sender_username: Option<String>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at < now).unwrap_or(false)
    }

    pub fn is_unread(&self) -> bool {
        self.status == NotificationStatus::Unread
    }
}

/// Insert payload for [`Notification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_id: Option<i64>,
    pub sender_id: Option<UserId>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewNotification {
    pub fn new(
        user_id: UserId,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            related_id: None,
            sender_id: None,
            expires_at: None,
        }
    }

    pub fn related_to(mut self, related_id: i64) -> Self {
        self.related_id = Some(related_id);
        self
    }

    pub fn from_sender(mut self, sender_id: UserId) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn expiring_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }
}

/// Unread counters for the mailbox badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationSummary {
    pub unread_count: i64,
    pub friend_requests: i64,
    pub event_invites: i64,
    pub comments: i64,
    pub has_notifications: bool,
}

impl NotificationSummary {
    /// Tallies the types of unread, unexpired notifications.
    pub fn tally<I>(unread: I) -> Self
    where
        I: IntoIterator<Item = NotificationType>,
    {
        let mut summary = Self::default();
        for kind in unread {
            summary.unread_count += 1;
            match kind {
                NotificationType::FriendRequest => summary.friend_requests += 1,
                NotificationType::EventInvite => summary.event_invites += 1,
                NotificationType::PostComment => summary.comments += 1,
                NotificationType::General => {}
            }
        }
        summary.has_notifications = summary.unread_count > 0;
        summary
    }
}

/// Global mailbox counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationStats {
    pub total: i64,
    pub unread: i64,
    pub expired: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListNotificationsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_summary_tally() {
        let summary = NotificationSummary::tally([
            NotificationType::FriendRequest,
            NotificationType::FriendRequest,
            NotificationType::EventInvite,
            NotificationType::PostComment,
            NotificationType::General,
        ]);
        assert_eq!(summary.unread_count, 5);
        assert_eq!(summary.friend_requests, 2);
        assert_eq!(summary.event_invites, 1);
        assert_eq!(summary.comments, 1);
        assert!(summary.has_notifications);
    }

    #[test]
    fn test_empty_summary() {
        let summary = NotificationSummary::tally(std::iter::empty());
        assert_eq!(summary, NotificationSummary::default());
        assert!(!summary.has_notifications);
    }

    #[test]
    fn test_builder() {
        let expires = Utc::now() + Duration::days(30);
        let n = NewNotification::new(3, NotificationType::FriendRequest, "t", "m")
            .related_to(42)
            .from_sender(8)
            .expiring_at(Some(expires));
        assert_eq!(n.related_id, Some(42));
        assert_eq!(n.sender_id, Some(8));
        assert_eq!(n.expires_at, Some(expires));
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut n = Notification {
            id: 1,
            user_id: 1,
            notification_type: NotificationType::General,
            title: "t".into(),
            message: "m".into(),
            related_id: None,
            sender_id: None,
            sender_username: None,
            status: NotificationStatus::Unread,
            created_at: now,
            updated_at: now,
            expires_at: None,
        };
        assert!(!n.is_expired_at(now));
        n.expires_at = Some(now - Duration::seconds(1));
        assert!(n.is_expired_at(now));
    }

    #[test]
    fn test_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationType::EventInvite).unwrap(),
            "\"event_invite\""
        );
    }
}
