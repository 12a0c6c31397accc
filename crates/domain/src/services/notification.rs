//! Best-effort notification emission.
//!
//! Relationship transitions commit first and notify afterwards. A failing
//! mailbox is logged and never undoes the committed transition.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::{
    models::{NewNotification, Notification, NotificationType},
    ports::NotificationSink,
    UserId,
};

pub const DEFAULT_NOTIFICATION_TTL_DAYS: i64 = 30;

#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    ttl: Option<Duration>,
}

impl Notifier {
    /// `ttl` sets `expires_at` on relationship notifications; `None` keeps them forever.
    pub fn new(sink: Arc<dyn NotificationSink>, ttl: Option<Duration>) -> Self {
        Self { sink, ttl }
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.ttl.map(|ttl| Utc::now() + ttl)
    }

    pub async fn emit(&self, notification: NewNotification) -> Option<Notification> {
        let user_id = notification.user_id;
        let kind = notification.notification_type;
        let related_id = notification.related_id;

        match self.sink.create(notification).await {
            Ok(created) => Some(created),
            Err(e) => {
                warn!(
                    user_id = user_id,
                    notification_type = %kind,
                    related_id = ?related_id,
                    error = %e,
                    "Failed to create notification"
                );
                None
            }
        }
    }

    /// Removes the notification that announced `related_id` to `user_id`.
    pub async fn retract(&self, user_id: UserId, kind: NotificationType, related_id: i64) {
        if let Err(e) = self.sink.delete_by_related(user_id, kind, related_id).await {
            warn!(
                user_id = user_id,
                notification_type = %kind,
                related_id = related_id,
                error = %e,
                "Failed to retract notification"
            );
        }
    }
}
