//! Purges expired notifications.

use std::sync::Arc;
use std::time::Duration;

use domain::ports::NotificationSink;
use tracing::info;

use super::scheduler::{Job, JobScheduler};

/// Deletes every notification whose `expires_at` has passed.
///
/// The delete is a single idempotent statement, so overlapping or repeated
/// runs are harmless.
pub struct NotificationCleanupJob {
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
}

impl NotificationCleanupJob {
    pub fn new(sink: Arc<dyn NotificationSink>, interval: Duration) -> Self {
        Self { sink, interval }
    }

    /// Registers the job on `scheduler`.
    pub fn schedule(self, scheduler: &mut JobScheduler) {
        scheduler.register(self);
    }
}

#[async_trait::async_trait]
impl Job for NotificationCleanupJob {
    fn name(&self) -> &'static str {
        "notification_cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), String> {
        let deleted = self
            .sink
            .delete_expired()
            .await
            .map_err(|e| format!("Failed to delete expired notifications: {e}"))?;

        info!(deleted = deleted, "Deleted expired notifications");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use domain::models::{NewNotification, NewUser, NotificationType};
    use domain::ports::IdentityStore;
    use persistence::MemoryStore;
    use shared::pagination::PageRequest;

    async fn seed(store: &Arc<MemoryStore>) -> i64 {
        let user = store
            .create_user(NewUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
                first_name: "Alice".into(),
                last_name: "A".into(),
            })
            .await
            .unwrap();

        store
            .create(
                NewNotification::new(user.id, NotificationType::FriendRequest, "Old", "expired")
                    .expiring_at(Some(Utc::now() - ChronoDuration::hours(1))),
            )
            .await
            .unwrap();
        store
            .create(NewNotification::new(user.id, NotificationType::General, "New", "kept"))
            .await
            .unwrap();
        user.id
    }

    #[tokio::test]
    async fn test_execute_deletes_expired() {
        let store = Arc::new(MemoryStore::new());
        let user_id = seed(&store).await;

        let job = NotificationCleanupJob::new(store.clone(), Duration::from_secs(3600));
        job.execute().await.unwrap();
        job.execute().await.unwrap();

        let remaining = store.list_for_user(user_id, PageRequest::default()).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "New");
        assert_eq!(NotificationSink::stats(store.as_ref()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_scheduled_cleanup_runs_at_start() {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;

        let mut scheduler = JobScheduler::new();
        NotificationCleanupJob::new(store.clone(), Duration::from_secs(3600)).schedule(&mut scheduler);
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(NotificationSink::stats(store.as_ref()).await.unwrap().total, 1);
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(1)).await;
    }
}
