//! Sweeps expired sessions out of the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use domain::services::SessionStore;
use tracing::{debug, info};

use super::scheduler::{Job, JobScheduler};

/// Tokens that are never presented again are otherwise only evicted on lookup.
pub struct SessionCleanupJob {
    sessions: Arc<SessionStore>,
    interval: Duration,
}

impl SessionCleanupJob {
    pub fn new(sessions: Arc<SessionStore>, interval: Duration) -> Self {
        Self { sessions, interval }
    }

    pub fn schedule(self, scheduler: &mut JobScheduler) {
        scheduler.register(self);
    }
}

#[async_trait::async_trait]
impl Job for SessionCleanupJob {
    fn name(&self) -> &'static str {
        "session_cleanup"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), String> {
        let purged = self.sessions.purge_expired();
        if purged > 0 {
            info!(purged = purged, remaining = self.sessions.len(), "Purged expired sessions");
        } else {
            debug!("No expired sessions to purge");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[tokio::test]
    async fn test_execute_purges_expired_sessions() {
        let sessions = Arc::new(SessionStore::new(ChronoDuration::milliseconds(10)));
        sessions.create_session(1).unwrap();
        sessions.create_session(2).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let job = SessionCleanupJob::new(sessions.clone(), Duration::from_secs(3600));
        job.execute().await.unwrap();

        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_execute_keeps_live_sessions() {
        let sessions = Arc::new(SessionStore::default());
        let session = sessions.create_session(5).unwrap();

        SessionCleanupJob::new(sessions.clone(), Duration::from_secs(3600))
            .execute()
            .await
            .unwrap();

        assert_eq!(sessions.user_id(&session.token), Some(5));
    }
}
