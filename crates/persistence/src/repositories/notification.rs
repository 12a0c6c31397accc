//! Notification repository.

use async_trait::async_trait;
use domain::{
    models::{NewNotification, Notification, NotificationStats, NotificationSummary, NotificationType},
    ports::NotificationSink,
    DomainError, UserId,
};
use shared::pagination::PageRequest;
use sqlx::PgPool;

use crate::entities::{
    NotificationEntity, NotificationStatsEntity, NotificationStatusDb, NotificationSummaryEntity,
    NotificationTypeDb,
};
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Distinguishes an unknown id from someone else's notification after a
    /// scoped write touched no rows.
    async fn ownership_failure(&self, id: i64) -> Result<DomainError, DomainError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM notifications WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(if exists {
            DomainError::Unauthorized("Notification belongs to another user".to_string())
        } else {
            DomainError::not_found("Notification not found")
        })
    }
}

#[async_trait]
impl NotificationSink for NotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<Notification, DomainError> {
        let timer = QueryTimer::new("create_notification");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            WITH inserted AS (
                INSERT INTO notifications (user_id, type, title, message, related_id, sender_id, expires_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            SELECT i.id, i.user_id, i.type AS notification_type, i.title, i.message, i.related_id,
                   i.sender_id, s.username AS sender_username, i.status, i.created_at,
                   i.updated_at, i.expires_at
            FROM inserted i
            LEFT JOIN users s ON s.id = i.sender_id
            "#,
        )
        .bind(notification.user_id)
        .bind(NotificationTypeDb::from(notification.notification_type))
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.related_id)
        .bind(notification.sender_id)
        .bind(notification.expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    async fn list_for_user(&self, user: UserId, page: PageRequest) -> Result<Vec<Notification>, DomainError> {
        let timer = QueryTimer::new("list_notifications");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT n.id, n.user_id, n.type AS notification_type, n.title, n.message, n.related_id,
                   n.sender_id, s.username AS sender_username, n.status, n.created_at,
                   n.updated_at, n.expires_at
            FROM notifications n
            LEFT JOIN users s ON s.id = n.sender_id
            WHERE n.user_id = $1
              AND (n.expires_at IS NULL OR n.expires_at > NOW())
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn summary(&self, user: UserId) -> Result<NotificationSummary, DomainError> {
        let timer = QueryTimer::new("notification_summary");
        let result = sqlx::query_as::<_, NotificationSummaryEntity>(
            r#"
            SELECT
                COUNT(*) AS unread_count,
                COUNT(*) FILTER (WHERE type = 'friend_request') AS friend_requests,
                COUNT(*) FILTER (WHERE type = 'event_invite') AS event_invites,
                COUNT(*) FILTER (WHERE type = 'post_comment') AS comments
            FROM notifications
            WHERE user_id = $1
              AND status = 'unread'
              AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }

    async fn mark_read(&self, id: i64, user: UserId) -> Result<(), DomainError> {
        let timer = QueryTimer::new("mark_notification_read");
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user)
        .bind(NotificationStatusDb::Read)
        .execute(&self.pool)
        .await;
        timer.record();

        if result?.rows_affected() == 0 {
            return Err(self.ownership_failure(id).await?);
        }
        Ok(())
    }

    async fn mark_all_read(&self, user: UserId) -> Result<u64, DomainError> {
        let timer = QueryTimer::new("mark_all_notifications_read");
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET status = 'read', updated_at = NOW()
            WHERE user_id = $1 AND status = 'unread'
            "#,
        )
        .bind(user)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    async fn delete(&self, id: i64, user: UserId) -> Result<(), DomainError> {
        let timer = QueryTimer::new("delete_notification");
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user)
            .execute(&self.pool)
            .await;
        timer.record();

        if result?.rows_affected() == 0 {
            return Err(self.ownership_failure(id).await?);
        }
        Ok(())
    }

    async fn delete_by_related(
        &self,
        user: UserId,
        notification_type: NotificationType,
        related_id: i64,
    ) -> Result<u64, DomainError> {
        let timer = QueryTimer::new("delete_notifications_by_related");
        let result = sqlx::query(
            "DELETE FROM notifications WHERE user_id = $1 AND type = $2 AND related_id = $3",
        )
        .bind(user)
        .bind(NotificationTypeDb::from(notification_type))
        .bind(related_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    async fn delete_expired(&self) -> Result<u64, DomainError> {
        let timer = QueryTimer::new("delete_expired_notifications");
        let result = sqlx::query("DELETE FROM notifications WHERE expires_at IS NOT NULL AND expires_at <= NOW()")
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected())
    }

    async fn stats(&self) -> Result<NotificationStats, DomainError> {
        let timer = QueryTimer::new("notification_stats");
        let result = sqlx::query_as::<_, NotificationStatsEntity>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'unread') AS unread,
                COUNT(*) FILTER (WHERE expires_at IS NOT NULL AND expires_at <= NOW()) AS expired
            FROM notifications
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }
}
