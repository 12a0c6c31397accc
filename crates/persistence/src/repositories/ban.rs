//! Ban repository: ban/unban transactions and their audit trail.

use async_trait::async_trait;
use domain::{
    models::{
        ban::ensure_bannable, BanAction, BanCommand, BanHistoryEntry, BanListItem, BanState,
        BanStats, UserBan,
    },
    ports::BanStore,
    DomainError, UserId,
};
use sqlx::{Connection, PgConnection, PgPool};
use tracing::warn;

use crate::entities::{BanActionDb, BanHistoryEntity, BanListEntity, BanStatsEntity, UserBanEntity};
use crate::metrics::{record_transition, QueryTimer};

const BAN_COLUMNS: &str = "id, user_id, banned_by_admin_id, reason, banned_at, unbanned_at, \
                           unbanned_by_admin_id, is_active, notes";

#[derive(Clone)]
pub struct BanRepository {
    pool: PgPool,
}

/// One history row to append.
struct HistoryRecord<'a> {
    user_id: UserId,
    admin_id: UserId,
    action: BanAction,
    reason: &'a str,
    ban_id: i64,
}

impl BanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Locks the target user row; returns its admin flag.
    async fn lock_target(conn: &mut PgConnection, user_id: UserId) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))
    }

    async fn locked_active_ban(conn: &mut PgConnection, user_id: UserId) -> Result<Option<UserBan>, DomainError> {
        let ban = sqlx::query_as::<_, UserBanEntity>(&format!(
            "SELECT {BAN_COLUMNS} FROM user_bans WHERE user_id = $1 AND is_active FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
        Ok(ban.map(Into::into))
    }

    /// Appends a history row inside a savepoint. A failure is logged and
    /// rolled back to the savepoint so the surrounding transition still commits.
    async fn append_history(conn: &mut PgConnection, record: HistoryRecord<'_>) {
        let outcome: Result<(), sqlx::Error> = async {
            let mut savepoint = conn.begin().await?;
            sqlx::query(
                r#"
                INSERT INTO ban_history (user_id, admin_id, action, reason, ban_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(record.user_id)
            .bind(record.admin_id)
            .bind(BanActionDb::from(record.action))
            .bind(record.reason)
            .bind(record.ban_id)
            .execute(&mut *savepoint)
            .await?;
            savepoint.commit().await
        }
        .await;

        if let Err(e) = outcome {
            warn!(
                user_id = record.user_id,
                ban_id = record.ban_id,
                action = %record.action,
                error = %e,
                "Failed to append ban history"
            );
        }
    }

    async fn ban_tx(&self, command: BanCommand) -> Result<UserBan, DomainError> {
        let mut tx = self.pool.begin().await?;

        let target_is_admin = Self::lock_target(&mut tx, command.target).await?;
        ensure_bannable(target_is_admin)?;

        let active = Self::locked_active_ban(&mut tx, command.target).await?;
        BanState::from_active(active.as_ref()).apply(BanAction::Ban)?;

        let ban: UserBan = sqlx::query_as::<_, UserBanEntity>(&format!(
            r#"
            INSERT INTO user_bans (user_id, banned_by_admin_id, reason, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING {BAN_COLUMNS}
            "#
        ))
        .bind(command.target)
        .bind(command.admin_id)
        .bind(&command.reason)
        .bind(&command.notes)
        .fetch_one(&mut *tx)
        .await?
        .into();

        sqlx::query("UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(command.target)
            .execute(&mut *tx)
            .await?;

        Self::append_history(
            &mut tx,
            HistoryRecord {
                user_id: command.target,
                admin_id: command.admin_id,
                action: BanAction::Ban,
                reason: &command.reason,
                ban_id: ban.id,
            },
        )
        .await;

        tx.commit().await?;
        Ok(ban)
    }

    async fn unban_tx(&self, target: UserId, admin_id: UserId, reason: &str) -> Result<UserBan, DomainError> {
        let mut tx = self.pool.begin().await?;

        Self::lock_target(&mut tx, target).await?;

        let active = Self::locked_active_ban(&mut tx, target).await?;
        BanState::from_active(active.as_ref()).apply(BanAction::Unban)?;
        let ban_id = active.map(|ban| ban.id).ok_or(DomainError::NoActiveBan)?;

        let lifted: UserBan = sqlx::query_as::<_, UserBanEntity>(&format!(
            r#"
            UPDATE user_bans
            SET is_active = FALSE,
                unbanned_at = NOW(),
                unbanned_by_admin_id = $2,
                notes = CASE
                    WHEN notes IS NULL OR notes = '' THEN '[unban] ' || $3
                    ELSE notes || E'\n[unban] ' || $3
                END
            WHERE id = $1
            RETURNING {BAN_COLUMNS}
            "#
        ))
        .bind(ban_id)
        .bind(admin_id)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?
        .into();

        sqlx::query("UPDATE users SET is_active = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(target)
            .execute(&mut *tx)
            .await?;

        Self::append_history(
            &mut tx,
            HistoryRecord {
                user_id: target,
                admin_id,
                action: BanAction::Unban,
                reason,
                ban_id,
            },
        )
        .await;

        tx.commit().await?;
        Ok(lifted)
    }
}

#[async_trait]
impl BanStore for BanRepository {
    async fn ban(&self, command: BanCommand) -> Result<UserBan, DomainError> {
        let timer = QueryTimer::new("ban_user");
        let result = self.ban_tx(command).await.map_err(|e| match e {
            // Lost a race on the one-active-ban index.
            DomainError::Conflict(_) => DomainError::AlreadyBanned,
            other => other,
        });
        timer.record();
        record_transition("ban", "ban", &result);
        result
    }

    async fn unban(&self, target: UserId, admin_id: UserId, reason: &str) -> Result<UserBan, DomainError> {
        let timer = QueryTimer::new("unban_user");
        let result = self.unban_tx(target, admin_id, reason).await;
        timer.record();
        record_transition("ban", "unban", &result);
        result
    }

    async fn active_ban(&self, user: UserId) -> Result<Option<UserBan>, DomainError> {
        let timer = QueryTimer::new("find_active_ban");
        let result = sqlx::query_as::<_, UserBanEntity>(&format!(
            "SELECT {BAN_COLUMNS} FROM user_bans WHERE user_id = $1 AND is_active"
        ))
        .bind(user)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn find_ban(&self, ban_id: i64) -> Result<Option<UserBan>, DomainError> {
        let timer = QueryTimer::new("find_ban_by_id");
        let result = sqlx::query_as::<_, UserBanEntity>(&format!(
            "SELECT {BAN_COLUMNS} FROM user_bans WHERE id = $1"
        ))
        .bind(ban_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn active_bans(&self) -> Result<Vec<BanListItem>, DomainError> {
        let timer = QueryTimer::new("list_active_bans");
        let result = sqlx::query_as::<_, BanListEntity>(
            r#"
            SELECT b.id, b.user_id, b.banned_by_admin_id, b.reason, b.banned_at, b.unbanned_at,
                   b.unbanned_by_admin_id, b.is_active, b.notes,
                   u.username, a.username AS banned_by_username
            FROM user_bans b
            JOIN users u ON u.id = b.user_id
            JOIN users a ON a.id = b.banned_by_admin_id
            WHERE b.is_active
            ORDER BY b.banned_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn history(&self, user: UserId) -> Result<Vec<BanHistoryEntry>, DomainError> {
        let timer = QueryTimer::new("list_ban_history");
        let result = sqlx::query_as::<_, BanHistoryEntity>(
            r#"
            SELECT id, user_id, admin_id, action, reason, ban_id, created_at
            FROM ban_history
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn stats(&self) -> Result<BanStats, DomainError> {
        let timer = QueryTimer::new("ban_stats");
        let result = sqlx::query_as::<_, BanStatsEntity>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE is_active) AS active_bans,
                COUNT(*) AS total_bans,
                COUNT(*) FILTER (WHERE unbanned_at >= date_trunc('day', NOW())) AS unbanned_today
            FROM user_bans
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?.into())
    }
}
