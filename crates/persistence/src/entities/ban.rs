//! Ban and ban history entities.

use chrono::{DateTime, Utc};
use domain::models::{BanAction, BanHistoryEntry, BanListItem, BanStats, UserBan};
use sqlx::FromRow;

/// Maps to the `ban_action` PostgreSQL enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ban_action", rename_all = "lowercase")]
pub enum BanActionDb {
    Banned,
    Unbanned,
}

impl From<BanActionDb> for BanAction {
    fn from(db: BanActionDb) -> Self {
        match db {
            BanActionDb::Banned => BanAction::Ban,
            BanActionDb::Unbanned => BanAction::Unban,
        }
    }
}

impl From<BanAction> for BanActionDb {
    fn from(action: BanAction) -> Self {
        match action {
            BanAction::Ban => BanActionDb::Banned,
            BanAction::Unban => BanActionDb::Unbanned,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct UserBanEntity {
    pub id: i64,
    pub user_id: i64,
    pub banned_by_admin_id: i64,
    pub reason: String,
    pub banned_at: DateTime<Utc>,
    pub unbanned_at: Option<DateTime<Utc>>,
    pub unbanned_by_admin_id: Option<i64>,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl From<UserBanEntity> for UserBan {
    fn from(entity: UserBanEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            banned_by_admin_id: entity.banned_by_admin_id,
            reason: entity.reason,
            banned_at: entity.banned_at,
            unbanned_at: entity.unbanned_at,
            unbanned_by_admin_id: entity.unbanned_by_admin_id,
            is_active: entity.is_active,
            notes: entity.notes,
        }
    }
}

/// Active ban joined with both usernames.
#[derive(Debug, Clone, FromRow)]
pub struct BanListEntity {
    #[sqlx(flatten)]
    pub ban: UserBanEntity,
    pub username: String,
    pub banned_by_username: String,
}

impl From<BanListEntity> for BanListItem {
    fn from(entity: BanListEntity) -> Self {
        Self {
            ban: entity.ban.into(),
            username: entity.username,
            banned_by_username: entity.banned_by_username,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BanHistoryEntity {
    pub id: i64,
    pub user_id: i64,
    pub admin_id: i64,
    pub action: BanActionDb,
    pub reason: String,
    pub ban_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<BanHistoryEntity> for BanHistoryEntry {
    fn from(entity: BanHistoryEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            admin_id: entity.admin_id,
            action: entity.action.into(),
            reason: entity.reason,
            ban_id: entity.ban_id,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct BanStatsEntity {
    pub active_bans: i64,
    pub total_bans: i64,
    pub unbanned_today: i64,
}

impl From<BanStatsEntity> for BanStats {
    fn from(entity: BanStatsEntity) -> Self {
        Self {
            active_bans: entity.active_bans,
            total_bans: entity.total_bans,
            unbanned_today: entity.unbanned_today,
        }
    }
}
