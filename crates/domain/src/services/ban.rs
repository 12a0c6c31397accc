//! Administrative bans.

use std::sync::Arc;

use tracing::info;

use crate::{
    models::{
        ban::{authorize_moderator, DEFAULT_BAN_REASON, DEFAULT_UNBAN_REASON},
        BanCommand, BanHistoryEntry, BanInfo, BanListItem, BanStats, NewNotification,
        NotificationType, UserBan,
    },
    ports::{BanStore, IdentityStore},
    services::Notifier,
    DomainError, UserId,
};

pub struct BanService {
    identity: Arc<dyn IdentityStore>,
    store: Arc<dyn BanStore>,
    notifier: Notifier,
}

impl BanService {
    pub fn new(identity: Arc<dyn IdentityStore>, store: Arc<dyn BanStore>, notifier: Notifier) -> Self {
        Self {
            identity,
            store,
            notifier,
        }
    }

    pub async fn ban(
        &self,
        admin_id: UserId,
        target: UserId,
        reason: Option<String>,
        notes: Option<String>,
    ) -> Result<UserBan, DomainError> {
        let is_admin = self.identity.is_admin(admin_id).await?;
        authorize_moderator(admin_id, is_admin, target)?;

        let reason = non_blank(reason).unwrap_or_else(|| DEFAULT_BAN_REASON.to_string());
        let ban = self
            .store
            .ban(BanCommand {
                target,
                admin_id,
                reason,
                notes: non_blank(notes),
            })
            .await?;

        info!(ban_id = ban.id, user_id = target, admin_id = admin_id, "User banned");
        Ok(ban)
    }

    pub async fn unban(
        &self,
        admin_id: UserId,
        target: UserId,
        reason: Option<String>,
    ) -> Result<UserBan, DomainError> {
        let is_admin = self.identity.is_admin(admin_id).await?;
        authorize_moderator(admin_id, is_admin, target)?;

        let reason = non_blank(reason).unwrap_or_else(|| DEFAULT_UNBAN_REASON.to_string());
        let ban = self.store.unban(target, admin_id, &reason).await?;

        info!(ban_id = ban.id, user_id = target, admin_id = admin_id, "User unbanned");

        self.notifier
            .emit(
                NewNotification::new(
                    target,
                    NotificationType::General,
                    "Account reactivated",
                    "Your account has been reactivated by an administrator",
                )
                .related_to(ban.id)
                .from_sender(admin_id),
            )
            .await;

        Ok(ban)
    }

    /// Ban details shown to a user whose login is refused.
    pub async fn ban_info(&self, user: UserId) -> Result<Option<BanInfo>, DomainError> {
        Ok(self.store.active_ban(user).await?.map(|ban| ban.info()))
    }

    pub async fn active_ban(&self, user: UserId) -> Result<Option<UserBan>, DomainError> {
        self.store.active_ban(user).await
    }

    pub async fn active_bans(&self) -> Result<Vec<BanListItem>, DomainError> {
        self.store.active_bans().await
    }

    pub async fn history(&self, user: UserId) -> Result<Vec<BanHistoryEntry>, DomainError> {
        self.store.history(user).await
    }

    pub async fn stats(&self) -> Result<BanStats, DomainError> {
        self.store.stats().await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
