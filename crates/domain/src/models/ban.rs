//! Administrative bans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{DomainError, UserId};

pub const DEFAULT_BAN_REASON: &str = "Administrative ban";
pub const DEFAULT_UNBAN_REASON: &str = "Ban lifted by administrator";

/// Whether a user currently has an active ban.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BanState {
    None,
    Active,
}

/// Recorded in `ban_history.action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BanAction {
    #[serde(rename = "banned")]
    Ban,
    #[serde(rename = "unbanned")]
    Unban,
}

impl std::fmt::Display for BanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BanAction::Ban => write!(f, "banned"),
            BanAction::Unban => write!(f, "unbanned"),
        }
    }
}

impl BanState {
    pub fn apply(self, action: BanAction) -> Result<Self, DomainError> {
        match (self, action) {
            (BanState::None, BanAction::Ban) => Ok(BanState::Active),
            (BanState::Active, BanAction::Unban) => Ok(BanState::None),
            (BanState::Active, BanAction::Ban) => Err(DomainError::AlreadyBanned),
            (BanState::None, BanAction::Unban) => Err(DomainError::NoActiveBan),
        }
    }

    pub fn from_active(active: Option<&UserBan>) -> Self {
        match active {
            Some(ban) if ban.is_active => BanState::Active,
            _ => BanState::None,
        }
    }
}

/// Checks the caller may act on `target` at all.
pub fn authorize_moderator(actor: UserId, actor_is_admin: bool, target: UserId) -> Result<(), DomainError> {
    if !actor_is_admin {
        return Err(DomainError::Forbidden(
            "Administrator privileges required".to_string(),
        ));
    }
    if actor == target {
        return Err(DomainError::SelfReference(
            "Administrators cannot ban or unban themselves".to_string(),
        ));
    }
    Ok(())
}

/// Checked inside the ban transaction with the target row locked.
pub fn ensure_bannable(target_is_admin: bool) -> Result<(), DomainError> {
    if target_is_admin {
        Err(DomainError::Forbidden(
            "Administrators cannot ban other administrators".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UserBan {
    pub id: i64,
    pub user_id: UserId,
    pub banned_by_admin_id: UserId,
    pub reason: String,
    pub banned_at: DateTime<Utc>,
    pub unbanned_at: Option<DateTime<Utc>>,
    pub unbanned_by_admin_id: Option<UserId>,
    pub is_active: bool,
    pub notes: Option<String>,
}

impl UserBan {
    pub fn info(&self) -> BanInfo {
        BanInfo {
            reason: self.reason.clone(),
            banned_at: self.banned_at,
        }
    }

    /// Closes the ban, appending the unban reason to the notes.
    pub fn lift(&mut self, admin_id: UserId, reason: &str, at: DateTime<Utc>) {
        self.is_active = false;
        self.unbanned_at = Some(at);
        self.unbanned_by_admin_id = Some(admin_id);
        self.notes = Some(append_note(self.notes.as_deref(), reason));
    }
}

pub(crate) fn append_note(existing: Option<&str>, reason: &str) -> String {
    match existing {
        Some(notes) if !notes.is_empty() => format!("{}\n[unban] {}", notes, reason),
        _ => format!("[unban] {}", reason),
    }
}

/// Shown to a banned user on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BanInfo {
    pub reason: String,
    pub banned_at: DateTime<Utc>,
}

/// Active ban with the usernames an admin needs to read it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BanListItem {
    #[serde(flatten)]
    pub ban: UserBan,
    pub username: String,
    pub banned_by_username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BanHistoryEntry {
    pub id: i64,
    pub user_id: UserId,
    pub admin_id: UserId,
    pub action: BanAction,
    pub reason: String,
    pub ban_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BanStats {
    pub active_bans: i64,
    pub total_bans: i64,
    pub unbanned_today: i64,
}

/// Ban command after defaults are applied.
#[derive(Debug, Clone)]
pub struct BanCommand {
    pub target: UserId,
    pub admin_id: UserId,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct BanUserRequest {
    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: UserId,
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UnbanUserRequest {
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_ban() -> UserBan {
        UserBan {
            id: 1,
            user_id: 5,
            banned_by_admin_id: 1,
            reason: "spam".to_string(),
            banned_at: Utc::now(),
            unbanned_at: None,
            unbanned_by_admin_id: None,
            is_active: true,
            notes: None,
        }
    }

    #[test]
    fn test_ban_state_machine() {
        assert_eq!(BanState::None.apply(BanAction::Ban).unwrap(), BanState::Active);
        assert_eq!(BanState::Active.apply(BanAction::Unban).unwrap(), BanState::None);
        assert_eq!(
            BanState::Active.apply(BanAction::Ban),
            Err(DomainError::AlreadyBanned)
        );
        assert_eq!(
            BanState::None.apply(BanAction::Unban),
            Err(DomainError::NoActiveBan)
        );
    }

    #[test]
    fn test_state_from_active_ban() {
        let ban = active_ban();
        assert_eq!(BanState::from_active(Some(&ban)), BanState::Active);
        assert_eq!(BanState::from_active(None), BanState::None);
    }

    #[test]
    fn test_moderator_rules() {
        assert!(authorize_moderator(1, true, 2).is_ok());
        assert!(matches!(
            authorize_moderator(1, false, 2),
            Err(DomainError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_moderator(1, true, 1),
            Err(DomainError::SelfReference(_))
        ));
        assert!(matches!(ensure_bannable(true), Err(DomainError::Forbidden(_))));
        assert!(ensure_bannable(false).is_ok());
    }

    #[test]
    fn test_lift_closes_ban_and_appends_note() {
        let mut ban = active_ban();
        ban.notes = Some("first warning".to_string());
        let at = Utc::now();
        ban.lift(9, "appeal accepted", at);
        assert!(!ban.is_active);
        assert_eq!(ban.unbanned_at, Some(at));
        assert_eq!(ban.unbanned_by_admin_id, Some(9));
        assert_eq!(
            ban.notes.as_deref(),
            Some("first warning\n[unban] appeal accepted")
        );
    }

    #[test]
    fn test_ban_action_serde() {
        assert_eq!(serde_json::to_string(&BanAction::Ban).unwrap(), "\"banned\"");
        assert_eq!(BanAction::Unban.to_string(), "unbanned");
    }
}
