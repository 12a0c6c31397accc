//! Event invitations and participation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{models::UserProfile, DomainError, UserId};

/// Lifecycle of an event invite. A re-invite resets a resolved row to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Rejected,
}

impl std::fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InviteStatus::Pending => write!(f, "pending"),
            InviteStatus::Accepted => write!(f, "accepted"),
            InviteStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteAction {
    Accept,
    Reject,
}

impl std::fmt::Display for InviteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InviteAction::Accept => write!(f, "accept"),
            InviteAction::Reject => write!(f, "reject"),
        }
    }
}

impl InviteStatus {
    pub fn apply(self, action: InviteAction) -> Result<Self, DomainError> {
        match (self, action) {
            (InviteStatus::Pending, InviteAction::Accept) => Ok(InviteStatus::Accepted),
            (InviteStatus::Pending, InviteAction::Reject) => Ok(InviteStatus::Rejected),
            (resolved, action) => Err(DomainError::InvalidState(format!(
                "Cannot {} an invite that is already {}",
                action, resolved
            ))),
        }
    }
}

/// Invitation from `sender_id` to `receiver_id` for the event behind `post_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EventInvite {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub post_id: i64,
    pub message: String,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventInvite {
    /// Only the invited user resolves an invite.
    pub fn transition(&self, action: InviteAction, actor: UserId) -> Result<InviteStatus, DomainError> {
        if actor != self.receiver_id {
            return Err(DomainError::Unauthorized(format!(
                "Only the invited user can {} this invite",
                action
            )));
        }
        self.status.apply(action)
    }
}

/// Insert/upsert payload for an invite.
#[derive(Debug, Clone)]
pub struct NewEventInvite {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub post_id: i64,
    pub message: String,
}

/// Confirmed participation of a user in an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventParticipant {
    pub user_id: UserId,
    pub post_id: i64,
    pub registered_at: DateTime<Utc>,
}

/// Pending invite as shown to the receiver.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventInviteInfo {
    pub id: i64,
    pub post_id: i64,
    pub sender: UserProfile,
    pub message: String,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ParticipantInfo {
    pub user: UserProfile,
    pub registered_at: DateTime<Utc>,
}

/// Request body to invite a friend to an event.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SendEventInviteRequest {
    #[validate(range(min = 1, message = "post_id must be positive"))]
    pub post_id: i64,
    #[validate(email(message = "Invalid email format"))]
    pub friend_email: String,
    #[validate(length(max = 500, message = "Message must be at most 500 characters"))]
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ParticipantsResponse {
    pub post_id: i64,
    pub participants: Vec<ParticipantInfo>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ParticipationStatusResponse {
    pub post_id: i64,
    pub is_participant: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite(status: InviteStatus) -> EventInvite {
        let now = Utc::now();
        EventInvite {
            id: 11,
            sender_id: 1,
            receiver_id: 2,
            post_id: 40,
            message: "Partita giovedì?".to_string(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_receiver_resolves_pending_invite() {
        let inv = invite(InviteStatus::Pending);
        assert_eq!(
            inv.transition(InviteAction::Accept, 2).unwrap(),
            InviteStatus::Accepted
        );
        assert_eq!(
            inv.transition(InviteAction::Reject, 2).unwrap(),
            InviteStatus::Rejected
        );
    }

    #[test]
    fn test_sender_cannot_resolve() {
        let inv = invite(InviteStatus::Pending);
        assert!(matches!(
            inv.transition(InviteAction::Accept, 1),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_resolved_invite_is_invalid_state() {
        for status in [InviteStatus::Accepted, InviteStatus::Rejected] {
            let inv = invite(status);
            assert!(matches!(
                inv.transition(InviteAction::Accept, 2),
                Err(DomainError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn test_send_request_validation() {
        let req = SendEventInviteRequest {
            post_id: 0,
            friend_email: "friend@example.com".to_string(),
            message: Some("x".repeat(501)),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("post_id"));
        assert!(errors.field_errors().contains_key("message"));
    }

    #[test]
    fn test_participant_info_nests_user() {
        let info = ParticipantInfo {
            user: UserProfile {
                id: 7,
                username: "sara".to_string(),
                first_name: "Sara".to_string(),
                last_name: "Verdi".to_string(),
                email: "sara@example.com".to_string(),
            },
            registered_at: Utc::now(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["user"]["id"], 7);
        assert_eq!(json["user"]["username"], "sara");
        assert!(json.get("id").is_none());
    }
}
