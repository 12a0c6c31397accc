//! Friend request state machine and friendship edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{models::UserProfile, DomainError, UserId};

/// Lifecycle of a friend request.
///
/// `Pending` is the only state with outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl std::fmt::Display for FriendRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FriendRequestStatus::Pending => write!(f, "pending"),
            FriendRequestStatus::Accepted => write!(f, "accepted"),
            FriendRequestStatus::Rejected => write!(f, "rejected"),
            FriendRequestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// What a participant does to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestAction {
    Accept,
    Reject,
    Cancel,
}

impl std::fmt::Display for FriendRequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FriendRequestAction::Accept => write!(f, "accept"),
            FriendRequestAction::Reject => write!(f, "reject"),
            FriendRequestAction::Cancel => write!(f, "cancel"),
        }
    }
}

impl FriendRequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FriendRequestStatus::Pending)
    }

    /// Next status after `action`, or `InvalidState` once resolved.
    pub fn apply(self, action: FriendRequestAction) -> Result<Self, DomainError> {
        use FriendRequestAction::*;
        use FriendRequestStatus::*;

        match (self, action) {
            (Pending, Accept) => Ok(Accepted),
            (Pending, Reject) => Ok(Rejected),
            (Pending, Cancel) => Ok(Cancelled),
            (resolved, action) => Err(DomainError::InvalidState(format!(
                "Cannot {} a friend request that is already {}",
                action, resolved
            ))),
        }
    }
}

/// A directed request from `sender_id` to `receiver_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FriendRequest {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FriendRequest {
    /// Receiver accepts or rejects; only the sender cancels.
    pub fn authorize(&self, action: FriendRequestAction, actor: UserId) -> Result<(), DomainError> {
        let allowed = match action {
            FriendRequestAction::Accept | FriendRequestAction::Reject => self.receiver_id,
            FriendRequestAction::Cancel => self.sender_id,
        };
        if actor == allowed {
            Ok(())
        } else {
            Err(DomainError::Unauthorized(format!(
                "Only the {} can {} this friend request",
                if action == FriendRequestAction::Cancel { "sender" } else { "receiver" },
                action
            )))
        }
    }

    /// Actor check first, then status check.
    pub fn transition(
        &self,
        action: FriendRequestAction,
        actor: UserId,
    ) -> Result<FriendRequestStatus, DomainError> {
        self.authorize(action, actor)?;
        self.status.apply(action)
    }

    /// The user whose mailbox holds the request notification.
    pub fn notified_user(&self) -> UserId {
        self.receiver_id
    }
}

/// Orders a pair so the smaller id comes first.
pub fn canonical_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// An undirected edge stored in canonical order (`user1_id < user2_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Friendship {
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn between(a: UserId, b: UserId, created_at: DateTime<Utc>) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::SelfReference(
                "A user cannot be friends with themself".to_string(),
            ));
        }
        let (user1_id, user2_id) = canonical_pair(a, b);
        Ok(Self {
            user1_id,
            user2_id,
            created_at,
        })
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.user1_id == user || self.user2_id == user
    }

    /// The other end of the edge, if `user` is on it.
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if self.user1_id == user {
            Some(self.user2_id)
        } else if self.user2_id == user {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

/// Friend list entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FriendInfo {
    pub user: UserProfile,
    pub friends_since: DateTime<Utc>,
}

/// Pending request as seen by one party; `user` is the counterpart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FriendRequestInfo {
    pub id: i64,
    pub user: UserProfile,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
}

/// Request body to send a friend request by email.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SendFriendRequestRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FriendListResponse {
    pub friends: Vec<FriendInfo>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FriendshipStatusResponse {
    pub user_id: UserId,
    pub are_friends: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(sender: UserId, receiver: UserId) -> FriendRequest {
        let now = Utc::now();
        FriendRequest {
            id: 1,
            sender_id: sender,
            receiver_id: receiver,
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pending_transitions() {
        use FriendRequestAction::*;
        let p = FriendRequestStatus::Pending;
        assert_eq!(p.apply(Accept).unwrap(), FriendRequestStatus::Accepted);
        assert_eq!(p.apply(Reject).unwrap(), FriendRequestStatus::Rejected);
        assert_eq!(p.apply(Cancel).unwrap(), FriendRequestStatus::Cancelled);
    }

    #[test]
    fn test_terminal_states_reject_every_action() {
        use FriendRequestAction::*;
        for status in [
            FriendRequestStatus::Accepted,
            FriendRequestStatus::Rejected,
            FriendRequestStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
            for action in [Accept, Reject, Cancel] {
                assert!(matches!(
                    status.apply(action),
                    Err(DomainError::InvalidState(_))
                ));
            }
        }
    }

    #[test]
    fn test_only_receiver_accepts_or_rejects() {
        let req = pending(1, 2);
        assert!(req.transition(FriendRequestAction::Accept, 2).is_ok());
        assert!(matches!(
            req.transition(FriendRequestAction::Accept, 1),
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            req.transition(FriendRequestAction::Reject, 3),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_only_sender_cancels() {
        let req = pending(1, 2);
        assert_eq!(
            req.transition(FriendRequestAction::Cancel, 1).unwrap(),
            FriendRequestStatus::Cancelled
        );
        assert!(matches!(
            req.transition(FriendRequestAction::Cancel, 2),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_actor_checked_before_state() {
        let mut req = pending(1, 2);
        req.status = FriendRequestStatus::Accepted;
        assert!(matches!(
            req.transition(FriendRequestAction::Accept, 9),
            Err(DomainError::Unauthorized(_))
        ));
        assert!(matches!(
            req.transition(FriendRequestAction::Accept, 2),
            Err(DomainError::InvalidState(_))
        ));
    }

    #[test]
    fn test_canonical_pair_is_order_independent() {
        assert_eq!(canonical_pair(5, 3), (3, 5));
        assert_eq!(canonical_pair(3, 5), (3, 5));
        let f1 = Friendship::between(9, 4, Utc::now()).unwrap();
        let f2 = Friendship::between(4, 9, f1.created_at).unwrap();
        assert_eq!(f1, f2);
        assert_eq!(f1.user1_id, 4);
    }

    #[test]
    fn test_friendship_rejects_self_edge() {
        assert!(matches!(
            Friendship::between(4, 4, Utc::now()),
            Err(DomainError::SelfReference(_))
        ));
    }

    #[test]
    fn test_friendship_other() {
        let f = Friendship::between(2, 8, Utc::now()).unwrap();
        assert_eq!(f.other(2), Some(8));
        assert_eq!(f.other(8), Some(2));
        assert_eq!(f.other(5), None);
        assert!(f.involves(8));
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&FriendRequestStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_friend_info_nests_user() {
        let info = FriendInfo {
            user: UserProfile {
                id: 3,
                username: "marco".to_string(),
                first_name: "Marco".to_string(),
                last_name: "Bianchi".to_string(),
                email: "marco@example.com".to_string(),
            },
            friends_since: Utc::now(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["user"]["id"], 3);
        assert!(json.get("username").is_none());
        assert!(json["friends_since"].is_string());
    }
}
