//! Collaborator contracts consumed by the relationship services.
//!
//! PostgreSQL and in-memory adapters live in the persistence crate; the
//! remote post service adapter lives in the api crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::pagination::PageRequest;
use thiserror::Error;

use crate::{
    models::{
        BanCommand, BanHistoryEntry, BanListItem, BanStats, EventInvite, EventInviteInfo,
        EventParticipant, Favorite, FriendInfo, FriendRequest, FriendRequestAction,
        FriendRequestInfo, InviteAction, NewEventInvite, NewNotification, NewUser, Notification, NotificationStats,
        NotificationSummary, NotificationType, ParticipantInfo, User, UserBan, UserProfile,
    },
    DomainError, UserId,
};

/// User accounts and their admin/active flags.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Fails with `Conflict` when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, DomainError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Looks a user up by email or username.
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, DomainError>;

    async fn set_active(&self, id: UserId, active: bool) -> Result<(), DomainError>;

    /// Flips `is_active` under the user's row lock and returns the new value.
    /// Reactivating a user who still has an active ban is a `Conflict`.
    async fn toggle_active(&self, id: UserId) -> Result<bool, DomainError>;

    /// Stores an already hashed password. `NotFound` for unknown users.
    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), DomainError>;

    async fn list_users(&self) -> Result<Vec<User>, DomainError>;

    async fn count_users(&self) -> Result<i64, DomainError>;

    async fn is_admin(&self, id: UserId) -> Result<bool, DomainError> {
        Ok(self.find_by_id(id).await?.map(|u| u.is_admin).unwrap_or(false))
    }

    async fn is_active(&self, id: UserId) -> Result<bool, DomainError> {
        Ok(self.find_by_id(id).await?.map(|u| u.is_active).unwrap_or(false))
    }
}

/// Friend requests and friendship edges.
///
/// Transitions run as one atomic unit: lock, authorize, check status,
/// write, derived insert, commit.
#[async_trait]
pub trait FriendshipStore: Send + Sync {
    /// Creates a pending request. `Conflict` if already friends or a
    /// pending request exists in either direction.
    async fn create_request(&self, sender: UserId, receiver: UserId) -> Result<FriendRequest, DomainError>;

    /// Applies `action`; accepting also inserts the canonical friendship.
    async fn respond_to_request(
        &self,
        request_id: i64,
        actor: UserId,
        action: FriendRequestAction,
    ) -> Result<FriendRequest, DomainError>;

    async fn find_request(&self, request_id: i64) -> Result<Option<FriendRequest>, DomainError>;

    /// `NotFound` when the two users are not friends.
    async fn remove_friendship(&self, a: UserId, b: UserId) -> Result<(), DomainError>;

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, DomainError>;

    async fn list_friends(&self, user: UserId) -> Result<Vec<FriendInfo>, DomainError>;

    async fn incoming_requests(&self, user: UserId) -> Result<Vec<FriendRequestInfo>, DomainError>;

    async fn outgoing_requests(&self, user: UserId) -> Result<Vec<FriendRequestInfo>, DomainError>;

    /// Users matching `term` who are not `user`, not friends and have no
    /// pending request with `user` in either direction.
    async fn search_candidates(&self, user: UserId, term: &str) -> Result<Vec<UserProfile>, DomainError>;

    async fn mutual_friends(&self, a: UserId, b: UserId) -> Result<Vec<UserProfile>, DomainError>;

    async fn friend_count(&self, user: UserId) -> Result<i64, DomainError>;
}

/// Posts a user has bookmarked. Adding and removing are idempotent.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    /// Returns `false` when the post was already a favorite.
    async fn add_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError>;

    /// Returns `false` when the post was not a favorite.
    async fn remove_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError>;

    async fn is_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError>;

    /// Newest first.
    async fn favorites(&self, user: UserId) -> Result<Vec<Favorite>, DomainError>;
}

/// Event invites and participation.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Upserts the (receiver, post) invite back to pending. `Forbidden` if the
    /// two users are not friends, `Conflict` if an invite is already pending.
    async fn send_invite(&self, invite: NewEventInvite) -> Result<EventInvite, DomainError>;

    /// Applies `action`; accepting also upserts the participant row.
    async fn respond_to_invite(
        &self,
        invite_id: i64,
        actor: UserId,
        action: InviteAction,
    ) -> Result<EventInvite, DomainError>;

    async fn pending_invites(&self, user: UserId) -> Result<Vec<EventInviteInfo>, DomainError>;

    /// `Conflict` when already participating.
    async fn join(&self, user: UserId, post_id: i64) -> Result<EventParticipant, DomainError>;

    /// `NotFound` when not participating.
    async fn leave(&self, user: UserId, post_id: i64) -> Result<(), DomainError>;

    async fn is_participant(&self, user: UserId, post_id: i64) -> Result<bool, DomainError>;

    async fn participants(&self, post_id: i64) -> Result<Vec<ParticipantInfo>, DomainError>;

    async fn participations(&self, user: UserId) -> Result<Vec<EventParticipant>, DomainError>;

    /// Friends of `user` who neither participate nor hold a pending invite.
    async fn available_friends(&self, user: UserId, post_id: i64) -> Result<Vec<UserProfile>, DomainError>;
}

/// User bans and their audit history.
#[async_trait]
pub trait BanStore: Send + Sync {
    /// Inserts an active ban and deactivates the user. `NotFound` for an
    /// unknown target, `Forbidden` for an admin target, `AlreadyBanned`.
    async fn ban(&self, command: BanCommand) -> Result<UserBan, DomainError>;

    /// Closes the active ban and reactivates the user. `NoActiveBan` otherwise.
    async fn unban(&self, target: UserId, admin_id: UserId, reason: &str) -> Result<UserBan, DomainError>;

    async fn active_ban(&self, user: UserId) -> Result<Option<UserBan>, DomainError>;

    async fn find_ban(&self, ban_id: i64) -> Result<Option<UserBan>, DomainError>;

    async fn active_bans(&self) -> Result<Vec<BanListItem>, DomainError>;

    /// Newest first.
    async fn history(&self, user: UserId) -> Result<Vec<BanHistoryEntry>, DomainError>;

    async fn stats(&self) -> Result<BanStats, DomainError>;
}

/// Per-recipient notification mailbox.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create(&self, notification: NewNotification) -> Result<Notification, DomainError>;

    /// Newest first, excluding expired rows.
    async fn list_for_user(&self, user: UserId, page: PageRequest) -> Result<Vec<Notification>, DomainError>;

    async fn summary(&self, user: UserId) -> Result<NotificationSummary, DomainError>;

    /// `NotFound` for an unknown id, `Unauthorized` for someone else's.
    async fn mark_read(&self, id: i64, user: UserId) -> Result<(), DomainError>;

    async fn mark_all_read(&self, user: UserId) -> Result<u64, DomainError>;

    /// `NotFound` for an unknown id, `Unauthorized` for someone else's.
    async fn delete(&self, id: i64, user: UserId) -> Result<(), DomainError>;

    async fn delete_by_related(
        &self,
        user: UserId,
        notification_type: NotificationType,
        related_id: i64,
    ) -> Result<u64, DomainError>;

    /// Bulk delete of rows whose `expires_at` has passed.
    async fn delete_expired(&self) -> Result<u64, DomainError>;

    async fn stats(&self) -> Result<NotificationStats, DomainError>;
}

/// Failures of the remote posts/comments service.
#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("post service unreachable: {0}")]
    Unreachable(String),

    #[error("post service returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("post service response invalid: {0}")]
    InvalidResponse(String),
}

/// Content counters reported by the post service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PostStats {
    #[serde(default)]
    pub total_posts: i64,
    #[serde(default)]
    pub total_comments: i64,
    #[serde(default)]
    pub total_sport_fields: i64,
}

/// Remote posts/comments backend.
#[async_trait]
pub trait PostService: Send + Sync {
    async fn delete_post(&self, post_id: i64) -> Result<(), PostServiceError>;

    async fn delete_comment(&self, comment_id: i64) -> Result<(), PostServiceError>;

    async fn stats(&self) -> Result<PostStats, PostServiceError>;

    async fn post_title(&self, post_id: i64) -> Result<String, PostServiceError>;
}
