//! Friend request workflow.

use std::sync::Arc;

use shared::validation::normalize_email;
use tracing::info;

use crate::{
    models::{
        FriendInfo, FriendRequest, FriendRequestAction, FriendRequestInfo, NewNotification,
        NotificationType, User, UserProfile,
    },
    ports::{FriendshipStore, IdentityStore},
    services::Notifier,
    DomainError, UserId,
};

pub struct FriendshipService {
    identity: Arc<dyn IdentityStore>,
    store: Arc<dyn FriendshipStore>,
    notifier: Notifier,
}

impl FriendshipService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        store: Arc<dyn FriendshipStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            identity,
            store,
            notifier,
        }
    }

    /// Sends a request to the user registered under `target_email`.
    pub async fn send_request(
        &self,
        sender_id: UserId,
        target_email: &str,
    ) -> Result<FriendRequest, DomainError> {
        let target = self
            .identity
            .find_by_email(&normalize_email(target_email))
            .await?
            .ok_or_else(|| DomainError::not_found("No user registered with that email"))?;

        if target.id == sender_id {
            return Err(DomainError::SelfReference(
                "You cannot send a friend request to yourself".to_string(),
            ));
        }

        let sender = self.require_user(sender_id).await?;
        let request = self.store.create_request(sender_id, target.id).await?;

        info!(
            request_id = request.id,
            sender_id = sender_id,
            receiver_id = target.id,
            "Friend request sent"
        );

        self.notifier
            .emit(
                NewNotification::new(
                    target.id,
                    NotificationType::FriendRequest,
                    "New friend request",
                    format!("{} sent you a friend request", display_name(&sender)),
                )
                .related_to(request.id)
                .from_sender(sender_id)
                .expiring_at(self.notifier.expiry()),
            )
            .await;

        Ok(request)
    }

    pub async fn accept(&self, request_id: i64, actor: UserId) -> Result<FriendRequest, DomainError> {
        let request = self
            .store
            .respond_to_request(request_id, actor, FriendRequestAction::Accept)
            .await?;

        info!(request_id = request_id, "Friend request accepted");

        self.notifier
            .retract(request.receiver_id, NotificationType::FriendRequest, request.id)
            .await;

        if let Ok(Some(receiver)) = self.identity.find_by_id(request.receiver_id).await {
            self.notifier
                .emit(
                    NewNotification::new(
                        request.sender_id,
                        NotificationType::General,
                        "Friend request accepted",
                        format!("{} accepted your friend request", display_name(&receiver)),
                    )
                    .related_to(request.id)
                    .from_sender(request.receiver_id)
                    .expiring_at(self.notifier.expiry()),
                )
                .await;
        }

        Ok(request)
    }

    pub async fn reject(&self, request_id: i64, actor: UserId) -> Result<FriendRequest, DomainError> {
        self.resolve(request_id, actor, FriendRequestAction::Reject).await
    }

    pub async fn cancel(&self, request_id: i64, actor: UserId) -> Result<FriendRequest, DomainError> {
        self.resolve(request_id, actor, FriendRequestAction::Cancel).await
    }

    async fn resolve(
        &self,
        request_id: i64,
        actor: UserId,
        action: FriendRequestAction,
    ) -> Result<FriendRequest, DomainError> {
        let request = self.store.respond_to_request(request_id, actor, action).await?;

        info!(request_id = request_id, action = %action, "Friend request resolved");

        self.notifier
            .retract(request.notified_user(), NotificationType::FriendRequest, request.id)
            .await;

        Ok(request)
    }

    pub async fn remove_friend(&self, actor: UserId, friend_id: UserId) -> Result<(), DomainError> {
        if actor == friend_id {
            return Err(DomainError::SelfReference(
                "You cannot unfriend yourself".to_string(),
            ));
        }
        self.store.remove_friendship(actor, friend_id).await?;
        info!(user_id = actor, friend_id = friend_id, "Friendship removed");
        Ok(())
    }

    pub async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, DomainError> {
        if a == b {
            return Ok(false);
        }
        self.store.are_friends(a, b).await
    }

    pub async fn friends(&self, user: UserId) -> Result<Vec<FriendInfo>, DomainError> {
        self.store.list_friends(user).await
    }

    pub async fn incoming(&self, user: UserId) -> Result<Vec<FriendRequestInfo>, DomainError> {
        self.store.incoming_requests(user).await
    }

    pub async fn outgoing(&self, user: UserId) -> Result<Vec<FriendRequestInfo>, DomainError> {
        self.store.outgoing_requests(user).await
    }

    /// Blank terms return nothing rather than the whole user table.
    pub async fn search(&self, user: UserId, term: &str) -> Result<Vec<UserProfile>, DomainError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        self.store.search_candidates(user, term).await
    }

    pub async fn mutual_friends(&self, a: UserId, b: UserId) -> Result<Vec<UserProfile>, DomainError> {
        self.store.mutual_friends(a, b).await
    }

    pub async fn friend_count(&self, user: UserId) -> Result<i64, DomainError> {
        self.store.friend_count(user).await
    }

    async fn require_user(&self, id: UserId) -> Result<User, DomainError> {
        self.identity
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))
    }
}

pub(crate) fn display_name(user: &User) -> String {
    let full = format!("{} {}", user.first_name, user.last_name);
    let full = full.trim();
    if full.is_empty() {
        user.username.clone()
    } else {
        full.to_string()
    }
}
