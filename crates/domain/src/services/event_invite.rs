//! Event invitations and participation.

use std::sync::Arc;

use shared::validation::normalize_email;
use tracing::{debug, info};

use crate::{
    models::{
        EventInvite, EventInviteInfo, EventParticipant, InviteAction, NewEventInvite,
        NewNotification, NotificationType, ParticipantInfo, UserProfile,
    },
    ports::{EventStore, IdentityStore, PostService},
    services::{friendship::display_name, Notifier},
    DomainError, UserId,
};

pub struct EventInviteService {
    identity: Arc<dyn IdentityStore>,
    store: Arc<dyn EventStore>,
    posts: Arc<dyn PostService>,
    notifier: Notifier,
}

impl EventInviteService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        store: Arc<dyn EventStore>,
        posts: Arc<dyn PostService>,
        notifier: Notifier,
    ) -> Self {
        Self {
            identity,
            store,
            posts,
            notifier,
        }
    }

    /// Invites the friend registered under `friend_email` to `post_id`.
    pub async fn send_invite(
        &self,
        sender_id: UserId,
        post_id: i64,
        friend_email: &str,
        message: Option<String>,
    ) -> Result<EventInvite, DomainError> {
        let receiver = self
            .identity
            .find_by_email(&normalize_email(friend_email))
            .await?
            .ok_or_else(|| DomainError::not_found("No user registered with that email"))?;

        if receiver.id == sender_id {
            return Err(DomainError::SelfReference(
                "You cannot invite yourself to an event".to_string(),
            ));
        }

        let sender = self
            .identity
            .find_by_id(sender_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        let invite = self
            .store
            .send_invite(NewEventInvite {
                sender_id,
                receiver_id: receiver.id,
                post_id,
                message: message.unwrap_or_default(),
            })
            .await?;

        info!(
            invite_id = invite.id,
            post_id = post_id,
            sender_id = sender_id,
            receiver_id = receiver.id,
            "Event invite sent"
        );

        let title = self.event_title(post_id).await;
        self.notifier
            .emit(
                NewNotification::new(
                    receiver.id,
                    NotificationType::EventInvite,
                    "Event invitation",
                    format!("{} invited you to \"{}\"", display_name(&sender), title),
                )
                .related_to(invite.id)
                .from_sender(sender_id)
                .expiring_at(self.notifier.expiry()),
            )
            .await;

        Ok(invite)
    }

    pub async fn accept(&self, invite_id: i64, actor: UserId) -> Result<EventInvite, DomainError> {
        self.resolve(invite_id, actor, InviteAction::Accept).await
    }

    pub async fn reject(&self, invite_id: i64, actor: UserId) -> Result<EventInvite, DomainError> {
        self.resolve(invite_id, actor, InviteAction::Reject).await
    }

    async fn resolve(
        &self,
        invite_id: i64,
        actor: UserId,
        action: InviteAction,
    ) -> Result<EventInvite, DomainError> {
        let invite = self.store.respond_to_invite(invite_id, actor, action).await?;

        info!(invite_id = invite_id, action = %action, "Event invite resolved");

        self.notifier
            .retract(invite.receiver_id, NotificationType::EventInvite, invite.id)
            .await;

        Ok(invite)
    }

    pub async fn pending_invites(&self, user: UserId) -> Result<Vec<EventInviteInfo>, DomainError> {
        self.store.pending_invites(user).await
    }

    pub async fn join(&self, user: UserId, post_id: i64) -> Result<EventParticipant, DomainError> {
        let participant = self.store.join(user, post_id).await?;
        info!(user_id = user, post_id = post_id, "Joined event");
        Ok(participant)
    }

    pub async fn leave(&self, user: UserId, post_id: i64) -> Result<(), DomainError> {
        self.store.leave(user, post_id).await?;
        info!(user_id = user, post_id = post_id, "Left event");
        Ok(())
    }

    pub async fn is_participant(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        self.store.is_participant(user, post_id).await
    }

    pub async fn participants(&self, post_id: i64) -> Result<Vec<ParticipantInfo>, DomainError> {
        self.store.participants(post_id).await
    }

    pub async fn participations(&self, user: UserId) -> Result<Vec<EventParticipant>, DomainError> {
        self.store.participations(user).await
    }

    pub async fn available_friends(
        &self,
        user: UserId,
        post_id: i64,
    ) -> Result<Vec<UserProfile>, DomainError> {
        self.store.available_friends(user, post_id).await
    }

    async fn event_title(&self, post_id: i64) -> String {
        match self.posts.post_title(post_id).await {
            Ok(title) if !title.trim().is_empty() => title,
            Ok(_) => fallback_title(post_id),
            Err(e) => {
                debug!(post_id = post_id, error = %e, "Post title unavailable");
                fallback_title(post_id)
            }
        }
    }
}

fn fallback_title(post_id: i64) -> String {
    format!("Sports event #{}", post_id)
}
