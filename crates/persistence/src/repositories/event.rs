//! Event invite and participation repository.

use async_trait::async_trait;
use domain::{
    models::{
        canonical_pair, EventInvite, EventInviteInfo, EventParticipant, InviteAction,
        InviteStatus, NewEventInvite, ParticipantInfo, UserProfile,
    },
    ports::EventStore,
    DomainError, UserId,
};
use sqlx::PgPool;

use super::lock_users;
use crate::entities::{
    EventInviteEntity, EventInviteInfoEntity, EventParticipantEntity, InviteStatusDb,
    ParticipantEntity, UserProfileEntity,
};
use crate::metrics::{record_transition, QueryTimer};

const INVITE_COLUMNS: &str =
    "id, sender_id, receiver_id, post_id, message, status, created_at, updated_at";

#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn send_invite_tx(&self, invite: NewEventInvite) -> Result<EventInvite, DomainError> {
        let mut tx = self.pool.begin().await?;

        lock_users(&mut tx, &[invite.sender_id, invite.receiver_id]).await?;

        let (user1, user2) = canonical_pair(invite.sender_id, invite.receiver_id);
        let are_friends = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM friendships WHERE user1_id = $1 AND user2_id = $2)",
        )
        .bind(user1)
        .bind(user2)
        .fetch_one(&mut *tx)
        .await?;

        if !are_friends {
            return Err(DomainError::Forbidden(
                "You can only invite friends to events".to_string(),
            ));
        }

        let participating = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM event_participants WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(invite.receiver_id)
        .bind(invite.post_id)
        .fetch_one(&mut *tx)
        .await?;

        if participating {
            return Err(DomainError::Conflict(
                "This user already participates in the event".to_string(),
            ));
        }

        let existing = sqlx::query_scalar::<_, InviteStatusDb>(
            "SELECT status FROM event_invites WHERE receiver_id = $1 AND post_id = $2 FOR UPDATE",
        )
        .bind(invite.receiver_id)
        .bind(invite.post_id)
        .fetch_optional(&mut *tx)
        .await?;

        if existing == Some(InviteStatusDb::Pending) {
            return Err(DomainError::Conflict(
                "An invite for this event is already pending".to_string(),
            ));
        }

        let saved = sqlx::query_as::<_, EventInviteEntity>(&format!(
            r#"
            INSERT INTO event_invites (sender_id, receiver_id, post_id, message)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (receiver_id, post_id) DO UPDATE
            SET sender_id = EXCLUDED.sender_id,
                message = EXCLUDED.message,
                status = 'pending',
                updated_at = NOW()
            RETURNING {INVITE_COLUMNS}
            "#
        ))
        .bind(invite.sender_id)
        .bind(invite.receiver_id)
        .bind(invite.post_id)
        .bind(&invite.message)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved.into())
    }

    async fn respond_tx(
        &self,
        invite_id: i64,
        actor: UserId,
        action: InviteAction,
    ) -> Result<EventInvite, DomainError> {
        let mut tx = self.pool.begin().await?;

        let current: EventInvite = sqlx::query_as::<_, EventInviteEntity>(&format!(
            "SELECT {INVITE_COLUMNS} FROM event_invites WHERE id = $1 FOR UPDATE"
        ))
        .bind(invite_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("Event invite not found"))?
        .into();

        let next = current.transition(action, actor)?;

        let updated = sqlx::query_as::<_, EventInviteEntity>(&format!(
            r#"
            UPDATE event_invites SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {INVITE_COLUMNS}
            "#
        ))
        .bind(invite_id)
        .bind(InviteStatusDb::from(next))
        .fetch_one(&mut *tx)
        .await?;

        if next == InviteStatus::Accepted {
            sqlx::query(
                r#"
                INSERT INTO event_participants (user_id, post_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, post_id) DO NOTHING
                "#,
            )
            .bind(current.receiver_id)
            .bind(current.post_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated.into())
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn send_invite(&self, invite: NewEventInvite) -> Result<EventInvite, DomainError> {
        if invite.sender_id == invite.receiver_id {
            return Err(DomainError::SelfReference(
                "You cannot invite yourself to an event".to_string(),
            ));
        }
        let timer = QueryTimer::new("send_event_invite");
        let result = self.send_invite_tx(invite).await;
        timer.record();
        record_transition("event_invite", "send", &result);
        result
    }

    async fn respond_to_invite(
        &self,
        invite_id: i64,
        actor: UserId,
        action: InviteAction,
    ) -> Result<EventInvite, DomainError> {
        let timer = QueryTimer::new("respond_to_event_invite");
        let result = self.respond_tx(invite_id, actor, action).await;
        timer.record();
        record_transition("event_invite", &action.to_string(), &result);
        result
    }

    async fn pending_invites(&self, user: UserId) -> Result<Vec<EventInviteInfo>, DomainError> {
        let timer = QueryTimer::new("list_pending_event_invites");
        let result = sqlx::query_as::<_, EventInviteInfoEntity>(
            r#"
            SELECT ei.id, ei.post_id, ei.message, ei.status, ei.created_at,
                   u.id AS sender_id, u.username, u.first_name, u.last_name, u.email
            FROM event_invites ei
            JOIN users u ON u.id = ei.sender_id
            WHERE ei.receiver_id = $1 AND ei.status = 'pending'
            ORDER BY ei.updated_at DESC, ei.id DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn join(&self, user: UserId, post_id: i64) -> Result<EventParticipant, DomainError> {
        let timer = QueryTimer::new("join_event");
        let result = sqlx::query_as::<_, EventParticipantEntity>(
            r#"
            INSERT INTO event_participants (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            RETURNING user_id, post_id, registered_at
            "#,
        )
        .bind(user)
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        let result = result?
            .map(Into::into)
            .ok_or_else(|| DomainError::Conflict("You already participate in this event".to_string()));
        record_transition("participation", "join", &result);
        result
    }

    async fn leave(&self, user: UserId, post_id: i64) -> Result<(), DomainError> {
        let timer = QueryTimer::new("leave_event");
        let result = sqlx::query("DELETE FROM event_participants WHERE user_id = $1 AND post_id = $2")
            .bind(user)
            .bind(post_id)
            .execute(&self.pool)
            .await;
        timer.record();

        let result = if result?.rows_affected() == 0 {
            Err(DomainError::not_found("You do not participate in this event"))
        } else {
            Ok(())
        };
        record_transition("participation", "leave", &result);
        result
    }

    async fn is_participant(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        let timer = QueryTimer::new("check_participation");
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM event_participants WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?)
    }

    async fn participants(&self, post_id: i64) -> Result<Vec<ParticipantInfo>, DomainError> {
        let timer = QueryTimer::new("list_event_participants");
        let result = sqlx::query_as::<_, ParticipantEntity>(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email, ep.registered_at
            FROM event_participants ep
            JOIN users u ON u.id = ep.user_id
            WHERE ep.post_id = $1
            ORDER BY ep.registered_at, u.id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn participations(&self, user: UserId) -> Result<Vec<EventParticipant>, DomainError> {
        let timer = QueryTimer::new("list_user_participations");
        let result = sqlx::query_as::<_, EventParticipantEntity>(
            r#"
            SELECT user_id, post_id, registered_at
            FROM event_participants
            WHERE user_id = $1
            ORDER BY registered_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn available_friends(&self, user: UserId, post_id: i64) -> Result<Vec<UserProfile>, DomainError> {
        let timer = QueryTimer::new("list_invitable_friends");
        let result = sqlx::query_as::<_, UserProfileEntity>(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email
            FROM friendships f
            JOIN users u ON u.id = CASE WHEN f.user1_id = $1 THEN f.user2_id ELSE f.user1_id END
            WHERE (f.user1_id = $1 OR f.user2_id = $1)
              AND NOT EXISTS (
                  SELECT 1 FROM event_participants ep
                  WHERE ep.user_id = u.id AND ep.post_id = $2
              )
              AND NOT EXISTS (
                  SELECT 1 FROM event_invites ei
                  WHERE ei.receiver_id = u.id AND ei.post_id = $2 AND ei.status = 'pending'
              )
            ORDER BY u.first_name, u.last_name, u.id
            "#,
        )
        .bind(user)
        .bind(post_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }
}
