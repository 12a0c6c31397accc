//! Friend request and friendship repository.

use async_trait::async_trait;
use domain::{
    models::{
        canonical_pair, FriendInfo, FriendRequest, FriendRequestAction, FriendRequestInfo,
        FriendRequestStatus, UserProfile,
    },
    ports::FriendshipStore,
    DomainError, UserId,
};
use sqlx::{PgConnection, PgPool};

use super::{like_pattern, lock_users};
use crate::entities::{
    FriendEntity, FriendRequestEntity, FriendRequestInfoEntity, FriendRequestStatusDb,
    UserProfileEntity,
};
use crate::metrics::{record_transition, QueryTimer};

const SEARCH_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct FriendshipRepository {
    pool: PgPool,
}

impl FriendshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn friendship_exists(conn: &mut PgConnection, a: UserId, b: UserId) -> Result<bool, DomainError> {
        let (user1, user2) = canonical_pair(a, b);
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM friendships WHERE user1_id = $1 AND user2_id = $2)",
        )
        .bind(user1)
        .bind(user2)
        .fetch_one(conn)
        .await?;
        Ok(exists)
    }

    async fn create_request_tx(&self, sender: UserId, receiver: UserId) -> Result<FriendRequest, DomainError> {
        let mut tx = self.pool.begin().await?;

        // Crossed sends (A->B, B->A) serialise on these row locks.
        lock_users(&mut tx, &[sender, receiver]).await?;

        if Self::friendship_exists(&mut tx, sender, receiver).await? {
            return Err(DomainError::Conflict(
                "You are already friends with this user".to_string(),
            ));
        }

        let pending = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM friend_requests
                WHERE status = 'pending'
                  AND ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
            )
            "#,
        )
        .bind(sender)
        .bind(receiver)
        .fetch_one(&mut *tx)
        .await?;

        if pending {
            return Err(DomainError::Conflict(
                "A pending friend request already exists between you and this user".to_string(),
            ));
        }

        let request = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            INSERT INTO friend_requests (sender_id, receiver_id)
            VALUES ($1, $2)
            RETURNING id, sender_id, receiver_id, status, created_at, updated_at
            "#,
        )
        .bind(sender)
        .bind(receiver)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request.into())
    }

    async fn respond_tx(
        &self,
        request_id: i64,
        actor: UserId,
        action: FriendRequestAction,
    ) -> Result<FriendRequest, DomainError> {
        let mut tx = self.pool.begin().await?;

        let current: FriendRequest = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            SELECT id, sender_id, receiver_id, status, created_at, updated_at
            FROM friend_requests
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DomainError::not_found("Friend request not found"))?
        .into();

        let next = current.transition(action, actor)?;

        let updated = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            UPDATE friend_requests
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, sender_id, receiver_id, status, created_at, updated_at
            "#,
        )
        .bind(request_id)
        .bind(FriendRequestStatusDb::from(next))
        .fetch_one(&mut *tx)
        .await?;

        if next == FriendRequestStatus::Accepted {
            let (user1, user2) = canonical_pair(current.sender_id, current.receiver_id);
            sqlx::query(
                r#"
                INSERT INTO friendships (user1_id, user2_id)
                VALUES ($1, $2)
                ON CONFLICT (user1_id, user2_id) DO NOTHING
                "#,
            )
            .bind(user1)
            .bind(user2)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(updated.into())
    }
}

#[async_trait]
impl FriendshipStore for FriendshipRepository {
    async fn create_request(&self, sender: UserId, receiver: UserId) -> Result<FriendRequest, DomainError> {
        if sender == receiver {
            return Err(DomainError::SelfReference(
                "You cannot send a friend request to yourself".to_string(),
            ));
        }
        let timer = QueryTimer::new("create_friend_request");
        let result = self.create_request_tx(sender, receiver).await;
        timer.record();
        record_transition("friend_request", "send", &result);
        result
    }

    async fn respond_to_request(
        &self,
        request_id: i64,
        actor: UserId,
        action: FriendRequestAction,
    ) -> Result<FriendRequest, DomainError> {
        let timer = QueryTimer::new("respond_to_friend_request");
        let result = self.respond_tx(request_id, actor, action).await;
        timer.record();
        record_transition("friend_request", &action.to_string(), &result);
        result
    }

    async fn find_request(&self, request_id: i64) -> Result<Option<FriendRequest>, DomainError> {
        let timer = QueryTimer::new("find_friend_request");
        let result = sqlx::query_as::<_, FriendRequestEntity>(
            r#"
            SELECT id, sender_id, receiver_id, status, created_at, updated_at
            FROM friend_requests
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn remove_friendship(&self, a: UserId, b: UserId) -> Result<(), DomainError> {
        let timer = QueryTimer::new("remove_friendship");
        let (user1, user2) = canonical_pair(a, b);
        let result = sqlx::query("DELETE FROM friendships WHERE user1_id = $1 AND user2_id = $2")
            .bind(user1)
            .bind(user2)
            .execute(&self.pool)
            .await;
        timer.record();
        if result?.rows_affected() == 0 {
            return Err(DomainError::not_found("You are not friends with this user"));
        }
        Ok(())
    }

    async fn are_friends(&self, a: UserId, b: UserId) -> Result<bool, DomainError> {
        let timer = QueryTimer::new("check_friendship");
        let mut conn = self.pool.acquire().await?;
        let result = Self::friendship_exists(&mut conn, a, b).await;
        timer.record();
        result
    }

    async fn list_friends(&self, user: UserId) -> Result<Vec<FriendInfo>, DomainError> {
        let timer = QueryTimer::new("list_friends");
        let result = sqlx::query_as::<_, FriendEntity>(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email, f.created_at AS friends_since
            FROM friendships f
            JOIN users u ON u.id = CASE WHEN f.user1_id = $1 THEN f.user2_id ELSE f.user1_id END
            WHERE f.user1_id = $1 OR f.user2_id = $1
            ORDER BY u.first_name, u.last_name, u.id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn incoming_requests(&self, user: UserId) -> Result<Vec<FriendRequestInfo>, DomainError> {
        let timer = QueryTimer::new("list_incoming_friend_requests");
        let result = sqlx::query_as::<_, FriendRequestInfoEntity>(
            r#"
            SELECT fr.id, fr.status, fr.created_at,
                   u.id AS user_id, u.username, u.first_name, u.last_name, u.email
            FROM friend_requests fr
            JOIN users u ON u.id = fr.sender_id
            WHERE fr.receiver_id = $1 AND fr.status = 'pending'
            ORDER BY fr.created_at DESC, fr.id DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn outgoing_requests(&self, user: UserId) -> Result<Vec<FriendRequestInfo>, DomainError> {
        let timer = QueryTimer::new("list_outgoing_friend_requests");
        let result = sqlx::query_as::<_, FriendRequestInfoEntity>(
            r#"
            SELECT fr.id, fr.status, fr.created_at,
                   u.id AS user_id, u.username, u.first_name, u.last_name, u.email
            FROM friend_requests fr
            JOIN users u ON u.id = fr.receiver_id
            WHERE fr.sender_id = $1 AND fr.status = 'pending'
            ORDER BY fr.created_at DESC, fr.id DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn search_candidates(&self, user: UserId, term: &str) -> Result<Vec<UserProfile>, DomainError> {
        let timer = QueryTimer::new("search_friend_candidates");
        let result = sqlx::query_as::<_, UserProfileEntity>(
            r#"
            SELECT u.id, u.username, u.first_name, u.last_name, u.email
            FROM users u
            WHERE u.id <> $1
              AND u.is_active
              AND (u.username ILIKE $2 OR u.first_name ILIKE $2
                   OR u.last_name ILIKE $2 OR u.email ILIKE $2)
              AND NOT EXISTS (
                  SELECT 1 FROM friendships f
                  WHERE f.user1_id = LEAST(u.id, $1) AND f.user2_id = GREATEST(u.id, $1)
              )
              AND NOT EXISTS (
                  SELECT 1 FROM friend_requests fr
                  WHERE fr.status = 'pending'
                    AND ((fr.sender_id = $1 AND fr.receiver_id = u.id)
                         OR (fr.sender_id = u.id AND fr.receiver_id = $1))
              )
            ORDER BY u.username
            LIMIT $3
            "#,
        )
        .bind(user)
        .bind(like_pattern(term))
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn mutual_friends(&self, a: UserId, b: UserId) -> Result<Vec<UserProfile>, DomainError> {
        let timer = QueryTimer::new("list_mutual_friends");
        let result = sqlx::query_as::<_, UserProfileEntity>(
            r#"
            WITH friends_a AS (
                SELECT CASE WHEN user1_id = $1 THEN user2_id ELSE user1_id END AS id
                FROM friendships WHERE user1_id = $1 OR user2_id = $1
            ),
            friends_b AS (
                SELECT CASE WHEN user1_id = $2 THEN user2_id ELSE user1_id END AS id
                FROM friendships WHERE user1_id = $2 OR user2_id = $2
            )
            SELECT u.id, u.username, u.first_name, u.last_name, u.email
            FROM users u
            WHERE u.id IN (SELECT id FROM friends_a INTERSECT SELECT id FROM friends_b)
            ORDER BY u.username
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn friend_count(&self, user: UserId) -> Result<i64, DomainError> {
        let timer = QueryTimer::new("count_friends");
        let result = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM friendships WHERE user1_id = $1 OR user2_id = $1",
        )
        .bind(user)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?)
    }
}
