//! Favorite posts repository.

use async_trait::async_trait;
use domain::{models::Favorite, ports::FavoriteStore, DomainError, UserId};
use sqlx::PgPool;

use crate::entities::FavoriteEntity;
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct FavoriteRepository {
    pool: PgPool,
}

impl FavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FavoriteStore for FavoriteRepository {
    async fn add_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        let timer = QueryTimer::new("add_favorite");
        let result = sqlx::query(
            r#"
            INSERT INTO user_favorites (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, post_id) DO NOTHING
            "#,
        )
        .bind(user)
        .bind(post_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    async fn remove_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        let timer = QueryTimer::new("remove_favorite");
        let result = sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND post_id = $2")
            .bind(user)
            .bind(post_id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    async fn is_favorite(&self, user: UserId, post_id: i64) -> Result<bool, DomainError> {
        let timer = QueryTimer::new("is_favorite");
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM user_favorites WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        Ok(result?)
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<Favorite>, DomainError> {
        let timer = QueryTimer::new("list_favorites");
        let result = sqlx::query_as::<_, FavoriteEntity>(
            r#"
            SELECT user_id, post_id, created_at
            FROM user_favorites
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }
}
