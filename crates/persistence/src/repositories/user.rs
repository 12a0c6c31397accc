//! User repository: the PostgreSQL identity store.

use async_trait::async_trait;
use domain::{
    models::{NewUser, User},
    ports::IdentityStore,
    DomainError, UserId,
};
use sqlx::PgPool;

use crate::entities::UserEntity;
use crate::metrics::QueryTimer;

const USER_COLUMNS: &str =
    "id, username, email, password_hash, first_name, last_name, is_admin, is_active, created_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Same lock order as a ban: the user row first, then its bans.
    async fn toggle_active_tx(&self, id: UserId) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or_else(|| DomainError::not_found("User not found"))?;

        if !current {
            let banned: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM user_bans WHERE user_id = $1 AND is_active)",
            )
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
            if banned {
                return Err(DomainError::Conflict(
                    "User has an active ban; lift the ban to reactivate them".to_string(),
                ));
            }
        }

        let is_active: bool = sqlx::query_scalar(
            "UPDATE users SET is_active = NOT is_active, updated_at = NOW() WHERE id = $1 RETURNING is_active",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(is_active)
    }

    /// Grants or revokes the admin flag. Used by provisioning tools and tests.
    pub async fn set_admin(&self, id: UserId, is_admin: bool) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE users SET is_admin = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(is_admin)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User not found"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for UserRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, DomainError> {
        let timer = QueryTimer::new("create_user");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name)
            VALUES ($1, LOWER($2), $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await;
        timer.record();

        result.map(Into::into).map_err(|e| match DomainError::from(e) {
            DomainError::Conflict(_) => {
                DomainError::Conflict("Username or email already registered".to_string())
            }
            other => other,
        })
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let timer = QueryTimer::new("find_user_by_id");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let timer = QueryTimer::new("find_user_by_email");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, DomainError> {
        let timer = QueryTimer::new("find_user_by_login");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE LOWER(email) = LOWER($1) OR username = $1
            ORDER BY (username = $1) DESC
            LIMIT 1
            "#
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        Ok(result?.map(Into::into))
    }

    async fn set_active(&self, id: UserId, active: bool) -> Result<(), DomainError> {
        let timer = QueryTimer::new("set_user_active");
        let result = sqlx::query("UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await;
        timer.record();
        if result?.rows_affected() == 0 {
            return Err(DomainError::not_found("User not found"));
        }
        Ok(())
    }

    async fn toggle_active(&self, id: UserId) -> Result<bool, DomainError> {
        let timer = QueryTimer::new("toggle_user_active");
        let result = self.toggle_active_tx(id).await;
        timer.record();
        result
    }

    async fn update_password(&self, id: UserId, password_hash: &str) -> Result<(), DomainError> {
        let timer = QueryTimer::new("update_user_password");
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await;
        timer.record();
        if result?.rows_affected() == 0 {
            return Err(DomainError::not_found("User not found"));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, DomainError> {
        let timer = QueryTimer::new("list_users");
        let result = sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn count_users(&self) -> Result<i64, DomainError> {
        let timer = QueryTimer::new("count_users");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        Ok(result?)
    }
}
