//! Favorite post entity.

use chrono::{DateTime, Utc};
use domain::models::Favorite;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct FavoriteEntity {
    pub user_id: i64,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

impl From<FavoriteEntity> for Favorite {
    fn from(entity: FavoriteEntity) -> Self {
        Self {
            user_id: entity.user_id,
            post_id: entity.post_id,
            created_at: entity.created_at,
        }
    }
}
