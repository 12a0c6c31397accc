//! Favorite post models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::UserId;

/// A post bookmarked by a user. Post ids are opaque references into the
/// post service; at most one row exists per (user, post).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Favorite {
    pub user_id: UserId,
    pub post_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct FavoriteRequest {
    #[validate(range(min = 1, message = "post_id must be positive"))]
    pub post_id: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FavoriteStatus {
    pub post_id: i64,
    pub is_favorite: bool,
}

/// Newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FavoriteListResponse {
    pub favorites: Vec<Favorite>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favorite_request_rejects_non_positive_post() {
        assert!(FavoriteRequest { post_id: 12 }.validate().is_ok());
        assert!(FavoriteRequest { post_id: 0 }.validate().is_err());
        assert!(FavoriteRequest { post_id: -3 }.validate().is_err());
    }
}
