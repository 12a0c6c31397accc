//! PostgreSQL implementations of the domain ports.

pub mod ban;
pub mod event;
pub mod favorite;
pub mod friendship;
pub mod notification;
pub mod user;

pub use ban::BanRepository;
pub use event::EventRepository;
pub use favorite::FavoriteRepository;
pub use friendship::FriendshipRepository;
pub use notification::NotificationRepository;
pub use user::UserRepository;

use domain::{DomainError, UserId};
use sqlx::PgConnection;

/// Locks the given user rows in id order so crossed transitions serialise
/// without deadlocking. `NotFound` if any id is unknown.
pub(crate) async fn lock_users(conn: &mut PgConnection, ids: &[UserId]) -> Result<(), DomainError> {
    let mut wanted: Vec<UserId> = ids.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    let locked = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM users WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&wanted)
    .fetch_all(conn)
    .await?;

    if locked.len() != wanted.len() {
        return Err(DomainError::not_found("User not found"));
    }
    Ok(())
}

/// `%term%` with LIKE metacharacters escaped.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("mario"), "%mario%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
