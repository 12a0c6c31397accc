//! Error taxonomy for identity and relationship operations.

use shared::crypto::TokenError;
use thiserror::Error;

/// Every failure a relationship or identity operation can surface.
///
/// Business-rule variants are terminal for the call. Only
/// [`DomainError::TransientStore`] is safe for the caller to retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),

    /// The actor is not the party allowed to perform this transition.
    #[error("{0}")]
    Unauthorized(String),

    /// The actor is known but lacks the required role.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Conflict(String),

    #[error("user already has an active ban")]
    AlreadyBanned,

    #[error("user has no active ban")]
    NoActiveBan,

    #[error("{0}")]
    SelfReference(String),

    #[error("store unavailable: {0}")]
    TransientStore(String),

    #[error("secure random source failed: {0}")]
    Crypto(String),
}

impl DomainError {
    /// Stable machine-readable kind for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::Conflict(_) => "conflict",
            DomainError::AlreadyBanned => "already_banned",
            DomainError::NoActiveBan => "no_active_ban",
            DomainError::SelfReference(_) => "self_reference",
            DomainError::TransientStore(_) => "transient_store",
            DomainError::Crypto(_) => "crypto",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::TransientStore(_))
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        DomainError::NotFound(what.into())
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DomainError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23505") => DomainError::Conflict("Resource already exists".to_string()),
                Some("23503") => {
                    DomainError::NotFound("Referenced resource not found".to_string())
                }
                Some("23514") => DomainError::InvalidState(db_err.message().to_string()),
                _ => DomainError::TransientStore(err.to_string()),
            },
            _ => DomainError::TransientStore(err.to_string()),
        }
    }
}

impl From<TokenError> for DomainError {
    fn from(err: TokenError) -> Self {
        DomainError::Crypto(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(DomainError::AlreadyBanned.code(), "already_banned");
        assert_eq!(DomainError::NoActiveBan.code(), "no_active_ban");
        assert_eq!(DomainError::InvalidState("x".into()).code(), "invalid_state");
        assert_eq!(DomainError::SelfReference("x".into()).code(), "self_reference");
    }

    #[test]
    fn test_only_store_errors_are_retryable() {
        assert!(DomainError::TransientStore("io".into()).is_retryable());
        assert!(!DomainError::Conflict("dup".into()).is_retryable());
        assert!(!DomainError::Crypto("rng".into()).is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DomainError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err: DomainError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_retryable());
    }
}
