//! In-process session store.
//!
//! Tokens map to a user id and an expiry. The map is guarded by one mutex
//! whose critical sections never perform I/O; token generation happens
//! before the lock is taken.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use shared::crypto::generate_session_token;

use crate::{DomainError, UserId};

pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Outcome of resolving a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLookup {
    Active(UserId),
    NotFound,
    /// The entry was stale and has been evicted.
    Expired,
}

impl SessionLookup {
    /// Collapses not-found and expired into "absent".
    pub fn user_id(self) -> Option<UserId> {
        match self {
            SessionLookup::Active(id) => Some(id),
            SessionLookup::NotFound | SessionLookup::Expired => None,
        }
    }
}

/// A freshly issued session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct SessionEntry {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_SESSION_TTL_DAYS))
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a new token for `user_id`. Fails only if the OS random source does.
    pub fn create_session(&self, user_id: UserId) -> Result<Session, DomainError> {
        let token = generate_session_token()?;
        let expires_at = Utc::now() + self.ttl;

        self.lock().insert(
            token.clone(),
            SessionEntry {
                user_id,
                expires_at,
            },
        );

        Ok(Session {
            token,
            user_id,
            expires_at,
        })
    }

    /// Resolves a token, evicting it if it has expired.
    pub fn resolve(&self, token: &str) -> SessionLookup {
        let now = Utc::now();
        let mut sessions = self.lock();

        match sessions.get(token).copied() {
            None => SessionLookup::NotFound,
            Some(entry) if entry.expires_at <= now => {
                sessions.remove(token);
                SessionLookup::Expired
            }
            Some(entry) => SessionLookup::Active(entry.user_id),
        }
    }

    pub fn user_id(&self, token: &str) -> Option<UserId> {
        self.resolve(token).user_id()
    }

    /// Revokes a token. Unknown tokens are ignored.
    pub fn delete(&self, token: &str) {
        self.lock().remove(token);
    }

    /// Evicts every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    /// Revokes every session of `user_id` except `keep`; returns how many went.
    pub fn revoke_others(&self, user_id: UserId, keep: &str) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|token, entry| entry.user_id != user_id || token == keep);
        before - sessions.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock still holds a consistent map: every critical section
    // is a single insert, lookup or remove.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
