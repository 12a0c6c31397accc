//! Authentication service for registration, login and sessions.

use std::sync::Arc;

use domain::{
    models::{BanInfo, ChangePasswordRequest, NewUser, RegisterRequest, User},
    ports::IdentityStore,
    services::{BanService, Session, SessionStore},
    DomainError, UserId,
};
use shared::{
    password::{PasswordError, PasswordHasher},
    validation::normalize_email,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ApiError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User is disabled")]
    UserDisabled,

    #[error("Account banned")]
    Banned(BanInfo),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Password error: {0}")]
    PasswordError(#[from] PasswordError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized("Invalid credentials".into()),
            AuthError::SessionNotFound => ApiError::Unauthorized("Authentication required".into()),
            AuthError::UserDisabled => ApiError::Forbidden("Account is disabled".into()),
            AuthError::Banned(info) => ApiError::Banned(info),
            AuthError::Domain(e) => ApiError::Domain(e),
            AuthError::PasswordError(e) => ApiError::Internal(e.to_string()),
            AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// A user together with the session just issued for them.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub user: User,
    pub session: Session,
}

pub struct AuthService {
    identity: Arc<dyn IdentityStore>,
    bans: Arc<BanService>,
    sessions: Arc<SessionStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AuthService {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        bans: Arc<BanService>,
        sessions: Arc<SessionStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            identity,
            bans,
            sessions,
            hasher,
        }
    }

    /// Creates the account and signs the new user in.
    ///
    /// The request is expected to have passed `validator` checks already.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthOutcome, AuthError> {
        let password_hash = self.hash(request.password).await?;

        let user = self
            .identity
            .create_user(NewUser {
                username: request.username.trim().to_string(),
                email: normalize_email(&request.email),
                password_hash,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
            })
            .await?;

        let session = self.sessions.create_session(user.id)?;
        info!(user_id = user.id, "User registered");

        Ok(AuthOutcome { user, session })
    }

    /// Signs in by email or username.
    ///
    /// Checks run in order: credentials, active ban, active flag.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<AuthOutcome, AuthError> {
        let user = self.verify_credentials(identifier, password).await?;

        if let Some(ban) = self.bans.ban_info(user.id).await? {
            warn!(user_id = user.id, "Login refused for banned user");
            return Err(AuthError::Banned(ban));
        }

        if !user.is_active {
            warn!(user_id = user.id, "Login refused for inactive user");
            return Err(AuthError::UserDisabled);
        }

        let session = self.sessions.create_session(user.id)?;
        info!(user_id = user.id, "User logged in");

        Ok(AuthOutcome { user, session })
    }

    /// Revokes a session token. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) {
        self.sessions.delete(token);
    }

    pub async fn me(&self, user_id: UserId) -> Result<User, AuthError> {
        self.identity
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::SessionNotFound)
    }

    async fn verify_credentials(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let identifier = identifier.trim();
        let user = match self.identity.find_by_login(identifier).await? {
            Some(user) => user,
            None => return Err(AuthError::InvalidCredentials),
        };

        if self.verify(password, user.password_hash.clone()).await? {
            Ok(user)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Replaces the password after checking the current one, then signs out
    /// every other session of the user. The session in `keep_token` survives.
    pub async fn change_password(
        &self,
        user_id: UserId,
        keep_token: &str,
        request: ChangePasswordRequest,
    ) -> Result<usize, AuthError> {
        let user = self.me(user_id).await?;

        if !self.verify(&request.current_password, user.password_hash).await? {
            warn!(user_id = user_id, "Password change refused: wrong current password");
            return Err(AuthError::InvalidCredentials);
        }

        let password_hash = self.hash(request.new_password).await?;
        self.identity.update_password(user_id, &password_hash).await?;

        let revoked = self.sessions.revoke_others(user_id, keep_token);
        info!(user_id = user_id, revoked_sessions = revoked, "Password changed");
        Ok(revoked)
    }

    // Argon2 is CPU bound; keep it off the async workers.
    async fn verify(&self, password: &str, hash: String) -> Result<bool, AuthError> {
        let hasher = self.hasher.clone();
        let plain = password.to_string();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))??;
        Ok(matches)
    }

    async fn hash(&self, password: String) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))??;
        Ok(hash)
    }
}
