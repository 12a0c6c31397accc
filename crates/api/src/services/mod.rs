//! Application services and external integrations.

pub mod auth;
pub mod cookies;
pub mod post_service;

pub use auth::{AuthError, AuthOutcome, AuthService};
pub use cookies::SessionCookie;
pub use post_service::HttpPostService;
