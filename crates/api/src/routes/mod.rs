//! HTTP route handlers.

pub mod admin;
pub mod auth;
pub mod events;
pub mod favorites;
pub mod friends;
pub mod health;
pub mod notifications;
pub mod users;
