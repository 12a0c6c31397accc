//! Domain layer for the Squadra backend.
//!
//! This crate contains:
//! - Domain models with closed status enums and their transition rules
//! - The [`errors::DomainError`] taxonomy shared by every layer
//! - Port traits implemented by persistence and remote adapters
//! - The in-memory session store and the relationship services

pub mod errors;
pub mod models;
pub mod ports;
pub mod services;

pub use errors::DomainError;

/// Numeric user identifier. Ordering matters for canonical friendship pairs.
pub type UserId = i64;
