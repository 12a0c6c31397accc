//! Shared utilities for the Squadra backend.
//!
//! - Session token generation from the OS random source
//! - Password hashing with Argon2id behind the [`password::PasswordHasher`] capability
//! - Offset pagination and input validation helpers

pub mod crypto;
pub mod pagination;
pub mod password;
pub mod validation;
