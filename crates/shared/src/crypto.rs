//! Secure random token generation.

use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

/// Number of random bytes behind a session token (256 bits).
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Failure of the operating system random source.
#[derive(Debug, Error)]
#[error("secure random source unavailable: {0}")]
pub struct TokenError(String);

/// Fills `len` bytes from the OS random source and hex-encodes them.
pub fn generate_token(len: usize) -> Result<String, TokenError> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TokenError(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Generates an opaque session token: 64 lowercase hex characters.
pub fn generate_session_token() -> Result<String, TokenError> {
    generate_token(SESSION_TOKEN_BYTES)
}
