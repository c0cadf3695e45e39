//! Opaque bearer tokens. Only the salted SHA-256 digest is ever stored.

use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_PREFIX: &str = "sf_";

/// Generate a fresh random bearer token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{TOKEN_PREFIX}{hex}")
}

/// Hex-encoded SHA-256 of `salt` followed by `token`.
#[must_use]
pub fn hash_token(salt: &str, token: &str) -> String {
    format!("{:x}", Sha256::digest(format!("{salt}{token}").as_bytes()))
}
