//! Token and hash utilities
//!
//! Magic-link tokens and client IP addresses are never stored in clear.
//! Both go through the same salted SHA-256 digest (with different salts),
//! and stored digests are only ever compared in constant time.
//!
//! # Algorithm
//!
//! 1. Concatenate `salt`, a `:` separator and the value
//! 2. SHA-256 the UTF-8 bytes
//! 3. Return as 64 lowercase hex characters

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::net::IpAddr;
use subtle::ConstantTimeEq;

/// Number of random bytes behind each magic-link token (192 bits)
pub const TOKEN_BYTES: usize = 24;

/// IP recorded when neither a forwarded header nor a peer address is known
pub const UNKNOWN_CLIENT_IP: &str = "0.0.0.0";

/// Salted one-way digest of `value`
///
/// # Examples
///
/// ```
/// use nyvoro_common::security::hash_value;
///
/// let hash = hash_value("203.0.113.9", "salt");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_value("203.0.113.9", "salt"));
/// assert_ne!(hash, hash_value("203.0.113.9", "other-salt"));
/// ```
pub fn hash_value(value: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a client IP for abuse tracking
pub fn hash_ip_address(ip_address: &str, salt: &str) -> String {
    hash_value(ip_address, salt)
}

/// Hash a magic-link token for storage and lookup
pub fn hash_magic_link_token(token: &str, salt: &str) -> String {
    hash_value(token, salt)
}

/// Generate a URL-safe random token
///
/// 24 bytes from the thread-local CSPRNG, base64url without padding
/// (32 characters).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare two stored hashes without leaking where they differ
///
/// Returns false immediately for empty inputs or a length mismatch. Only
/// meant for digests: their length is public, the content is not.
pub fn secure_compare(left: &str, right: &str) -> bool {
    if left.is_empty() || right.is_empty() || left.len() != right.len() {
        return false;
    }

    left.as_bytes().ct_eq(right.as_bytes()).into()
}

/// Resolve the client IP for a request
///
/// Prefers the first entry of an `X-Forwarded-For` header, then the
/// transport peer address, then [`UNKNOWN_CLIENT_IP`].
pub fn client_ip(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> String {
    if let Some(header) = forwarded_for {
        let first = header.split(',').next().unwrap_or_default().trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    match peer {
        Some(ip) => ip.to_string(),
        None => UNKNOWN_CLIENT_IP.to_string(),
    }
}
