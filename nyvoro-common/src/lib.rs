//! # Nyvoro Common Library
//!
//! Shared code for the Nyvoro Records backend:
//! - Join application schema, validation and form round trip
//! - Token and IP hashing, magic-link access resolution
//! - SQLite persistence for applications

pub mod access;
pub mod application;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod security;

pub use access::{resolve_access, AccessLevel};
pub use error::{Error, Result};
