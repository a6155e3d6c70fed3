//! SQLite persistence for join applications

pub mod applications;
pub mod init;
pub mod schema_sync;
pub mod table_schemas;

pub use applications::{ApplicationRecord, EmailStatus, NewApplication};
pub use init::{init_database, IN_MEMORY};
