//! Database initialization
//!
//! Opens (creating when needed) the SQLite database and brings the
//! `applications` table up to the current column set.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Location value selecting a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Open the database at `location` and sync its schema
///
/// `location` is a filesystem path or `:memory:`. Parent directories of a
/// file path are created on demand.
pub async fn init_database(location: &str) -> Result<SqlitePool> {
    let pool = if location == IN_MEMORY {
        // Each connection would see its own empty database; pin exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        info!("Opened in-memory database");
        pool
    } else {
        let db_path = Path::new(location);
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new database: {}", db_path.display());
        } else {
            info!("Opened existing database: {}", db_path.display());
        }

        // WAL lets profile reads proceed while a submission is being written
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        pool
    };

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    crate::db::table_schemas::sync_all_table_schemas(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_shared_across_queries() {
        let pool = init_database(IN_MEMORY).await.unwrap();

        sqlx::query(
            "INSERT INTO applications (id, created_at, updated_at, locale, payload_json, email_status, ip_hash, view_token_hash, edit_token_hash)
             VALUES ('a', 't', 't', 'en', '{}', 'pending', 'h', 'v', 'e')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM applications")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
