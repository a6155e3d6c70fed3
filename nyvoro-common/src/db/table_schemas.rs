//! Table schema declarations
//!
//! Single source of truth for the `applications` table. Rows written by the
//! first release only had `id, created_at, locale, payload_json,
//! email_status, ip_hash`; the remaining columns are added at startup.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

pub struct ApplicationsTableSchema;

impl TableSchema for ApplicationsTableSchema {
    fn table_name() -> &'static str {
        "applications"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "TEXT").primary_key(),
            ColumnDefinition::new("created_at", "TEXT")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
            // SQLite rejects a non-constant default on ADD COLUMN; backfilled below
            ColumnDefinition::new("updated_at", "TEXT").not_null().default("''"),
            ColumnDefinition::new("locale", "TEXT").not_null(),
            ColumnDefinition::new("payload_json", "TEXT").not_null(),
            ColumnDefinition::new("email_status", "TEXT").not_null(),
            ColumnDefinition::new("ip_hash", "TEXT").not_null(),
            ColumnDefinition::new("view_token_hash", "TEXT").not_null().default("''"),
            ColumnDefinition::new("edit_token_hash", "TEXT").not_null().default("''"),
        ]
    }
}

/// Create missing tables, add missing columns, backfill new columns
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&ApplicationsTableSchema::create_statement())
        .execute(pool)
        .await?;

    let added = SchemaSync::sync_table::<ApplicationsTableSchema>(pool).await?;

    if added.iter().any(|c| c == "updated_at") {
        let result = sqlx::query("UPDATE applications SET updated_at = created_at WHERE updated_at = ''")
            .execute(pool)
            .await?;
        info!("Backfilled updated_at for {} application(s)", result.rows_affected());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema_sync::SchemaIntrospector;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_database_gets_every_column() {
        let pool = memory_pool().await;
        sync_all_table_schemas(&pool).await.unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, "applications").await.unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "id",
                "created_at",
                "updated_at",
                "locale",
                "payload_json",
                "email_status",
                "ip_hash",
                "view_token_hash",
                "edit_token_hash",
            ]
        );
    }

    #[tokio::test]
    async fn test_legacy_rows_are_upgraded() {
        let pool = memory_pool().await;
        sqlx::query(
            r#"
            CREATE TABLE applications (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                locale TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                email_status TEXT NOT NULL,
                ip_hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO applications (id, created_at, locale, payload_json, email_status, ip_hash)
             VALUES ('legacy', '2024-05-01 10:00:00', 'en', '{}', 'sent', 'abc')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sync_all_table_schemas(&pool).await.unwrap();

        let (updated_at, view_hash, edit_hash): (String, String, String) = sqlx::query_as(
            "SELECT updated_at, view_token_hash, edit_token_hash FROM applications WHERE id = 'legacy'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(updated_at, "2024-05-01 10:00:00");
        assert_eq!(view_hash, "");
        assert_eq!(edit_hash, "");

        // Idempotent
        sync_all_table_schemas(&pool).await.unwrap();
    }
}
