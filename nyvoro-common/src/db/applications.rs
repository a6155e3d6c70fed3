//! Application record persistence
//!
//! One row per submitted join form. Token hashes are written once at
//! insert and never touched again; only the payload, locale and e-mail
//! status change afterwards.

use chrono::{SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Outcome of the notification e-mails for one application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for EmailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(EmailStatus::Pending),
            "sent" => Ok(EmailStatus::Sent),
            "failed" => Ok(EmailStatus::Failed),
            other => Err(Error::Internal(format!("Unknown email status '{}'", other))),
        }
    }
}

/// Stored application row
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationRecord {
    pub id: String,
    pub created_at: String,
    pub updated_at: String,
    pub locale: String,
    pub payload_json: String,
    pub email_status: EmailStatus,
    pub ip_hash: String,
    pub view_token_hash: String,
    pub edit_token_hash: String,
}

/// Fields supplied by the caller on insert
///
/// Timestamps are assigned by [`create`] and the status always starts as
/// pending.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub id: String,
    pub locale: String,
    pub payload_json: String,
    pub ip_hash: String,
    pub view_token_hash: String,
    pub edit_token_hash: String,
}

/// Current time as stored in `created_at` / `updated_at`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Insert a new application with status `pending`
///
/// A duplicate id surfaces as [`Error::Database`] with a unique-constraint
/// violation.
pub async fn create(pool: &SqlitePool, new: &NewApplication) -> Result<ApplicationRecord> {
    if new.view_token_hash.is_empty() || new.edit_token_hash.is_empty() {
        return Err(Error::InvalidInput("Token hashes must not be empty".to_string()));
    }

    let now = now_timestamp();

    sqlx::query(
        r#"
        INSERT INTO applications (
            id, created_at, updated_at, locale, payload_json,
            email_status, ip_hash, view_token_hash, edit_token_hash
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.id)
    .bind(&now)
    .bind(&now)
    .bind(&new.locale)
    .bind(&new.payload_json)
    .bind(EmailStatus::Pending.as_str())
    .bind(&new.ip_hash)
    .bind(&new.view_token_hash)
    .bind(&new.edit_token_hash)
    .execute(pool)
    .await?;

    Ok(ApplicationRecord {
        id: new.id.clone(),
        created_at: now.clone(),
        updated_at: now,
        locale: new.locale.clone(),
        payload_json: new.payload_json.clone(),
        email_status: EmailStatus::Pending,
        ip_hash: new.ip_hash.clone(),
        view_token_hash: new.view_token_hash.clone(),
        edit_token_hash: new.edit_token_hash.clone(),
    })
}

pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<ApplicationRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, created_at, updated_at, locale, payload_json,
               email_status, ip_hash, view_token_hash, edit_token_hash
        FROM applications
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let email_status: String = row.get("email_status");
            Ok(Some(ApplicationRecord {
                id: row.get("id"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
                locale: row.get("locale"),
                payload_json: row.get("payload_json"),
                email_status: email_status.parse()?,
                ip_hash: row.get("ip_hash"),
                view_token_hash: row.get("view_token_hash"),
                edit_token_hash: row.get("edit_token_hash"),
            }))
        }
        None => Ok(None),
    }
}

/// Record the notification outcome
///
/// Only a `pending` row moves; returns false when the row is missing or
/// already settled.
pub async fn update_email_status(pool: &SqlitePool, id: &str, status: EmailStatus) -> Result<bool> {
    if status == EmailStatus::Pending {
        return Err(Error::InvalidInput("Email status cannot return to pending".to_string()));
    }

    let result = sqlx::query(
        r#"
        UPDATE applications
        SET email_status = ?, updated_at = ?
        WHERE id = ? AND email_status = 'pending'
        "#,
    )
    .bind(status.as_str())
    .bind(now_timestamp())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Overwrite the payload and locale of an existing application
///
/// Returns false when no row has `id`.
pub async fn update_payload(pool: &SqlitePool, id: &str, locale: &str, payload_json: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE applications
        SET locale = ?, payload_json = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(locale)
    .bind(payload_json)
    .bind(now_timestamp())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
