//! Application intake and magic-link profile access
//!
//! A submission moves through validation, spam check, captcha, then is
//! stored with status `pending` before any e-mail is attempted. Once
//! stored it is never rolled back: a failed notification only changes the
//! response (202 instead of 201) and the recorded e-mail status.

use nyvoro_common::access::{resolve_access, AccessLevel};
use nyvoro_common::application::{ApplicationContent, JoinApplication};
use nyvoro_common::db::{applications, EmailStatus, NewApplication};
use nyvoro_common::security::{generate_token, hash_ip_address, hash_magic_link_token};
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::captcha::CaptchaVerifier;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::links::{build_profile_links, resolve_public_base_url, ProfileLinks};
use crate::mailer::Notifier;

pub const EMAIL_FAILED_MESSAGE: &str = "Application stored, notification email failed.";

const READ_TOKEN_REJECTED: &str = "Invalid or expired magic link token.";
const EDIT_TOKEN_REJECTED: &str = "Edit token is required to modify this profile.";

/// Request facts the intake needs besides the body
#[derive(Debug, Clone, Default)]
pub struct SubmissionContext {
    pub client_ip: String,
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Ok,
    StoredWithEmailError,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub status: SubmissionStatus,
    pub application_id: String,
    pub profile_links: ProfileLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub status: &'static str,
    pub application_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub can_edit: bool,
    pub payload: ApplicationContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdated {
    pub status: &'static str,
    pub application_id: String,
}

/// Orchestrates submissions and profile access
#[derive(Clone)]
pub struct IntakeService {
    db: SqlitePool,
    config: Arc<AppConfig>,
    captcha: Arc<dyn CaptchaVerifier>,
    notifier: Arc<dyn Notifier>,
}

impl IntakeService {
    pub fn new(
        db: SqlitePool,
        config: Arc<AppConfig>,
        captcha: Arc<dyn CaptchaVerifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            config,
            captcha,
            notifier,
        }
    }

    /// Handle a new join application
    pub async fn submit(&self, body: Value, ctx: SubmissionContext) -> Result<SubmissionReceipt, ApiError> {
        let application = JoinApplication::parse(body).map_err(ApiError::Validation)?;

        if application.is_spam() {
            info!("Submission rejected by honeypot");
            return Err(ApiError::SpamDetected);
        }

        let outcome = self
            .captcha
            .verify(&application.turnstile_token, &ctx.client_ip)
            .await;
        if !outcome.success {
            warn!("Captcha rejected submission: {:?}", outcome.errors);
            return Err(ApiError::CaptchaInvalid(outcome.errors));
        }

        let application_id = Uuid::new_v4().to_string();
        let view_token = generate_token();
        let edit_token = generate_token();
        let salt = &self.config.magic_link_salt;

        let base_url = resolve_public_base_url(ctx.origin.as_deref(), &self.config.public_web_base_url);
        let profile_links = build_profile_links(
            &base_url,
            application.locale(),
            &application_id,
            &view_token,
            &edit_token,
        );

        let payload_json = application
            .to_json()
            .map_err(|e| ApiError::Internal(format!("Failed to serialize payload: {}", e)))?;

        applications::create(
            &self.db,
            &NewApplication {
                id: application_id.clone(),
                locale: application.locale().to_string(),
                payload_json,
                ip_hash: hash_ip_address(&ctx.client_ip, &self.config.ip_hash_salt),
                view_token_hash: hash_magic_link_token(&view_token, salt),
                edit_token_hash: hash_magic_link_token(&edit_token, salt),
            },
        )
        .await?;

        info!(application_id = %application_id, "Application stored");

        let notified = self
            .notifier
            .send_application_notifications(&application_id, &application.content, &profile_links)
            .await;

        let (email_status, status, message) = match notified {
            Ok(()) => (EmailStatus::Sent, SubmissionStatus::Ok, None),
            Err(e) => {
                error!(application_id = %application_id, "Failed to send application notification: {}", e);
                (
                    EmailStatus::Failed,
                    SubmissionStatus::StoredWithEmailError,
                    Some(EMAIL_FAILED_MESSAGE),
                )
            }
        };

        applications::update_email_status(&self.db, &application_id, email_status).await?;

        Ok(SubmissionReceipt {
            status,
            application_id,
            profile_links,
            message,
        })
    }

    async fn authorize(
        &self,
        application_id: &str,
        token: Option<&str>,
    ) -> Result<(applications::ApplicationRecord, AccessLevel), ApiError> {
        let application_id = application_id.trim();
        if application_id.is_empty() {
            return Err(ApiError::ApplicationIdRequired);
        }

        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::TokenRequired)?;

        let record = applications::get_by_id(&self.db, application_id)
            .await?
            .ok_or(ApiError::NotFound)?;

        let access = resolve_access(
            token,
            &record.view_token_hash,
            &record.edit_token_hash,
            &self.config.magic_link_salt,
        );

        Ok((record, access))
    }

    /// Read a profile with a view or edit token
    pub async fn get_profile(&self, application_id: &str, token: Option<&str>) -> Result<ProfileView, ApiError> {
        let (record, access) = self.authorize(application_id, token).await?;

        if !access.can_view() {
            return Err(ApiError::InvalidToken(READ_TOKEN_REJECTED));
        }

        let stored = JoinApplication::from_stored_json(&record.payload_json).map_err(|e| {
            ApiError::PayloadCorrupted {
                application_id: record.id.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(ProfileView {
            status: "ok",
            application_id: record.id,
            created_at: record.created_at,
            updated_at: record.updated_at,
            can_edit: access.can_edit(),
            payload: stored.content,
        })
    }

    /// Replace the editable content; requires the edit token
    ///
    /// Edits are not re-checked for spam or captcha: holding the edit
    /// token is the proof of legitimacy. `body` is only inspected once the
    /// token has been accepted.
    pub async fn update_profile(
        &self,
        application_id: &str,
        token: Option<&str>,
        body: Result<Value, ApiError>,
    ) -> Result<ProfileUpdated, ApiError> {
        let (record, access) = self.authorize(application_id, token).await?;

        if !access.can_edit() {
            return Err(ApiError::InvalidToken(EDIT_TOKEN_REJECTED));
        }

        let content = ApplicationContent::parse(body?).map_err(ApiError::Validation)?;
        let locale = content.locale.to_string();
        let payload_json = content
            .into_stored_payload()
            .to_json()
            .map_err(|e| ApiError::Internal(format!("Failed to serialize payload: {}", e)))?;

        if !applications::update_payload(&self.db, &record.id, &locale, &payload_json).await? {
            return Err(ApiError::NotFound);
        }

        info!(application_id = %record.id, "Application profile updated");

        Ok(ProfileUpdated {
            status: "ok",
            application_id: record.id,
        })
    }
}
