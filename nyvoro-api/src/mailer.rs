//! Notification dispatch
//!
//! Each accepted application produces two messages: one to the label
//! (reply-to the applicant) and an acknowledgement to the applicant
//! (reply-to the label). No retries; the caller records the outcome.

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use nyvoro_common::application::ApplicationContent;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::SmtpConfig;
use crate::email_template::{
    build_applicant_acknowledgement_email, build_application_notification_email, NotificationEmail,
};
use crate::links::ProfileLinks;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid mailbox '{address}': {source}")]
    Address {
        address: String,
        source: lettre::address::AddressError,
    },

    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Notification transport unavailable: {0}")]
    Unavailable(String),
}

/// Sends the two application e-mails
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Succeeds only when both messages were accepted by the transport
    async fn send_application_notifications(
        &self,
        application_id: &str,
        payload: &ApplicationContent,
        links: &ProfileLinks,
    ) -> Result<(), NotifyError>;
}

fn mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse::<Mailbox>().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

fn compose(from: &Mailbox, to: Mailbox, reply_to: Mailbox, email: NotificationEmail) -> Result<Message, NotifyError> {
    let message = Message::builder()
        .from(from.clone())
        .to(to)
        .reply_to(reply_to)
        .subject(email.subject)
        .multipart(MultiPart::alternative_plain_html(email.text, email.html))?;
    Ok(message)
}

/// SMTP delivery through lettre
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    recipient: Mailbox,
    logo_url: String,
}

impl SmtpNotifier {
    /// Builds the transport; no connection is made until the first send
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.user.clone(), config.pass.clone()))
            .timeout(Some(timeout))
            .build();

        Ok(Self {
            transport,
            from: mailbox(&config.from)?,
            recipient: mailbox(&config.recipient_email)?,
            logo_url: config.logo_url.clone(),
        })
    }

    /// Internal notification first, acknowledgement second
    fn build_messages(
        &self,
        application_id: &str,
        payload: &ApplicationContent,
        links: &ProfileLinks,
    ) -> Result<[Message; 2], NotifyError> {
        let applicant = mailbox(&payload.profile.email)?;
        let submitted_at = Utc::now();

        let internal = build_application_notification_email(
            application_id,
            payload,
            links,
            &self.logo_url,
            submitted_at,
        );
        let acknowledgement = build_applicant_acknowledgement_email(
            application_id,
            payload,
            links,
            &self.logo_url,
            submitted_at,
        );

        Ok([
            compose(&self.from, self.recipient.clone(), applicant.clone(), internal)?,
            compose(&self.from, applicant, self.recipient.clone(), acknowledgement)?,
        ])
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_application_notifications(
        &self,
        application_id: &str,
        payload: &ApplicationContent,
        links: &ProfileLinks,
    ) -> Result<(), NotifyError> {
        for message in self.build_messages(application_id, payload, links)? {
            self.transport.send(message).await?;
            debug!(application_id = %application_id, "SMTP accepted message");
        }
        Ok(())
    }
}
