//! Cloudflare Turnstile verification
//!
//! A rejected or unverifiable token is an ordinary [`CaptchaOutcome`] with
//! `success == false`; the caller turns it into a 400. Nothing here
//! returns an error to the request pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TurnstileConfig;

/// Error code reported when the verification endpoint could not be reached
pub const VERIFICATION_UNAVAILABLE: &str = "verification_unavailable";

/// Error code reported when the endpoint answered with something other than JSON
pub const VERIFICATION_BAD_RESPONSE: &str = "verification_bad_response";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptchaOutcome {
    pub success: bool,
    pub errors: Vec<String>,
}

impl CaptchaOutcome {
    pub fn passed() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![error.into()],
        }
    }
}

/// Verifies a captcha token submitted with the join form
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str, remote_ip: &str) -> CaptchaOutcome;
}

#[derive(Debug, Deserialize)]
struct SiteverifyResponse {
    #[serde(default)]
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

/// Turnstile `siteverify` client
pub struct TurnstileVerifier {
    client: reqwest::Client,
    secret_key: String,
    verify_url: String,
    bypass: bool,
}

impl TurnstileVerifier {
    pub fn new(config: &TurnstileConfig, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("nyvoro-api/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            verify_url: config.verify_url.clone(),
            bypass: config.bypass,
        })
    }
}

#[async_trait]
impl CaptchaVerifier for TurnstileVerifier {
    async fn verify(&self, token: &str, remote_ip: &str) -> CaptchaOutcome {
        if self.bypass {
            debug!("Captcha verification bypassed");
            return CaptchaOutcome::passed();
        }

        let params = [
            ("secret", self.secret_key.as_str()),
            ("response", token),
            ("remoteip", remote_ip),
        ];

        let response = match self.client.post(&self.verify_url).form(&params).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Captcha verification request failed: {}", e);
                return CaptchaOutcome::failed(VERIFICATION_UNAVAILABLE);
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Captcha verification endpoint returned HTTP {}", status.as_u16());
            return CaptchaOutcome::failed(format!("verification_http_{}", status.as_u16()));
        }

        match response.json::<SiteverifyResponse>().await {
            Ok(body) => CaptchaOutcome {
                success: body.success,
                errors: body.error_codes,
            },
            Err(e) => {
                warn!("Captcha verification response unreadable: {}", e);
                CaptchaOutcome::failed(VERIFICATION_BAD_RESPONSE)
            }
        }
    }
}
