//! Magic-link URLs handed to the applicant
//!
//! The base URL is taken from the request `Origin` when it is a plain
//! http(s) origin, so a submission made from a preview deployment links
//! back to that deployment.

use nyvoro_common::application::Locale;
use serde::Serialize;
use url::form_urlencoded::byte_serialize;
use url::Url;

pub use crate::config::normalize_base_url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLinks {
    pub view_url: String,
    pub edit_url: String,
}

/// Base URL for links, from the `Origin` header or `fallback`
pub fn resolve_public_base_url(origin: Option<&str>, fallback: &str) -> String {
    let Some(origin) = origin else {
        return fallback.to_string();
    };

    match Url::parse(origin) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            normalize_base_url(&parsed.origin().ascii_serialization())
        }
        _ => fallback.to_string(),
    }
}

fn encode_component(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

/// View link carries the view token, edit link the edit token
pub fn build_profile_links(
    base_url: &str,
    locale: Locale,
    application_id: &str,
    view_token: &str,
    edit_token: &str,
) -> ProfileLinks {
    let base = normalize_base_url(base_url);

    ProfileLinks {
        view_url: format!(
            "{}/{}/application-profile/{}?token={}",
            base,
            locale,
            application_id,
            encode_component(view_token)
        ),
        edit_url: format!(
            "{}/{}/join?applicationId={}&editToken={}",
            base,
            locale,
            application_id,
            encode_component(edit_token)
        ),
    }
}
