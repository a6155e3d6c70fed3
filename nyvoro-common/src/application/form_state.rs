//! Flat form model used by the join and profile-edit pages
//!
//! The browser form holds every input as a string. Converting a stored
//! payload to a [`JoinFormState`] and back must reproduce the editable
//! content, so a profile can be edited without drifting.

use serde::{Deserialize, Serialize};

use super::payload::{
    ApplicationContent, AudienceAnalytics, BudgetAndResources, JoinApplication, Locale,
    Objectives, Planning, Profile, ProjectType, ReleaseHistory, SocialLinks, StreamingLinks,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinFormState {
    pub legal_name: String,
    pub artist_name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub country: String,
    pub project_type: ProjectType,
    pub years_active: String,
    pub primary_genre: String,
    pub secondary_genres: String,
    pub instagram: String,
    pub tiktok: String,
    pub youtube: String,
    pub x: String,
    pub website: String,
    pub spotify: String,
    pub apple_music: String,
    pub sound_cloud: String,
    pub deezer: String,
    pub beatport: String,
    pub notable_releases: String,
    pub release_summary: String,
    pub monthly_listeners: String,
    pub total_followers: String,
    pub average_streams_per_release: String,
    pub top_markets: String,
    pub monthly_marketing_budget_eur: String,
    pub production_budget_per_track_eur: String,
    pub team_description: String,
    pub release_frequency: String,
    #[serde(rename = "roadmap90Days")]
    pub roadmap_90_days: String,
    #[serde(rename = "goals12Months")]
    pub goals_12_months: String,
    pub why_nyvoro: String,
    pub message: String,
    pub consent: bool,
    pub honeypot: String,
    pub turnstile_token: String,
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_optional_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn number_to_string(value: Option<f64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}

fn text_or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Populate the form from stored editable content
pub fn to_form_state(payload: &ApplicationContent) -> JoinFormState {
    let p = &payload.profile;
    let social = &payload.social_links;
    let streaming = &payload.streaming_links;
    let audience = &payload.audience_analytics;
    let budget = &payload.budget_and_resources;

    JoinFormState {
        legal_name: p.legal_name.clone(),
        artist_name: p.artist_name.clone(),
        email: p.email.clone(),
        phone: text_or_empty(&p.phone),
        city: p.city.clone(),
        country: p.country.clone(),
        project_type: p.project_type,
        years_active: p.years_active.to_string(),
        primary_genre: p.primary_genre.clone(),
        secondary_genres: p.secondary_genres.join(", "),
        instagram: text_or_empty(&social.instagram),
        tiktok: text_or_empty(&social.tiktok),
        youtube: text_or_empty(&social.youtube),
        x: text_or_empty(&social.x),
        website: text_or_empty(&social.website),
        spotify: text_or_empty(&streaming.spotify),
        apple_music: text_or_empty(&streaming.apple_music),
        sound_cloud: text_or_empty(&streaming.sound_cloud),
        deezer: text_or_empty(&streaming.deezer),
        beatport: text_or_empty(&streaming.beatport),
        notable_releases: payload.release_history.notable_releases.join(", "),
        release_summary: payload.release_history.release_summary.clone(),
        monthly_listeners: number_to_string(audience.monthly_listeners),
        total_followers: number_to_string(audience.total_followers),
        average_streams_per_release: number_to_string(audience.average_streams_per_release),
        top_markets: audience.top_markets.join(", "),
        monthly_marketing_budget_eur: number_to_string(budget.monthly_marketing_budget_eur),
        production_budget_per_track_eur: number_to_string(budget.production_budget_per_track_eur),
        team_description: budget.team_description.clone(),
        release_frequency: payload.planning.release_frequency.clone(),
        roadmap_90_days: payload.planning.roadmap_90_days.clone(),
        goals_12_months: payload.objectives.goals_12_months.clone(),
        why_nyvoro: payload.objectives.why_nyvoro.clone(),
        message: payload.message.clone(),
        consent: payload.consent,
        honeypot: String::new(),
        turnstile_token: String::new(),
    }
}

/// Build editable content from the form
///
/// An unparseable `yearsActive` becomes `-1` so validation rejects it
/// instead of silently saving zero.
pub fn build_editable_payload(locale: Locale, values: &JoinFormState) -> ApplicationContent {
    ApplicationContent {
        locale,
        profile: Profile {
            legal_name: values.legal_name.clone(),
            artist_name: values.artist_name.clone(),
            email: values.email.clone(),
            phone: parse_optional_text(&values.phone),
            city: values.city.clone(),
            country: values.country.clone(),
            project_type: values.project_type,
            years_active: values.years_active.trim().parse::<i64>().unwrap_or(-1),
            primary_genre: values.primary_genre.clone(),
            secondary_genres: parse_list(&values.secondary_genres),
        },
        social_links: SocialLinks {
            instagram: parse_optional_text(&values.instagram),
            tiktok: parse_optional_text(&values.tiktok),
            youtube: parse_optional_text(&values.youtube),
            x: parse_optional_text(&values.x),
            website: parse_optional_text(&values.website),
        },
        streaming_links: StreamingLinks {
            spotify: parse_optional_text(&values.spotify),
            apple_music: parse_optional_text(&values.apple_music),
            sound_cloud: parse_optional_text(&values.sound_cloud),
            deezer: parse_optional_text(&values.deezer),
            beatport: parse_optional_text(&values.beatport),
        },
        release_history: ReleaseHistory {
            notable_releases: parse_list(&values.notable_releases),
            release_summary: values.release_summary.clone(),
        },
        audience_analytics: AudienceAnalytics {
            monthly_listeners: parse_optional_number(&values.monthly_listeners),
            total_followers: parse_optional_number(&values.total_followers),
            average_streams_per_release: parse_optional_number(&values.average_streams_per_release),
            top_markets: parse_list(&values.top_markets),
        },
        budget_and_resources: BudgetAndResources {
            monthly_marketing_budget_eur: parse_optional_number(&values.monthly_marketing_budget_eur),
            production_budget_per_track_eur: parse_optional_number(
                &values.production_budget_per_track_eur,
            ),
            team_description: values.team_description.clone(),
        },
        planning: Planning {
            release_frequency: values.release_frequency.clone(),
            roadmap_90_days: values.roadmap_90_days.clone(),
        },
        objectives: Objectives {
            goals_12_months: values.goals_12_months.clone(),
            why_nyvoro: values.why_nyvoro.clone(),
        },
        message: values.message.clone(),
        consent: values.consent,
    }
}

/// Build a full submission (editable content plus captcha and honeypot)
pub fn build_submission_payload(locale: Locale, values: &JoinFormState) -> JoinApplication {
    JoinApplication {
        content: build_editable_payload(locale, values),
        turnstile_token: values.turnstile_token.clone(),
        honeypot: values.honeypot.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::payload::fixtures::submission;

    #[test]
    fn test_form_round_trip_preserves_editable_content() {
        let content = submission().content;
        let form = to_form_state(&content);
        let rebuilt = build_editable_payload(content.locale, &form);
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn test_round_trip_with_every_optional_filled() {
        let mut content = submission().content;
        content.locale = Locale::Fr;
        content.profile.phone = Some("+33 6 12 34 56 78".to_string());
        content.social_links.website = Some("https://lumina.example".to_string());
        content.streaming_links.beatport = Some("https://beatport.com/artist/x".to_string());
        content.audience_analytics.average_streams_per_release = Some(1234.5);
        content.budget_and_resources.production_budget_per_track_eur = None;
        content.release_history.notable_releases =
            vec!["Aurora Echo".to_string(), "Night Tide".to_string()];

        let rebuilt = build_editable_payload(Locale::Fr, &to_form_state(&content));
        assert_eq!(rebuilt, content);
        assert!(rebuilt.validate().is_ok());
    }

    #[test]
    fn test_form_state_clears_submission_only_fields() {
        let form = to_form_state(&submission().content);
        assert_eq!(form.honeypot, "");
        assert_eq!(form.turnstile_token, "");
        assert_eq!(form.secondary_genres, "Electronica");
        assert_eq!(form.monthly_listeners, "12000");
        assert_eq!(form.phone, "");
    }

    #[test]
    fn test_lists_split_and_drop_blanks() {
        let mut form = to_form_state(&submission().content);
        form.top_markets = " France, ,Germany ,".to_string();
        let content = build_editable_payload(Locale::En, &form);
        assert_eq!(content.audience_analytics.top_markets, vec!["France", "Germany"]);
    }

    #[test]
    fn test_unparseable_years_active_fails_validation() {
        let mut form = to_form_state(&submission().content);
        form.years_active = "four".to_string();
        let content = build_editable_payload(Locale::En, &form);
        assert!(content.validate().unwrap_err().has_field("profile.yearsActive"));
    }

    #[test]
    fn test_submission_payload_carries_captcha_fields() {
        let mut form = to_form_state(&submission().content);
        form.turnstile_token = "token_abcdefghij".to_string();
        let app = build_submission_payload(Locale::En, &form);
        assert_eq!(app.turnstile_token, "token_abcdefghij");
        assert!(app.validate().is_ok());
    }
}
