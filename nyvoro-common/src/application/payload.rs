//! Join application payload
//!
//! [`JoinApplication`] is what the public form submits. Its editable part,
//! [`ApplicationContent`], is what a magic-link holder may read and rewrite;
//! the captcha token and honeypot are only meaningful at submission time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::lenient;
use super::validation::{Checks, ValidationErrors};

/// Captcha token written into payloads saved through the profile editor
///
/// Edits are authorised by the edit token, not by a fresh captcha, but the
/// stored row must still satisfy the full submission schema.
pub const PROFILE_EDIT_TURNSTILE_TOKEN: &str = "profile_edit_token_1234567890";

/// Minimum length of a captcha token accepted at submission
pub const MIN_TURNSTILE_TOKEN_LEN: usize = 10;

/// Site language the applicant used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Fr,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en" => Ok(Locale::En),
            "fr" => Ok(Locale::Fr),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Solo,
    Duo,
    Band,
    Producer,
    Dj,
    Other,
}

impl ProjectType {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectType::Solo => "Solo",
            ProjectType::Duo => "Duo",
            ProjectType::Band => "Band",
            ProjectType::Producer => "Producer",
            ProjectType::Dj => "DJ",
            ProjectType::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub legal_name: String,
    pub artist_name: String,
    pub email: String,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub city: String,
    pub country: String,
    pub project_type: ProjectType,
    #[serde(deserialize_with = "lenient::whole_number")]
    pub years_active: i64,
    pub primary_genre: String,
    pub secondary_genres: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingLinks {
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub spotify: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub apple_music: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub sound_cloud: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub deezer: Option<String>,
    #[serde(default, deserialize_with = "lenient::optional_text", skip_serializing_if = "Option::is_none")]
    pub beatport: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseHistory {
    pub notable_releases: Vec<String>,
    pub release_summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceAnalytics {
    #[serde(default, deserialize_with = "lenient::optional_number", skip_serializing_if = "Option::is_none")]
    pub monthly_listeners: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number", skip_serializing_if = "Option::is_none")]
    pub total_followers: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number", skip_serializing_if = "Option::is_none")]
    pub average_streams_per_release: Option<f64>,
    pub top_markets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAndResources {
    #[serde(default, deserialize_with = "lenient::optional_number", skip_serializing_if = "Option::is_none")]
    pub monthly_marketing_budget_eur: Option<f64>,
    #[serde(default, deserialize_with = "lenient::optional_number", skip_serializing_if = "Option::is_none")]
    pub production_budget_per_track_eur: Option<f64>,
    pub team_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planning {
    pub release_frequency: String,
    #[serde(rename = "roadmap90Days")]
    pub roadmap_90_days: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objectives {
    #[serde(rename = "goals12Months")]
    pub goals_12_months: String,
    pub why_nyvoro: String,
}

/// Editable application content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationContent {
    pub locale: Locale,
    pub profile: Profile,
    pub social_links: SocialLinks,
    pub streaming_links: StreamingLinks,
    pub release_history: ReleaseHistory,
    pub audience_analytics: AudienceAnalytics,
    pub budget_and_resources: BudgetAndResources,
    pub planning: Planning,
    pub objectives: Objectives,
    pub message: String,
    pub consent: bool,
}

/// Full submission as posted by the join form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinApplication {
    #[serde(flatten)]
    pub content: ApplicationContent,
    pub turnstile_token: String,
    #[serde(default)]
    pub honeypot: String,
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_all(values: &mut [String]) {
    values.iter_mut().for_each(trim_in_place);
}

impl ApplicationContent {
    /// Deserialize, trim and validate an editable payload
    pub fn parse(value: Value) -> Result<Self, ValidationErrors> {
        let mut content: ApplicationContent =
            serde_json::from_value(value).map_err(|e| ValidationErrors::form(e.to_string()))?;
        content.normalize();
        content.validate()?;
        Ok(content)
    }

    /// Trim every free-text field
    pub fn normalize(&mut self) {
        let p = &mut self.profile;
        trim_in_place(&mut p.legal_name);
        trim_in_place(&mut p.artist_name);
        trim_in_place(&mut p.email);
        trim_in_place(&mut p.city);
        trim_in_place(&mut p.country);
        trim_in_place(&mut p.primary_genre);
        trim_all(&mut p.secondary_genres);

        trim_all(&mut self.release_history.notable_releases);
        trim_in_place(&mut self.release_history.release_summary);
        trim_all(&mut self.audience_analytics.top_markets);
        trim_in_place(&mut self.budget_and_resources.team_description);
        trim_in_place(&mut self.planning.release_frequency);
        trim_in_place(&mut self.planning.roadmap_90_days);
        trim_in_place(&mut self.objectives.goals_12_months);
        trim_in_place(&mut self.objectives.why_nyvoro);
        trim_in_place(&mut self.message);
    }

    /// Check length, range and format rules on an already-normalized payload
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::new();
        self.check(&mut checks);
        checks.finish()
    }

    pub(crate) fn check(&self, c: &mut Checks) {
        let p = &self.profile;
        c.text("profile.legalName", &p.legal_name, 2, 120);
        c.text("profile.artistName", &p.artist_name, 2, 120);
        c.email("profile.email", &p.email);
        c.optional_text("profile.phone", p.phone.as_deref(), 6, 40);
        c.text("profile.city", &p.city, 2, 120);
        c.text("profile.country", &p.country, 2, 120);
        c.integer_range("profile.yearsActive", p.years_active, 0, 80);
        c.text("profile.primaryGenre", &p.primary_genre, 2, 80);
        c.list("profile.secondaryGenres", &p.secondary_genres, 10, 2, 80);

        let s = &self.social_links;
        c.optional_url("socialLinks.instagram", s.instagram.as_deref());
        c.optional_url("socialLinks.tiktok", s.tiktok.as_deref());
        c.optional_url("socialLinks.youtube", s.youtube.as_deref());
        c.optional_url("socialLinks.x", s.x.as_deref());
        c.optional_url("socialLinks.website", s.website.as_deref());

        let s = &self.streaming_links;
        c.optional_url("streamingLinks.spotify", s.spotify.as_deref());
        c.optional_url("streamingLinks.appleMusic", s.apple_music.as_deref());
        c.optional_url("streamingLinks.soundCloud", s.sound_cloud.as_deref());
        c.optional_url("streamingLinks.deezer", s.deezer.as_deref());
        c.optional_url("streamingLinks.beatport", s.beatport.as_deref());

        let r = &self.release_history;
        c.list("releaseHistory.notableReleases", &r.notable_releases, 10, 2, 200);
        c.text("releaseHistory.releaseSummary", &r.release_summary, 20, 1600);

        let a = &self.audience_analytics;
        c.optional_non_negative("audienceAnalytics.monthlyListeners", a.monthly_listeners);
        c.optional_non_negative("audienceAnalytics.totalFollowers", a.total_followers);
        c.optional_non_negative(
            "audienceAnalytics.averageStreamsPerRelease",
            a.average_streams_per_release,
        );
        c.list("audienceAnalytics.topMarkets", &a.top_markets, 10, 2, 120);

        let b = &self.budget_and_resources;
        c.optional_non_negative(
            "budgetAndResources.monthlyMarketingBudgetEur",
            b.monthly_marketing_budget_eur,
        );
        c.optional_non_negative(
            "budgetAndResources.productionBudgetPerTrackEur",
            b.production_budget_per_track_eur,
        );
        c.text("budgetAndResources.teamDescription", &b.team_description, 10, 1200);

        c.text("planning.releaseFrequency", &self.planning.release_frequency, 5, 160);
        c.text("planning.roadmap90Days", &self.planning.roadmap_90_days, 30, 3000);
        c.text("objectives.goals12Months", &self.objectives.goals_12_months, 30, 3000);
        c.text("objectives.whyNyvoro", &self.objectives.why_nyvoro, 30, 3000);
        c.text("message", &self.message, 20, 3000);
        c.must_be_true("consent", self.consent);
    }

    /// Wrap edited content as a storable full payload
    pub fn into_stored_payload(self) -> JoinApplication {
        JoinApplication {
            content: self,
            turnstile_token: PROFILE_EDIT_TURNSTILE_TOKEN.to_string(),
            honeypot: String::new(),
        }
    }
}

impl JoinApplication {
    /// Deserialize, trim and validate a submission
    pub fn parse(value: Value) -> Result<Self, ValidationErrors> {
        let mut application: JoinApplication =
            serde_json::from_value(value).map_err(|e| ValidationErrors::form(e.to_string()))?;
        application.content.normalize();
        application.validate()?;
        Ok(application)
    }

    /// Re-validate a payload read back from storage
    pub fn from_stored_json(payload_json: &str) -> Result<Self, ValidationErrors> {
        let value: Value = serde_json::from_str(payload_json)
            .map_err(|e| ValidationErrors::form(format!("invalid JSON: {}", e)))?;
        Self::parse(value)
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut checks = Checks::new();
        self.content.check(&mut checks);
        if self.turnstile_token.chars().count() < MIN_TURNSTILE_TOKEN_LEN {
            let mut errors = checks.finish().err().unwrap_or_default();
            errors.add("turnstileToken", "Turnstile token is required.");
            return Err(errors);
        }
        checks.finish()
    }

    /// Honeypot field filled in (after trimming)
    pub fn is_spam(&self) -> bool {
        !self.honeypot.trim().is_empty()
    }

    pub fn locale(&self) -> Locale {
        self.content.locale
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    /// A submission that passes every rule
    pub fn submission_json() -> Value {
        json!({
            "locale": "en",
            "turnstileToken": "token_1234567890",
            "honeypot": "",
            "profile": {
                "legalName": "Alex Martin",
                "artistName": "Lumina Nova",
                "email": "alex@example.com",
                "phone": "",
                "city": "Paris",
                "country": "France",
                "projectType": "solo",
                "yearsActive": 4,
                "primaryGenre": "Melodic House",
                "secondaryGenres": ["Electronica"]
            },
            "socialLinks": {
                "instagram": "",
                "tiktok": "",
                "youtube": "https://youtube.com/@luminanova",
                "x": "",
                "website": ""
            },
            "streamingLinks": {
                "spotify": "https://open.spotify.com/artist/example",
                "appleMusic": "",
                "soundCloud": "",
                "deezer": "",
                "beatport": ""
            },
            "releaseHistory": {
                "notableReleases": ["Aurora Echo"],
                "releaseSummary": "Released one EP and two singles with independent promo support."
            },
            "audienceAnalytics": {
                "monthlyListeners": 12000,
                "totalFollowers": 9000,
                "averageStreamsPerRelease": 46000,
                "topMarkets": ["France", "Germany"]
            },
            "budgetAndResources": {
                "monthlyMarketingBudgetEur": 1200,
                "productionBudgetPerTrackEur": 600,
                "teamDescription": "Manager plus freelance visual designer and mix engineer."
            },
            "planning": {
                "releaseFrequency": "One single every 6 weeks",
                "roadmap90Days": "Two singles ready, one live session planned, and collab outreach in progress."
            },
            "objectives": {
                "goals12Months": "Reach 200k monthly listeners and build a consistent touring profile in Europe.",
                "whyNyvoro": "Nyvoro combines artistic direction and strategic release execution, which is exactly what this project needs."
            },
            "message": "I am ready to build a long-term project with a clear release and growth discipline.",
            "consent": true
        })
    }

    pub fn submission() -> JoinApplication {
        JoinApplication::parse(submission_json()).expect("fixture must be valid")
    }
}
