//! Notification e-mail rendering
//!
//! Both messages carry a plain-text part and an HTML part built from the
//! same rows. Every interpolated value is escaped in the HTML part.

use chrono::{DateTime, SecondsFormat, Utc};
use nyvoro_common::application::ApplicationContent;

use crate::links::ProfileLinks;
use crate::pages::escape_html;

const NOT_AVAILABLE: &str = "n/a";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

struct Row {
    label: &'static str,
    text: String,
    /// Pre-escaped HTML, when the cell is more than plain text
    html: Option<String>,
}

impl Row {
    fn plain(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            text: value.into(),
            html: None,
        }
    }

    fn multiline(label: &'static str, value: &str) -> Self {
        Self {
            label,
            text: value.to_string(),
            html: Some(escape_html(value).replace("\r\n", "<br />").replace('\n', "<br />")),
        }
    }

    fn link(label: &'static str, url: Option<&str>, caption: Option<&str>) -> Self {
        match url.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Self {
                label,
                text: url.to_string(),
                html: Some(format!(
                    r#"<a href="{}">{}</a>"#,
                    escape_html(url),
                    escape_html(caption.unwrap_or(url))
                )),
            },
            None => Self::plain(label, NOT_AVAILABLE),
        }
    }

    fn html(&self) -> String {
        self.html.clone().unwrap_or_else(|| escape_html(&self.text))
    }
}

struct Section {
    title: &'static str,
    rows: Vec<Row>,
}

fn optional_text(value: Option<&str>) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

fn list(values: &[String]) -> String {
    let items: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
    if items.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        items.join(", ")
    }
}

/// en-US style grouping, at most two fraction digits
fn number(value: Option<f64>) -> String {
    let Some(value) = value else {
        return NOT_AVAILABLE.to_string();
    };

    let rounded = (value * 100.0).round() / 100.0;
    let whole = rounded.trunc() as i64;
    let cents = ((rounded - rounded.trunc()).abs() * 100.0).round() as i64;

    let digits = whole.abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if whole < 0 {
        grouped.insert(0, '-');
    }

    match cents {
        0 => grouped,
        c if c % 10 == 0 => format!("{}.{}", grouped, c / 10),
        c => format!("{}.{:02}", grouped, c),
    }
}

fn money(value: Option<f64>) -> String {
    match value {
        Some(_) => format!("EUR {}", number(value)),
        None => NOT_AVAILABLE.to_string(),
    }
}

fn build_sections(
    application_id: &str,
    payload: &ApplicationContent,
    links: &ProfileLinks,
    submitted_at: &str,
) -> Vec<Section> {
    let p = &payload.profile;
    let social = &payload.social_links;
    let streaming = &payload.streaming_links;
    let audience = &payload.audience_analytics;
    let budget = &payload.budget_and_resources;

    vec![
        Section {
            title: "Submission",
            rows: vec![
                Row::plain("Application ID", application_id),
                Row::plain("Submitted at (UTC)", submitted_at),
                Row::plain("Locale", payload.locale.as_str().to_uppercase()),
                Row::plain("Consent", if payload.consent { "Yes" } else { "No" }),
                Row::link("Public profile link", Some(&links.view_url), Some("Open public profile")),
                Row::link("Edit profile link", Some(&links.edit_url), Some("Open editable profile")),
            ],
        },
        Section {
            title: "Profile",
            rows: vec![
                Row::plain("Artist name", p.artist_name.as_str()),
                Row::plain("Legal name", p.legal_name.as_str()),
                Row::plain("Email", p.email.as_str()),
                Row::plain("Phone", optional_text(p.phone.as_deref())),
                Row::plain("City", p.city.as_str()),
                Row::plain("Country", p.country.as_str()),
                Row::plain("Project type", p.project_type.label()),
                Row::plain("Years active", p.years_active.to_string()),
                Row::plain("Primary genre", p.primary_genre.as_str()),
                Row::plain("Secondary genres", list(&p.secondary_genres)),
            ],
        },
        Section {
            title: "Social links",
            rows: vec![
                Row::link("Instagram", social.instagram.as_deref(), None),
                Row::link("TikTok", social.tiktok.as_deref(), None),
                Row::link("YouTube", social.youtube.as_deref(), None),
                Row::link("X", social.x.as_deref(), None),
                Row::link("Website", social.website.as_deref(), None),
            ],
        },
        Section {
            title: "Streaming links",
            rows: vec![
                Row::link("Spotify", streaming.spotify.as_deref(), None),
                Row::link("Apple Music", streaming.apple_music.as_deref(), None),
                Row::link("SoundCloud", streaming.sound_cloud.as_deref(), None),
                Row::link("Deezer", streaming.deezer.as_deref(), None),
                Row::link("Beatport", streaming.beatport.as_deref(), None),
            ],
        },
        Section {
            title: "Release history",
            rows: vec![
                Row::plain("Notable releases", list(&payload.release_history.notable_releases)),
                Row::multiline("Release summary", &payload.release_history.release_summary),
            ],
        },
        Section {
            title: "Audience analytics",
            rows: vec![
                Row::plain("Monthly listeners", number(audience.monthly_listeners)),
                Row::plain("Total followers", number(audience.total_followers)),
                Row::plain("Avg streams/release", number(audience.average_streams_per_release)),
                Row::plain("Top markets", list(&audience.top_markets)),
            ],
        },
        Section {
            title: "Budget and resources",
            rows: vec![
                Row::plain("Monthly marketing budget", money(budget.monthly_marketing_budget_eur)),
                Row::plain("Production budget / track", money(budget.production_budget_per_track_eur)),
                Row::multiline("Team description", &budget.team_description),
            ],
        },
        Section {
            title: "Planning and objectives",
            rows: vec![
                Row::plain("Release frequency", payload.planning.release_frequency.as_str()),
                Row::multiline("Roadmap (90 days)", &payload.planning.roadmap_90_days),
                Row::multiline("Goals (12 months)", &payload.objectives.goals_12_months),
                Row::multiline("Why Nyvoro", &payload.objectives.why_nyvoro),
                Row::multiline("Additional message", &payload.message),
            ],
        },
    ]
}

fn render_text_section(section: &Section) -> String {
    let rows: Vec<String> = section
        .rows
        .iter()
        .map(|row| format!("- {}: {}", row.label, row.text))
        .collect();
    format!("{}\n{}", section.title, rows.join("\n"))
}

fn render_html_section(section: &Section) -> String {
    let rows: String = section
        .rows
        .iter()
        .map(|row| {
            format!(
                r#"<tr><td style="padding:8px 14px 8px 0;width:220px;vertical-align:top;color:#6b7280;font-size:12px;font-weight:700;text-transform:uppercase;">{}</td><td style="padding:8px 0;color:#111827;font-size:14px;line-height:1.55;">{}</td></tr>"#,
                escape_html(row.label),
                row.html()
            )
        })
        .collect();

    format!(
        r#"<h2 style="margin:24px 0 8px 0;color:#0f172a;font-size:16px;">{}</h2><table role="presentation" width="100%" cellpadding="0" cellspacing="0">{}</table>"#,
        escape_html(section.title),
        rows
    )
}

fn render_document(locale: &str, subject: &str, logo_url: &str, heading: &str, body: &str) -> String {
    let logo = match logo_url.trim() {
        "" => String::new(),
        url => format!(
            r#"<img src="{}" alt="Nyvoro Records" width="36" height="36" style="display:block;border:0;border-radius:8px;" />"#,
            escape_html(url)
        ),
    };

    format!(
        r#"<!doctype html>
<html lang="{locale}">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width,initial-scale=1" />
    <title>{subject}</title>
  </head>
  <body style="margin:0;padding:24px;background:#f3f4f6;font-family:Arial,Helvetica,sans-serif;">
    <div style="max-width:680px;margin:0 auto;background:#ffffff;border-radius:14px;padding:28px;">
      {logo}
      {heading}
      {body}
      <p style="margin-top:28px;color:#6b7280;font-size:12px;">Sent by Nyvoro application backend.</p>
    </div>
  </body>
</html>"#,
        locale = escape_html(locale),
        subject = escape_html(subject),
        logo = logo,
        heading = heading,
        body = body,
    )
}

fn render_actions(links: &ProfileLinks, view_caption: &str, edit_caption: &str) -> String {
    format!(
        r#"<p><a href="{}" style="display:inline-block;padding:10px 14px;background:#0b5fff;color:#ffffff;font-size:13px;font-weight:700;text-decoration:none;border-radius:8px;">{}</a> <a href="{}" style="display:inline-block;padding:10px 14px;color:#0f172a;font-size:13px;font-weight:700;text-decoration:none;border-radius:8px;border:1px solid #b8caef;">{}</a></p>"#,
        escape_html(&links.view_url),
        escape_html(view_caption),
        escape_html(&links.edit_url),
        escape_html(edit_caption)
    )
}

fn format_submitted_at(submitted_at: DateTime<Utc>) -> String {
    submitted_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Internal notification sent to the label
pub fn build_application_notification_email(
    application_id: &str,
    payload: &ApplicationContent,
    links: &ProfileLinks,
    logo_url: &str,
    submitted_at: DateTime<Utc>,
) -> NotificationEmail {
    let artist = &payload.profile.artist_name;
    let subject = format!("[Nyvoro] New application - {}", artist);
    let sections = build_sections(application_id, payload, links, &format_submitted_at(submitted_at));

    let mut text_parts = vec![
        "NYVORO - NEW ARTIST APPLICATION".to_string(),
        format!("Reply-to: {}", payload.profile.email),
        format!("Public profile: {}", links.view_url),
        format!("Edit profile: {}", links.edit_url),
    ];
    text_parts.extend(sections.iter().map(render_text_section));

    let heading = format!(
        r#"<h1 style="margin:12px 0 4px 0;font-size:22px;color:#0f172a;">New artist application</h1><p style="margin:0;color:#374151;">{} submitted a new form. Reply-to: <a href="mailto:{}">{}</a></p>"#,
        escape_html(artist),
        escape_html(&payload.profile.email),
        escape_html(&payload.profile.email)
    );
    let body = format!(
        "{}{}",
        render_actions(links, "Open profile", "Open edit access"),
        sections.iter().map(render_html_section).collect::<String>()
    );

    NotificationEmail {
        html: render_document(payload.locale.as_str(), &subject, logo_url, &heading, &body),
        text: text_parts.join("\n\n"),
        subject,
    }
}

/// Acknowledgement sent to the applicant, with their magic links
pub fn build_applicant_acknowledgement_email(
    application_id: &str,
    payload: &ApplicationContent,
    links: &ProfileLinks,
    logo_url: &str,
    submitted_at: DateTime<Utc>,
) -> NotificationEmail {
    let artist = &payload.profile.artist_name;
    let subject = format!("[Nyvoro] Application received - {}", artist);
    let submitted_at = format_submitted_at(submitted_at);

    let text = [
        format!("Hello {},", artist),
        String::new(),
        "We have received your application and our team will review it as soon as possible.".to_string(),
        String::new(),
        format!("Application ID: {}", application_id),
        format!("Submitted at (UTC): {}", submitted_at),
        format!("Public profile link: {}", links.view_url),
        format!("Edit profile link: {}", links.edit_url),
        String::new(),
        "You can update your profile anytime using the edit link above.".to_string(),
        String::new(),
        "Nyvoro Records".to_string(),
    ]
    .join("\n");

    let heading = format!(
        r#"<h1 style="margin:12px 0 4px 0;font-size:22px;color:#0f172a;">Application received</h1><p style="margin:0;color:#374151;">Thank you {}. We will get back to you shortly.</p>"#,
        escape_html(artist)
    );
    let summary = Section {
        title: "Your submission",
        rows: vec![
            Row::plain("Application ID", application_id),
            Row::plain("Submitted at (UTC)", submitted_at),
            Row::link("Public profile link", Some(&links.view_url), None),
            Row::link("Edit profile link", Some(&links.edit_url), None),
        ],
    };
    let body = format!(
        "{}{}<p style=\"color:#374151;font-size:14px;\">You can update your profile anytime using the edit link above.</p>",
        render_actions(links, "View profile", "Edit profile"),
        render_html_section(&summary)
    );

    NotificationEmail {
        html: render_document(payload.locale.as_str(), &subject, logo_url, &heading, &body),
        text,
        subject,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nyvoro_common::application::JoinApplication;
    use serde_json::json;

    fn payload() -> ApplicationContent {
        let mut value = json!({
            "locale": "en",
            "turnstileToken": "token_1234567890",
            "profile": {
                "legalName": "Alex Martin",
                "artistName": "Lumina <Nova>",
                "email": "alex@example.com",
                "city": "Paris",
                "country": "France",
                "projectType": "dj",
                "yearsActive": 4,
                "primaryGenre": "Melodic House",
                "secondaryGenres": []
            },
            "socialLinks": { "youtube": "https://youtube.com/@luminanova" },
            "streamingLinks": {},
            "releaseHistory": {
                "notableReleases": ["Aurora Echo"],
                "releaseSummary": "Released one EP and two singles.\nIndependent promo."
            },
            "audienceAnalytics": {
                "monthlyListeners": 1234567.891,
                "topMarkets": ["France"]
            },
            "budgetAndResources": {
                "monthlyMarketingBudgetEur": 1200,
                "teamDescription": "Manager plus freelance designer."
            },
            "planning": {
                "releaseFrequency": "One single every 6 weeks",
                "roadmap90Days": "Two singles ready, one live session planned, and outreach."
            },
            "objectives": {
                "goals12Months": "Reach 200k monthly listeners and tour in Europe next year.",
                "whyNyvoro": "Nyvoro combines artistic direction and strategic release execution."
            },
            "message": "Ready to build a long-term project together.",
            "consent": true
        });
        value["honeypot"] = json!("");
        JoinApplication::parse(value).unwrap().content
    }

    fn links() -> ProfileLinks {
        ProfileLinks {
            view_url: "https://nyvoro.example/en/application-profile/app-1?token=v".to_string(),
            edit_url: "https://nyvoro.example/en/join?applicationId=app-1&editToken=e".to_string(),
        }
    }

    fn submitted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(number(None), "n/a");
        assert_eq!(number(Some(12000.0)), "12,000");
        assert_eq!(number(Some(1234567.891)), "1,234,567.89");
        assert_eq!(number(Some(0.5)), "0.5");
        assert_eq!(number(Some(999.0)), "999");
        assert_eq!(money(Some(1200.0)), "EUR 1,200");
        assert_eq!(money(None), "n/a");
    }

    #[test]
    fn test_notification_email() {
        let email = build_application_notification_email(
            "app-1",
            &payload(),
            &links(),
            "https://nyvoro.example/favicon.svg",
            submitted_at(),
        );

        assert_eq!(email.subject, "[Nyvoro] New application - Lumina <Nova>");
        assert!(email.text.contains("Application ID: app-1"));
        assert!(email.text.contains("- Phone: n/a"));
        assert!(email.text.contains("- Project type: DJ"));
        assert!(email.text.contains("- Monthly listeners: 1,234,567.89"));
        assert!(email.text.contains("- Submitted at (UTC): 2025-03-01T12:30:00.000Z"));
        assert!(email.text.contains(&links().edit_url));

        assert!(email.html.contains("Lumina &lt;Nova&gt;"));
        assert!(!email.html.contains("Lumina <Nova>"));
        assert!(email.html.contains("applicationId=app-1&amp;editToken=e"));
        assert!(email.html.contains("two singles.<br />Independent"));
        assert!(email.html.contains(r#"src="https://nyvoro.example/favicon.svg""#));
    }

    #[test]
    fn test_acknowledgement_email() {
        let email = build_applicant_acknowledgement_email(
            "app-1",
            &payload(),
            &links(),
            "",
            submitted_at(),
        );

        assert_eq!(email.subject, "[Nyvoro] Application received - Lumina <Nova>");
        assert!(email.text.starts_with("Hello Lumina <Nova>,"));
        assert!(email.text.contains("Public profile link: https://nyvoro.example/en/application-profile/app-1?token=v"));
        assert!(email.html.contains("Thank you Lumina &lt;Nova&gt;."));
        assert!(!email.html.contains("<img"));
    }
}
