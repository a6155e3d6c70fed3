//! Server-rendered HTML for browsers hitting the API directly
//!
//! Two pages: the landing page at `/` (when the website bundle is not
//! served) and the error page shown instead of a JSON error body when the
//! request accepts `text/html`.

use axum::http::{HeaderMap, StatusCode};

use crate::config::Environment;

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// True when the `Accept` header mentions `text/html`
pub fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.to_lowercase().contains("text/html"))
        .unwrap_or(false)
}

const STYLE: &str = r#"
      :root {
        --bg: #e9e7e2;
        --surface: #f7f5f1;
        --ink: #101215;
        --muted: #5f656d;
        --line: #d3cfc8;
        --accent: #13171d;
      }
      @media (prefers-color-scheme: dark) {
        :root {
          --bg: #0f141d;
          --surface: #161d29;
          --ink: #edf1f7;
          --muted: #a8b1bf;
          --line: #2b3443;
          --accent: #f0f4fb;
        }
      }
      * { box-sizing: border-box; }
      body {
        margin: 0;
        min-height: 100vh;
        color: var(--ink);
        font-family: 'Sora', system-ui, sans-serif;
        background: var(--bg);
      }
      main { max-width: 960px; margin: 0 auto; padding: 48px 20px; }
      .card {
        background: var(--surface);
        border: 1px solid var(--line);
        border-radius: 18px;
        padding: 28px;
        margin-bottom: 20px;
      }
      .eyebrow { text-transform: uppercase; letter-spacing: 0.08em; font-size: 12px; color: var(--muted); }
      .error-code { font-size: 72px; font-weight: 700; margin: 0; }
      .endpoint { display: flex; justify-content: space-between; gap: 12px; padding: 8px 0; border-top: 1px solid var(--line); }
      .hero-actions { display: flex; gap: 12px; flex-wrap: wrap; margin-top: 20px; }
      .action { padding: 10px 16px; border-radius: 999px; text-decoration: none; border: 1px solid var(--accent); color: var(--ink); }
      .action.primary { background: var(--accent); color: var(--bg); }
      footer { color: var(--muted); font-size: 12px; }
"#;

fn render_shell(title: &str, description: &str, environment: Environment, content: &str) -> String {
    format!(
        r##"<!doctype html>
<html lang="en">
  <head>
    <meta charset="UTF-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1.0" />
    <meta name="description" content="{description}" />
    <meta name="theme-color" content="#101215" />
    <title>{title}</title>
    <style>{style}</style>
  </head>
  <body>
    <main>
{content}
      <footer>Nyvoro Records API &middot; environment: {environment}</footer>
    </main>
  </body>
</html>"##,
        description = escape_html(description),
        title = escape_html(title),
        style = STYLE,
        content = content,
        environment = escape_html(environment.as_str()),
    )
}

/// Landing page listing the public endpoints
pub fn render_home_page(environment: Environment) -> String {
    let content = r#"
      <section class="card">
        <p class="eyebrow">Nyvoro Records &middot; Public API</p>
        <h1>Application intake API</h1>
        <p>JSON endpoints for the join form and magic-link profile access.</p>
        <div class="hero-actions">
          <a class="action primary" href="/api/v1/health">Open /api/v1/health</a>
          <a class="action" href="https://www.nyvoro-records.com" target="_blank" rel="noreferrer">Visit nyvoro-records.com</a>
        </div>
      </section>
      <section class="card">
        <h2>Endpoints</h2>
        <div class="endpoint"><span>Health check</span><code>GET /api/v1/health</code></div>
        <div class="endpoint"><span>Join application intake</span><code>POST /api/v1/applications</code></div>
        <div class="endpoint"><span>Profile access via magic link</span><code>GET /api/v1/applications/:applicationId/profile?token=...</code></div>
        <div class="endpoint"><span>Profile edit via edit link</span><code>PUT /api/v1/applications/:applicationId/profile?token=...</code></div>
      </section>
      <section class="card">
        <h2>Behaviour</h2>
        <p>Turnstile verification before any persistence. Honeypot and per-IP rate limiting against automated abuse.</p>
        <p>Unknown routes return <code>404</code>, disallowed origins <code>403</code>, failures <code>500</code>. Browsers get this styled page, API clients keep JSON.</p>
      </section>"#;

    render_shell(
        "Nyvoro Records API",
        "Nyvoro Records public API gateway with operational health and endpoint overview.",
        environment,
        content,
    )
}

fn error_copy(status: StatusCode) -> (String, &'static str) {
    let (title, description) = match status.as_u16() {
        400 => ("Bad request.", "The request payload or parameters are invalid."),
        401 => ("Unauthorized request.", "Authentication is required to access this resource."),
        403 => (
            "Access forbidden.",
            "The request origin or permissions are not allowed for this route.",
        ),
        404 => ("Route not found.", "The requested endpoint does not exist on this API."),
        429 => (
            "Rate limit reached.",
            "Too many requests were detected in a short period. Please retry later.",
        ),
        500 => (
            "Unexpected server error.",
            "The API encountered an internal failure while processing the request.",
        ),
        503 => ("Service unavailable.", "The service is temporarily unavailable while recovering."),
        code => {
            return (
                format!("HTTP {} response.", code),
                "The request completed with an unexpected HTTP error status.",
            )
        }
    };
    (title.to_string(), description)
}

/// Error page for a 4xx/5xx status
///
/// Statuses outside 400..=599 render as 500.
pub fn render_error_page(
    status: StatusCode,
    environment: Environment,
    message: Option<&str>,
    request_path: Option<&str>,
) -> String {
    let status = if status.is_client_error() || status.is_server_error() {
        status
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let code = status.as_u16();
    let (title, description) = error_copy(status);

    let path_markup = request_path
        .map(|path| {
            format!(
                r#"<p class="error-detail">Requested path: <code>{}</code></p>"#,
                escape_html(path)
            )
        })
        .unwrap_or_default();

    let content = format!(
        r#"
      <section class="card">
        <p class="error-code" aria-hidden="true">{code}</p>
        <p class="eyebrow">Nyvoro Records API &middot; Error {code}</p>
        <h1>{title}</h1>
        <p class="error-description">{description}</p>
        {path_markup}
        <div class="hero-actions">
          <a class="action primary" href="/">Back to API home</a>
          <a class="action" href="/api/v1/health">Open health endpoint</a>
        </div>
      </section>"#,
        code = code,
        title = escape_html(&title),
        description = escape_html(message.unwrap_or(description)),
        path_markup = path_markup,
    );

    render_shell(
        &format!("Nyvoro Records API \u{b7} {}", code),
        &format!("Nyvoro Records API error page for status code {}.", code),
        environment,
        &content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_wants_html() {
        let mut headers = HeaderMap::new();
        assert!(!wants_html(&headers));
        headers.insert("accept", HeaderValue::from_static("application/json"));
        assert!(!wants_html(&headers));
        headers.insert("accept", HeaderValue::from_static("Text/HTML,application/xhtml+xml"));
        assert!(wants_html(&headers));
    }

    #[test]
    fn test_error_page_escapes_path_and_message() {
        let html = render_error_page(
            StatusCode::NOT_FOUND,
            Environment::Test,
            Some("Requested route does not exist."),
            Some("/nope?<script>"),
        );
        assert!(html.contains("Route not found."));
        assert!(html.contains("/nope?&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"href="/api/v1/health""#));
    }

    #[test]
    fn test_error_page_normalizes_status() {
        let html = render_error_page(StatusCode::OK, Environment::Development, None, None);
        assert!(html.contains("Error 500"));
        assert!(html.contains("The API encountered an internal failure"));
    }

    #[test]
    fn test_unlisted_status_has_generic_copy() {
        let html = render_error_page(StatusCode::IM_A_TEAPOT, Environment::Production, None, None);
        assert!(html.contains("HTTP 418 response."));
    }

    #[test]
    fn test_home_page_lists_endpoints() {
        let html = render_home_page(Environment::Production);
        assert!(html.contains("POST /api/v1/applications"));
        assert!(html.contains("environment: production"));
    }
}
