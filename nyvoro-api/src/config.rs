//! Service configuration
//!
//! Every setting comes from an environment variable (or the matching
//! command-line flag). The parsed [`AppConfig`] is immutable and shared by
//! `Arc` with every component that needs it.

use clap::{Parser, ValueEnum};
use nyvoro_common::application::is_valid_email;
use nyvoro_common::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";
const PRODUCTION_WEB_BASE_URL: &str = "https://www.nyvoro-records.com";
const DEVELOPMENT_WEB_BASE_URL: &str = "http://localhost:5173";
const PLACEHOLDER_SALT: &str = "change-this-in-production";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw settings as read from the environment / command line
#[derive(Parser, Debug, Clone)]
#[command(name = "nyvoro-api")]
#[command(about = "Nyvoro Records application intake API")]
#[command(version)]
pub struct ConfigArgs {
    #[arg(long, env = "NODE_ENV", value_enum, default_value = "development")]
    pub node_env: Environment,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "4000", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Comma-separated list of origins allowed to call the API
    #[arg(long, env = "API_ALLOWED_ORIGINS", default_value = "http://localhost:5173,http://localhost:4173")]
    pub allowed_origins: String,

    /// SQLite file path, or `:memory:`
    #[arg(long, env = "DATABASE_URL", default_value = "data/nyvoro.db")]
    pub database_url: String,

    #[arg(long, env = "TURNSTILE_SECRET_KEY", default_value = "turnstile_secret_placeholder")]
    pub turnstile_secret_key: String,

    #[arg(long, env = "TURNSTILE_VERIFY_URL", default_value = DEFAULT_TURNSTILE_VERIFY_URL)]
    pub turnstile_verify_url: String,

    /// Skip captcha verification (defaults to on only in the test environment)
    #[arg(long, env = "TURNSTILE_BYPASS")]
    pub turnstile_bypass: Option<String>,

    #[arg(long, env = "RATE_LIMIT_WINDOW_MS", default_value = "900000", value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_limit_window_ms: u64,

    #[arg(long, env = "RATE_LIMIT_MAX", default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit_max: u32,

    /// Key throttling on `X-Forwarded-For` instead of the socket peer
    #[arg(long, env = "TRUST_PROXY")]
    pub trust_proxy: Option<String>,

    #[arg(long, env = "SMTP_HOST", default_value = "smtp.example.com")]
    pub smtp_host: String,

    #[arg(long, env = "SMTP_PORT", default_value = "587", value_parser = clap::value_parser!(u16).range(1..))]
    pub smtp_port: u16,

    /// Implicit TLS instead of STARTTLS
    #[arg(long, env = "SMTP_SECURE")]
    pub smtp_secure: Option<String>,

    #[arg(long, env = "SMTP_USER", default_value = "placeholder_user")]
    pub smtp_user: String,

    #[arg(long, env = "SMTP_PASS", default_value = "placeholder_password", hide_env_values = true)]
    pub smtp_pass: String,

    #[arg(long, env = "SMTP_FROM", default_value = "no-reply@nyvoro-records.com")]
    pub smtp_from: String,

    #[arg(long, env = "APPLICATION_RECIPIENT_EMAIL", default_value = "demo@nyvoro-records.com")]
    pub application_recipient_email: String,

    #[arg(long, env = "MAIL_LOGO_URL")]
    pub mail_logo_url: Option<String>,

    #[arg(long, env = "IP_HASH_SALT", default_value = PLACEHOLDER_SALT, hide_env_values = true)]
    pub ip_hash_salt: String,

    /// Salt for magic-link token hashes (defaults to the IP salt)
    #[arg(long, env = "MAGIC_LINK_SALT", hide_env_values = true)]
    pub magic_link_salt: Option<String>,

    #[arg(long, env = "PUBLIC_WEB_BASE_URL")]
    pub public_web_base_url: Option<String>,

    /// Directory holding the built website
    #[arg(long, env = "WEB_DIST_DIR", default_value = "web/dist")]
    pub web_dist_dir: PathBuf,

    #[arg(long, env = "SERVE_WEB_DIST")]
    pub serve_web_dist: Option<String>,

    /// Timeout for captcha and SMTP calls
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct TurnstileConfig {
    pub secret_key: String,
    pub verify_url: String,
    pub bypass: bool,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub recipient_email: String,
    pub logo_url: String,
}

/// Validated service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub database_url: String,
    pub turnstile: TurnstileConfig,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    pub trust_proxy: bool,
    pub smtp: SmtpConfig,
    pub ip_hash_salt: String,
    pub magic_link_salt: String,
    pub public_web_base_url: String,
    pub web_dist_dir: PathBuf,
    pub serve_web_dist: bool,
    pub http_timeout: Duration,
}

/// `1|true|yes|on` (any case) is true, anything else false, absent is `default`
pub fn parse_boolean(value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(raw) => matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
    }
}

/// Strip trailing slashes
pub fn normalize_base_url(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

fn require_url(key: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| Error::Config(format!("{} is not a valid URL ({}): {}", key, e, value)))
}

fn require_email(key: &str, value: &str) -> Result<()> {
    if is_valid_email(value) {
        Ok(())
    } else {
        Err(Error::Config(format!("{} is not a valid e-mail address: {}", key, value)))
    }
}

impl AppConfig {
    /// Read configuration from the process environment and arguments
    pub fn from_env() -> Result<Self> {
        let args = ConfigArgs::try_parse().map_err(|e| Error::Config(e.to_string()))?;
        Self::from_args(args)
    }

    /// Apply defaults and validation to parsed arguments
    pub fn from_args(args: ConfigArgs) -> Result<Self> {
        let environment = args.node_env;

        let public_web_base_url = match &args.public_web_base_url {
            Some(url) => {
                require_url("PUBLIC_WEB_BASE_URL", url)?;
                normalize_base_url(url)
            }
            None if environment == Environment::Production => PRODUCTION_WEB_BASE_URL.to_string(),
            None => DEVELOPMENT_WEB_BASE_URL.to_string(),
        };

        require_url("TURNSTILE_VERIFY_URL", &args.turnstile_verify_url)?;
        require_email("SMTP_FROM", &args.smtp_from)?;
        require_email("APPLICATION_RECIPIENT_EMAIL", &args.application_recipient_email)?;

        let logo_url = match args.mail_logo_url {
            Some(url) => {
                require_url("MAIL_LOGO_URL", &url)?;
                url
            }
            None => format!("{}/favicon.svg", public_web_base_url),
        };

        let turnstile_bypass = parse_boolean(args.turnstile_bypass.as_deref(), environment == Environment::Test);
        if turnstile_bypass && environment == Environment::Production {
            return Err(Error::Config(
                "TURNSTILE_BYPASS cannot be enabled in production".to_string(),
            ));
        }

        let allowed_origins: Vec<String> = args
            .allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let magic_link_salt = args
            .magic_link_salt
            .filter(|salt| !salt.is_empty())
            .unwrap_or_else(|| args.ip_hash_salt.clone());

        if environment == Environment::Production && args.ip_hash_salt == PLACEHOLDER_SALT {
            warn!("IP_HASH_SALT is still the placeholder value; set a secret salt in production");
        }

        Ok(Self {
            environment,
            port: args.port,
            allowed_origins,
            database_url: args.database_url,
            turnstile: TurnstileConfig {
                secret_key: args.turnstile_secret_key,
                verify_url: args.turnstile_verify_url,
                bypass: turnstile_bypass,
            },
            rate_limit_window: Duration::from_millis(args.rate_limit_window_ms),
            rate_limit_max: args.rate_limit_max,
            trust_proxy: parse_boolean(args.trust_proxy.as_deref(), false),
            smtp: SmtpConfig {
                host: args.smtp_host,
                port: args.smtp_port,
                secure: parse_boolean(args.smtp_secure.as_deref(), false),
                user: args.smtp_user,
                pass: args.smtp_pass,
                from: args.smtp_from,
                recipient_email: args.application_recipient_email,
                logo_url,
            },
            ip_hash_salt: args.ip_hash_salt,
            magic_link_salt,
            public_web_base_url,
            web_dist_dir: args.web_dist_dir,
            serve_web_dist: parse_boolean(
                args.serve_web_dist.as_deref(),
                environment == Environment::Production,
            ),
            http_timeout: Duration::from_secs(args.http_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<AppConfig> {
        let mut argv = vec!["nyvoro-api"];
        argv.extend_from_slice(extra);
        AppConfig::from_args(ConfigArgs::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_parse_boolean() {
        assert!(parse_boolean(Some("1"), false));
        assert!(parse_boolean(Some("TRUE"), false));
        assert!(parse_boolean(Some("Yes"), false));
        assert!(parse_boolean(Some("on"), false));
        assert!(!parse_boolean(Some("off"), true));
        assert!(!parse_boolean(Some(""), true));
        assert!(parse_boolean(None, true));
        assert!(!parse_boolean(None, false));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://a.example///"), "https://a.example");
        assert_eq!(normalize_base_url("https://a.example"), "https://a.example");
    }

    #[test]
    fn test_test_environment_defaults() {
        let config = parse(&["--node-env", "test", "--magic-link-salt", ""]).unwrap();
        assert!(config.turnstile.bypass);
        assert!(!config.serve_web_dist);
        assert_eq!(config.public_web_base_url, DEVELOPMENT_WEB_BASE_URL);
        assert_eq!(config.smtp.logo_url, "http://localhost:5173/favicon.svg");
        assert_eq!(config.magic_link_salt, config.ip_hash_salt);
        assert!(!config.trust_proxy);
    }

    #[test]
    fn test_trust_proxy_flag() {
        assert!(parse(&["--trust-proxy", "yes"]).unwrap().trust_proxy);
        assert!(!parse(&["--trust-proxy", "off"]).unwrap().trust_proxy);
    }

    #[test]
    fn test_magic_link_salt_override() {
        let config = parse(&["--ip-hash-salt", "ip-salt", "--magic-link-salt", "link-salt"]).unwrap();
        assert_eq!(config.ip_hash_salt, "ip-salt");
        assert_eq!(config.magic_link_salt, "link-salt");
    }

    #[test]
    fn test_origins_are_trimmed() {
        let config = parse(&["--allowed-origins", " https://a.example , https://b.example,"]).unwrap();
        assert_eq!(config.allowed_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn test_production_refuses_captcha_bypass() {
        let err = parse(&["--node-env", "production", "--turnstile-bypass", "true"]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_production_defaults() {
        let config = parse(&[
            "--node-env",
            "production",
            "--turnstile-bypass",
            "no",
            "--serve-web-dist",
            "",
        ])
        .unwrap();
        assert!(!config.turnstile.bypass);
        assert!(!config.serve_web_dist);

        let config = parse(&["--node-env", "production", "--turnstile-bypass", "0"]).unwrap();
        assert!(config.serve_web_dist);
    }

    #[test]
    fn test_public_base_url_trailing_slash_stripped() {
        let config = parse(&["--public-web-base-url", "https://nyvoro.example/"]).unwrap();
        assert_eq!(config.public_web_base_url, "https://nyvoro.example");
        assert_eq!(config.smtp.logo_url, "https://nyvoro.example/favicon.svg");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(parse(&["--smtp-from", "not-an-email"]).is_err());
        assert!(parse(&["--public-web-base-url", "nope"]).is_err());
        assert!(ConfigArgs::try_parse_from(["nyvoro-api", "--rate-limit-max", "0"]).is_err());
    }
}
