//! Configuration types.
//!
//! Everything is read from environment variables. `main` loads a `.env`
//! file first (if present) so local runs don't need exported vars.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default idle between processing passes.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default number of unread messages fetched per pass.
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Default inbox search query.
pub const DEFAULT_INBOX_QUERY: &str = "is:unread";

/// Agent loop configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Idle time between processing passes.
    pub poll_interval: Duration,
    /// Granularity at which the idle wait checks for a stop signal.
    pub stop_check_interval: Duration,
    /// How long `stop()` waits for the background loop to exit.
    pub stop_grace: Duration,
    /// Upper bound on a single classification call.
    pub extraction_timeout: Duration,
    /// Maximum messages fetched per pass.
    pub max_results: u32,
    /// Inbox search query for candidate messages.
    pub query: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            stop_check_interval: Duration::from_secs(1),
            stop_grace: Duration::from_secs(5),
            extraction_timeout: Duration::from_secs(30),
            max_results: DEFAULT_MAX_RESULTS,
            query: DEFAULT_INBOX_QUERY.to_string(),
        }
    }
}

impl AgentConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: Duration::from_secs(env_parse(
                "AGENT_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            stop_check_interval: defaults.stop_check_interval,
            stop_grace: Duration::from_secs(env_parse("AGENT_STOP_GRACE_SECS", 5)?),
            extraction_timeout: Duration::from_secs(env_parse(
                "AGENT_EXTRACTION_TIMEOUT_SECS",
                30,
            )?),
            max_results: env_parse("AGENT_MAX_RESULTS", DEFAULT_MAX_RESULTS)?,
            query: std::env::var("AGENT_INBOX_QUERY").unwrap_or(defaults.query),
        })
    }
}

/// Control-surface HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("AGENT_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into());
        let bind_addr = raw.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
            key: "AGENT_BIND_ADDR".into(),
            message: format!("{e}"),
        })?;
        Ok(Self { bind_addr })
    }
}

/// Extraction service (OpenAI-compatible chat completions) configuration.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl ExtractionConfig {
    /// Requires `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: SecretString::from(require_env("OPENAI_API_KEY")?),
            model: std::env::var("AGENT_EXTRACTION_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            request_timeout: Duration::from_secs(env_parse(
                "AGENT_EXTRACTION_TIMEOUT_SECS",
                30,
            )?),
        })
    }
}

/// Gmail REST API configuration.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub access_token: SecretString,
    pub api_base: String,
}

impl GmailConfig {
    /// Requires `GMAIL_ACCESS_TOKEN`. Read lazily at agent start.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_token: SecretString::from(require_env("GMAIL_ACCESS_TOKEN")?),
            api_base: std::env::var("GMAIL_API_BASE").unwrap_or_else(|_| {
                "https://gmail.googleapis.com/gmail/v1/users/me".to_string()
            }),
        })
    }
}

/// Google Calendar REST API configuration.
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub access_token: SecretString,
    pub calendar_id: String,
    pub api_base: String,
    /// Time zone attached to event start/end.
    pub time_zone: String,
}

impl CalendarConfig {
    /// Requires `GOOGLE_CALENDAR_ACCESS_TOKEN` and `CALENDAR_ID`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_token: SecretString::from(require_env("GOOGLE_CALENDAR_ACCESS_TOKEN")?),
            calendar_id: require_env("CALENDAR_ID")?,
            api_base: std::env::var("GOOGLE_CALENDAR_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string()),
            time_zone: std::env::var("CALENDAR_TIME_ZONE").unwrap_or_else(|_| "UTC".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
