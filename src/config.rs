use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::agent::DEFAULT_MODEL;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 30 * 60;

/// Runtime settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ai_timeout: Duration,
    pub session_idle_ttl: Duration,
    pub ga_measurement_id: Option<String>,
    pub ga_api_secret: Option<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            ),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ai_timeout: parse_secs_or("AI_TIMEOUT_SECS", get("AI_TIMEOUT_SECS"), DEFAULT_AI_TIMEOUT_SECS),
            session_idle_ttl: parse_secs_or(
                "SESSION_IDLE_TTL_SECS",
                get("SESSION_IDLE_TTL_SECS"),
                DEFAULT_SESSION_IDLE_TTL_SECS,
            ),
            ga_measurement_id: get("GA_MEASUREMENT_ID"),
            ga_api_secret: get("GA_API_SECRET"),
            port: parse_or("PORT", get("PORT"), DEFAULT_PORT),
        }
    }

    /// Both GA4 values, when analytics forwarding is configured.
    pub fn measurement_protocol(&self) -> Option<(&str, &str)> {
        match (&self.ga_measurement_id, &self.ga_api_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {key}={raw:?}, using {default}");
            default
        }),
    }
}

/// A whole number of seconds; zero is rejected like any other invalid value.
fn parse_secs_or(key: &str, raw: Option<String>, default: u64) -> Duration {
    let secs = match parse_or(key, raw, default) {
        0 => {
            warn!("Ignoring {key}=0, using {default}");
            default
        }
        secs => secs,
    };
    Duration::from_secs(secs)
}
