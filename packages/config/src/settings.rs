// ABOUTME: Runtime settings resolved from environment variables
// ABOUTME: Missing variables fall back to defaults; malformed numbers are rejected

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::constants::*;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Settings shared by the engine and the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    pub max_db_connections: u32,
    /// `None` leaves the generative strategy unconfigured
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: Option<String>,
    pub generation_timeout: Duration,
    pub public_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            max_db_connections: DEFAULT_MAX_DB_CONNECTIONS,
            anthropic_api_key: None,
            anthropic_model: None,
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings from an explicit map (used by tests and embedding callers)
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let settings = Settings {
            database_path: non_empty(PROPOSEKIT_DATABASE_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            max_db_connections: parse_positive(
                PROPOSEKIT_MAX_DB_CONNECTIONS,
                non_empty(PROPOSEKIT_MAX_DB_CONNECTIONS),
                defaults.max_db_connections,
            )?,
            anthropic_api_key: non_empty(ANTHROPIC_API_KEY),
            anthropic_model: non_empty(ANTHROPIC_MODEL),
            generation_timeout: Duration::from_secs(parse_positive(
                PROPOSEKIT_GENERATION_TIMEOUT_SECS,
                non_empty(PROPOSEKIT_GENERATION_TIMEOUT_SECS),
                DEFAULT_GENERATION_TIMEOUT_SECS,
            )?),
            public_base_url: non_empty(PROPOSEKIT_PUBLIC_BASE_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
        };

        if settings.anthropic_api_key.is_none() {
            info!("{} not set - proposals will use template content", ANTHROPIC_API_KEY);
        }
        debug!(
            "Loaded settings: database={}, timeout={}s",
            settings.database_path.display(),
            settings.generation_timeout.as_secs()
        );

        Ok(settings)
    }
}

/// Parse a count or duration; zero is rejected like any other malformed value
fn parse_positive<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
{
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}
