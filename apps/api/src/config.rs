use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable is present but malformed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server-wide credential. A batch request may supply its own key instead.
    pub anthropic_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    /// Hard cap on contacts per batch, for cost control.
    pub max_contacts_per_batch: usize,
    /// Used when a batch request does not say how many contacts to process.
    pub default_contact_limit: usize,
    pub model_call_timeout: Duration,
    pub email_call_pause: Duration,
    /// Finished batches kept in memory for status, results and export.
    pub max_finished_batches: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_contacts_per_batch: env_or("MAX_CONTACTS_PER_BATCH", 10)?,
            default_contact_limit: env_or("DEFAULT_CONTACT_LIMIT", 5)?,
            model_call_timeout: Duration::from_secs(env_or("MODEL_CALL_TIMEOUT_SECS", 60)?),
            email_call_pause: Duration::from_millis(env_or("EMAIL_CALL_PAUSE_MS", 500)?),
            max_finished_batches: env_or("MAX_FINISHED_BATCHES", 100)?,
        };

        if config.max_contacts_per_batch == 0 {
            bail!("MAX_CONTACTS_PER_BATCH must be at least 1");
        }
        if config.max_finished_batches == 0 {
            bail!("MAX_FINISHED_BATCHES must be at least 1");
        }
        if config.model_call_timeout.is_zero() {
            bail!("MODEL_CALL_TIMEOUT_SECS must be at least 1");
        }

        Ok(config)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        None => Ok(default),
    }
}
