use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Process-level configuration loaded from environment variables.
/// Fails if `ANTHROPIC_API_KEY` is missing; every other value has a default.
#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    /// Voice capture is disabled when absent.
    pub openai_api_key: Option<String>,
    /// Interview records go to `MemoryStore` when absent.
    pub database_url: Option<String>,
    pub rust_log: String,
    pub session: SessionSettings,
}

/// Tunables for a single interview session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Countdown per question.
    pub answer_time_limit_secs: u32,
    pub generation_max_attempts: u32,
    pub generation_retry_delay: Duration,
    /// Upper bound on a single question-generation call.
    pub generation_timeout: Duration,
    pub evaluation_max_attempts: u32,
    pub evaluation_retry_delay: Duration,
    pub evaluation_timeout: Duration,
    /// Answer text longer than this (in chars) is truncated before evaluation.
    pub answer_char_limit: usize,
    pub code_char_limit: usize,
    /// Audio chunks buffered between interim transcripts. 0 disables interim transcripts.
    pub transcript_interim_chunks: usize,
    pub completion_model: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            answer_time_limit_secs: 300,
            generation_max_attempts: 3,
            generation_retry_delay: Duration::from_millis(2000),
            generation_timeout: Duration::from_secs(60),
            evaluation_max_attempts: 3,
            evaluation_retry_delay: Duration::from_millis(2000),
            evaluation_timeout: Duration::from_secs(60),
            answer_char_limit: 200,
            code_char_limit: 300,
            transcript_interim_chunks: 8,
            completion_model: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            openai_api_key: optional_env("OPENAI_API_KEY"),
            database_url: optional_env("DATABASE_URL"),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            session: SessionSettings::from_env()?,
        })
    }
}

impl SessionSettings {
    pub fn from_env() -> Result<Self> {
        let defaults = SessionSettings::default();

        Ok(SessionSettings {
            answer_time_limit_secs: parse_env(
                "ANSWER_TIME_LIMIT_SECS",
                defaults.answer_time_limit_secs,
            )?,
            generation_max_attempts: parse_env(
                "GENERATION_MAX_ATTEMPTS",
                defaults.generation_max_attempts,
            )?
            .max(1),
            generation_retry_delay: Duration::from_millis(parse_env(
                "GENERATION_RETRY_DELAY_MS",
                defaults.generation_retry_delay.as_millis() as u64,
            )?),
            generation_timeout: Duration::from_secs(parse_env(
                "GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout.as_secs(),
            )?),
            evaluation_max_attempts: parse_env(
                "EVALUATION_MAX_ATTEMPTS",
                defaults.evaluation_max_attempts,
            )?
            .max(1),
            evaluation_retry_delay: Duration::from_millis(parse_env(
                "EVALUATION_RETRY_DELAY_MS",
                defaults.evaluation_retry_delay.as_millis() as u64,
            )?),
            evaluation_timeout: Duration::from_secs(parse_env(
                "EVALUATION_TIMEOUT_SECS",
                defaults.evaluation_timeout.as_secs(),
            )?),
            answer_char_limit: parse_env("ANSWER_CHAR_LIMIT", defaults.answer_char_limit)?,
            code_char_limit: parse_env("CODE_CHAR_LIMIT", defaults.code_char_limit)?,
            transcript_interim_chunks: parse_env(
                "TRANSCRIPT_INTERIM_CHUNKS",
                defaults.transcript_interim_chunks,
            )?,
            completion_model: optional_env("COMPLETION_MODEL"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
