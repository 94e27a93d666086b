//! Runtime configuration for the pipeline.
//!
//! Settings are read once at startup into an immutable [`Settings`] value that
//! is passed by reference to every component. Business logic never reads the
//! environment itself.

use std::time::Duration;

use thiserror::Error;

use crate::scheduler::PipelineVariant;

/// Environment variables that must be set for any invocation.
pub const REQUIRED_VARS: [&str; 5] = [
    "DATABASE_URL",
    "AI_SERVICE_URL",
    "DLQ_NAME",
    "WORKFLOW_ID",
    "SOURCE_EMAIL",
];

const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_QUEUE_NAME: &str = "companies";
const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more required environment variables are unset or empty.
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),

    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Pipeline settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Document store connection string (e.g. `sqlite://adforge.db`).
    pub database_url: String,
    /// Endpoint of the generation service.
    pub ai_service_url: String,
    /// Name of the dead-letter list.
    pub dead_letter_queue: String,
    /// Identifier of the downstream workflow.
    pub workflow_id: String,
    /// Sender address for email notifications.
    pub source_email: String,

    /// Redis connection URL for the queues and workflow trigger.
    pub redis_url: String,
    /// Name of the inbound list.
    pub queue_name: String,
    /// Maximum number of messages taken per invocation.
    pub batch_size: usize,
    /// Transport timeout for a single generation call.
    pub ai_request_timeout: Duration,
    /// Which pipeline flavour to run.
    pub variant: PipelineVariant,
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVars` naming every missing variable, or
    /// `ConfigError::InvalidValue` for an unparseable optional variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary key lookup.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .map(String::from)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnvVars(missing));
        }

        let required = |key: &str| get(key).unwrap_or_default();

        let batch_size = match get("BATCH_SIZE") {
            Some(val) => parse_env_value::<usize>(&val, "BATCH_SIZE")?,
            None => DEFAULT_BATCH_SIZE,
        };
        if batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "BATCH_SIZE".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }

        let timeout_secs = match get("AI_REQUEST_TIMEOUT_SECS") {
            Some(val) => parse_env_value::<u64>(&val, "AI_REQUEST_TIMEOUT_SECS")?,
            None => DEFAULT_AI_TIMEOUT_SECS,
        };

        let variant = match get("PIPELINE_VARIANT") {
            Some(val) => parse_env_value::<PipelineVariant>(&val, "PIPELINE_VARIANT")?,
            None => PipelineVariant::default(),
        };

        Ok(Self {
            database_url: required("DATABASE_URL"),
            ai_service_url: required("AI_SERVICE_URL"),
            dead_letter_queue: required("DLQ_NAME"),
            workflow_id: required("WORKFLOW_ID"),
            source_email: required("SOURCE_EMAIL"),
            redis_url: get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            queue_name: get("QUEUE_NAME").unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
            batch_size,
            ai_request_timeout: Duration::from_secs(timeout_secs),
            variant,
        })
    }

    /// Overrides the variant (CLI flag).
    pub fn with_variant(mut self, variant: PipelineVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Overrides the batch size (CLI flag).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Parses an environment variable value.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn complete_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "sqlite://adforge.db"),
            ("AI_SERVICE_URL", "http://localhost:8000/generate"),
            ("DLQ_NAME", "companies:dead_letter"),
            ("WORKFLOW_ID", "decision-maker"),
            ("SOURCE_EMAIL", "noreply@example.com"),
        ]
    }

    #[test]
    fn test_missing_vars_are_all_named() {
        let err = Settings::from_lookup(lookup_from(&[])).unwrap_err();

        match err {
            ConfigError::MissingEnvVars(missing) => {
                assert_eq!(missing, REQUIRED_VARS.map(String::from).to_vec());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let mut env = complete_env();
        env.retain(|(k, _)| *k != "WORKFLOW_ID");
        env.push(("WORKFLOW_ID", "  "));
        env.retain(|(k, _)| *k != "SOURCE_EMAIL");

        let err = Settings::from_lookup(lookup_from(&env)).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("WORKFLOW_ID"));
        assert!(rendered.contains("SOURCE_EMAIL"));
        assert!(!rendered.contains("DATABASE_URL"));
    }

    #[test]
    fn test_defaults_for_optional_values() {
        let settings = Settings::from_lookup(lookup_from(&complete_env())).unwrap();

        assert_eq!(settings.redis_url, "redis://localhost:6379");
        assert_eq!(settings.queue_name, "companies");
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.ai_request_timeout, Duration::from_secs(120));
        assert_eq!(settings.variant, PipelineVariant::Research);
        assert_eq!(settings.dead_letter_queue, "companies:dead_letter");
    }

    #[test]
    fn test_optional_overrides() {
        let mut env = complete_env();
        env.push(("BATCH_SIZE", "25"));
        env.push(("PIPELINE_VARIANT", "refresh"));
        env.push(("AI_REQUEST_TIMEOUT_SECS", "30"));

        let settings = Settings::from_lookup(lookup_from(&env)).unwrap();
        assert_eq!(settings.batch_size, 25);
        assert_eq!(settings.variant, PipelineVariant::Refresh);
        assert_eq!(settings.ai_request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_batch_size() {
        let mut env = complete_env();
        env.push(("BATCH_SIZE", "lots"));
        let err = Settings::from_lookup(lookup_from(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "BATCH_SIZE"));

        let mut env = complete_env();
        env.push(("BATCH_SIZE", "0"));
        assert!(Settings::from_lookup(lookup_from(&env)).is_err());
    }

    #[test]
    fn test_invalid_variant() {
        let mut env = complete_env();
        env.push(("PIPELINE_VARIANT", "nightly"));
        let err = Settings::from_lookup(lookup_from(&env)).unwrap_err();
        assert!(err.to_string().contains("PIPELINE_VARIANT"));
    }
}
