//! Runtime configuration.
//!
//! Settings come from environment variables (optionally loaded from a `.env`
//! file by the binary via `dotenvy`). Command-line flags override them.

use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable holding the bot's own screen name.
pub const ENV_SCREEN_NAME: &str = "FLOCKBOT_SCREEN_NAME";
/// Environment variable for the request/response timeout, in seconds.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "FLOCKBOT_REQUEST_TIMEOUT_SECS";
/// Environment variable for the number of statuses the console transport keeps for search.
pub const ENV_SEARCH_HISTORY: &str = "FLOCKBOT_SEARCH_HISTORY";

/// Default timeout for a request that expects a typed response.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default search history size.
pub const DEFAULT_SEARCH_HISTORY: usize = 1000;

/// Bot configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    /// The bot's own identity. Statuses replying to it are "addressed".
    pub screen_name: String,
    /// How long a requester waits for a typed response before giving up.
    pub request_timeout: Duration,
    /// Statuses retained by the console transport for answering searches.
    pub search_history: usize,
}

impl BotConfig {
    /// Configuration with defaults for everything except the identity.
    pub fn new(screen_name: impl Into<String>) -> Self {
        Self {
            screen_name: screen_name.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            search_history: DEFAULT_SEARCH_HISTORY,
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let screen_name = get(ENV_SCREEN_NAME)
            .map(|v| v.trim().trim_start_matches('@').to_string())
            .ok_or_else(|| ConfigError::MissingEnvVar(ENV_SCREEN_NAME.to_string()))?;

        let request_timeout = match get(ENV_REQUEST_TIMEOUT_SECS) {
            Some(raw) => Duration::from_secs(parse_positive(ENV_REQUEST_TIMEOUT_SECS, &raw)?),
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let search_history = match get(ENV_SEARCH_HISTORY) {
            Some(raw) => parse_positive(ENV_SEARCH_HISTORY, &raw)? as usize,
            None => DEFAULT_SEARCH_HISTORY,
        };

        Ok(Self {
            screen_name,
            request_timeout,
            search_history,
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a positive integer, got '{}'", raw),
        }),
        Ok(n) => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply_when_only_identity_is_set() {
        let config = BotConfig::from_lookup(lookup(&[(ENV_SCREEN_NAME, "flockbot")])).unwrap();
        assert_eq!(config, BotConfig::new("flockbot"));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_missing_identity_is_an_error() {
        let err = BotConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == ENV_SCREEN_NAME));
    }

    #[test]
    fn test_blank_identity_counts_as_missing() {
        let err = BotConfig::from_lookup(lookup(&[(ENV_SCREEN_NAME, "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_leading_at_sign_is_stripped() {
        let config = BotConfig::from_lookup(lookup(&[(ENV_SCREEN_NAME, "@flockbot")])).unwrap();
        assert_eq!(config.screen_name, "flockbot");
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = BotConfig::from_lookup(lookup(&[
            (ENV_SCREEN_NAME, "flockbot"),
            (ENV_REQUEST_TIMEOUT_SECS, "3"),
            (ENV_SEARCH_HISTORY, "50"),
        ]))
        .unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.search_history, 50);
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = BotConfig::from_lookup(lookup(&[
            (ENV_SCREEN_NAME, "flockbot"),
            (ENV_REQUEST_TIMEOUT_SECS, "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn test_non_numeric_history_is_rejected() {
        let err = BotConfig::from_lookup(lookup(&[
            (ENV_SCREEN_NAME, "flockbot"),
            (ENV_SEARCH_HISTORY, "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
