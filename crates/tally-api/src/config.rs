use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_path: String,
    pub device_jwt_secret: String,
    pub device_jwt_issuer: String,
    pub auth_clock_skew: Duration,
    pub duplicate_window: Duration,
    pub masked_blur_level: i64,
    pub conflict_list_limit: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("device_jwt_secret", &"[REDACTED]")
            .field("device_jwt_issuer", &self.device_jwt_issuer)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("duplicate_window", &self.duplicate_window)
            .field("masked_blur_level", &self.masked_blur_level)
            .field("conflict_list_limit", &self.conflict_list_limit)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "TALLY_API_BIND_ADDR", "127.0.0.1:8080");
        let database_path = value_or_default(&lookup, "TALLY_DATABASE_PATH", "tally.db");

        let device_jwt_secret = required_trimmed(&lookup, "TALLY_DEVICE_JWT_SECRET")?;
        if device_jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "TALLY_DEVICE_JWT_SECRET must be at least 32 bytes".to_string(),
            ));
        }
        let device_jwt_issuer = value_or_default(&lookup, "TALLY_DEVICE_JWT_ISSUER", "tally");

        let auth_clock_skew_secs = value_or_default(&lookup, "TALLY_AUTH_CLOCK_SKEW_SECS", "30")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "TALLY_AUTH_CLOCK_SKEW_SECS must be an integer in [0, 300]".to_string(),
                )
            })?;
        if auth_clock_skew_secs > 300 {
            return Err(ConfigError::Invalid(
                "TALLY_AUTH_CLOCK_SKEW_SECS must be in [0, 300]".to_string(),
            ));
        }

        let duplicate_window_secs = value_or_default(&lookup, "TALLY_DUPLICATE_WINDOW_SECS", "2")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "TALLY_DUPLICATE_WINDOW_SECS must be an integer in [0, 60]".to_string(),
                )
            })?;
        if duplicate_window_secs > 60 {
            return Err(ConfigError::Invalid(
                "TALLY_DUPLICATE_WINDOW_SECS must be in [0, 60]".to_string(),
            ));
        }

        let masked_blur_level = value_or_default(&lookup, "TALLY_MASKED_BLUR_LEVEL", "10")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "TALLY_MASKED_BLUR_LEVEL must be an integer in [1, 100]".to_string(),
                )
            })?;
        if !(1..=100).contains(&masked_blur_level) {
            return Err(ConfigError::Invalid(
                "TALLY_MASKED_BLUR_LEVEL must be in [1, 100]".to_string(),
            ));
        }

        let conflict_list_limit = value_or_default(&lookup, "TALLY_CONFLICT_LIST_LIMIT", "100")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "TALLY_CONFLICT_LIST_LIMIT must be an integer in [1, 1000]".to_string(),
                )
            })?;
        if !(1..=1_000).contains(&conflict_list_limit) {
            return Err(ConfigError::Invalid(
                "TALLY_CONFLICT_LIST_LIMIT must be in [1, 1000]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            database_path,
            device_jwt_secret,
            device_jwt_issuer,
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            duplicate_window: Duration::from_secs(duplicate_window_secs),
            masked_blur_level,
            conflict_list_limit,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(map: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        |key| map.get(key).map(|value| (*value).to_string())
    }

    #[test]
    fn config_requires_device_secret() {
        let map: HashMap<&str, &str> = HashMap::new();
        let err = AppConfig::from_lookup(lookup(&map)).unwrap_err();
        assert!(err.to_string().contains("TALLY_DEVICE_JWT_SECRET"));
    }

    #[test]
    fn config_rejects_short_secret() {
        let mut map = HashMap::new();
        map.insert("TALLY_DEVICE_JWT_SECRET", "too-short");
        let err = AppConfig::from_lookup(lookup(&map)).unwrap_err();
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn config_applies_defaults() {
        let mut map = HashMap::new();
        map.insert(
            "TALLY_DEVICE_JWT_SECRET",
            "0123456789abcdef0123456789abcdef",
        );
        let config = AppConfig::from_lookup(lookup(&map)).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.database_path, "tally.db");
        assert_eq!(config.duplicate_window, Duration::from_secs(2));
        assert_eq!(config.masked_blur_level, 10);
        assert_eq!(config.conflict_list_limit, 100);
    }

    #[test]
    fn config_rejects_out_of_range_window() {
        let mut map = HashMap::new();
        map.insert(
            "TALLY_DEVICE_JWT_SECRET",
            "0123456789abcdef0123456789abcdef",
        );
        map.insert("TALLY_DUPLICATE_WINDOW_SECS", "120");
        let err = AppConfig::from_lookup(lookup(&map)).unwrap_err();
        assert!(err.to_string().contains("TALLY_DUPLICATE_WINDOW_SECS"));
    }

    #[test]
    fn config_redacts_secret_in_debug() {
        let mut map = HashMap::new();
        map.insert(
            "TALLY_DEVICE_JWT_SECRET",
            "sensitive-device-secret-0123456789ab",
        );
        let config = AppConfig::from_lookup(lookup(&map)).unwrap();

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-device-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
