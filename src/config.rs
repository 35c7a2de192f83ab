use std::time::Duration;

use crate::error::AggregatorError;

/// Process-wide settings, loaded once at startup from the environment.
/// Mirrors the shape of the original Python `Settings` object, minus the
/// Firestore/JWT fields that belong to the out-of-scope user-account and
/// public-API surfaces.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub http_max_connections: usize,
    pub http_max_idle_per_host: usize,
    pub http_request_timeout: Duration,
    pub http_connect_timeout: Duration,
    pub use_proxies: bool,
    pub rotating_proxy_endpoint: Option<String>,
    pub geocoder_base_url: String,
    pub venue_mapping_path: String,
    pub environment: Environment,
    pub schedule_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Settings {
    pub fn from_env() -> Result<Self, AggregatorError> {
        let database_url = require_env("DATABASE_URL")?;
        let use_proxies = parse_bool_env("USE_PROXIES").unwrap_or(false);
        let rotating_proxy_endpoint = std::env::var("ROTATING_PROXY_ENDPOINT").ok();
        if use_proxies && rotating_proxy_endpoint.is_none() {
            return Err(AggregatorError::Config(
                "ROTATING_PROXY_ENDPOINT is required when USE_PROXIES=true".to_string(),
            ));
        }

        let environment = match std::env::var("ENVIRONMENT").as_deref() {
            Ok("production") => Environment::Production,
            Ok("staging") => Environment::Staging,
            Ok("development") | Err(_) => Environment::Development,
            Ok(other) => {
                return Err(AggregatorError::Config(format!(
                    "unrecognised ENVIRONMENT value: {other}"
                )))
            }
        };

        Ok(Self {
            database_url,
            http_max_connections: parse_env_or("HTTP_MAX_CONNECTIONS", 50)?,
            http_max_idle_per_host: parse_env_or("HTTP_MAX_IDLE_PER_HOST", 10)?,
            http_request_timeout: Duration::from_secs(parse_env_or(
                "HTTP_REQUEST_TIMEOUT_SECS",
                15,
            )?),
            http_connect_timeout: Duration::from_secs(parse_env_or(
                "HTTP_CONNECT_TIMEOUT_SECS",
                10,
            )?),
            use_proxies,
            rotating_proxy_endpoint,
            geocoder_base_url: std::env::var("GEOCODER_BASE_URL")
                .unwrap_or_else(|_| "https://api.postcodes.io".to_string()),
            venue_mapping_path: std::env::var("VENUE_MAPPING_PATH")
                .unwrap_or_else(|_| "mappings.json".to_string()),
            environment,
            schedule_interval: Duration::from_secs(parse_env_or("SCHEDULE_INTERVAL_SECS", 3_600)?),
        })
    }
}

fn require_env(name: &str) -> Result<String, AggregatorError> {
    std::env::var(name)
        .map_err(|_| AggregatorError::Config(format!("missing required environment variable {name}")))
}

fn parse_bool_env(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|value| match value.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AggregatorError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| AggregatorError::Config(format!("invalid value for {name}: {value}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_env_accepts_common_forms() {
        std::env::set_var("TEST_BOOL_FLAG_A", "true");
        assert_eq!(parse_bool_env("TEST_BOOL_FLAG_A"), Some(true));
        std::env::set_var("TEST_BOOL_FLAG_A", "0");
        assert_eq!(parse_bool_env("TEST_BOOL_FLAG_A"), Some(false));
        std::env::remove_var("TEST_BOOL_FLAG_A");
        assert_eq!(parse_bool_env("TEST_BOOL_FLAG_A"), None);
    }

    #[test]
    fn parse_env_or_falls_back_to_default() {
        std::env::remove_var("TEST_MISSING_NUMBER");
        let value: u64 = parse_env_or("TEST_MISSING_NUMBER", 42).unwrap();
        assert_eq!(value, 42);
    }
}
