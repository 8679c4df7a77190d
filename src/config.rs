//! Environment-driven configuration

use crate::disclosure::{TruncationUnit, DEFAULT_MAX_VISIBLE};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVICE_URL: &str = "http://127.0.0.1:8000/api/query";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub service_url: String,
    pub port: u16,
    pub truncate_at: usize,
    pub truncation_unit: TruncationUnit,
    /// Retrieval mode the session starts in
    pub retrieval_mode: bool,
    /// `None` waits for the service indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            port: DEFAULT_PORT,
            truncate_at: DEFAULT_MAX_VISIBLE,
            truncation_unit: TruncationUnit::Chars,
            retrieval_mode: true,
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or empty keys take their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let service_url = match get("RAGTRIP_SERVICE_URL") {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => url,
            Some(url) => {
                return Err(ConfigError::invalid(
                    "RAGTRIP_SERVICE_URL",
                    &url,
                    "expected an http:// or https:// URL",
                ))
            }
            None => defaults.service_url,
        };

        let port = match get("RAGTRIP_PORT") {
            Some(v) => v
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid("RAGTRIP_PORT", &v, e.to_string()))?,
            None => defaults.port,
        };

        let truncate_at = match get("RAGTRIP_TRUNCATE_AT") {
            Some(v) => parse_positive("RAGTRIP_TRUNCATE_AT", &v)?,
            None => defaults.truncate_at,
        };

        let truncation_unit = match get("RAGTRIP_TRUNCATION_UNIT") {
            Some(v) => v
                .parse::<TruncationUnit>()
                .map_err(|e| ConfigError::invalid("RAGTRIP_TRUNCATION_UNIT", &v, e))?,
            None => defaults.truncation_unit,
        };

        let retrieval_mode = match get("RAGTRIP_RETRIEVAL_MODE") {
            Some(v) => parse_bool(&v).ok_or_else(|| {
                ConfigError::invalid("RAGTRIP_RETRIEVAL_MODE", &v, "expected true or false")
            })?,
            None => defaults.retrieval_mode,
        };

        let request_timeout = match get("RAGTRIP_REQUEST_TIMEOUT_SECS") {
            Some(v) => {
                let secs = parse_positive("RAGTRIP_REQUEST_TIMEOUT_SECS", &v)?;
                Some(Duration::from_secs(secs))
            }
            None => defaults.request_timeout,
        };

        Ok(Self {
            service_url,
            port,
            truncate_at,
            truncation_unit,
            retrieval_mode,
            request_timeout,
        })
    }
}

/// Parse a whole number that must be at least 1
fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: fmt::Display,
{
    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(key, value, e.to_string()))?;
    if parsed == T::default() {
        return Err(ConfigError::invalid(key, value, "must be greater than zero"));
    }
    Ok(parsed)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
