//! Dashboard configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::RegistrationMode;
use crate::idle::DEFAULT_IDLE_WINDOW;
use crate::net::transport::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, HttpTimeouts};
use crate::router::GuardMode;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SENSORS_PAGE_SIZE: u32 = 20;
pub const DEFAULT_READINGS_PAGE_SIZE: u32 = 100;
/// One week. Longer windows are rejected rather than left to overflow timers.
pub const MAX_IDLE_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;
const TOKEN_FILE_NAME: &str = ".sensordash/token.json";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?} ({reason})")]
    Invalid { key: &'static str, value: String, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub base_url: String,
    pub token_file: PathBuf,
    pub idle_window: Duration,
    pub timeouts: HttpTimeouts,
    pub sensors_page_size: u32,
    pub readings_page_size: u32,
    pub registration_mode: RegistrationMode,
    pub guard_mode: GuardMode,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            token_file: default_token_file(std::env::var("HOME").ok().as_deref()),
            idle_window: DEFAULT_IDLE_WINDOW,
            timeouts: HttpTimeouts::default(),
            sensors_page_size: DEFAULT_SENSORS_PAGE_SIZE,
            readings_page_size: DEFAULT_READINGS_PAGE_SIZE,
            registration_mode: RegistrationMode::default(),
            guard_mode: GuardMode::default(),
        }
    }
}

impl DashboardConfig {
    /// Build typed config from environment variables.
    ///
    /// All optional:
    /// - `SENSORDASH_BASE_URL`: backend origin, default `http://127.0.0.1:8000`
    /// - `SENSORDASH_TOKEN_FILE`: default `$HOME/.sensordash/token.json`
    /// - `SENSORDASH_IDLE_TIMEOUT_SECS`: default 300
    /// - `SENSORDASH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `SENSORDASH_CONNECT_TIMEOUT_SECS`: default 10
    /// - `SENSORDASH_SENSORS_PAGE_SIZE`: default 20
    /// - `SENSORDASH_READINGS_PAGE_SIZE`: default 100
    /// - `SENSORDASH_REGISTRATION_MODE`: `explicit_login` (default) or `auto_login`
    /// - `SENSORDASH_GUARD_MODE`: `resume` (default) or `fixed`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any value that does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let base_url = get("SENSORDASH_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "SENSORDASH_BASE_URL",
                value: base_url,
                reason: "expected an http(s) URL",
            });
        }

        let token_file = get("SENSORDASH_TOKEN_FILE")
            .map_or_else(|| default_token_file(lookup("HOME").as_deref()), PathBuf::from);

        let idle_secs = parse_u64(
            get("SENSORDASH_IDLE_TIMEOUT_SECS"),
            "SENSORDASH_IDLE_TIMEOUT_SECS",
            DEFAULT_IDLE_WINDOW.as_secs(),
        )?;
        if idle_secs > MAX_IDLE_TIMEOUT_SECS {
            return Err(ConfigError::Invalid {
                key: "SENSORDASH_IDLE_TIMEOUT_SECS",
                value: idle_secs.to_string(),
                reason: "too large",
            });
        }
        let timeouts = HttpTimeouts {
            request_secs: parse_u64(
                get("SENSORDASH_REQUEST_TIMEOUT_SECS"),
                "SENSORDASH_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_u64(
                get("SENSORDASH_CONNECT_TIMEOUT_SECS"),
                "SENSORDASH_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
        };
        let sensors_page_size = parse_page_size(
            get("SENSORDASH_SENSORS_PAGE_SIZE"),
            "SENSORDASH_SENSORS_PAGE_SIZE",
            DEFAULT_SENSORS_PAGE_SIZE,
        )?;
        let readings_page_size = parse_page_size(
            get("SENSORDASH_READINGS_PAGE_SIZE"),
            "SENSORDASH_READINGS_PAGE_SIZE",
            DEFAULT_READINGS_PAGE_SIZE,
        )?;
        let registration_mode = parse_registration_mode(get("SENSORDASH_REGISTRATION_MODE"))?;
        let guard_mode = parse_guard_mode(get("SENSORDASH_GUARD_MODE"))?;

        Ok(Self {
            base_url,
            token_file,
            idle_window: Duration::from_secs(idle_secs),
            timeouts,
            sensors_page_size,
            readings_page_size,
            registration_mode,
            guard_mode,
        })
    }
}

fn default_token_file(home: Option<&str>) -> PathBuf {
    match home {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(TOKEN_FILE_NAME),
        _ => PathBuf::from(TOKEN_FILE_NAME),
    }
}

fn parse_u64(raw: Option<String>, key: &'static str, default: u64) -> Result<u64, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::Invalid { key, value: raw, reason: "expected a positive integer" }),
    }
}

fn parse_page_size(raw: Option<String>, key: &'static str, default: u32) -> Result<u32, ConfigError> {
    let value = parse_u64(raw, key, u64::from(default))?;
    u32::try_from(value).map_err(|_| ConfigError::Invalid { key, value: value.to_string(), reason: "too large" })
}

fn parse_registration_mode(raw: Option<String>) -> Result<RegistrationMode, ConfigError> {
    match raw.as_deref() {
        None | Some("explicit_login") => Ok(RegistrationMode::ExplicitLogin),
        Some("auto_login") => Ok(RegistrationMode::AutoLogin),
        Some(other) => Err(ConfigError::Invalid {
            key: "SENSORDASH_REGISTRATION_MODE",
            value: other.to_owned(),
            reason: "expected 'explicit_login' or 'auto_login'",
        }),
    }
}

fn parse_guard_mode(raw: Option<String>) -> Result<GuardMode, ConfigError> {
    match raw.as_deref() {
        None | Some("resume") => Ok(GuardMode::Resume),
        Some("fixed") => Ok(GuardMode::Fixed),
        Some(other) => Err(ConfigError::Invalid {
            key: "SENSORDASH_GUARD_MODE",
            value: other.to_owned(),
            reason: "expected 'resume' or 'fixed'",
        }),
    }
}
