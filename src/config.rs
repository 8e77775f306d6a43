use std::path::PathBuf;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::logger::LogConfig;

/// Fallback used when the binary was built without `YTAB_API_BASE_URL`.
pub const DEFAULT_API_BASE_URL: &str = "https://xa0etg74tg.execute-api.us-east-1.amazonaws.com/prod";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Base URL baked in at build time, if any.
pub fn build_time_api_base_url() -> Option<&'static str> {
    option_env!("YTAB_API_BASE_URL").filter(|url| !url.trim().is_empty())
}

#[derive(Debug, Default)]
pub struct Overrides {
    pub api_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

#[derive(Debug)]
pub struct Settings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub log: LogConfig,
}

impl Settings {
    pub fn resolve(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, build_time_api_base_url())
    }

    fn resolve_with(overrides: Overrides, build_time: Option<&str>) -> Result<Self, ConfigError> {
        let raw_url = overrides
            .api_base_url
            .or_else(|| build_time.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = normalize_base_url(&raw_url)?;

        let timeout_secs = overrides
            .timeout_secs
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let mut log = LogConfig::default();
        if let Some(level) = overrides.log_level {
            log.level = level;
        }

        Ok(Self {
            api_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
            log,
        })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Per-user directory for ytab files. Only logs live here.
pub fn data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytab")
}
