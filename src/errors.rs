use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed (HTTP {status}){}", server_suffix(.message))]
    Status {
        status: u16,
        message: Option<String>,
    },

    #[error("Request timed out")]
    Timeout,

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

fn server_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl ApiError {
    /// Best message to show the user: the server's own message when it sent
    /// one, otherwise the caller's generic fallback.
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            ApiError::Timeout => "Request timed out".to_string(),
            _ => fallback.to_string(),
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            ApiError::Status { status: 401, .. } => {
                Some("Your YouTube session may have expired. Log out and sign in again.")
            }
            ApiError::Status { status: 403, .. } => {
                Some("Check that the connected account can access this channel.")
            }
            ApiError::Status { status, .. } if *status >= 500 => {
                Some("The A/B test service may be temporarily unavailable. Try again shortly.")
            }
            ApiError::Status { .. } => None,
            ApiError::Network(_) => Some("Check your internet connection and try again."),
            ApiError::Timeout => Some("The server did not respond in time. Press r to retry."),
            ApiError::Parse(_) => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenDecodeError {
    #[error("token is not valid base64")]
    InvalidBase64,

    #[error("decoded token is not valid UTF-8")]
    InvalidUtf8,

    #[error("decoded token is empty")]
    Empty,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Variant B description is required")]
    MissingVariantB,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid API base URL '{0}': must start with http:// or https://")]
    InvalidBaseUrl(String),

    #[error("Request timeout must be at least one second")]
    ZeroTimeout,
}

impl ConfigError {
    pub fn hint(&self) -> Option<&str> {
        match self {
            ConfigError::InvalidBaseUrl(_) => {
                Some("Pass --api-url https://... or rebuild with YTAB_API_BASE_URL set.")
            }
            ConfigError::ZeroTimeout => Some("Pass --timeout-secs with a value of 1 or more."),
        }
    }
}
