// SPDX-License-Identifier: MPL-2.0

use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const APP_ID: &str = "io.github.sethcottle.Plaza";
pub const APP_NAME: &str = "Plaza";

#[cfg(feature = "devel")]
pub const IS_DEVEL: bool = true;
#[cfg(not(feature = "devel"))]
pub const IS_DEVEL: bool = false;

/// Posts revealed by the first feed window
pub const FIRST_PAGE_SIZE: usize = 30;
/// Posts revealed by every window after the first
pub const NEXT_PAGE_SIZE: usize = 10;

/// Media entries kept per post
pub const MAX_GALLERY_ITEMS: usize = 10;

/// Liked-by users revealed per chunk in the detail view
pub const DEFAULT_LIKES_PAGE_SIZE: usize = 12;
/// Distance from the bottom of the likes list that triggers the next chunk
pub const LIKES_SCROLL_THRESHOLD_PX: f64 = 48.0;
/// Minimum gap between two scroll-triggered likes loads
pub const LIKES_SCROLL_THROTTLE: Duration = Duration::from_millis(200);

pub const PLACEHOLDER_AVATAR: &str = "https://ui-avatars.com/api/?name=User&background=random";
pub const PLACEHOLDER_USER_NAME: &str = "user";
pub const UNKNOWN_AUTHOR_NAME: &str = "Unknown";

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

// REST endpoints, relative to the API base
pub const POSTS_PATH: &str = "/api/posts";
pub const ME_PATH: &str = "/api/users/me";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

/// Boot-time configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base used for REST calls and to absolutize relative media URLs
    pub api_base: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn new(api_base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: normalize_base(api_base)?,
            token: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }

    /// Load configuration from `PLAZA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `PLAZA_API_BASE` is missing or any value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_base = std::env::var("PLAZA_API_BASE")
            .map_err(|_| ConfigError::MissingEnvVar("PLAZA_API_BASE".to_string()))?;

        let token = std::env::var("PLAZA_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        let timeout_secs = match std::env::var("PLAZA_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    name: "PLAZA_HTTP_TIMEOUT_SECS".to_string(),
                    message: e.to_string(),
                })?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            api_base: normalize_base(&api_base)?,
            token,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Validate the base and drop any trailing slash so paths can be appended.
fn normalize_base(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        name: "PLAZA_API_BASE".to_string(),
        message: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            name: "PLAZA_API_BASE".to_string(),
            message: format!("unsupported scheme {}", parsed.scheme()),
        });
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
