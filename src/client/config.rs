use std::time::Duration;

use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError, DEFAULT_SERVER_URL};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SILENCE_THRESHOLD: Duration = Duration::from_secs(30);
pub const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Client configuration wrapper.
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
    /// Bound on every HTTP call
    pub request_timeout: Duration,
    /// Push silence after which the liveness poll kicks in
    pub silence_threshold: Duration,
    /// Minimum spacing between two polls
    pub min_poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let app = std::env::var("BOARDSYNC_API_URL")
            .ok()
            .and_then(|url| AppConfig::builder().server_url(url).build().ok())
            .unwrap_or_default();
        Self::from_app(app)
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self::from_app(builder.build()?))
    }

    fn from_app(app: AppConfig) -> Self {
        Self {
            app,
            token: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            min_poll_interval: DEFAULT_MIN_POLL_INTERVAL,
        }
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        self.app.endpoint(path)
    }

    pub fn channel_url(&self) -> String {
        self.app.channel_url()
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }
}
