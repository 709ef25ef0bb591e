//! Application configuration module
//!
//! Provides the server URL configuration shared by the client and by tools
//! that talk to the server.

use thiserror::Error;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the board server, without a trailing slash
    pub server_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.starts_with("http://") || self.server_url.starts_with("https://") {
            Ok(())
        } else {
            Err(ConfigError::InvalidUrl(self.server_url.clone()))
        }
    }

    /// Join a path onto the server URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path.trim_start_matches('/'))
    }

    /// WebSocket URL of the board channel
    pub fn channel_url(&self) -> String {
        let base = self
            .server_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/ws", base)
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let server_url = self
            .server_url
            .ok_or(ConfigError::MissingValue("server_url"))?
            .trim_end_matches('/')
            .to_string();
        let config = AppConfig { server_url };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
