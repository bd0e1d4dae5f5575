//! Layered application configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `telemetry.toml`, then `TELEMETRY__<SECTION>__<KEY>` environment variables.

use std::path::Path;

use cloud_sync::CloudConfig;
use config::{Config, Environment, File};
use event_classifier::ClassifierConfig;
use geo_track::DEFAULT_STEP_M;
use serde::{Deserialize, Serialize};
use session::{SessionConfig, Visibility};
use thiserror::Error;

use crate::rate_limit::RateLimitConfig;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub classifier: ClassifierConfig,
    pub session: SessionSettings,
    pub storage: StorageConfig,
    pub cloud: CloudConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Session defaults applied to every recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub visibility: Visibility,
    /// Owner stamped on summaries; publishing is refused without one
    pub owner_id: Option<String>,
    /// Spacing for rendered polylines (m)
    pub resample_step_m: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            visibility: Visibility::default(),
            owner_id: None,
            resample_step_m: DEFAULT_STEP_M,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory` or a sqlx SQLite URL such as `sqlite://telemetry.db`
    pub url: String,
    /// Raw session logs kept by the in-memory backend
    pub memory_retention_sessions: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: "memory".to_string(),
            memory_retention_sessions: 1_000,
        }
    }
}

impl StorageConfig {
    pub fn is_memory(&self) -> bool {
        self.url == "memory"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` (or `telemetry.toml` in the working
    /// directory, if present), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name("telemetry").required(false),
        };

        let config: AppConfig = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("TELEMETRY").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.classifier
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("classifier: {}", e)))?;

        if !(self.session.resample_step_m.is_finite() && self.session.resample_step_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "session.resample_step_m must be positive, got {}",
                self.session.resample_step_m
            )));
        }
        if self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0 {
            return Err(ConfigError::Invalid("rate_limit values must be non-zero".to_string()));
        }
        if self.storage.url.is_empty() {
            return Err(ConfigError::Invalid("storage.url is empty".to_string()));
        }
        Ok(())
    }

    /// Per-session settings for the aggregator
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            classifier: self.classifier.clone(),
            visibility: self.session.visibility,
            owner_id: self.session.owner_id.clone(),
        }
    }
}
