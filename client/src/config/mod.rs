//! Configuration management for the survey client
//!
//! Configuration is loaded hierarchically:
//! 1. Default values (in code)
//! 2. TOML config files (config/development.toml or config/production.toml)
//! 3. Environment variables (prefix: SURVEY__)

use crate::error::{ClientError, ClientResult};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientConfig {
    #[validate(nested)]
    pub api: ApiConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    #[validate(nested)]
    pub diary: DiaryConfig,
    #[serde(default)]
    #[validate(nested)]
    pub analytics: AnalyticsConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiConfig {
    #[validate(url)]
    pub base_url: String,
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,
    /// Error code the backend uses for "already responded"
    #[validate(length(min = 1))]
    pub conflict_code: String,
    /// Role sent with data export requests
    pub export_role: String,
    /// Bearer token; never serialized back out
    #[serde(default, skip_serializing)]
    pub auth_token: Option<SecretString>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Local cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the key-value cache files
    pub dir: PathBuf,
}

/// Diary configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiaryConfig {
    pub form_id: Option<String>,
    pub question_id: Option<String>,
    #[validate(range(min = 1, max = 60000))]
    pub debounce_ms: u64,
}

impl DiaryConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            form_id: None,
            question_id: None,
            debounce_ms: 800,
        }
    }
}

/// Dashboard configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalyticsConfig {
    #[validate(range(min = 1))]
    pub sample_answer_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            sample_answer_limit: 10,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:5000/api".to_string(),
                timeout_secs: 30,
                conflict_code: "ALREADY_RESPONDED".to_string(),
                export_role: "admin".to_string(),
                auth_token: None,
            },
            storage: StorageConfig {
                dir: PathBuf::from(".survey-cache"),
            },
            diary: DiaryConfig::default(),
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from files and environment
    ///
    /// Loading order (later sources override earlier):
    /// 1. Default values
    /// 2. Config file based on RUST_ENV (development.toml or production.toml)
    /// 3. Environment variables with SURVEY__ prefix
    pub fn load() -> ClientResult<Self> {
        let env = env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string());
        let config_file = format!("config/{}.toml", env);

        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&ClientConfig::default())?)
            // Load from environment-specific config file
            .add_source(config::File::with_name(&config_file).required(false))
            // Override with environment variables (SURVEY__ prefix)
            // e.g., SURVEY__API__BASE_URL=https://forms.example.com/api
            .add_source(config::Environment::with_prefix("SURVEY").separator("__"))
            .build()?;

        let loaded: ClientConfig = config.try_deserialize()?;
        loaded
            .validate()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(loaded)
    }

    /// Check if running in production mode
    pub fn is_production() -> bool {
        env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false)
    }
}
