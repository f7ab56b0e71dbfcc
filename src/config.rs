use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;
use crate::uploader::retry::RetryConfig;

const APP_DIR: &str = "story-uploader";
const CONFIG_FILE: &str = "config.json";

/// Everything an upload run needs. Missing fields in the config file fall
/// back to these defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Id of the story to create or update
    pub resource_id: String,
    /// Root of the rendered story bundle
    pub folder: PathBuf,
    /// Team token sent as `Authorization: Bearer <token>`
    pub token: String,
    /// `name[:port]` of the story service
    pub host: String,
    /// Path prefix in front of the story id
    pub path: String,
    pub batch_size: usize,
    pub retry: RetryConfig,
    /// No timeout unless set.
    pub request_timeout_secs: Option<u64>,
    pub log_level: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            resource_id: "ddd44fd5-25ac-4154-9f30-049c7c1bae82".to_string(),
            folder: PathBuf::from("test_story"),
            token: String::new(),
            host: "localhost:8080".to_string(),
            path: "quarto/update".to_string(),
            batch_size: 10,
            retry: RetryConfig::default(),
            request_timeout_secs: None,
            log_level: "info".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Copy safe to print.
    pub fn redacted(&self) -> Self {
        Self {
            token: InputValidator::redact_token(&self.token),
            ..self.clone()
        }
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join(APP_DIR);

    Ok(config_dir.join(CONFIG_FILE))
}

/// Load from `explicit_path`, or from the default location. Only a missing
/// default file falls back to defaults.
pub fn load_config(explicit_path: Option<&Path>) -> AppResult<UploadConfig> {
    let config_path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => {
            let path = get_config_path()?;
            if !path.exists() {
                log::debug!("No config at {}, using defaults", path.display());
                return Ok(UploadConfig::default());
            }
            path
        }
    };

    let config_str = fs::read_to_string(&config_path)?;
    let config: UploadConfig = serde_json::from_str(&config_str).map_err(|e| {
        AppError::Config(format!("Failed to parse {}: {}", config_path.display(), e))
    })?;

    log::debug!("Loaded configuration from {}", config_path.display());
    Ok(config)
}

/// Write `config` as pretty JSON, keeping the previous file as `.bak`.
pub fn save_config(config: &UploadConfig, path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if path.exists() {
        let backup_path = path.with_extension("json.bak");
        if let Err(e) = fs::copy(path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(path, config_str)?;

    log::info!("Configuration saved to {}", path.display());
    Ok(())
}

pub fn validate_config(config: &UploadConfig) -> AppResult<()> {
    InputValidator::validate_resource_id(&config.resource_id)?;
    InputValidator::validate_token(&config.token)?;
    InputValidator::validate_host(&config.host)?;
    InputValidator::validate_path_prefix(&config.path)?;
    InputValidator::validate_batch_size(config.batch_size)?;

    if config.retry.max_attempts == 0 || config.retry.max_attempts > 20 {
        return Err(AppError::validation("retry.max_attempts", "Must be between 1 and 20"));
    }

    if config.retry.base_delay_ms == 0 {
        return Err(AppError::validation("retry.base_delay_ms", "Must be at least 1ms"));
    }

    if config.retry.exponential_base < 1.0 || !config.retry.exponential_base.is_finite() {
        return Err(AppError::validation("retry.exponential_base", "Must be 1.0 or greater"));
    }

    if config.request_timeout_secs == Some(0) {
        return Err(AppError::validation("request_timeout_secs", "Must be greater than 0"));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}
