//! Configuration management

use crate::error::{DeskError, DeskResult, ErrorContext};
use crate::types::{ApiConfig, ClientConfig, StorageConfig, UiConfig};

use std::path::{Path, PathBuf};

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "MSGDESK_API_URL";

/// Page sizes offered by the list view
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8080".to_string(),
                timeout_seconds: 30,
                user_agent: format!("msgdesk/{}", env!("CARGO_PKG_VERSION")),
            },
            storage: StorageConfig {
                session_file: "~/.msgdesk/session.json".to_string(),
            },
            ui: UiConfig { page_size: 10 },
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> DeskResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeskError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: ClientConfig = toml::from_str(&content).map_err(|e| DeskError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> DeskResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| DeskError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| DeskError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
        self
    }

    /// Session file path with a leading `~` expanded to the home directory
    pub fn session_file_path(&self) -> PathBuf {
        expand_home(&self.storage.session_file)
    }

    /// Validate configuration
    pub fn validate(&self) -> DeskResult<()> {
        if let Err(e) = url::Url::parse(&self.api.base_url) {
            return Err(DeskError::Config {
                message: format!("Invalid api.base_url '{}': {}", self.api.base_url, e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Use an absolute URL such as http://localhost:8080"),
            });
        }

        if self.api.timeout_seconds == 0 {
            return Err(DeskError::Config {
                message: "api.timeout_seconds must be greater than 0".to_string(),
                source: None,
                context: ErrorContext::new("config")
                    .with_operation("validate")
                    .with_suggestion("Set api.timeout_seconds to a positive value"),
            });
        }

        if !PAGE_SIZE_OPTIONS.contains(&self.ui.page_size) {
            return Err(DeskError::Config {
                message: format!(
                    "ui.page_size must be one of {:?}, got {}",
                    PAGE_SIZE_OPTIONS, self.ui.page_size
                ),
                source: None,
                context: ErrorContext::new("config").with_operation("validate"),
            });
        }

        if self.storage.session_file.trim().is_empty() {
            return Err(DeskError::Config {
                message: "storage.session_file must not be empty".to_string(),
                source: None,
                context: ErrorContext::new("config").with_operation("validate"),
            });
        }

        Ok(())
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}
