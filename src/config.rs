use crate::connection::{ConnectionConfig, DEFAULT_SCPI_PORT};
use crate::screen_capture::CaptureConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub scope: ScopeConfig,
    pub capture: CaptureTimingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScopeConfig {
    pub host: String,
    pub port: u16,
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
}

/// Settling delays in milliseconds; firmware revisions may need different
/// values, so they live in config rather than the code.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptureTimingConfig {
    pub format_settle_ms: u64,
    pub print_settle_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scope: ScopeConfig::default(),
            capture: CaptureTimingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: DEFAULT_SCPI_PORT,
            connect_timeout_ms: 5_000,
            read_timeout_ms: 10_000,
            write_timeout_ms: 5_000,
        }
    }
}

impl Default for CaptureTimingConfig {
    fn default() -> Self {
        Self {
            format_settle_ms: 100,
            print_settle_ms: 200,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            connect_timeout: Duration::from_millis(self.scope.connect_timeout_ms),
            read_timeout: Duration::from_millis(self.scope.read_timeout_ms),
            write_timeout: Duration::from_millis(self.scope.write_timeout_ms),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            format_settle: Duration::from_millis(self.capture.format_settle_ms),
            print_settle: Duration::from_millis(self.capture.print_settle_ms),
        }
    }
}

/// Load configuration from file with layered fallbacks
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(ConfigError::Message(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    } else if Path::new("scope.toml").exists() {
        builder = builder.add_source(File::with_name("scope.toml"));
    }

    // Environment variable overrides with prefix "SIGLENT_SCOPE_"
    builder = builder.add_source(
        Environment::with_prefix("SIGLENT_SCOPE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize::<AppConfig>()
}

/// Load configuration with better error handling and defaults
pub fn load_config_or_default(config_path: Option<&Path>) -> AppConfig {
    match load_config(config_path) {
        Ok(config) => {
            log::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            log::warn!("Failed to load config ({}), using defaults", e);
            AppConfig::default()
        }
    }
}
