//! Shop API configuration module.
//!
//! ## Load Order (later overrides earlier)
//! 1. Default values
//! 2. Config file (`KITSHOP_CONFIG`, or `./kitshop.toml` if it exists)
//! 3. `KITSHOP_*` environment variables
//!
//! ```toml
//! # kitshop.toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 3000
//!
//! [database]
//! path = "./kitshop.db"
//! max_connections = 5
//!
//! [bonus]
//! accrual_bps = 300            # 3%
//! delay_days = 10
//! process_interval_secs = 3600 # 0 disables the in-process scheduler
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use kitshop_core::validation::validate_accrual_bps;
use kitshop_core::{AccrualRate, BonusPolicy, DEFAULT_ACCRUAL_BPS, DEFAULT_BONUS_DELAY_DAYS};
use kitshop_db::DbConfig;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kitshop.toml";

/// Shop API configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub bonus: BonusSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file, or `:memory:`.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./kitshop.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseSettings {
    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        if self.path.as_os_str() == kitshop_db::pool::IN_MEMORY_PATH {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.path).max_connections(self.max_connections)
    }
}

/// Accrual and crediting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusSettings {
    /// Share of a sale total earned as bonus, in basis points.
    #[serde(default = "default_accrual_bps")]
    pub accrual_bps: u32,

    /// Days between a sale and the moment its bonus may be credited.
    #[serde(default = "default_delay_days")]
    pub delay_days: i64,

    /// Seconds between scheduled batch runs. 0 disables the scheduler.
    #[serde(default = "default_process_interval")]
    pub process_interval_secs: u64,
}

fn default_accrual_bps() -> u32 {
    DEFAULT_ACCRUAL_BPS
}

fn default_delay_days() -> i64 {
    DEFAULT_BONUS_DELAY_DAYS
}

fn default_process_interval() -> u64 {
    3600
}

impl Default for BonusSettings {
    fn default() -> Self {
        BonusSettings {
            accrual_bps: default_accrual_bps(),
            delay_days: default_delay_days(),
            process_interval_secs: default_process_interval(),
        }
    }
}

impl BonusSettings {
    pub fn policy(&self) -> BonusPolicy {
        BonusPolicy::new(AccrualRate::from_bps(self.accrual_bps), self.delay_days)
    }

    /// Scheduler period, or `None` when scheduling is disabled.
    pub fn process_interval(&self) -> Option<Duration> {
        (self.process_interval_secs > 0).then(|| Duration::from_secs(self.process_interval_secs))
    }
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var("KITSHOP_CONFIG").ok().map(PathBuf::from);
        Self::load_from(explicit.as_deref(), |key| std::env::var(key).ok())
    }

    /// Loads configuration with an explicit file and variable source.
    ///
    /// An explicit path must exist; the default `kitshop.toml` is optional.
    pub fn load_from(
        config_path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();

        match config_path {
            Some(path) => {
                config = Self::read_file(path)?;
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    config = Self::read_file(path)?;
                } else {
                    debug!("No config file found, using defaults");
                }
            }
        }

        config.apply_overrides(env)?;
        config.validate()?;

        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        info!(path = %path.display(), "Loading config file");

        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;

        Ok(toml::from_str(&contents)?)
    }

    /// Applies `KITSHOP_*` overrides from `env`.
    fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(addr) = env("KITSHOP_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = env("KITSHOP_PORT") {
            self.server.port = parse_var("KITSHOP_PORT", &port)?;
        }
        if let Some(path) = env("KITSHOP_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = env("KITSHOP_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("KITSHOP_DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(bps) = env("KITSHOP_BONUS_ACCRUAL_BPS") {
            self.bonus.accrual_bps = parse_var("KITSHOP_BONUS_ACCRUAL_BPS", &bps)?;
        }
        if let Some(days) = env("KITSHOP_BONUS_DELAY_DAYS") {
            self.bonus.delay_days = parse_var("KITSHOP_BONUS_DELAY_DAYS", &days)?;
        }
        if let Some(secs) = env("KITSHOP_BONUS_PROCESS_INTERVAL_SECS") {
            self.bonus.process_interval_secs =
                parse_var("KITSHOP_BONUS_PROCESS_INTERVAL_SECS", &secs)?;
        }
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_accrual_bps(self.bonus.accrual_bps)
            .map_err(|e| ConfigError::InvalidValue(format!("bonus.accrual_bps: {}", e)))?;

        if self.bonus.delay_days < 0 {
            return Err(ConfigError::InvalidValue(
                "bonus.delay_days must not be negative".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{}={}", key, value)))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.bonus.accrual_bps, 300);
        assert_eq!(config.bonus.delay_days, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [bonus]
            accrual_bps = 500
            process_interval_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.bonus.accrual_bps, 500);
        assert_eq!(config.bonus.delay_days, 10);
        assert!(config.bonus.process_interval().is_none());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(vars(&[
                ("KITSHOP_PORT", "9000"),
                ("KITSHOP_DATABASE_PATH", ":memory:"),
                ("KITSHOP_BONUS_ACCRUAL_BPS", "250"),
                ("KITSHOP_BONUS_PROCESS_INTERVAL_SECS", "60"),
            ]))
            .unwrap();

        assert_eq!(config.server.bind_address(), "0.0.0.0:9000");
        assert!(config.database.db_config().is_in_memory());
        assert_eq!(config.bonus.policy().accrual_rate.bps(), 250);
        assert_eq!(config.bonus.process_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(vars(&[("KITSHOP_PORT", "not-a-port")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.bonus.accrual_bps = 10_001;
        assert!(config.validate().is_err());

        config.bonus.accrual_bps = 300;
        config.bonus.delay_days = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = AppConfig::load_from(Some(Path::new("/nonexistent/kitshop.toml")), vars(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
