//! Configuration loading with layered overrides.
//!
//! Config is loaded in order (each layer overrides the previous):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. CLI arguments

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::resolver::DEFAULT_FANOUT_CONCURRENCY;

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub resolver: Resolver,
    #[serde(default)]
    pub log: Log,
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data.db".to_string()
}

/// Permission resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolver {
    /// How many resources the fan-out resolves at once.
    #[serde(default = "default_fanout_concurrency")]
    pub fanout_concurrency: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            fanout_concurrency: default_fanout_concurrency(),
        }
    }
}

fn default_fanout_concurrency() -> usize {
    DEFAULT_FANOUT_CONCURRENCY
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Builder for loading configuration with customizable options.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix (e.g., "MYAPP" -> MYAPP_LOG_LEVEL)
    pub env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            env_prefix: "WARDEN".to_string(),
        }
    }
}

impl ConfigLoader {
    /// Create a new config loader with the given environment prefix.
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
        }
    }

    /// Load configuration from file, environment, and CLI arguments.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `cli_database_url` - CLI override for database URL
    /// * `cli_fanout_concurrency` - CLI override for fan-out concurrency
    /// * `cli_log_level` - CLI override for the log filter
    pub fn load(
        &self,
        config_path: Option<&Path>,
        cli_database_url: Option<&str>,
        cli_fanout_concurrency: Option<usize>,
        cli_log_level: Option<&str>,
    ) -> crate::Result<Config> {
        // Start with file config or defaults
        let mut config: Config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?
        } else {
            Config::default()
        };

        // Override with environment variables
        let prefix = &self.env_prefix;

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(concurrency) = std::env::var(format!("{prefix}_FANOUT_CONCURRENCY"))
            && let Ok(n) = concurrency.parse()
        {
            config.resolver.fanout_concurrency = n;
        }
        if let Ok(level) = std::env::var(format!("{prefix}_LOG_LEVEL")) {
            config.log.level = level;
        }
        if let Ok(json) = std::env::var(format!("{prefix}_LOG_JSON"))
            && let Ok(b) = json.parse()
        {
            config.log.json = b;
        }

        // Override with CLI arguments
        if let Some(url) = cli_database_url {
            config.database.url = url.to_string();
        }
        if let Some(n) = cli_fanout_concurrency {
            config.resolver.fanout_concurrency = n;
        }
        if let Some(level) = cli_log_level {
            config.log.level = level.to_string();
        }

        // Validate
        if config.resolver.fanout_concurrency == 0 {
            return Err(Error::Config(
                "resolver.fanout_concurrency must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}
