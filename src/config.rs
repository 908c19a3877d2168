//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{collections::HashMap, path::PathBuf};

use crate::admin::AdminRule;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub site: SiteConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Default site configuration
///
/// Applied to the well-known default site at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Public domain (e.g., "news.example.com")
    pub domain: String,
    /// Display name (defaults to the domain)
    pub name: Option<String>,
}

impl SiteConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.domain)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

/// Admin override configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdminConfig {
    /// Inline rule table keyed by "<app>.<AdminName>"
    #[serde(default)]
    pub rules: HashMap<String, AdminRule>,
    /// Optional JSON or YAML file holding additional rules
    pub rules_path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (OPPS__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("database.path", "data/opps.db")?
            .set_default("site.domain", "example.com")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("OPPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.site.domain.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "site.domain must not be empty".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                self.logging.format
            )));
        }

        if let Some(path) = &self.admin.rules_path {
            if !path.exists() {
                return Err(crate::error::AppError::Config(format!(
                    "admin.rules_path does not exist: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}
