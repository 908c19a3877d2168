//! opps-core - content models and admin layer of the Opps CMS
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Admin Layer                           │
//! │  - Rule table applied at registration                       │
//! │  - Form/inline registry                                     │
//! │  - Author-stamping save, mass publish actions               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Content Layer                          │
//! │  - Publication window, slugs and redirects                  │
//! │  - Keyed configuration values                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Data Layer                            │
//! │  - SQLite (sqlx)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `admin`: admin definitions, rule table and actions
//! - `content`: content capabilities shared by all content types
//! - `data`: database and models
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod admin;
pub mod config;
pub mod content;
pub mod data;
pub mod error;
pub mod metrics;

use std::sync::Arc;

/// Shared application state
///
/// Cheap to clone; hands out the database and the admin site built at
/// startup.
#[derive(Clone)]
pub struct Core {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Default site as configured
    pub site: Arc<data::Site>,

    /// Admin site with rules applied
    pub admin: Arc<admin::AdminSite>,
}

impl Core {
    /// Initialize application state with the built-in admins
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        Self::with_registry(config, admin::AdminRegistry::new(), admin::builtin_admins()).await
    }

    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Refresh the default site
    /// 3. Load the admin rule table
    /// 4. Register admins, applying their rules
    ///
    /// # Errors
    /// Returns error if any initialization step fails. Rules naming an
    /// unregistered form or inline fail here, at startup.
    pub async fn with_registry(
        config: config::AppConfig,
        registry: admin::AdminRegistry,
        admins: Vec<admin::ModelAdmin>,
    ) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = data::Database::connect(&config.database.path).await?;

        // 2. Refresh the default site
        let site = db
            .ensure_default_site(&config.site.domain, config.site.display_name())
            .await?;

        // 3. Load the admin rule table
        let rules = admin::RuleTable::from_config(&config.admin)?;

        // 4. Register admins
        let mut admin_site = admin::AdminSite::new(rules, registry);
        for model_admin in admins {
            admin_site.register(model_admin)?;
        }

        let unused = admin_site.unused_rules();
        if !unused.is_empty() {
            tracing::warn!(rules = ?unused, "Admin rules matched no registered admin");
        }

        tracing::info!(
            admins = admin_site.len(),
            "Application state initialized successfully"
        );

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            site: Arc::new(site),
            admin: Arc::new(admin_site),
        })
    }
}
