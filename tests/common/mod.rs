//! Common test utilities for integration tests

use opps_core::{Core, admin, config};
use std::collections::HashMap;
use tempfile::TempDir;

/// Test environment backed by a temporary database
pub struct TestEnv {
    pub core: Core,
    pub _temp_dir: TempDir,
}

impl TestEnv {
    /// Create a test environment with the built-in admins and no rules
    pub async fn new() -> Self {
        Self::with_rules(HashMap::new()).await
    }

    /// Create a test environment with inline admin rules
    pub async fn with_rules(rules: HashMap<String, admin::AdminRule>) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir, rules);

        let core = Core::new(config).await.unwrap();

        Self {
            core,
            _temp_dir: temp_dir,
        }
    }

    /// Create an author account in the database
    pub async fn create_user(&self, username: &str) -> opps_core::data::User {
        let user = opps_core::data::User::new(username);
        self.core.db.insert_user(&user).await.unwrap();
        user
    }
}

/// Configuration pointing at a database inside `temp_dir`
pub fn test_config(
    temp_dir: &TempDir,
    rules: HashMap<String, admin::AdminRule>,
) -> config::AppConfig {
    config::AppConfig {
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        site: config::SiteConfig {
            domain: "news.test.example.com".to_string(),
            name: Some("Test News".to_string()),
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
        admin: config::AdminConfig {
            rules,
            rules_path: None,
        },
    }
}
