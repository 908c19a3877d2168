//! Admin site: the set of registered admins

use std::collections::{BTreeMap, HashSet};

use super::model_admin::ModelAdmin;
use super::registry::AdminRegistry;
use super::rules::RuleTable;
use crate::error::AppError;
use crate::metrics::ADMIN_RULES_APPLIED_TOTAL;

/// Registered admins with their rules applied
#[derive(Debug)]
pub struct AdminSite {
    rules: RuleTable,
    registry: AdminRegistry,
    admins: BTreeMap<String, ModelAdmin>,
    applied: HashSet<String>,
}

impl AdminSite {
    pub fn new(rules: RuleTable, registry: AdminRegistry) -> Self {
        Self {
            rules,
            registry,
            admins: BTreeMap::new(),
            applied: HashSet::new(),
        }
    }

    /// Register an admin, applying its rule if the table has one
    ///
    /// # Errors
    /// - `Config` when an admin with the same key is already registered
    /// - `Lookup` when the rule names an unregistered form or inline
    pub fn register(&mut self, admin: ModelAdmin) -> Result<&ModelAdmin, AppError> {
        let key = admin.key();
        if self.admins.contains_key(&key) {
            return Err(AppError::Config(format!("admin already registered: {key}")));
        }

        let admin = match self.rules.get(admin.app(), admin.name()) {
            Some(rule) => {
                let admin = admin
                    .with_rule(rule, &self.registry)
                    .map_err(|e| e.observe("admin_register"))?;
                self.applied.insert(key.to_ascii_lowercase());
                ADMIN_RULES_APPLIED_TOTAL.inc();
                tracing::info!(admin = %key, "Admin rule applied");
                admin
            }
            None => admin,
        };

        tracing::debug!(admin = %key, "Admin registered");
        Ok(self.admins.entry(key).or_insert(admin))
    }

    pub fn get(&self, app: &str, name: &str) -> Option<&ModelAdmin> {
        self.admins.get(&RuleTable::key(app, name))
    }

    /// Registered admins ordered by key
    pub fn admins(&self) -> impl Iterator<Item = &ModelAdmin> {
        self.admins.values()
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }

    /// Rule keys that matched no registered admin, usually typos
    pub fn unused_rules(&self) -> Vec<&str> {
        self.rules
            .keys()
            .into_iter()
            .filter(|key| !self.applied.contains(*key))
            .collect()
    }
}
