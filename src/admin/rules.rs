//! Declarative admin rule table
//!
//! Rules are keyed by `"<app>.<AdminName>"`. Keys are matched
//! case-insensitively since configuration sources may fold case.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::config::AdminConfig;
use crate::error::AppError;

/// A titled group of form fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fieldset {
    #[serde(default)]
    pub name: Option<String>,
    pub fields: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
}

/// Overrides for one admin definition
///
/// Every present field replaces the admin's value outright.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminRule {
    #[serde(default)]
    pub fieldsets: Option<Vec<Fieldset>>,
    #[serde(default)]
    pub list_display: Option<Vec<String>>,
    #[serde(default)]
    pub list_filter: Option<Vec<String>>,
    #[serde(default)]
    pub search_fields: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub raw_id_fields: Option<Vec<String>>,
    #[serde(default)]
    pub prepopulated_fields: Option<BTreeMap<String, Vec<String>>>,
    #[serde(default)]
    pub readonly_fields: Option<Vec<String>>,
    /// field name -> attribute name -> value, applied when the form is built
    #[serde(default)]
    pub field_overrides: Option<BTreeMap<String, BTreeMap<String, serde_json::Value>>>,
    /// Registry name of the form to use
    #[serde(default)]
    pub form: Option<String>,
    /// Registry names of the inlines to use
    #[serde(default)]
    pub inlines: Option<Vec<String>>,
    /// Any other attribute, passed through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// All admin rules, looked up by app label and admin name
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, AdminRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `"<app>.<AdminName>"`
    pub fn key(app: &str, admin_name: &str) -> String {
        format!("{app}.{admin_name}")
    }

    pub fn from_map(rules: HashMap<String, AdminRule>) -> Self {
        let mut table = Self::new();
        for (key, rule) in rules {
            table.insert(&key, rule);
        }
        table
    }

    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let rules: HashMap<String, AdminRule> = serde_json::from_str(raw)
            .map_err(|e| AppError::Config(format!("invalid admin rules (json): {e}")))?;
        Ok(Self::from_map(rules))
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, AppError> {
        let rules: HashMap<String, AdminRule> = serde_yaml::from_str(raw)
            .map_err(|e| AppError::Config(format!("invalid admin rules (yaml): {e}")))?;
        Ok(Self::from_map(rules))
    }

    /// Load a `.json`, `.yaml` or `.yml` rule file
    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read admin rules {}: {e}", path.display()))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&raw),
            _ => Err(AppError::Config(format!(
                "admin rules file must be .json, .yaml or .yml: {}",
                path.display()
            ))),
        }
    }

    /// Rules from `admin.rules_path` overlaid with the inline `admin.rules`
    pub fn from_config(config: &AdminConfig) -> Result<Self, AppError> {
        let mut table = match &config.rules_path {
            Some(path) => Self::from_path(path)?,
            None => Self::new(),
        };
        for (key, rule) in &config.rules {
            table.insert(key, rule.clone());
        }

        tracing::debug!(rules = table.len(), "Admin rule table loaded");
        Ok(table)
    }

    pub fn insert(&mut self, key: &str, rule: AdminRule) {
        self.rules.insert(key.to_ascii_lowercase(), rule);
    }

    pub fn get(&self, app: &str, admin_name: &str) -> Option<&AdminRule> {
        self.rules
            .get(&Self::key(app, admin_name).to_ascii_lowercase())
    }

    /// Normalized rule keys, sorted
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
