//! Typed values of the keyed configuration store

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Storage format of a config entry's raw value
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ConfigFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A config value interpreted according to its format
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// `text` values, returned unchanged
    Text(String),
    /// Parsed `json` or `yaml` values
    Structured(serde_json::Value),
}

impl ConfigValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    pub fn as_structured(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Text(_) => None,
            Self::Structured(value) => Some(value),
        }
    }
}

/// Interpret a raw stored value
pub fn format_value(value: &str, format: ConfigFormat) -> Result<ConfigValue, AppError> {
    match format {
        ConfigFormat::Text => Ok(ConfigValue::Text(value.to_string())),
        ConfigFormat::Json => serde_json::from_str(value)
            .map(ConfigValue::Structured)
            .map_err(|e| AppError::Parse {
                format: "json",
                message: e.to_string(),
            }),
        ConfigFormat::Yaml => serde_yaml::from_str(value)
            .map(ConfigValue::Structured)
            .map_err(|e| AppError::Parse {
                format: "yaml",
                message: e.to_string(),
            }),
    }
}

/// Equality filters narrowing a config lookup.
///
/// Unset fields do not constrain the lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigScope {
    pub site_id: Option<String>,
    pub channel_id: Option<String>,
    pub article_id: Option<String>,
    pub key_group: Option<String>,
    pub format: Option<ConfigFormat>,
    pub description: Option<String>,
}

impl ConfigScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    pub fn channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn article(mut self, article_id: impl Into<String>) -> Self {
        self.article_id = Some(article_id.into());
        self
    }

    pub fn group(mut self, key_group: impl Into<String>) -> Self {
        self.key_group = Some(key_group.into());
        self
    }

    pub fn format(mut self, format: ConfigFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
