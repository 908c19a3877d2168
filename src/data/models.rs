//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{
    CanonicalPath, ConfigFormat, ConfigValue, Publication, Publishable, Sluggable, format_value,
};
use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Sites, users, redirects
// =============================================================================

/// A site served by this installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Site {
    pub id: String,
    pub domain: String,
    pub name: String,
}

/// An author account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: EntityId::new().0,
            username: username.into(),
            created_at: Utc::now(),
        }
    }
}

/// Old path to new path mapping, scoped to a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Redirect {
    pub id: String,
    pub site_id: String,
    pub old_path: String,
    pub new_path: String,
    pub created_at: DateTime<Utc>,
}

/// What a content save did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    /// true when the row did not exist before
    pub created: bool,
    /// Redirect recorded because the slug changed
    pub redirect: Option<Redirect>,
}

// =============================================================================
// Channel
// =============================================================================

/// A section of the site grouping articles
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Channel {
    pub id: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub publication: Publication,
    pub name: String,
    pub slug: String,
}

impl Channel {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        slug: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new().0,
            publication: Publication::new(user_id, now),
            name: name.into(),
            slug: slug.into(),
        }
    }
}

impl Publishable for Channel {
    fn publication(&self) -> &Publication {
        &self.publication
    }

    fn publication_mut(&mut self) -> &mut Publication {
        &mut self.publication
    }
}

impl Sluggable for Channel {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn site_id(&self) -> &str {
        &self.publication.site_id
    }

    fn canonical_path(&self) -> Option<&dyn CanonicalPath> {
        Some(self)
    }
}

impl CanonicalPath for Channel {
    fn absolute_path(&self) -> Result<String, AppError> {
        Ok(format!("/{}/", self.slug))
    }
}

// =============================================================================
// Article
// =============================================================================

/// A piece of content published inside a channel
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Article {
    pub id: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub publication: Publication,
    pub title: String,
    pub headline: Option<String>,
    pub slug: String,
    pub channel_id: Option<String>,
    /// Slug of `channel_id`, loaded alongside the article
    #[sqlx(default)]
    pub channel_slug: Option<String>,
}

impl Article {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        slug: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new().0,
            publication: Publication::new(user_id, now),
            title: title.into(),
            headline: None,
            slug: slug.into(),
            channel_id: None,
            channel_slug: None,
        }
    }

    pub fn in_channel(mut self, channel: &Channel) -> Self {
        self.channel_id = Some(channel.id.clone());
        self.channel_slug = Some(channel.slug.clone());
        self
    }

    pub fn with_headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = Some(headline.into());
        self
    }
}

impl Publishable for Article {
    fn publication(&self) -> &Publication {
        &self.publication
    }

    fn publication_mut(&mut self) -> &mut Publication {
        &mut self.publication
    }
}

impl Sluggable for Article {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn site_id(&self) -> &str {
        &self.publication.site_id
    }

    fn canonical_path(&self) -> Option<&dyn CanonicalPath> {
        Some(self)
    }
}

impl CanonicalPath for Article {
    fn absolute_path(&self) -> Result<String, AppError> {
        match &self.channel_slug {
            Some(channel_slug) => Ok(format!("/{}/{}", channel_slug, self.slug)),
            None => Err(AppError::Validation(format!(
                "article {} has no channel",
                self.slug
            ))),
        }
    }
}

// =============================================================================
// Box
// =============================================================================

/// Named slot pointing at an article and/or channel
///
/// References are cleared when the target is deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentBox {
    pub id: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub publication: Publication,
    pub name: String,
    pub slug: String,
    pub article_id: Option<String>,
    pub channel_id: Option<String>,
}

impl ContentBox {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        slug: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new().0,
            publication: Publication::new(user_id, now),
            name: name.into(),
            slug: slug.into(),
            article_id: None,
            channel_id: None,
        }
    }

    /// `"<slug>-<site name>"`
    pub fn display_name(&self, site: &Site) -> String {
        format!("{}-{}", self.slug, site.name)
    }
}

impl Publishable for ContentBox {
    fn publication(&self) -> &Publication {
        &self.publication
    }

    fn publication_mut(&mut self) -> &mut Publication {
        &mut self.publication
    }
}

// =============================================================================
// Config entries
// =============================================================================

/// Key/value configuration row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConfigEntry {
    pub id: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub publication: Publication,
    pub key_group: Option<String>,
    pub key: String,
    pub format: ConfigFormat,
    /// Raw value, interpreted according to `format`
    pub value: String,
    pub description: Option<String>,
    pub article_id: Option<String>,
    pub channel_id: Option<String>,
}

impl ConfigEntry {
    pub fn new(
        user_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new().0,
            publication: Publication::new(user_id, now),
            key_group: None,
            key: key.into(),
            format: ConfigFormat::Text,
            value: value.into(),
            description: None,
            article_id: None,
            channel_id: None,
        }
    }

    pub fn in_group(mut self, key_group: impl Into<String>) -> Self {
        self.key_group = Some(key_group.into());
        self
    }

    pub fn with_format(mut self, format: ConfigFormat) -> Self {
        self.format = format;
        self
    }

    pub fn for_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn for_article(mut self, article_id: impl Into<String>) -> Self {
        self.article_id = Some(article_id.into());
        self
    }

    /// The value interpreted according to `format`
    pub fn formatted(&self) -> Result<ConfigValue, AppError> {
        format_value(&self.value, self.format)
    }
}

impl std::fmt::Display for ConfigEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.key, self.value)
    }
}

impl Publishable for ConfigEntry {
    fn publication(&self) -> &Publication {
        &self.publication
    }

    fn publication_mut(&mut self) -> &mut Publication {
        &mut self.publication
    }
}
