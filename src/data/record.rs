//! Table bindings for content types
//!
//! `ContentRecord` tells the generic save/query paths in `Database`
//! where a content type lives and how to write it.

use sqlx::SqliteConnection;
use sqlx::sqlite::SqliteRow;

use super::models::*;
use crate::content::{Publishable, Sluggable, validate_slug};
use crate::error::{AppError, map_write_error};

/// A publishable content type stored in its own table
///
/// `SELECT` must alias the content table as `t`.
#[allow(async_fn_in_trait)]
pub trait ContentRecord: Publishable + for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    const SELECT: &'static str;

    fn id(&self) -> &str;

    /// Field checks run before any database access
    fn clean(&self) -> Result<(), AppError> {
        Ok(())
    }

    /// `Some` for types taking part in redirect-on-rename
    fn as_sluggable(&self) -> Option<&dyn Sluggable> {
        None
    }

    /// Refresh values derived from related rows before the save
    async fn resolve_relations(&mut self, _conn: &mut SqliteConnection) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), AppError>;

    /// Write mutable columns. Author, site and insert time are left alone.
    async fn update(&self, conn: &mut SqliteConnection) -> Result<(), AppError>;
}

// =============================================================================
// Channel
// =============================================================================

impl ContentRecord for Channel {
    const TABLE: &'static str = "channels";
    const SELECT: &'static str = "SELECT t.* FROM channels t";

    fn id(&self) -> &str {
        &self.id
    }

    fn clean(&self) -> Result<(), AppError> {
        validate_slug("slug", &self.slug)
    }

    fn as_sluggable(&self) -> Option<&dyn Sluggable> {
        Some(self)
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO channels (
                id, user_id, site_id, date_available, published,
                date_insert, date_update, name, slug
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.publication.user_id)
        .bind(&self.publication.site_id)
        .bind(self.publication.date_available)
        .bind(self.publication.published)
        .bind(self.publication.timestamps.date_insert)
        .bind(self.publication.timestamps.date_update)
        .bind(&self.name)
        .bind(&self.slug)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(Self::TABLE, e))?;

        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE channels
            SET date_available = ?, published = ?, date_update = ?, name = ?, slug = ?
            WHERE id = ?
            "#,
        )
        .bind(self.publication.date_available)
        .bind(self.publication.published)
        .bind(self.publication.timestamps.date_update)
        .bind(&self.name)
        .bind(&self.slug)
        .bind(&self.id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(Self::TABLE, e))?;

        Ok(())
    }
}

// =============================================================================
// Article
// =============================================================================

impl ContentRecord for Article {
    const TABLE: &'static str = "articles";
    const SELECT: &'static str = "SELECT t.*, c.slug AS channel_slug FROM articles t \
         LEFT JOIN channels c ON c.id = t.channel_id";

    fn id(&self) -> &str {
        &self.id
    }

    fn clean(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        validate_slug("slug", &self.slug)
    }

    fn as_sluggable(&self) -> Option<&dyn Sluggable> {
        Some(self)
    }

    async fn resolve_relations(&mut self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        self.channel_slug = match &self.channel_id {
            Some(channel_id) => {
                let slug = sqlx::query_scalar::<_, String>("SELECT slug FROM channels WHERE id = ?")
                    .bind(channel_id)
                    .fetch_optional(&mut *conn)
                    .await?;
                if slug.is_none() {
                    return Err(AppError::Validation(format!(
                        "channel does not exist: {channel_id}"
                    )));
                }
                slug
            }
            None => None,
        };

        Ok(())
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO articles (
                id, user_id, site_id, date_available, published,
                date_insert, date_update, title, headline, slug, channel_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.publication.user_id)
        .bind(&self.publication.site_id)
        .bind(self.publication.date_available)
        .bind(self.publication.published)
        .bind(self.publication.timestamps.date_insert)
        .bind(self.publication.timestamps.date_update)
        .bind(&self.title)
        .bind(&self.headline)
        .bind(&self.slug)
        .bind(&self.channel_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(Self::TABLE, e))?;

        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE articles
            SET date_available = ?, published = ?, date_update = ?,
                title = ?, headline = ?, slug = ?, channel_id = ?
            WHERE id = ?
            "#,
        )
        .bind(self.publication.date_available)
        .bind(self.publication.published)
        .bind(self.publication.timestamps.date_update)
        .bind(&self.title)
        .bind(&self.headline)
        .bind(&self.slug)
        .bind(&self.channel_id)
        .bind(&self.id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(Self::TABLE, e))?;

        Ok(())
    }
}

// =============================================================================
// Box
// =============================================================================

impl ContentRecord for ContentBox {
    const TABLE: &'static str = "boxes";
    const SELECT: &'static str = "SELECT t.* FROM boxes t";

    fn id(&self) -> &str {
        &self.id
    }

    fn clean(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        validate_slug("slug", &self.slug)
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO boxes (
                id, user_id, site_id, date_available, published,
                date_insert, date_update, name, slug, article_id, channel_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.publication.user_id)
        .bind(&self.publication.site_id)
        .bind(self.publication.date_available)
        .bind(self.publication.published)
        .bind(self.publication.timestamps.date_insert)
        .bind(self.publication.timestamps.date_update)
        .bind(&self.name)
        .bind(&self.slug)
        .bind(&self.article_id)
        .bind(&self.channel_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(Self::TABLE, e))?;

        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE boxes
            SET date_available = ?, published = ?, date_update = ?,
                name = ?, slug = ?, article_id = ?, channel_id = ?
            WHERE id = ?
            "#,
        )
        .bind(self.publication.date_available)
        .bind(self.publication.published)
        .bind(self.publication.timestamps.date_update)
        .bind(&self.name)
        .bind(&self.slug)
        .bind(&self.article_id)
        .bind(&self.channel_id)
        .bind(&self.id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(Self::TABLE, e))?;

        Ok(())
    }
}

// =============================================================================
// Config entries
// =============================================================================

impl ContentRecord for ConfigEntry {
    const TABLE: &'static str = "config_entries";
    const SELECT: &'static str = "SELECT t.* FROM config_entries t";

    fn id(&self) -> &str {
        &self.id
    }

    fn clean(&self) -> Result<(), AppError> {
        validate_slug("key", &self.key)?;
        if let Some(key_group) = &self.key_group {
            validate_slug("key_group", key_group)?;
        }
        Ok(())
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO config_entries (
                id, user_id, site_id, date_available, published,
                date_insert, date_update, key_group, key, format, value,
                description, article_id, channel_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&self.id)
        .bind(&self.publication.user_id)
        .bind(&self.publication.site_id)
        .bind(self.publication.date_available)
        .bind(self.publication.published)
        .bind(self.publication.timestamps.date_insert)
        .bind(self.publication.timestamps.date_update)
        .bind(&self.key_group)
        .bind(&self.key)
        .bind(self.format)
        .bind(&self.value)
        .bind(&self.description)
        .bind(&self.article_id)
        .bind(&self.channel_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(Self::TABLE, e))?;

        Ok(())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE config_entries
            SET date_available = ?, published = ?, date_update = ?,
                key_group = ?, key = ?, format = ?, value = ?, description = ?,
                article_id = ?, channel_id = ?
            WHERE id = ?
            "#,
        )
        .bind(self.publication.date_available)
        .bind(self.publication.published)
        .bind(self.publication.timestamps.date_update)
        .bind(&self.key_group)
        .bind(&self.key)
        .bind(self.format)
        .bind(&self.value)
        .bind(&self.description)
        .bind(&self.article_id)
        .bind(&self.channel_id)
        .bind(&self.id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_write_error(Self::TABLE, e))?;

        Ok(())
    }
}
