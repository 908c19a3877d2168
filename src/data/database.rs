//! SQLite database operations
//!
//! All database access goes through this module.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use std::path::Path;

use super::models::*;
use super::record::ContentRecord;
use crate::content::{
    ConfigScope, ConfigValue, DEFAULT_SITE_ID, RedirectPlan, Timestamps,
    intended_path, plan_redirect,
};
use crate::error::{AppError, map_write_error};
use crate::metrics::{CONFIG_LOOKUPS_TOTAL, CONTENT_SAVES_TOTAL, REDIRECTS_CREATED_TOTAL};

/// Message shown when a save would shadow an existing redirect
pub const REDIRECT_COLLISION_MESSAGE: &str = "The URL already exists as a redirect";

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Underlying pool, for callers composing their own queries
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    // =========================================================================
    // Sites
    // =========================================================================

    /// Get site by ID
    pub async fn get_site(&self, id: &str) -> Result<Option<Site>, AppError> {
        let site = sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(site)
    }

    /// Create or update a site
    pub async fn upsert_site(&self, site: &Site) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sites (id, domain, name) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET domain = excluded.domain, name = excluded.name
            "#,
        )
        .bind(&site.id)
        .bind(&site.domain)
        .bind(&site.name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Point the default site at the configured domain
    pub async fn ensure_default_site(&self, domain: &str, name: &str) -> Result<Site, AppError> {
        let site = Site {
            id: DEFAULT_SITE_ID.to_string(),
            domain: domain.to_string(),
            name: name.to_string(),
        };
        self.upsert_site(&site).await?;

        tracing::info!(domain = %site.domain, name = %site.name, "Default site ready");
        Ok(site)
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, ?)")
            .bind(&user.id)
            .bind(&user.username)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error("users", e))?;

        Ok(())
    }

    /// Get user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    // =========================================================================
    // Redirects
    // =========================================================================

    /// Find the redirect whose source is `old_path` on a site
    pub async fn find_redirect(
        &self,
        site_id: &str,
        old_path: &str,
    ) -> Result<Option<Redirect>, AppError> {
        let redirect = sqlx::query_as::<_, Redirect>(
            "SELECT * FROM redirects WHERE site_id = ? AND old_path = ?",
        )
        .bind(site_id)
        .bind(old_path)
        .fetch_optional(&self.pool)
        .await?;

        Ok(redirect)
    }

    /// All redirects of a site, oldest first
    pub async fn list_redirects(&self, site_id: &str) -> Result<Vec<Redirect>, AppError> {
        let redirects = sqlx::query_as::<_, Redirect>(
            "SELECT * FROM redirects WHERE site_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(redirects)
    }

    /// Insert a redirect outside of a content save
    pub async fn insert_redirect(&self, redirect: &Redirect) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_redirect(&mut conn, redirect).await
    }

    // =========================================================================
    // Content (generic)
    // =========================================================================

    /// Get a content row by ID
    pub async fn get<T: ContentRecord>(&self, id: &str) -> Result<Option<T>, AppError> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_id(&mut conn, id).await
    }

    /// Whether a content row with this ID is stored
    pub async fn exists<T: ContentRecord>(&self, id: &str) -> Result<bool, AppError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", T::TABLE);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Rows live right now
    pub async fn all_published<T: ContentRecord>(&self) -> Result<Vec<T>, AppError> {
        self.all_published_at(Utc::now()).await
    }

    /// Rows live at `now`: published and available, newest availability first
    pub async fn all_published_at<T: ContentRecord>(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<T>, AppError> {
        let sql = format!(
            "{} WHERE t.published = 1 AND t.date_available <= ? \
             ORDER BY t.date_available DESC, t.id DESC",
            T::SELECT
        );
        let rows = sqlx::query_as::<_, T>(&sql)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Delete a content row; related references are cleared by the schema
    pub async fn delete<T: ContentRecord>(&self, id: &str) -> Result<bool, AppError> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the published flag on every listed row
    ///
    /// # Returns
    /// Number of rows updated
    pub async fn set_published<T: ContentRecord>(
        &self,
        ids: &[String],
        published: bool,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET published = ", T::TABLE));
        query
            .push_bind(published)
            .push(", date_update = MAX(date_insert, ")
            .push_bind(now)
            .push(") WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let result = query.build().execute(&self.pool).await?;

        tracing::info!(
            table = T::TABLE,
            published,
            requested = ids.len(),
            updated = result.rows_affected(),
            "Publication flag updated"
        );
        Ok(result.rows_affected())
    }

    /// Save a content row at the current time
    pub async fn save<T: ContentRecord>(&self, entity: &mut T) -> Result<SaveOutcome, AppError> {
        self.save_at(entity, Utc::now()).await
    }

    /// Save a content row
    ///
    /// # Steps
    /// 1. Field validation
    /// 2. Stored row: restore author/site/insert time and touch the
    ///    update time. New row: stamp timestamps
    /// 3. Redirect collision check for types with a canonical path,
    ///    on the site the row belongs to
    /// 4. Insert, or record a redirect if the slug changed and update
    ///
    /// Steps 2-4 share one transaction.
    ///
    /// # Errors
    /// - `Validation` when a field is invalid or the path is a redirect source
    /// - `UniquenessViolation` when a unique column collides
    pub async fn save_at<T: ContentRecord>(
        &self,
        entity: &mut T,
        now: DateTime<Utc>,
    ) -> Result<SaveOutcome, AppError> {
        entity.clean().map_err(|e| e.observe("save"))?;

        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<SaveOutcome, AppError> = async {
            entity.resolve_relations(&mut conn).await?;

            let stored: Option<T> = fetch_by_id(&mut conn, entity.id()).await?;
            match &stored {
                None => entity.publication_mut().timestamps = Timestamps::new(now),
                Some(stored) => {
                    let previous = stored.publication();
                    let publication = entity.publication_mut();
                    publication.user_id = previous.user_id.clone();
                    publication.site_id = previous.site_id.clone();
                    publication.timestamps = previous.timestamps.clone();
                    publication.timestamps.touch(now);
                }
            }

            // Checked against the site the row is written to
            if let Some(sluggable) = entity.as_sluggable() {
                if let Some(path) = intended_path(sluggable)? {
                    if redirect_exists(&mut conn, sluggable.site_id(), &path).await? {
                        return Err(AppError::Validation(
                            REDIRECT_COLLISION_MESSAGE.to_string(),
                        ));
                    }
                }
            }

            let Some(stored) = stored else {
                entity.insert(&mut conn).await?;
                return Ok(SaveOutcome {
                    created: true,
                    redirect: None,
                });
            };

            let plan = match (stored.as_sluggable(), entity.as_sluggable()) {
                (Some(previous), Some(current)) => plan_redirect(previous, current)?,
                _ => None,
            };
            let redirect = match plan {
                Some(plan) => {
                    let redirect = redirect_from_plan(plan, now);
                    insert_redirect(&mut conn, &redirect).await?;
                    Some(redirect)
                }
                None => None,
            };

            entity.update(&mut conn).await?;
            Ok(SaveOutcome {
                created: false,
                redirect,
            })
        }
        .await;

        match result {
            Ok(outcome) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;

                let operation = if outcome.created { "insert" } else { "update" };
                CONTENT_SAVES_TOTAL
                    .with_label_values(&[T::TABLE, operation])
                    .inc();
                if let Some(redirect) = &outcome.redirect {
                    REDIRECTS_CREATED_TOTAL.inc();
                    tracing::info!(
                        table = T::TABLE,
                        site_id = %redirect.site_id,
                        old_path = %redirect.old_path,
                        new_path = %redirect.new_path,
                        "Slug changed; redirect recorded"
                    );
                }
                tracing::debug!(table = T::TABLE, id = %entity.id(), operation, "Content saved");
                Ok(outcome)
            }
            Err(error) => {
                let rollback = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                if let Err(rollback_error) = rollback {
                    tracing::error!(
                        table = T::TABLE,
                        error = %rollback_error,
                        "Rollback failed; closing connection"
                    );
                    drop(conn.detach());
                }
                tracing::warn!(
                    table = T::TABLE,
                    id = %entity.id(),
                    error = %error,
                    "Content save rejected"
                );
                Err(error.observe("save"))
            }
        }
    }

    // =========================================================================
    // Config entries
    // =========================================================================

    /// Latest live value for `key` at the current time
    pub async fn get_value(
        &self,
        key: &str,
        scope: &ConfigScope,
    ) -> Result<Option<ConfigValue>, AppError> {
        self.get_value_at(key, scope, Utc::now()).await
    }

    /// Latest live value for `key` at `now`
    ///
    /// Among published, available rows matching `key` and every scope
    /// filter, the one inserted last wins.
    ///
    /// # Returns
    /// `None` when no row matches
    ///
    /// # Errors
    /// `Parse` when the winning row does not parse in its format
    pub async fn get_value_at(
        &self,
        key: &str,
        scope: &ConfigScope,
        now: DateTime<Utc>,
    ) -> Result<Option<ConfigValue>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(ConfigEntry::SELECT);
        query.push(" WHERE t.key = ").push_bind(key);
        push_live_filter(&mut query, now);
        push_scope_filters(&mut query, scope);
        query.push(" ORDER BY t.date_insert DESC, t.id DESC LIMIT 1");

        let entry = query
            .build_query_as::<ConfigEntry>()
            .fetch_optional(&self.pool)
            .await?;

        let Some(entry) = entry else {
            CONFIG_LOOKUPS_TOTAL.with_label_values(&["value", "miss"]).inc();
            tracing::debug!(key, "Config key not found");
            return Ok(None);
        };

        CONFIG_LOOKUPS_TOTAL.with_label_values(&["value", "hit"]).inc();
        entry
            .formatted()
            .map(Some)
            .map_err(|e| e.observe("get_value"))
    }

    /// Every live value in `key_group` at the current time
    pub async fn get_values(
        &self,
        key_group: &str,
        scope: &ConfigScope,
    ) -> Result<Option<BTreeMap<String, ConfigValue>>, AppError> {
        self.get_values_at(key_group, scope, Utc::now()).await
    }

    /// Every live value in `key_group` at `now`, keyed by config key
    ///
    /// All matching rows contribute. Rows are visited oldest first, so a
    /// key present on several rows ends up with the latest value.
    ///
    /// # Returns
    /// `None` when no row matches
    pub async fn get_values_at(
        &self,
        key_group: &str,
        scope: &ConfigScope,
        now: DateTime<Utc>,
    ) -> Result<Option<BTreeMap<String, ConfigValue>>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(ConfigEntry::SELECT);
        query.push(" WHERE t.key_group = ").push_bind(key_group);
        push_live_filter(&mut query, now);
        push_scope_filters(&mut query, scope);
        query.push(" ORDER BY t.date_insert ASC, t.id ASC");

        let entries = query
            .build_query_as::<ConfigEntry>()
            .fetch_all(&self.pool)
            .await?;

        if entries.is_empty() {
            CONFIG_LOOKUPS_TOTAL.with_label_values(&["group", "miss"]).inc();
            tracing::debug!(key_group, "Config group not found");
            return Ok(None);
        }

        CONFIG_LOOKUPS_TOTAL.with_label_values(&["group", "hit"]).inc();
        let mut values = BTreeMap::new();
        for entry in entries {
            let value = entry.formatted().map_err(|e| e.observe("get_values"))?;
            values.insert(entry.key, value);
        }

        Ok(Some(values))
    }
}

async fn fetch_by_id<T: ContentRecord>(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<T>, AppError> {
    let sql = format!("{} WHERE t.id = ?", T::SELECT);
    let row = sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}

async fn redirect_exists(
    conn: &mut SqliteConnection,
    site_id: &str,
    old_path: &str,
) -> Result<bool, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM redirects WHERE site_id = ? AND old_path = ?",
    )
    .bind(site_id)
    .bind(old_path)
    .fetch_one(&mut *conn)
    .await?;

    Ok(count > 0)
}

async fn insert_redirect(conn: &mut SqliteConnection, redirect: &Redirect) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO redirects (id, site_id, old_path, new_path, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&redirect.id)
    .bind(&redirect.site_id)
    .bind(&redirect.old_path)
    .bind(&redirect.new_path)
    .bind(redirect.created_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_write_error("redirects", e))?;

    Ok(())
}

fn redirect_from_plan(plan: RedirectPlan, now: DateTime<Utc>) -> Redirect {
    Redirect {
        id: EntityId::new().0,
        site_id: plan.site_id,
        old_path: plan.old_path,
        new_path: plan.new_path,
        created_at: now,
    }
}

fn push_live_filter(query: &mut QueryBuilder<'_, Sqlite>, now: DateTime<Utc>) {
    query
        .push(" AND t.published = 1 AND t.date_available <= ")
        .push_bind(now);
}

fn push_scope_filters(query: &mut QueryBuilder<'_, Sqlite>, scope: &ConfigScope) {
    if let Some(site_id) = &scope.site_id {
        query.push(" AND t.site_id = ").push_bind(site_id.clone());
    }
    if let Some(channel_id) = &scope.channel_id {
        query.push(" AND t.channel_id = ").push_bind(channel_id.clone());
    }
    if let Some(article_id) = &scope.article_id {
        query.push(" AND t.article_id = ").push_bind(article_id.clone());
    }
    if let Some(key_group) = &scope.key_group {
        query.push(" AND t.key_group = ").push_bind(key_group.clone());
    }
    if let Some(format) = scope.format {
        query.push(" AND t.format = ").push_bind(format);
    }
    if let Some(description) = &scope.description {
        query.push(" AND t.description = ").push_bind(description.clone());
    }
}
