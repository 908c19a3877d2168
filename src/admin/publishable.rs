//! Admins for publishable content
//!
//! The base definition lists title, availability and published state and
//! hides the author, which `save_model` fills from the acting user.

use super::model_admin::ModelAdmin;
use super::registry::{FormField, FormSpec};
use crate::data::{ContentRecord, Database, SaveOutcome, User};
use crate::error::AppError;

/// Base admin for publishable content
pub fn publishable_admin(app: &str, name: &str) -> ModelAdmin {
    ModelAdmin::new(app, name)
        .list_display(&["title", "date_available", "published"])
        .list_filter(&["date_available", "published"])
        .search_fields(&["title", "slug", "headline"])
        .exclude(&["user_id"])
}

/// Save from the admin.
///
/// A record that is not stored yet gets `current_user` as author.
/// Existing records keep their author.
pub async fn save_model<T: ContentRecord>(
    db: &Database,
    current_user: &User,
    obj: &mut T,
) -> Result<SaveOutcome, AppError> {
    if !db.exists::<T>(obj.id()).await? {
        obj.publication_mut().user_id = current_user.id.clone();
    }

    let outcome = db.save(obj).await?;
    tracing::info!(
        table = T::TABLE,
        id = %obj.id(),
        user = %current_user.username,
        created = outcome.created,
        "Saved from admin"
    );
    Ok(outcome)
}

/// Admins for the built-in content types
pub fn builtin_admins() -> Vec<ModelAdmin> {
    vec![
        ModelAdmin::new("channels", "ChannelAdmin")
            .list_display(&["name", "slug", "date_available", "published"])
            .list_filter(&["date_available", "published"])
            .search_fields(&["name", "slug"])
            .exclude(&["user_id"])
            .prepopulated("slug", &["name"])
            .form(|| {
                FormSpec::with_fields(
                    "ChannelForm",
                    &["user_id", "site_id", "name", "slug", "date_available", "published"],
                )
            }),
        publishable_admin("articles", "ArticleAdmin")
            .prepopulated("slug", &["title"])
            .raw_id_fields(&["channel_id"])
            .form(|| {
                FormSpec::new("ArticleForm")
                    .field(FormField::new("user_id"))
                    .field(FormField::new("site_id"))
                    .field(FormField::new("title").attr("required", serde_json::json!(true)))
                    .field(FormField::new("slug"))
                    .field(FormField::new("headline"))
                    .field(FormField::new("channel_id"))
                    .field(FormField::new("date_available"))
                    .field(FormField::new("published"))
            }),
        ModelAdmin::new("boxes", "BoxAdmin")
            .list_display(&["name", "slug", "site_id", "date_available", "published"])
            .list_filter(&["site_id", "published"])
            .search_fields(&["name", "slug"])
            .exclude(&["user_id"])
            .raw_id_fields(&["article_id", "channel_id"])
            .prepopulated("slug", &["name"])
            .form(|| {
                FormSpec::with_fields(
                    "BoxForm",
                    &[
                        "user_id",
                        "site_id",
                        "name",
                        "slug",
                        "article_id",
                        "channel_id",
                        "date_available",
                        "published",
                    ],
                )
            }),
        ModelAdmin::new("config", "ConfigAdmin")
            .list_display(&["key", "key_group", "format", "value", "published"])
            .list_filter(&["key_group", "format", "site_id"])
            .search_fields(&["key", "value", "description"])
            .exclude(&["user_id"])
            .raw_id_fields(&["article_id", "channel_id"])
            .form(|| {
                FormSpec::with_fields(
                    "ConfigForm",
                    &[
                        "user_id",
                        "site_id",
                        "key_group",
                        "key",
                        "format",
                        "value",
                        "description",
                        "article_id",
                        "channel_id",
                        "date_available",
                        "published",
                    ],
                )
            }),
    ]
}
