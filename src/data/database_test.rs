//! Database tests

use super::*;
use crate::content::{ConfigFormat, ConfigScope, ConfigValue, Publishable, Timestamped};
use crate::error::AppError;
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

/// Helper to create an author
async fn create_user(db: &Database, username: &str) -> User {
    let user = User::new(username);
    db.insert_user(&user).await.unwrap();
    user
}

fn at(hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

#[tokio::test]
async fn test_database_connection() {
    let (db, _temp_dir) = create_test_db().await;

    let site = db.get_site("default").await.unwrap();
    assert!(site.is_some(), "default site is seeded by the migration");
}

#[tokio::test]
async fn test_default_site_follows_configuration() {
    let (db, _temp_dir) = create_test_db().await;

    let site = db
        .ensure_default_site("news.example.com", "Daily News")
        .await
        .unwrap();
    assert_eq!(site.id, "default");

    let stored = db.get_site("default").await.unwrap().unwrap();
    assert_eq!(stored.domain, "news.example.com");
    assert_eq!(stored.name, "Daily News");
}

#[tokio::test]
async fn test_user_insert_and_get() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let retrieved = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(retrieved.username, "editor");

    let duplicate = db.insert_user(&User::new("editor")).await;
    assert!(matches!(duplicate, Err(AppError::UniquenessViolation(_))));
}

// =============================================================================
// Publishing
// =============================================================================

#[tokio::test]
async fn test_all_published_respects_window() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut live = Channel::new(&user.id, "World", "world", at(8));
    live.publish();
    db.save_at(&mut live, at(8)).await.unwrap();

    let mut scheduled = Channel::new(&user.id, "Sports", "sports", at(8));
    scheduled.publication.date_available = at(12);
    scheduled.publish();
    db.save_at(&mut scheduled, at(8)).await.unwrap();

    let mut draft = Channel::new(&user.id, "Drafts", "drafts", at(8));
    db.save_at(&mut draft, at(8)).await.unwrap();

    let at_ten: Vec<Channel> = db.all_published_at(at(10)).await.unwrap();
    assert_eq!(at_ten.len(), 1);
    assert_eq!(at_ten[0].slug, "world");

    // Availability boundary is inclusive
    let at_noon: Vec<Channel> = db.all_published_at(at(12)).await.unwrap();
    let slugs: Vec<&str> = at_noon.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs, vec!["sports", "world"]);
    assert!(at_noon[0].is_published_at(at(12)));
}

#[tokio::test]
async fn test_set_published() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut first = Channel::new(&user.id, "World", "world", at(8));
    let mut second = Channel::new(&user.id, "Sports", "sports", at(8));
    db.save_at(&mut first, at(8)).await.unwrap();
    db.save_at(&mut second, at(8)).await.unwrap();

    let ids = vec![first.id.clone(), second.id.clone(), "missing".to_string()];
    let updated = db.set_published::<Channel>(&ids, true, at(9)).await.unwrap();
    assert_eq!(updated, 2);

    let stored: Channel = db.get(&first.id).await.unwrap().unwrap();
    assert!(stored.publication.published);
    assert_eq!(stored.date_update(), at(9));
    assert_eq!(stored.date_insert(), at(8));

    assert_eq!(db.set_published::<Channel>(&[], true, at(9)).await.unwrap(), 0);
}

// =============================================================================
// Saving
// =============================================================================

#[tokio::test]
async fn test_update_keeps_author_site_and_insert_time() {
    let (db, _temp_dir) = create_test_db().await;
    let author = create_user(&db, "author").await;
    let other = create_user(&db, "other").await;

    let mut channel = Channel::new(&author.id, "World", "world", at(8));
    let outcome = db.save_at(&mut channel, at(8)).await.unwrap();
    assert!(outcome.created);
    assert!(outcome.redirect.is_none());

    channel.publication.user_id = other.id.clone();
    channel.publication.timestamps.date_insert = at(1);
    channel.name = "World News".to_string();
    let outcome = db.save_at(&mut channel, at(9)).await.unwrap();
    assert!(!outcome.created);

    let stored: Channel = db.get(&channel.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "World News");
    assert_eq!(stored.publication.user_id, author.id);
    assert_eq!(stored.publication.site_id, "default");
    assert_eq!(stored.date_insert(), at(8));
    assert_eq!(stored.date_update(), at(9));
    assert_eq!(channel.publication.user_id, author.id);
}

#[tokio::test]
async fn test_update_never_moves_date_update_before_insert() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();
    db.save_at(&mut channel, at(7)).await.unwrap();

    let stored: Channel = db.get(&channel.id).await.unwrap().unwrap();
    assert_eq!(stored.date_update(), at(8));
}

#[tokio::test]
async fn test_invalid_slug_rejected_before_write() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut channel = Channel::new(&user.id, "World", "world news", at(8));
    let result = db.save_at(&mut channel, at(8)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(!db.exists::<Channel>(&channel.id).await.unwrap());
}

#[tokio::test]
async fn test_duplicate_slug_is_uniqueness_violation() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut first = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut first, at(8)).await.unwrap();

    let mut second = Channel::new(&user.id, "World again", "world", at(8));
    let result = db.save_at(&mut second, at(8)).await;
    assert!(matches!(result, Err(AppError::UniquenessViolation(_))));
}

// =============================================================================
// Redirects
// =============================================================================

#[tokio::test]
async fn test_slug_change_records_one_redirect() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();
    assert!(db.list_redirects("default").await.unwrap().is_empty());

    // Saving without a slug change records nothing
    db.save_at(&mut channel, at(9)).await.unwrap();
    assert!(db.list_redirects("default").await.unwrap().is_empty());

    channel.slug = "world-news".to_string();
    let outcome = db.save_at(&mut channel, at(10)).await.unwrap();
    let redirect = outcome.redirect.expect("slug change records a redirect");
    assert_eq!(redirect.old_path, "/world/");
    assert_eq!(redirect.new_path, "/world-news/");

    let redirects = db.list_redirects("default").await.unwrap();
    assert_eq!(redirects.len(), 1);
    assert_eq!(redirects[0], redirect);
    assert!(db.find_redirect("default", "/world/").await.unwrap().is_some());
}

#[tokio::test]
async fn test_article_redirect_uses_channel_path() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();

    let mut article = Article::new(&user.id, "Elections", "elections", at(8)).in_channel(&channel);
    db.save_at(&mut article, at(8)).await.unwrap();

    article.slug = "elections-2024".to_string();
    let outcome = db.save_at(&mut article, at(9)).await.unwrap();
    let redirect = outcome.redirect.unwrap();
    assert_eq!(redirect.old_path, "/world/elections");
    assert_eq!(redirect.new_path, "/world/elections-2024");

    let stored: Article = db.get(&article.id).await.unwrap().unwrap();
    assert_eq!(stored.channel_slug.as_deref(), Some("world"));
}

#[tokio::test]
async fn test_article_without_channel_renames_by_raw_slug() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut article = Article::new(&user.id, "Orphan", "orphan", at(8));
    db.save_at(&mut article, at(8)).await.unwrap();

    article.slug = "orphan-story".to_string();
    let outcome = db.save_at(&mut article, at(9)).await.unwrap();
    let redirect = outcome.redirect.expect("rename records a redirect");
    assert_eq!(redirect.old_path, "orphan");
    assert_eq!(redirect.new_path, "orphan-story");

    let stored: Article = db.get(&article.id).await.unwrap().unwrap();
    assert_eq!(stored.slug, "orphan-story");
    assert_eq!(db.list_redirects("default").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_article_gaining_channel_redirects_from_raw_slug() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut article = Article::new(&user.id, "Orphan", "orphan", at(8));
    db.save_at(&mut article, at(8)).await.unwrap();

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();

    article.channel_id = Some(channel.id.clone());
    article.slug = "found".to_string();
    let outcome = db.save_at(&mut article, at(9)).await.unwrap();
    let redirect = outcome.redirect.unwrap();
    assert_eq!(redirect.old_path, "orphan");
    assert_eq!(redirect.new_path, "/world/found");
}

#[tokio::test]
async fn test_article_with_unknown_channel_rejected() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut article = Article::new(&user.id, "Ghost", "ghost", at(8));
    article.channel_id = Some("no-such-channel".to_string());
    let result = db.save_at(&mut article, at(8)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_redirect_collision_rejects_save() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();
    channel.slug = "world-news".to_string();
    db.save_at(&mut channel, at(9)).await.unwrap();

    // "/world/" is now a redirect source
    let mut newcomer = Channel::new(&user.id, "World", "world", at(10));
    let result = db.save_at(&mut newcomer, at(10)).await;
    match result {
        Err(AppError::Validation(message)) => assert_eq!(message, REDIRECT_COLLISION_MESSAGE),
        other => panic!("expected collision, got {other:?}"),
    }
    assert!(!db.exists::<Channel>(&newcomer.id).await.unwrap());
    assert_eq!(db.list_redirects("default").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_redirect_collision_checked_on_stored_site() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut renamed = Channel::new(&user.id, "Taken", "taken", at(8));
    db.save_at(&mut renamed, at(8)).await.unwrap();
    renamed.slug = "moved".to_string();
    db.save_at(&mut renamed, at(9)).await.unwrap();

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();

    // The site is fixed at first save, so the check must not follow the edit
    channel.publication.site_id = "other".to_string();
    channel.slug = "taken".to_string();
    let result = db.save_at(&mut channel, at(10)).await;
    match result {
        Err(AppError::Validation(message)) => assert_eq!(message, REDIRECT_COLLISION_MESSAGE),
        other => panic!("expected collision, got {other:?}"),
    }

    let stored: Channel = db.get(&channel.id).await.unwrap().unwrap();
    assert_eq!(stored.slug, "world");
    assert_eq!(stored.publication.site_id, "default");
    assert_eq!(db.list_redirects("default").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_save_leaves_no_redirect() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut taken = Channel::new(&user.id, "Sports", "sports", at(8));
    db.save_at(&mut taken, at(8)).await.unwrap();

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();

    // Renaming onto a taken slug fails on the update, after the redirect insert
    channel.slug = "sports".to_string();
    let result = db.save_at(&mut channel, at(9)).await;
    assert!(matches!(result, Err(AppError::UniquenessViolation(_))));

    assert!(db.list_redirects("default").await.unwrap().is_empty());
    let stored: Channel = db.get(&channel.id).await.unwrap().unwrap();
    assert_eq!(stored.slug, "world");
}

// =============================================================================
// Boxes and deletion
// =============================================================================

#[tokio::test]
async fn test_box_references_cleared_on_delete() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;
    let site = db.get_site("default").await.unwrap().unwrap();

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();
    let mut article = Article::new(&user.id, "Elections", "elections", at(8)).in_channel(&channel);
    db.save_at(&mut article, at(8)).await.unwrap();

    let mut content_box = ContentBox::new(&user.id, "Front page", "front-page", at(8));
    content_box.article_id = Some(article.id.clone());
    content_box.channel_id = Some(channel.id.clone());
    db.save_at(&mut content_box, at(8)).await.unwrap();
    assert_eq!(content_box.display_name(&site), format!("front-page-{}", site.name));

    assert!(db.delete::<Article>(&article.id).await.unwrap());
    let stored: ContentBox = db.get(&content_box.id).await.unwrap().unwrap();
    assert!(stored.article_id.is_none());
    assert_eq!(stored.channel_id.as_deref(), Some(channel.id.as_str()));

    assert!(db.delete::<Channel>(&channel.id).await.unwrap());
    let stored: ContentBox = db.get(&content_box.id).await.unwrap().unwrap();
    assert!(stored.channel_id.is_none());

    assert!(!db.delete::<Channel>(&channel.id).await.unwrap());
}

// =============================================================================
// Config entries
// =============================================================================

async fn save_config(db: &Database, mut entry: ConfigEntry, now: chrono::DateTime<Utc>) -> ConfigEntry {
    entry.publish();
    db.save_at(&mut entry, now).await.unwrap();
    entry
}

#[tokio::test]
async fn test_get_value_missing_key_is_none() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    save_config(&db, ConfigEntry::new(&user.id, "empty", "", at(8)), at(8)).await;

    let scope = ConfigScope::new();
    assert_eq!(db.get_value_at("missing", &scope, at(9)).await.unwrap(), None);
    assert_eq!(
        db.get_value_at("empty", &scope, at(9)).await.unwrap(),
        Some(ConfigValue::Text(String::new()))
    );
}

#[tokio::test]
async fn test_get_value_formats() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    save_config(
        &db,
        ConfigEntry::new(&user.id, "limits", r#"{"per_page": 10}"#, at(8))
            .with_format(ConfigFormat::Json),
        at(8),
    )
    .await;
    save_config(
        &db,
        ConfigEntry::new(&user.id, "raw-limits", r#"{"per_page": 10}"#, at(8)),
        at(8),
    )
    .await;
    save_config(
        &db,
        ConfigEntry::new(&user.id, "menu", "- home\n- world\n", at(8)).with_format(ConfigFormat::Yaml),
        at(8),
    )
    .await;
    save_config(
        &db,
        ConfigEntry::new(&user.id, "broken", "{not json", at(8)).with_format(ConfigFormat::Json),
        at(8),
    )
    .await;

    let scope = ConfigScope::new();
    assert_eq!(
        db.get_value_at("limits", &scope, at(9)).await.unwrap(),
        Some(ConfigValue::Structured(serde_json::json!({"per_page": 10})))
    );
    assert_eq!(
        db.get_value_at("raw-limits", &scope, at(9)).await.unwrap(),
        Some(ConfigValue::Text(r#"{"per_page": 10}"#.to_string()))
    );
    assert_eq!(
        db.get_value_at("menu", &scope, at(9)).await.unwrap(),
        Some(ConfigValue::Structured(serde_json::json!(["home", "world"])))
    );
    assert!(matches!(
        db.get_value_at("broken", &scope, at(9)).await,
        Err(AppError::Parse { format: "json", .. })
    ));
}

#[tokio::test]
async fn test_get_value_latest_wins_and_skips_unpublished() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();

    save_config(&db, ConfigEntry::new(&user.id, "color", "blue", at(8)), at(8)).await;
    save_config(
        &db,
        ConfigEntry::new(&user.id, "color", "red", at(9)).for_channel(&channel.id),
        at(9),
    )
    .await;

    let mut draft = ConfigEntry::new(&user.id, "color", "green", at(10)).in_group("theme");
    db.save_at(&mut draft, at(10)).await.unwrap();

    let mut later = ConfigEntry::new(&user.id, "color", "black", at(8)).in_group("print");
    later.publication.date_available = at(20);
    save_config(&db, later, at(11)).await;

    let any = ConfigScope::new();
    assert_eq!(
        db.get_value_at("color", &any, at(12)).await.unwrap(),
        Some(ConfigValue::Text("red".to_string()))
    );

    let site_wide = ConfigScope::new().site("default").group("theme");
    assert_eq!(db.get_value_at("color", &site_wide, at(12)).await.unwrap(), None);

    let by_channel = ConfigScope::new().channel(&channel.id);
    assert_eq!(
        db.get_value_at("color", &by_channel, at(12)).await.unwrap(),
        Some(ConfigValue::Text("red".to_string()))
    );

    let by_format = ConfigScope::new().format(ConfigFormat::Json);
    assert_eq!(db.get_value_at("color", &by_format, at(12)).await.unwrap(), None);

    assert_eq!(
        db.get_value_at("color", &any, at(21)).await.unwrap(),
        Some(ConfigValue::Text("black".to_string()))
    );
}

#[tokio::test]
async fn test_get_values_by_group() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    save_config(
        &db,
        ConfigEntry::new(&user.id, "primary", "blue", at(8)).in_group("theme"),
        at(8),
    )
    .await;
    save_config(
        &db,
        ConfigEntry::new(&user.id, "fonts", r#"["serif"]"#, at(8))
            .in_group("theme")
            .with_format(ConfigFormat::Json),
        at(8),
    )
    .await;
    save_config(
        &db,
        ConfigEntry::new(&user.id, "unrelated", "x", at(8)).in_group("other"),
        at(8),
    )
    .await;

    let values = db
        .get_values_at("theme", &ConfigScope::new(), at(9))
        .await
        .unwrap()
        .expect("group has values");
    assert_eq!(values.len(), 2);
    assert_eq!(values["primary"], ConfigValue::Text("blue".to_string()));
    assert_eq!(
        values["fonts"],
        ConfigValue::Structured(serde_json::json!(["serif"]))
    );

    assert_eq!(
        db.get_values_at("missing", &ConfigScope::new(), at(9)).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_get_values_later_rows_win() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut channel = Channel::new(&user.id, "World", "world", at(8));
    db.save_at(&mut channel, at(8)).await.unwrap();

    save_config(
        &db,
        ConfigEntry::new(&user.id, "primary", "blue", at(8)).in_group("theme"),
        at(8),
    )
    .await;
    save_config(
        &db,
        ConfigEntry::new(&user.id, "primary", "red", at(9))
            .in_group("theme")
            .for_channel(&channel.id),
        at(9),
    )
    .await;

    let values = db
        .get_values_at("theme", &ConfigScope::new(), at(10))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values["primary"], ConfigValue::Text("red".to_string()));
}

#[tokio::test]
async fn test_config_scope_tuple_is_unique() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    save_config(&db, ConfigEntry::new(&user.id, "color", "blue", at(8)), at(8)).await;

    let mut same_scope = ConfigEntry::new(&user.id, "color", "red", at(9));
    let result = db.save_at(&mut same_scope, at(9)).await;
    assert!(matches!(result, Err(AppError::UniquenessViolation(_))));

    // Same key in another group is a distinct entry
    let mut grouped = ConfigEntry::new(&user.id, "color", "red", at(9)).in_group("theme");
    db.save_at(&mut grouped, at(9)).await.unwrap();
}

#[tokio::test]
async fn test_invalid_config_key_rejected() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let mut entry = ConfigEntry::new(&user.id, "bad key", "x", at(8));
    assert!(matches!(
        db.save_at(&mut entry, at(8)).await,
        Err(AppError::Validation(_))
    ));

    let mut entry = ConfigEntry::new(&user.id, "ok", "x", at(8)).in_group("bad group");
    assert!(matches!(
        db.save_at(&mut entry, at(8)).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn test_is_published_tracks_clock() {
    let (db, _temp_dir) = create_test_db().await;
    let user = create_user(&db, "editor").await;

    let now = Utc::now();
    let mut entry = ConfigEntry::new(&user.id, "soon", "x", now);
    entry.publication.date_available = now + Duration::hours(1);
    entry.publish();
    db.save(&mut entry).await.unwrap();

    let stored: ConfigEntry = db.get(&entry.id).await.unwrap().unwrap();
    assert!(!stored.is_published());
    assert!(stored.is_published_at(now + Duration::hours(1)));
    assert_eq!(stored.to_string(), "soon-x");
}
