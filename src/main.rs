//! opps binary entry point

use opps_core::{Core, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Initialize metrics
/// 4. Connect database and build the admin site
/// 5. Report what was registered
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    let default_filter = format!("opps_core={},opps={}", config.logging.level, config.logging.level);
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.clone().into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| default_filter.clone().into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!(
        domain = %config.site.domain,
        database = %config.database.path.display(),
        "Configuration loaded"
    );

    // 3. Initialize metrics
    opps_core::metrics::init_metrics();

    // 4. Initialize application state
    let core = Core::new(config).await?;

    // 5. Report
    for admin in core.admin.admins() {
        tracing::info!(
            admin = %admin.key(),
            list_display = ?admin.get_list_display(),
            inlines = admin.inlines().len(),
            "Admin registered"
        );
    }

    let published_articles = core
        .db
        .all_published::<opps_core::data::Article>()
        .await?
        .len();
    tracing::info!(
        site = %core.site.domain,
        published_articles,
        "Content layer ready"
    );
    tracing::debug!(metrics = %opps_core::metrics::render()?, "Metrics snapshot");

    Ok(())
}
