//! Admin actions for bulk operations

use chrono::Utc;

use crate::data::{ContentRecord, Database};
use crate::error::AppError;
use crate::metrics::ADMIN_ACTIONS_TOTAL;

/// Result of executing an admin action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    /// Action completed for all items
    Success {
        message: String,
        affected_count: usize,
    },
    /// Action completed, but some selected items were skipped
    Warning {
        message: String,
        affected_count: usize,
        warnings: Vec<String>,
    },
}

impl ActionResult {
    /// Get the number of items affected by the action
    pub fn affected_count(&self) -> usize {
        match self {
            ActionResult::Success { affected_count, .. } => *affected_count,
            ActionResult::Warning { affected_count, .. } => *affected_count,
        }
    }

    /// Get the main message from the result
    pub fn message(&self) -> &str {
        match self {
            ActionResult::Success { message, .. } => message,
            ActionResult::Warning { message, .. } => message,
        }
    }
}

/// Mark the selected rows published
pub async fn publish_selected<T: ContentRecord>(
    db: &Database,
    ids: &[String],
) -> Result<ActionResult, AppError> {
    set_selected::<T>(db, ids, true, "publish_selected").await
}

/// Mark the selected rows unpublished
pub async fn unpublish_selected<T: ContentRecord>(
    db: &Database,
    ids: &[String],
) -> Result<ActionResult, AppError> {
    set_selected::<T>(db, ids, false, "unpublish_selected").await
}

async fn set_selected<T: ContentRecord>(
    db: &Database,
    ids: &[String],
    published: bool,
    action: &'static str,
) -> Result<ActionResult, AppError> {
    let affected = db
        .set_published::<T>(ids, published, Utc::now())
        .await
        .map_err(|e| e.observe(action))? as usize;

    ADMIN_ACTIONS_TOTAL
        .with_label_values(&[action, T::TABLE])
        .inc();

    let verb = if published { "published" } else { "unpublished" };
    let message = format!("Successfully {verb} {affected} {}", T::TABLE);

    let missing = ids.len().saturating_sub(affected);
    if missing > 0 {
        tracing::warn!(action, table = T::TABLE, missing, "Some selected items were not found");
        return Ok(ActionResult::Warning {
            message,
            affected_count: affected,
            warnings: vec![format!("{missing} selected item(s) not found")],
        });
    }

    Ok(ActionResult::Success {
        message,
        affected_count: affected,
    })
}
