//! Error types for opps-core
//!
//! All errors in the crate are converted to `AppError`.
//! Validation and uniqueness failures are user-visible and block the
//! operation; nothing here is transient, so nothing is retried.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found
    #[error("Resource not found")]
    NotFound,

    /// Pre-save validation failed (e.g. path shadowed by a redirect)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Duplicate value rejected by a storage-level unique constraint
    #[error("Uniqueness violation: {0}")]
    UniquenessViolation(String),

    /// Stored config value does not parse in its declared format
    #[error("Failed to parse {format} value: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// Admin form/inline name not present in the registry
    #[error("Admin lookup failed: {0}")]
    Lookup(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Stable label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Validation(_) => "validation",
            AppError::UniquenessViolation(_) => "uniqueness",
            AppError::Parse { .. } => "parse",
            AppError::Lookup(_) => "lookup",
            AppError::Database(_) => "database",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether the error should be shown to the admin user as-is
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::UniquenessViolation(_) | AppError::NotFound
        )
    }

    /// Record the error in the error counter
    pub(crate) fn observe(self, operation: &str) -> Self {
        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[self.kind(), operation])
            .inc();
        self
    }
}

/// Map a write failure, turning unique-constraint violations into
/// `UniquenessViolation`
pub(crate) fn map_write_error(table: &str, error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            return AppError::UniquenessViolation(format!(
                "{table}: {}",
                db_error.message()
            ));
        }
    }
    AppError::Database(error)
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
