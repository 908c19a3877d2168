//! Content capabilities
//!
//! Concrete content types compose these pieces instead of inheriting
//! from a base model:
//! - `Timestamps`: insert/update times maintained by the save paths
//! - `Publication`: author, site, availability window and published flag
//! - `Sluggable` / `CanonicalPath`: unique slug with redirect-on-rename
//! - `ConfigValue` / `ConfigScope`: typed values of the keyed config store

mod config_value;
mod publishable;
mod sluggable;

pub use config_value::{ConfigFormat, ConfigScope, ConfigValue, format_value};
pub use publishable::{DEFAULT_SITE_ID, Publication, Publishable, Timestamped, Timestamps};
pub use sluggable::{
    CanonicalPath, MAX_SLUG_LENGTH, RedirectPlan, Sluggable, intended_path, plan_redirect,
    validate_slug,
};
