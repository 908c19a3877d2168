//! Admin layer
//!
//! - `rules`: the declarative rule table keyed by `"<app>.<AdminName>"`
//! - `registry`: named form and inline factories the rules refer to
//! - `model_admin`: immutable admin definitions and list/form helpers
//! - `site`: registration, which applies the rules once
//! - `publishable`: author-stamping save and the built-in admins
//! - `actions`: mass publish/unpublish

pub mod actions;
mod model_admin;
mod publishable;
mod registry;
mod rules;
mod site;

pub use actions::{ActionResult, publish_selected, unpublish_selected};
pub use model_admin::ModelAdmin;
pub use publishable::{builtin_admins, publishable_admin, save_model};
pub use registry::{AdminRegistry, FormFactory, FormField, FormSpec, InlineAdmin, InlineFactory, InlineType};
pub use rules::{AdminRule, Fieldset, RuleTable};
pub use site::AdminSite;
