//! Slugs, canonical paths and redirect planning

use crate::error::AppError;

/// Longest slug accepted by `validate_slug`
pub const MAX_SLUG_LENGTH: usize = 150;

/// Capability: the record can compute its externally addressable path
pub trait CanonicalPath {
    /// Path such as `/news/some-article`.
    ///
    /// Returns `AppError::Validation` when the path cannot be computed
    /// from the record's current state.
    fn absolute_path(&self) -> Result<String, AppError>;
}

/// Content identified by a unique slug
pub trait Sluggable {
    fn slug(&self) -> &str;

    /// Site redirects are scoped to
    fn site_id(&self) -> &str;

    /// `Some` when the record can compute a canonical path.
    /// Without it no redirect checks or redirects happen.
    fn canonical_path(&self) -> Option<&dyn CanonicalPath> {
        None
    }
}

/// Redirect to create when a stored record's slug changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPlan {
    pub site_id: String,
    pub old_path: String,
    pub new_path: String,
}

/// Accept `[A-Za-z0-9_-]+` up to `MAX_SLUG_LENGTH` characters
pub fn validate_slug(field: &str, slug: &str) -> Result<(), AppError> {
    if slug.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    if slug.chars().count() > MAX_SLUG_LENGTH {
        return Err(AppError::Validation(format!(
            "{field} must be at most {MAX_SLUG_LENGTH} characters"
        )));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(format!(
            "{field} may only contain letters, numbers, underscores or hyphens: {slug}"
        )));
    }
    Ok(())
}

/// Path checked against existing redirects before a save.
///
/// `None` when the record has no canonical path. A path that cannot be
/// computed falls back to the raw slug.
pub fn intended_path(entity: &dyn Sluggable) -> Result<Option<String>, AppError> {
    let Some(resolver) = entity.canonical_path() else {
        return Ok(None);
    };

    match resolver.absolute_path() {
        Ok(path) => Ok(Some(path)),
        Err(AppError::Validation(reason)) => {
            tracing::debug!(
                slug = %entity.slug(),
                %reason,
                "Canonical path unavailable; checking redirects against raw slug"
            );
            Ok(Some(entity.slug().to_string()))
        }
        Err(error) => Err(error),
    }
}

/// Decide whether saving `current` over `stored` needs a redirect.
///
/// A path that cannot be computed falls back to the raw slug on that
/// side of the rename.
pub fn plan_redirect(
    stored: &dyn Sluggable,
    current: &dyn Sluggable,
) -> Result<Option<RedirectPlan>, AppError> {
    if stored.slug() == current.slug() {
        return Ok(None);
    }

    let (Some(old_resolver), Some(new_resolver)) =
        (stored.canonical_path(), current.canonical_path())
    else {
        return Ok(None);
    };

    let old_path = match old_resolver.absolute_path() {
        Ok(path) => path,
        Err(AppError::Validation(_)) => stored.slug().to_string(),
        Err(error) => return Err(error),
    };
    let new_path = match new_resolver.absolute_path() {
        Ok(path) => path,
        Err(AppError::Validation(_)) => current.slug().to_string(),
        Err(error) => return Err(error),
    };

    Ok(Some(RedirectPlan {
        site_id: current.site_id().to_string(),
        old_path,
        new_path,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Page {
        slug: String,
        section: Option<String>,
    }

    impl Sluggable for Page {
        fn slug(&self) -> &str {
            &self.slug
        }

        fn site_id(&self) -> &str {
            "default"
        }

        fn canonical_path(&self) -> Option<&dyn CanonicalPath> {
            Some(self)
        }
    }

    impl CanonicalPath for Page {
        fn absolute_path(&self) -> Result<String, AppError> {
            match &self.section {
                Some(section) => Ok(format!("/{}/{}", section, self.slug)),
                None => Err(AppError::Validation("page has no section".to_string())),
            }
        }
    }

    struct Tag(String);

    impl Sluggable for Tag {
        fn slug(&self) -> &str {
            &self.0
        }

        fn site_id(&self) -> &str {
            "default"
        }
    }

    fn page(slug: &str, section: Option<&str>) -> Page {
        Page {
            slug: slug.to_string(),
            section: section.map(str::to_string),
        }
    }

    #[test]
    fn slug_validation() {
        assert!(validate_slug("slug", "hello-world_2").is_ok());
        assert!(validate_slug("slug", "").is_err());
        assert!(validate_slug("slug", "with space").is_err());
        assert!(validate_slug("slug", "a/b").is_err());
        assert!(validate_slug("slug", &"a".repeat(MAX_SLUG_LENGTH + 1)).is_err());
    }

    #[test]
    fn intended_path_falls_back_to_slug() {
        assert_eq!(
            intended_path(&page("a", Some("news"))).unwrap(),
            Some("/news/a".to_string())
        );
        assert_eq!(intended_path(&page("a", None)).unwrap(), Some("a".to_string()));
        assert_eq!(intended_path(&Tag("a".to_string())).unwrap(), None);
    }

    #[test]
    fn unchanged_slug_plans_nothing() {
        let plan = plan_redirect(&page("a", Some("news")), &page("a", Some("sport"))).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn renamed_slug_plans_redirect() {
        let plan = plan_redirect(&page("a", Some("news")), &page("b", Some("news")))
            .unwrap()
            .expect("rename must redirect");
        assert_eq!(plan.old_path, "/news/a");
        assert_eq!(plan.new_path, "/news/b");
        assert_eq!(plan.site_id, "default");
    }

    #[test]
    fn old_path_failure_uses_raw_slug() {
        let plan = plan_redirect(&page("a", None), &page("b", Some("news")))
            .unwrap()
            .expect("rename must redirect");
        assert_eq!(plan.old_path, "a");
        assert_eq!(plan.new_path, "/news/b");
    }

    #[test]
    fn new_path_failure_uses_raw_slug() {
        let plan = plan_redirect(&page("a", Some("news")), &page("b", None))
            .unwrap()
            .expect("rename must redirect");
        assert_eq!(plan.old_path, "/news/a");
        assert_eq!(plan.new_path, "b");

        let plan = plan_redirect(&page("a", None), &page("b", None))
            .unwrap()
            .expect("rename must redirect");
        assert_eq!(plan.old_path, "a");
        assert_eq!(plan.new_path, "b");
    }

    #[test]
    fn types_without_paths_never_redirect() {
        let plan = plan_redirect(&Tag("a".to_string()), &Tag("b".to_string())).unwrap();
        assert!(plan.is_none());
    }
}
