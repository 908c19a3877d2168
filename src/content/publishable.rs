use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Id of the site every publishable record belongs to unless told otherwise
pub const DEFAULT_SITE_ID: &str = "default";

/// Creation and modification times of a record
///
/// `date_insert` is written once; `date_update` never goes below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Timestamps {
    pub date_insert: DateTime<Utc>,
    pub date_update: DateTime<Utc>,
}

impl Timestamps {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            date_insert: now,
            date_update: now,
        }
    }

    /// Mark the record as modified at `now`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.date_update = now.max(self.date_insert);
    }
}

/// Publication state shared by all publishable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Publication {
    /// Author account (fixed at first save)
    pub user_id: String,
    /// Owning site (fixed at first save)
    pub site_id: String,
    /// Instant from which the record may be shown
    pub date_available: DateTime<Utc>,
    pub published: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Publication {
    /// Unpublished, available from `now`, on the default site
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            site_id: DEFAULT_SITE_ID.to_string(),
            date_available: now,
            published: false,
            timestamps: Timestamps::new(now),
        }
    }

    /// Live at `instant`: published and not scheduled for later.
    /// The availability boundary is inclusive.
    pub fn is_published_at(&self, instant: DateTime<Utc>) -> bool {
        self.published && self.date_available <= instant
    }
}

/// Read access to a record's timestamps
pub trait Timestamped {
    fn timestamps(&self) -> &Timestamps;

    fn date_insert(&self) -> DateTime<Utc> {
        self.timestamps().date_insert
    }

    fn date_update(&self) -> DateTime<Utc> {
        self.timestamps().date_update
    }
}

/// Content that carries a `Publication`
pub trait Publishable {
    fn publication(&self) -> &Publication;

    fn publication_mut(&mut self) -> &mut Publication;

    /// Evaluated against the clock on every call
    fn is_published(&self) -> bool {
        self.is_published_at(Utc::now())
    }

    fn is_published_at(&self, instant: DateTime<Utc>) -> bool {
        self.publication().is_published_at(instant)
    }

    fn publish(&mut self) {
        self.publication_mut().published = true;
    }

    fn unpublish(&mut self) {
        self.publication_mut().published = false;
    }
}

impl<T: Publishable> Timestamped for T {
    fn timestamps(&self) -> &Timestamps {
        &self.publication().timestamps
    }
}
