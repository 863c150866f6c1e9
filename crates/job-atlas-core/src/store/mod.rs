//! Storage abstraction for Job Atlas.
//!
//! [`OfferStore`] and [`SkillStore`] cover every read and write the
//! pipeline performs. Both rely on "insert, ignore conflict" semantics:
//! uniqueness of offer URLs and skill names is enforced by the backend and
//! nothing is ever upserted.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::models::{Offer, Skill};
use crate::taxonomy::Category;

/// Storage failure.
///
/// [`StoreError::ConnectionLost`] is the one variant callers must not
/// swallow: batch loops log and continue on everything else but re-raise
/// this.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage connection lost: {0}")]
    ConnectionLost(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, StoreError::ConnectionLost(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Number of skills per category label, plus the uncategorized remainder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    pub by_category: Vec<(Category, i64)>,
    pub uncategorized: i64,
}

/// Offer persistence.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`known_urls`](OfferStore::known_urls) | Every stored offer URL |
/// | [`insert_offer`](OfferStore::insert_offer) | Insert unless the URL exists |
/// | [`tech_stacks`](OfferStore::tech_stacks) | Non-empty tech-stack blobs |
/// | [`count_offers`](OfferStore::count_offers) | Total stored offers |
#[async_trait]
pub trait OfferStore: Send + Sync {
    async fn known_urls(&self) -> StoreResult<HashSet<String>>;

    /// Insert `offer`. Returns `false` when an offer with the same URL
    /// already existed and nothing was written.
    async fn insert_offer(&self, offer: &Offer) -> StoreResult<bool>;

    async fn tech_stacks(&self) -> StoreResult<Vec<String>>;

    async fn count_offers(&self) -> StoreResult<i64>;
}

/// Skill vocabulary persistence.
#[async_trait]
pub trait SkillStore: Send + Sync {
    /// Insert a skill by original name. Returns `false` when it already
    /// existed.
    async fn insert_skill(&self, name: &str) -> StoreResult<bool>;

    /// Delete every skill and reset id allocation.
    async fn clear_skills(&self) -> StoreResult<()>;

    /// Skills without a category, ordered by id, optionally capped.
    async fn uncategorized_skills(&self, limit: Option<usize>) -> StoreResult<Vec<Skill>>;

    async fn set_category(&self, id: i64, category: Category) -> StoreResult<()>;

    /// The first `limit` skills by id.
    async fn list_skills(&self, limit: usize) -> StoreResult<Vec<Skill>>;

    /// Up to `limit` skill names in `category`, ordered by id.
    async fn sample_skills(&self, category: Category, limit: usize) -> StoreResult<Vec<String>>;

    /// Per-category counts, largest first.
    async fn category_counts(&self) -> StoreResult<CategoryCounts>;
}
