//! In-memory [`OfferStore`] / [`SkillStore`] for tests and dry runs.
//!
//! Uses `BTreeMap`s behind `std::sync::RwLock`. [`InMemoryStore::close`]
//! makes every later call fail with [`StoreError::ConnectionLost`], the
//! same way a closed SQLite pool behaves.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::{Offer, Skill};
use crate::taxonomy::Category;

use super::{CategoryCounts, OfferStore, SkillStore, StoreError, StoreResult};

#[derive(Default)]
struct SkillTable {
    next_id: i64,
    rows: BTreeMap<i64, Skill>,
    by_name: HashMap<String, i64>,
}

/// In-memory store.
pub struct InMemoryStore {
    offers: RwLock<BTreeMap<String, Offer>>,
    skills: RwLock<SkillTable>,
    closed: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            offers: RwLock::new(BTreeMap::new()),
            skills: RwLock::new(SkillTable {
                next_id: 1,
                ..Default::default()
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// Simulate a dropped connection.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Snapshot of a stored offer.
    pub fn offer(&self, url: &str) -> Option<Offer> {
        self.offers.read().ok()?.get(url).cloned()
    }

    /// Snapshot of every skill, ordered by id.
    pub fn skills(&self) -> Vec<Skill> {
        self.skills
            .read()
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::ConnectionLost("in-memory store closed".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Other(anyhow::anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl OfferStore for InMemoryStore {
    async fn known_urls(&self) -> StoreResult<HashSet<String>> {
        self.check_open()?;
        let offers = self.offers.read().map_err(poisoned)?;
        Ok(offers.keys().cloned().collect())
    }

    async fn insert_offer(&self, offer: &Offer) -> StoreResult<bool> {
        self.check_open()?;
        let mut offers = self.offers.write().map_err(poisoned)?;
        if offers.contains_key(&offer.url) {
            return Ok(false);
        }
        offers.insert(offer.url.clone(), offer.clone());
        Ok(true)
    }

    async fn tech_stacks(&self) -> StoreResult<Vec<String>> {
        self.check_open()?;
        let offers = self.offers.read().map_err(poisoned)?;
        Ok(offers
            .values()
            .filter_map(|o| o.tech_stack.clone())
            .filter(|t| !t.is_empty())
            .collect())
    }

    async fn count_offers(&self) -> StoreResult<i64> {
        self.check_open()?;
        Ok(self.offers.read().map_err(poisoned)?.len() as i64)
    }
}

#[async_trait]
impl SkillStore for InMemoryStore {
    async fn insert_skill(&self, name: &str) -> StoreResult<bool> {
        self.check_open()?;
        let mut table = self.skills.write().map_err(poisoned)?;
        if table.by_name.contains_key(name) {
            return Ok(false);
        }
        let id = table.next_id;
        table.next_id += 1;
        table.by_name.insert(name.to_string(), id);
        table.rows.insert(
            id,
            Skill {
                id,
                original_name: name.to_string(),
                canonical_name: None,
                category: None,
            },
        );
        Ok(true)
    }

    async fn clear_skills(&self) -> StoreResult<()> {
        self.check_open()?;
        let mut table = self.skills.write().map_err(poisoned)?;
        *table = SkillTable {
            next_id: 1,
            ..Default::default()
        };
        Ok(())
    }

    async fn uncategorized_skills(&self, limit: Option<usize>) -> StoreResult<Vec<Skill>> {
        self.check_open()?;
        let table = self.skills.read().map_err(poisoned)?;
        Ok(table
            .rows
            .values()
            .filter(|s| s.category.is_none())
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn set_category(&self, id: i64, category: Category) -> StoreResult<()> {
        self.check_open()?;
        let mut table = self.skills.write().map_err(poisoned)?;
        if let Some(skill) = table.rows.get_mut(&id) {
            skill.category = Some(category);
        }
        Ok(())
    }

    async fn list_skills(&self, limit: usize) -> StoreResult<Vec<Skill>> {
        self.check_open()?;
        let table = self.skills.read().map_err(poisoned)?;
        Ok(table.rows.values().take(limit).cloned().collect())
    }

    async fn sample_skills(&self, category: Category, limit: usize) -> StoreResult<Vec<String>> {
        self.check_open()?;
        let table = self.skills.read().map_err(poisoned)?;
        Ok(table
            .rows
            .values()
            .filter(|s| s.category == Some(category))
            .take(limit)
            .map(|s| s.original_name.clone())
            .collect())
    }

    async fn category_counts(&self) -> StoreResult<CategoryCounts> {
        self.check_open()?;
        let table = self.skills.read().map_err(poisoned)?;
        let mut counts: BTreeMap<Category, i64> = BTreeMap::new();
        let mut uncategorized = 0;
        for skill in table.rows.values() {
            match skill.category {
                Some(c) => *counts.entry(c).or_default() += 1,
                None => uncategorized += 1,
            }
        }
        let mut by_category: Vec<_> = counts.into_iter().collect();
        by_category.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        Ok(CategoryCounts {
            by_category,
            uncategorized,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offer_insert_is_ignore_on_conflict() {
        let store = InMemoryStore::new();
        let mut first = Offer::new("https://example.test/job-offer/a");
        first.title = Some("First".into());
        let mut second = first.clone();
        second.title = Some("Second".into());

        assert!(store.insert_offer(&first).await.unwrap());
        assert!(!store.insert_offer(&second).await.unwrap());
        assert_eq!(store.count_offers().await.unwrap(), 1);
        assert_eq!(store.offer(&first.url).unwrap().title.as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn skills_get_sequential_ids_and_reset_on_clear() {
        let store = InMemoryStore::new();
        assert!(store.insert_skill("Rust").await.unwrap());
        assert!(store.insert_skill("Go").await.unwrap());
        assert!(!store.insert_skill("Rust").await.unwrap());
        let ids: Vec<_> = store.skills().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);

        store.clear_skills().await.unwrap();
        assert!(store.insert_skill("Java").await.unwrap());
        assert_eq!(store.skills()[0].id, 1);
    }

    #[tokio::test]
    async fn uncategorized_respects_limit_and_category() {
        let store = InMemoryStore::new();
        for name in ["A", "B", "C"] {
            store.insert_skill(name).await.unwrap();
        }
        store.set_category(1, Category::Database).await.unwrap();
        let pending = store.uncategorized_skills(Some(1)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].original_name, "B");

        let counts = store.category_counts().await.unwrap();
        assert_eq!(counts.by_category, vec![(Category::Database, 1)]);
        assert_eq!(counts.uncategorized, 2);
    }

    #[tokio::test]
    async fn closed_store_reports_connection_lost() {
        let store = InMemoryStore::new();
        store.close();
        let err = store.known_urls().await.unwrap_err();
        assert!(err.is_connection_lost());
        assert!(store.insert_skill("x").await.unwrap_err().is_connection_lost());
    }
}
