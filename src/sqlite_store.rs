//! SQLite-backed [`OfferStore`] and [`SkillStore`].
//!
//! Every write is a single statement committed on its own; uniqueness is
//! left to the `offers.job_url` primary key and the
//! `skills.original_skill_name` unique constraint.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use job_atlas_core::models::{Offer, Skill};
use job_atlas_core::store::{CategoryCounts, OfferStore, SkillStore, StoreResult};
use job_atlas_core::taxonomy::Category;

use crate::db::store_error;

/// SQLite implementation of the store traits.
///
/// Holds an explicit [`SqlitePool`]; there is no process-wide handle.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn skill_from_row(row: &sqlx::sqlite::SqliteRow) -> Skill {
    let category: Option<String> = row.get("category");
    Skill {
        id: row.get("id"),
        original_name: row.get("original_skill_name"),
        canonical_name: row.get("canonical_skill_name"),
        category: category.as_deref().and_then(Category::from_label),
    }
}

#[async_trait]
impl OfferStore for SqliteStore {
    async fn known_urls(&self) -> StoreResult<HashSet<String>> {
        let urls: Vec<String> = sqlx::query_scalar("SELECT job_url FROM offers")
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(urls.into_iter().collect())
    }

    async fn insert_offer(&self, offer: &Offer) -> StoreResult<bool> {
        let s = &offer.salaries;
        let result = sqlx::query(
            r#"
            INSERT INTO offers (job_url, job_title, category, company, location,
                                salary_any, salary_b2b, salary_internship, salary_mandate,
                                salary_perm, salary_specific_task, work_type, experience,
                                employment_type, operating_mode, tech_stack)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_url) DO NOTHING
            "#,
        )
        .bind(&offer.url)
        .bind(&offer.title)
        .bind(&offer.category)
        .bind(&offer.company)
        .bind(&offer.location)
        .bind(&s.any)
        .bind(&s.b2b)
        .bind(&s.internship)
        .bind(&s.mandate)
        .bind(&s.permanent)
        .bind(&s.specific_task)
        .bind(&offer.work_type)
        .bind(&offer.experience)
        .bind(&offer.employment_type)
        .bind(&offer.operating_mode)
        .bind(&offer.tech_stack)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn tech_stacks(&self) -> StoreResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT tech_stack FROM offers WHERE tech_stack IS NOT NULL AND tech_stack != '' ORDER BY created_at, job_url",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)
    }

    async fn count_offers(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM offers")
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl SkillStore for SqliteStore {
    async fn insert_skill(&self, name: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO skills (original_skill_name) VALUES (?) ON CONFLICT(original_skill_name) DO NOTHING",
        )
        .bind(name)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_skills(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM skills")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        // Restart id allocation
        sqlx::query("DELETE FROM sqlite_sequence WHERE name = 'skills'")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn uncategorized_skills(&self, limit: Option<usize>) -> StoreResult<Vec<Skill>> {
        // SQLite treats a negative LIMIT as unbounded
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let rows = sqlx::query(
            r#"
            SELECT id, original_skill_name, canonical_skill_name, category
            FROM skills
            WHERE category IS NULL
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows.iter().map(skill_from_row).collect())
    }

    async fn set_category(&self, id: i64, category: Category) -> StoreResult<()> {
        sqlx::query("UPDATE skills SET category = ? WHERE id = ?")
            .bind(category.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn list_skills(&self, limit: usize) -> StoreResult<Vec<Skill>> {
        let rows = sqlx::query(
            "SELECT id, original_skill_name, canonical_skill_name, category FROM skills ORDER BY id LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(rows.iter().map(skill_from_row).collect())
    }

    async fn sample_skills(&self, category: Category, limit: usize) -> StoreResult<Vec<String>> {
        sqlx::query_scalar(
            "SELECT original_skill_name FROM skills WHERE category = ? ORDER BY id LIMIT ?",
        )
        .bind(category.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)
    }

    async fn category_counts(&self) -> StoreResult<CategoryCounts> {
        let rows: Vec<(Option<String>, i64)> =
            sqlx::query_as("SELECT category, COUNT(*) FROM skills GROUP BY category")
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;

        let mut counts: BTreeMap<Category, i64> = BTreeMap::new();
        let mut uncategorized = 0;
        for (label, n) in rows {
            match label {
                Some(label) => *counts.entry(Category::coerce(&label).0).or_default() += n,
                None => uncategorized += n,
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
