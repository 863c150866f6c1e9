//! Database statistics.
//!
//! Summarizes what the pipeline has stored so far: offers, skill
//! vocabulary size, categorization coverage, and the category
//! distribution with a few example skills. Used by `atlas stats`.

use anyhow::Result;

use job_atlas_core::store::{OfferStore, SkillStore};
use job_atlas_core::taxonomy::Category;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

const SAMPLED_CATEGORIES: usize = 5;
const SAMPLES_PER_CATEGORY: usize = 3;

pub struct Stats {
    pub offers: i64,
    pub categorized: i64,
    pub uncategorized: i64,
    /// Largest first.
    pub distribution: Vec<(Category, i64)>,
    pub samples: Vec<(Category, Vec<String>)>,
}

impl Stats {
    pub fn skills(&self) -> i64 {
        self.categorized + self.uncategorized
    }
}

pub async fn collect_stats(offers: &dyn OfferStore, skills: &dyn SkillStore) -> Result<Stats> {
    let offer_count = offers.count_offers().await?;
    let counts = skills.category_counts().await?;

    let mut samples = Vec::new();
    for (category, _) in counts.by_category.iter().take(SAMPLED_CATEGORIES) {
        let names = skills
            .sample_skills(*category, SAMPLES_PER_CATEGORY)
            .await?;
        samples.push((*category, names));
    }

    Ok(Stats {
        offers: offer_count,
        categorized: counts.by_category.iter().map(|(_, n)| n).sum(),
        uncategorized: counts.uncategorized,
        distribution: counts.by_category,
        samples,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let stats = collect_stats(&store, &store).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Job Atlas Database Stats");
    println!("========================");
    println!();
    println!("  Database:       {}", config.db.path.display());
    println!("  Size:           {}", format_bytes(db_size));
    println!();
    println!("  Offers:         {}", stats.offers);
    println!("  Skills:         {}", stats.skills());
    println!(
        "  Categorized:    {} / {} ({}%)",
        stats.categorized,
        stats.skills(),
        if stats.skills() > 0 {
            (stats.categorized * 100) / stats.skills()
        } else {
            0
        }
    );
    println!("  Uncategorized:  {}", stats.uncategorized);

    if !stats.distribution.is_empty() {
        println!();
        println!("  By category:");
        println!("  {:<28} {:>6}", "CATEGORY", "SKILLS");
        println!("  {}", "-".repeat(35));
        for (category, n) in &stats.distribution {
            println!("  {:<28} {:>6}", category.as_str(), n);
        }
    }

    if !stats.samples.is_empty() {
        println!();
        println!("  Samples:");
        for (category, names) in &stats.samples {
            println!("  {:<28} {}", category.as_str(), names.join(", "));
        }
    }

    println!();

    store.pool().close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use job_atlas_core::models::Offer;
    use job_atlas_core::store::memory::InMemoryStore;

    #[tokio::test]
    async fn summarizes_coverage_and_top_categories() {
        let store = InMemoryStore::new();
        store.insert_offer(&Offer::new("https://j.test/job-offer/1")).await.unwrap();

        let labelled = [
            ("PostgreSQL", Some(Category::Database)),
            ("MySQL", Some(Category::Database)),
            ("Redis", Some(Category::Database)),
            ("Oracle", Some(Category::Database)),
            ("Rust", Some(Category::ProgrammingLanguage)),
            ("Jira", None),
        ];
        for (i, (name, category)) in labelled.iter().enumerate() {
            store.insert_skill(name).await.unwrap();
            if let Some(c) = category {
                store.set_category(i as i64 + 1, *c).await.unwrap();
            }
        }

        let stats = collect_stats(&store, &store).await.unwrap();
        assert_eq!(stats.offers, 1);
        assert_eq!(stats.skills(), 6);
        assert_eq!(stats.categorized, 5);
        assert_eq!(stats.uncategorized, 1);
        assert_eq!(stats.distribution[0], (Category::Database, 4));
        assert_eq!(stats.samples[0].1, vec!["PostgreSQL", "MySQL", "Redis"]);
        assert_eq!(stats.samples[1], (Category::ProgrammingLanguage, vec!["Rust".to_string()]));
    }

    #[tokio::test]
    async fn empty_database() {
        let store = InMemoryStore::new();
        let stats = collect_stats(&store, &store).await.unwrap();
        assert_eq!(stats.skills(), 0);
        assert!(stats.distribution.is_empty());
        assert!(stats.samples.is_empty());
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
    }
}
