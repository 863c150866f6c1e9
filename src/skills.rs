//! Skill vocabulary extraction.
//!
//! Reads every stored tech-stack blob, tokenizes them into one in-memory
//! set, and inserts each name that is not already in the `skills` table.

use anyhow::{Context, Result};
use tracing::{info, warn};

use job_atlas_core::store::{OfferStore, SkillStore};
use job_atlas_core::tech_stack::unique_skills;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub offers_scanned: usize,
    pub unique_skills: usize,
    pub inserted: usize,
    pub existing: usize,
    pub failed: usize,
}

/// Populate the vocabulary from stored offers.
///
/// With `clear_first`, the vocabulary (and its categories) is wiped before
/// inserting. Only use that for a full rebuild.
pub async fn extract_skills(
    offers: &dyn OfferStore,
    skills: &dyn SkillStore,
    clear_first: bool,
) -> Result<ExtractReport> {
    if clear_first {
        warn!("clearing skill vocabulary before extraction");
        skills
            .clear_skills()
            .await
            .context("Failed to clear skills")?;
    }

    let blobs = offers
        .tech_stacks()
        .await
        .context("Failed to read tech stacks")?;
    let names = unique_skills(blobs.iter().map(String::as_str));
    info!(offers = blobs.len(), unique = names.len(), "tokenized tech stacks");

    let mut report = ExtractReport {
        offers_scanned: blobs.len(),
        unique_skills: names.len(),
        ..Default::default()
    };

    for name in &names {
        match skills.insert_skill(name).await {
            Ok(true) => report.inserted += 1,
            Ok(false) => report.existing += 1,
            Err(e) if e.is_connection_lost() => return Err(e.into()),
            Err(e) => {
                report.failed += 1;
                warn!(skill = %name, "failed to insert skill: {e:#}");
            }
        }
    }

    Ok(report)
}

pub async fn run_extract(config: &Config, clear_first: bool) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let report = extract_skills(&store, &store, clear_first).await?;

    println!("skills extract");
    println!("  offers scanned: {}", report.offers_scanned);
    println!("  unique skills: {}", report.unique_skills);
    println!("  inserted: {}", report.inserted);
    println!("  already present: {}", report.existing);
    if report.failed > 0 {
        println!("  failed: {}", report.failed);
    }
    println!("ok");

    store.pool().close().await;
    Ok(())
}

/// Print the first `limit` skills.
pub async fn run_sample(config: &Config, limit: usize) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let sample = store.list_skills(limit).await?;
    println!("skills sample ({} shown)", sample.len());
    for skill in &sample {
        let category = skill.category.map(|c| c.as_str()).unwrap_or("-");
        println!("  {:>5} | {} | {}", skill.id, skill.original_name, category);
    }
    println!("ok");

    store.pool().close().await;
    Ok(())
}
