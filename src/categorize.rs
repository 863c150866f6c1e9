//! Batch categorization of uncategorized skills.
//!
//! Pulls every skill whose category is unset, sends them to the model in
//! fixed-size batches, and writes back whatever the model answered. Each
//! batch tries the configured models in priority order and uses the first
//! that answers; a batch where every model fails is logged and skipped.
//! Because only uncategorized rows are fetched, re-running after a partial
//! failure picks up exactly what is left.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use job_atlas_core::fallback::{first_success, Fallback};
use job_atlas_core::models::Skill;
use job_atlas_core::prompt::{build_prompt, parse_response, SYSTEM_PROMPT};
use job_atlas_core::store::SkillStore;
use job_atlas_core::taxonomy::Category;

use crate::config::{Config, LlmConfig};
use crate::db;
use crate::llm::{create_backend, ChatBackend, ChatRequest};
use crate::pacing::{Pacer, TokioPacer};
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategorizeReport {
    pub fetched: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub categorized: usize,
    pub update_failures: usize,
}

pub struct Categorizer<'a> {
    backend: &'a dyn ChatBackend,
    llm: &'a LlmConfig,
    pacer: &'a dyn Pacer,
    batch_delay: Duration,
}

impl<'a> Categorizer<'a> {
    pub fn new(
        backend: &'a dyn ChatBackend,
        llm: &'a LlmConfig,
        pacer: &'a dyn Pacer,
        batch_delay: Duration,
    ) -> Self {
        Self {
            backend,
            llm,
            pacer,
            batch_delay,
        }
    }

    /// Ask the model chain about one batch. Returns the accepted
    /// assignments, or an empty map when every model failed.
    pub async fn categorize_batch(&self, batch: &[Skill]) -> BTreeMap<i64, Category> {
        let request = ChatRequest::user(self.llm, SYSTEM_PROMPT, build_prompt(batch));

        let outcome = first_success(self.llm.models.iter().map(String::as_str), |model| {
            let request = &request;
            async move { self.backend.invoke(model, request).await }
        })
        .await;

        for (model, err) in outcome.failures() {
            warn!(model = %model, "model failed, trying next: {err:#}");
        }
        let text = match outcome {
            Fallback::Success {
                candidate, value, ..
            } => {
                info!(model = %candidate, skills = batch.len(), "batch answered");
                value
            }
            Fallback::Exhausted { .. } => {
                warn!(skills = batch.len(), "all models failed for batch");
                return BTreeMap::new();
            }
        };

        let expected: HashSet<i64> = batch.iter().map(|s| s.id).collect();
        let parsed = parse_response(&text, Some(&expected));
        for line in &parsed.malformed {
            warn!(line = %line, "skipping unparseable response line");
        }
        for (id, label) in &parsed.coerced {
            warn!(id, label = %label, "unknown category, using Other");
        }
        for id in &parsed.unexpected {
            warn!(id, "response mentions a skill not in this batch");
        }
        let missing = batch.len().saturating_sub(parsed.assignments.len());
        if missing > 0 {
            warn!(missing, "response left skills uncategorized");
        }
        parsed.assignments
    }

    /// Categorize every uncategorized skill, up to `max_skills`.
    pub async fn run(
        &self,
        store: &dyn SkillStore,
        batch_size: usize,
        max_skills: Option<usize>,
    ) -> Result<CategorizeReport> {
        if batch_size == 0 {
            bail!("batch size must be > 0");
        }
        let pending = store
            .uncategorized_skills(max_skills)
            .await
            .context("Failed to fetch uncategorized skills")?;

        let mut report = CategorizeReport {
            fetched: pending.len(),
            ..Default::default()
        };
        if pending.is_empty() {
            info!("no uncategorized skills");
            return Ok(report);
        }

        let total_batches = pending.len().div_ceil(batch_size);
        for (i, batch) in pending.chunks(batch_size).enumerate() {
            report.batches += 1;
            info!(batch = i + 1, of = total_batches, skills = batch.len(), "categorizing");

            let assignments = self.categorize_batch(batch).await;
            if assignments.is_empty() {
                report.failed_batches += 1;
            }

            for (id, category) in assignments {
                match store.set_category(id, category).await {
                    Ok(()) => report.categorized += 1,
                    Err(e) if e.is_connection_lost() => return Err(e.into()),
                    Err(e) => {
                        report.update_failures += 1;
                        warn!(id, "failed to store category: {e:#}");
                    }
                }
            }

            if i + 1 < total_batches {
                self.pacer.pause(self.batch_delay).await;
            }
        }

        Ok(report)
    }
}

pub async fn run_categorize(
    config: &Config,
    batch_size: Option<usize>,
    max_skills: Option<usize>,
) -> Result<()> {
    let report = categorize_with_config(config, batch_size, max_skills).await?;

    println!("skills categorize");
    println!("  fetched: {}", report.fetched);
    println!("  batches: {} ({} failed)", report.batches, report.failed_batches);
    println!("  categorized: {}", report.categorized);
    if report.update_failures > 0 {
        println!("  update failures: {}", report.update_failures);
    }
    println!("ok");
    Ok(())
}

/// Build the backend from config and categorize against the configured
/// database.
pub async fn categorize_with_config(
    config: &Config,
    batch_size: Option<usize>,
    max_skills: Option<usize>,
) -> Result<CategorizeReport> {
    if !config.llm.is_enabled() {
        bail!("LLM provider is disabled. Set [llm] provider in config.");
    }
    let backend = create_backend(&config.llm)?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let pacer = TokioPacer;
    let categorizer = Categorizer::new(
        backend.as_ref(),
        &config.llm,
        &pacer,
        Duration::from_millis(config.pacing.batch_delay_ms),
    );

    let result = categorizer
        .run(
            &store,
            batch_size.unwrap_or(config.llm.batch_size),
            max_skills,
        )
        .await;
    store.pool().close().await;
    result
}
