//! The normalization trigger.
//!
//! An external invoker (a scheduler, the scrape's downstream trigger, or
//! `POST /normalize`) sends a [`NormalizeEvent`] naming which skill-side
//! stages to run. The handler never returns an error: failures become a
//! non-200 [`TriggerResponse`].

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use job_atlas_core::store::{OfferStore, SkillStore};

use crate::categorize::{CategorizeReport, Categorizer};
use crate::config::Config;
use crate::db;
use crate::llm::{create_backend, ChatBackend, DisabledBackend};
use crate::pacing::TokioPacer;
use crate::skills::{extract_skills, ExtractReport};
use crate::sqlite_store::SqliteStore;

pub const COMPLETED: &str = "Normalization completed";

/// Incoming trigger event. Both fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NormalizeEvent {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub clear_first: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl TriggerResponse {
    fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Categorize,
    #[default]
    All,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Categorize => "categorize",
            Stage::All => "all",
        }
    }

    fn extracts(self) -> bool {
        matches!(self, Stage::Extract | Stage::All)
    }

    fn categorizes(self) -> bool {
        matches!(self, Stage::Categorize | Stage::All)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "extract" => Ok(Stage::Extract),
            "categorize" => Ok(Stage::Categorize),
            "all" => Ok(Stage::All),
            other => bail!("unknown stage '{}': expected extract, categorize or all", other),
        }
    }
}

impl NormalizeEvent {
    pub fn stage(&self) -> Result<Stage> {
        match self.stage.as_deref() {
            None => Ok(Stage::All),
            Some(s) => s.parse(),
        }
    }

    pub fn clear_first(&self) -> bool {
        self.clear_first.unwrap_or(false)
    }
}

/// What one normalization run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub extract: Option<ExtractReport>,
    pub categorize: Option<CategorizeReport>,
}

/// Run the selected stages against the given stores.
///
/// `clear_first` only affects extraction; it is ignored for a
/// categorize-only run.
pub async fn run_stages(
    stage: Stage,
    clear_first: bool,
    offers: &dyn OfferStore,
    skills: &dyn SkillStore,
    categorizer: &Categorizer<'_>,
    batch_size: usize,
) -> Result<NormalizeReport> {
    let mut report = NormalizeReport::default();
    if stage.extracts() {
        report.extract = Some(extract_skills(offers, skills, clear_first).await?);
    }
    if stage.categorizes() {
        report.categorize = Some(categorizer.run(skills, batch_size, None).await?);
    }
    Ok(report)
}

/// Handle one event end to end: open the database, run the stages,
/// and translate the outcome into a response.
pub async fn handle_event(config: &Config, event: &NormalizeEvent) -> TriggerResponse {
    let stage = match event.stage() {
        Ok(stage) => stage,
        Err(e) => return TriggerResponse::new(400, e.to_string()),
    };
    info!(stage = %stage, clear_first = event.clear_first(), "normalization requested");

    match normalize_with_config(config, stage, event.clear_first()).await {
        Ok(report) => {
            info!(?report, "normalization finished");
            TriggerResponse::new(200, COMPLETED)
        }
        Err(e) => {
            error!("normalization failed: {e:#}");
            TriggerResponse::new(500, format!("Normalization failed: {e:#}"))
        }
    }
}

async fn normalize_with_config(
    config: &Config,
    stage: Stage,
    clear_first: bool,
) -> Result<NormalizeReport> {
    let backend: Box<dyn ChatBackend> = if stage.categorizes() {
        if !config.llm.is_enabled() {
            bail!("LLM provider is disabled. Set [llm] provider in config.");
        }
        create_backend(&config.llm)?
    } else {
        Box::new(DisabledBackend)
    };

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool);
    let pacer = TokioPacer;
    let categorizer = Categorizer::new(
        backend.as_ref(),
        &config.llm,
        &pacer,
        Duration::from_millis(config.pacing.batch_delay_ms),
    );

    let result = run_stages(
        stage,
        clear_first,
        &store,
        &store,
        &categorizer,
        config.llm.batch_size,
    )
    .await;
    store.pool().close().await;
    result
}

pub async fn run_normalize(config: &Config, stage: Option<String>, clear_first: bool) -> Result<()> {
    let event = NormalizeEvent {
        stage,
        clear_first: Some(clear_first),
    };
    let response = handle_event(config, &event).await;

    println!("normalize");
    println!("  stage: {}", event.stage.as_deref().unwrap_or("all"));
    println!("  status: {}", response.status_code);
    println!("  {}", response.body);
    if response.status_code != 200 {
        bail!("{}", response.body);
    }
    println!("ok");
    Ok(())
}
