//! # Job Atlas
//!
//! Job-offer acquisition and skill normalization.
//!
//! A headless browser walks a job board's infinite-scroll listing, visits
//! each offer page, and stores a structured record per offer. Independently,
//! the stored tech stacks are tokenized into a skill vocabulary, and a
//! language model assigns every skill one category from a fixed taxonomy.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Link         │──▶│ Offer        │──▶│  SQLite  │
//! │ Collector    │   │ Extractor    │   │  offers  │
//! └──────────────┘   └──────────────┘   └────┬─────┘
//!                                            │
//!                    ┌───────────────────────┘
//!                    ▼
//!             ┌──────────────┐   ┌──────────────┐
//!             │ Skill        │──▶│ Skill        │──▶ skills.category
//!             │ Tokenizer    │   │ Categorizer  │
//!             └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! atlas init                    # create database
//! atlas scrape --max-offers 20  # collect and store offers
//! atlas skills extract          # build the skill vocabulary
//! atlas skills categorize       # assign categories
//! atlas stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`browser`] | Page driver trait and headless Chromium driver |
//! | [`links`] | Infinite-scroll link collection |
//! | [`extract`] | Offer detail page extraction |
//! | [`ingest`] | Scrape orchestration |
//! | [`skills`] | Skill vocabulary extraction |
//! | [`categorize`] | Batch skill categorization |
//! | [`llm`] | Language-model backends |
//! | [`normalize`] | Normalization trigger handling |
//! | [`trigger`] | Downstream trigger invocation |
//! | [`server`] | HTTP trigger endpoint |
//! | [`sqlite_store`] | SQLite implementation of the store traits |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//!
//! Parsing, the taxonomy, and the store traits live in `job_atlas_core`.

pub mod aws;
pub mod browser;
pub mod categorize;
pub mod config;
pub mod db;
pub mod extract;
pub mod ingest;
pub mod links;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod normalize;
pub mod pacing;
pub mod server;
pub mod skills;
pub mod sqlite_store;
pub mod stats;
pub mod trigger;
