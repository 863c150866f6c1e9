//! # Job Atlas Core
//!
//! Runtime-free logic for Job Atlas: offer and skill models, the skill
//! taxonomy, value sanitizing, salary and tech-stack parsing, categorization
//! prompt/response handling, the model fallback combinator, and the store
//! abstraction with an in-memory backend.
//!
//! This crate contains no tokio, sqlx, browser, or HTTP dependencies. The
//! `job-atlas` binary crate wires these pieces to SQLite, Chromium, and the
//! language-model backends.

pub mod fallback;
pub mod models;
pub mod prompt;
pub mod salary;
pub mod sanitize;
pub mod store;
pub mod taxonomy;
pub mod tech_stack;
