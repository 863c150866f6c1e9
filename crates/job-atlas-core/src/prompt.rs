//! Categorization prompt construction and response parsing.
//!
//! The model receives one `id. name` line per skill and answers with one
//! `id:Category` line per skill. Responses are treated as untrusted text:
//! surrounding chatter is skipped, labels outside the taxonomy are coerced
//! to [`Category::Other`], and ids that were never asked about are dropped.

use std::collections::{BTreeMap, HashSet};

use crate::models::Skill;
use crate::taxonomy::Category;

pub const SYSTEM_PROMPT: &str =
    "You are a technical skills categorization expert. Return only ID:Category pairs, one per line.";

/// Build the user message for one batch.
pub fn build_prompt(batch: &[Skill]) -> String {
    let skills = batch
        .iter()
        .map(|s| format!("{}. {}", s.id, s.original_name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Categorize each of the following technical skills into exactly one of these categories:\n\
         {categories}\n\
         \n\
         Rules:\n\
         - Use only the category names listed above, spelled exactly as shown.\n\
         - Use \"Other\" when no category fits.\n\
         - Return one line per skill in the format ID:Category and nothing else.\n\
         \n\
         Skills:\n\
         {skills}",
        categories = Category::label_list(),
        skills = skills,
    )
}

/// Result of parsing one model response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Accepted assignments, keyed by skill id.
    pub assignments: BTreeMap<i64, Category>,
    /// Lines that did not have the `id:label` shape.
    pub malformed: Vec<String>,
    /// `(id, label)` pairs whose label was outside the taxonomy.
    pub coerced: Vec<(i64, String)>,
    /// Ids that were not part of the request.
    pub unexpected: Vec<i64>,
}

/// Parse `text` into id → category assignments.
///
/// When `expected` is given, ids outside it are reported in
/// [`ParsedResponse::unexpected`] and not assigned.
pub fn parse_response(text: &str, expected: Option<&HashSet<i64>>) -> ParsedResponse {
    let mut out = ParsedResponse::default();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some((left, right)) = line.split_once(':') else {
            out.malformed.push(line.to_string());
            continue;
        };
        let Ok(id) = left.trim().parse::<i64>() else {
            out.malformed.push(line.to_string());
            continue;
        };
        if let Some(expected) = expected {
            if !expected.contains(&id) {
                out.unexpected.push(id);
                continue;
            }
        }
        let label = right.trim();
        let (category, was_coerced) = Category::coerce(label);
        if was_coerced {
            out.coerced.push((id, label.to_string()));
        }
        out.assignments.insert(id, category);
    }

    out
}
