//! Tech-stack blobs: building them from page fragments and splitting them
//! back into skill tokens.

use indexmap::{IndexMap, IndexSet};

/// Upper bounds (exclusive, in chars) for the loose container scan.
pub const MAX_FALLBACK_NAME_CHARS: usize = 50;
pub const MAX_FALLBACK_LEVEL_CHARS: usize = 20;

/// Insertion-ordered `name -> level` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TechStack {
    entries: IndexMap<String, String>,
}

impl TechStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a skill. Blank names are ignored; a repeated name keeps its
    /// first position and takes the new level.
    pub fn insert(&mut self, name: &str, level: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        self.entries.insert(name.to_string(), level.trim().to_string());
    }

    /// Record a pair found by the loose container scan, subject to the
    /// length bounds. Returns whether it was accepted.
    pub fn insert_bounded(&mut self, name: &str, level: &str) -> bool {
        if name.chars().count() >= MAX_FALLBACK_NAME_CHARS
            || level.chars().count() >= MAX_FALLBACK_LEVEL_CHARS
        {
            return false;
        }
        let before = self.entries.len();
        self.insert(name, level);
        self.entries.len() > before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `"name: level; name: level"`, or `None` when empty.
    pub fn serialize(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        Some(
            self.entries
                .iter()
                .map(|(name, level)| {
                    if level.is_empty() {
                        name.clone()
                    } else {
                        format!("{name}: {level}")
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Split a stored blob into skill names.
///
/// Entries are separated by `;` or newlines (commas are part of names);
/// anything from the first `:` on is a proficiency suffix and dropped.
pub fn tokenize(blob: &str) -> Vec<String> {
    blob.split([';', '\n'])
        .filter_map(|piece| {
            let name = piece.split(':').next().unwrap_or_default().trim();
            if name.is_empty() {
                None
            } else {
                Some(name.to_string())
            }
        })
        .collect()
}

/// Tokenize many blobs into one deduplicated set, first-seen order.
pub fn unique_skills<'a, I>(blobs: I) -> IndexSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = IndexSet::new();
    for blob in blobs {
        out.extend(tokenize(blob));
    }
    out
}
