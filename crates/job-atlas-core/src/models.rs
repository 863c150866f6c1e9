//! Record types shared across the pipeline.
//!
//! An [`Offer`] is keyed by its source URL and never updated once stored.
//! A [`Skill`] is keyed by its original name and gains a [`Category`]
//! exactly once.

use serde::{Deserialize, Serialize};

use crate::taxonomy::Category;

/// Contract type a salary line is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// No recognisable contract label.
    Any,
    B2b,
    Internship,
    Mandate,
    Permanent,
    SpecificTask,
}

impl ContractType {
    pub const ALL: [ContractType; 6] = [
        ContractType::Any,
        ContractType::B2b,
        ContractType::Internship,
        ContractType::Mandate,
        ContractType::Permanent,
        ContractType::SpecificTask,
    ];

    /// Display label appended to fallback-formatted salary values.
    pub fn label(&self) -> &'static str {
        match self {
            ContractType::Any => "Any",
            ContractType::B2b => "B2B",
            ContractType::Internship => "Internship",
            ContractType::Mandate => "Mandate",
            ContractType::Permanent => "Permanent",
            ContractType::SpecificTask => "Specific-task",
        }
    }

    /// Column holding this slot in the `offers` table.
    pub fn column(&self) -> &'static str {
        match self {
            ContractType::Any => "salary_any",
            ContractType::B2b => "salary_b2b",
            ContractType::Internship => "salary_internship",
            ContractType::Mandate => "salary_mandate",
            ContractType::Permanent => "salary_perm",
            ContractType::SpecificTask => "salary_specific_task",
        }
    }
}

/// One salary string per contract type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salaries {
    pub any: Option<String>,
    pub b2b: Option<String>,
    pub internship: Option<String>,
    pub mandate: Option<String>,
    pub permanent: Option<String>,
    pub specific_task: Option<String>,
}

impl Salaries {
    pub fn get(&self, slot: ContractType) -> Option<&str> {
        self.slot(slot).as_deref()
    }

    /// Overwrite `slot`. Later assignments win.
    pub fn set(&mut self, slot: ContractType, value: String) {
        *self.slot_mut(slot) = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        ContractType::ALL.iter().all(|s| self.slot(*s).is_none())
    }

    /// Populated slots in [`ContractType::ALL`] order.
    pub fn filled(&self) -> Vec<(ContractType, &str)> {
        ContractType::ALL
            .iter()
            .filter_map(|s| self.get(*s).map(|v| (*s, v)))
            .collect()
    }

    fn slot(&self, slot: ContractType) -> &Option<String> {
        match slot {
            ContractType::Any => &self.any,
            ContractType::B2b => &self.b2b,
            ContractType::Internship => &self.internship,
            ContractType::Mandate => &self.mandate,
            ContractType::Permanent => &self.permanent,
            ContractType::SpecificTask => &self.specific_task,
        }
    }

    fn slot_mut(&mut self, slot: ContractType) -> &mut Option<String> {
        match slot {
            ContractType::Any => &mut self.any,
            ContractType::B2b => &mut self.b2b,
            ContractType::Internship => &mut self.internship,
            ContractType::Mandate => &mut self.mandate,
            ContractType::Permanent => &mut self.permanent,
            ContractType::SpecificTask => &mut self.specific_task,
        }
    }
}

/// A job offer as extracted from one detail page.
///
/// Every attribute except `url` is best-effort and may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub url: String,
    pub title: Option<String>,
    pub category: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salaries: Salaries,
    pub work_type: Option<String>,
    pub experience: Option<String>,
    pub employment_type: Option<String>,
    pub operating_mode: Option<String>,
    /// Serialized `"name: level; name: level"` blob.
    pub tech_stack: Option<String>,
}

impl Offer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Derive the operating mode from a location string.
///
/// Only a location of exactly `Remote` or `Hybrid` maps to that mode; any
/// other non-empty location, including `"Remote, Poland"`, is an office
/// position.
pub fn operating_mode(location: Option<&str>) -> Option<String> {
    let location = location?.trim();
    if location.is_empty() {
        None
    } else if location == "Remote" || location == "Hybrid" {
        Some(location.to_string())
    } else {
        Some("Office".to_string())
    }
}

/// A vocabulary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: i64,
    pub original_name: String,
    pub canonical_name: Option<String>,
    pub category: Option<Category>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operating_mode_from_location() {
        assert_eq!(operating_mode(Some("Remote")), Some("Remote".into()));
        assert_eq!(operating_mode(Some("Hybrid")), Some("Hybrid".into()));
        assert_eq!(operating_mode(Some(" Remote ")), Some("Remote".into()));
        assert_eq!(operating_mode(Some("Gdańsk")), Some("Office".into()));
        assert_eq!(operating_mode(Some("  ")), None);
        assert_eq!(operating_mode(None), None);
    }

    #[test]
    fn operating_mode_needs_exact_label() {
        assert_eq!(operating_mode(Some("Remote, Poland")), Some("Office".into()));
        assert_eq!(operating_mode(Some("Warszawa (Hybrid)")), Some("Office".into()));
        assert_eq!(operating_mode(Some("remote")), Some("Office".into()));
    }

    #[test]
    fn salaries_last_write_wins() {
        let mut s = Salaries::default();
        assert!(s.is_empty());
        s.set(ContractType::B2b, "1".into());
        s.set(ContractType::B2b, "2".into());
        assert_eq!(s.get(ContractType::B2b), Some("2"));
        assert_eq!(s.filled(), vec![(ContractType::B2b, "2")]);
    }

    #[test]
    fn every_slot_has_distinct_column() {
        let mut cols: Vec<_> = ContractType::ALL.iter().map(|c| c.column()).collect();
        cols.sort();
        cols.dedup();
        assert_eq!(cols.len(), 6);
    }
}
