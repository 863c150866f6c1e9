//! Salary block parsing.
//!
//! A detail page shows one block per contract type, e.g.
//!
//! ```text
//! 20 000 - 25 000 PLN
//! Net per month - B2B
//! ```
//!
//! Each block is parsed in two tiers. The primary pattern reads amount,
//! currency, descriptor and a contract label after a hyphen, and may match
//! several times. Only when it finds nothing does the fallback pattern look
//! for a bare `low - high CUR` range, inferring the contract type from the
//! rest of the block text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ContractType;
use crate::sanitize::collapse_whitespace;

static PRIMARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<amount>\d+(?:[ \x{a0},]?\d+)*(?:\s*-\s*\d+(?:[ \x{a0},]?\d+)*)?)\s*(?P<currency>PLN|USD|EUR|GBP|CHF)\s*(?P<desc>[^-]*?)\s*-\s*(?P<label>[^-\n]+)",
    )
    .expect("valid primary salary pattern")
});

static FALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<range>\d+(?:[ \x{a0},]?\d+)*\s*-\s*\d+(?:[ \x{a0},]?\d+)*)\s*(?P<currency>PLN|USD|EUR|GBP|CHF)",
    )
    .expect("valid fallback salary pattern")
});

/// One parsed salary assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryLine {
    pub slot: ContractType,
    pub value: String,
    pub via_fallback: bool,
}

/// Pick a contract slot by substring checks, first hit wins.
pub fn classify(text: &str) -> ContractType {
    if text.contains("B2B") {
        ContractType::B2b
    } else if text.contains("Permanent") {
        ContractType::Permanent
    } else if text.contains("Internship") {
        ContractType::Internship
    } else if text.contains("Mandate") || text.contains("Umowa zlecenie") {
        ContractType::Mandate
    } else if text.contains("Specific-task") || text.contains("Umowa o dzieło") {
        ContractType::SpecificTask
    } else {
        ContractType::Any
    }
}

/// Parse one salary block into slot assignments, in match order.
pub fn parse_block(text: &str) -> Vec<SalaryLine> {
    let primary: Vec<SalaryLine> = PRIMARY
        .captures_iter(text)
        .map(|caps| {
            let amount = collapse_whitespace(&caps["amount"]);
            let currency = &caps["currency"];
            let desc = collapse_whitespace(&caps["desc"]);
            let label = collapse_whitespace(&caps["label"]);
            let value = if desc.is_empty() {
                format!("{amount} {currency} - {label}")
            } else {
                format!("{amount} {currency} {desc} - {label}")
            };
            SalaryLine {
                slot: classify(&label),
                value,
                via_fallback: false,
            }
        })
        .collect();

    if !primary.is_empty() {
        return primary;
    }

    let Some(caps) = FALLBACK.captures(text) else {
        return Vec::new();
    };
    let range = collapse_whitespace(&caps["range"]);
    let currency = &caps["currency"];
    let slot = classify(text);
    let value = match slot {
        ContractType::Any => format!("{range} {currency}"),
        other => format!("{range} {currency} - {}", other.label()),
    };
    vec![SalaryLine {
        slot,
        value,
        via_fallback: true,
    }]
}
