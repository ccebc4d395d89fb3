// ==========================================
// EstrichManager - Document numbering
// ==========================================
// Formats human-readable numbers; the sequence values themselves
// come from repository::sequence_repo (atomic per scope/period).
// ==========================================

use chrono::{Datelike, NaiveDate};

/// Sequence scope/period pair as stored in `number_sequence`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceKey {
    pub scope: String,
    pub period: String,
}

pub struct Numbering;

impl Numbering {
    // ===== batches: per recipe and production day =====

    pub fn batch_key(recipe_code: &str, production_date: NaiveDate) -> SequenceKey {
        SequenceKey {
            scope: format!("batch:{}", recipe_code),
            period: production_date.format("%Y%m%d").to_string(),
        }
    }

    /// `{YYYYMMDD}-{recipeCode}-{seq:03}`
    pub fn batch_number(production_date: NaiveDate, recipe_code: &str, seq: u32) -> String {
        format!("{}-{}-{:03}", production_date.format("%Y%m%d"), recipe_code, seq)
    }

    /// Trailing sequence of a batch number (recipe codes may contain '-')
    pub fn parse_batch_sequence(batch_number: &str) -> Option<u32> {
        let (_, seq) = batch_number.rsplit_once('-')?;
        seq.parse().ok()
    }

    // ===== declarations of performance: per recipe and year =====

    pub fn dop_key(recipe_code: &str, issued_on: NaiveDate) -> SequenceKey {
        SequenceKey {
            scope: format!("dop:{}", recipe_code),
            period: issued_on.year().to_string(),
        }
    }

    /// `DoP-{YYYY}-{recipeCode}-{seq:04}`
    pub fn dop_number(issued_on: NaiveDate, recipe_code: &str, seq: u32) -> String {
        format!("DoP-{}-{}-{:04}", issued_on.year(), recipe_code, seq)
    }

    // ===== deviations: per year =====

    pub fn deviation_key(opened_on: NaiveDate) -> SequenceKey {
        SequenceKey {
            scope: "deviation".to_string(),
            period: opened_on.year().to_string(),
        }
    }

    /// `DEV-{YYYY}-{seq:04}`
    pub fn deviation_number(opened_on: NaiveDate, seq: u32) -> String {
        format!("DEV-{}-{:04}", opened_on.year(), seq)
    }
}

/// Normalized recipe code (trimmed, upper case) if it only uses `A-Z 0-9 - _`
pub fn normalize_recipe_code(code: &str) -> Option<String> {
    let code = code.trim().to_uppercase();
    let valid = !code.is_empty()
        && code.len() <= 32
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(code)
}
