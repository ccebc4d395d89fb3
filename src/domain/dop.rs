// ==========================================
// EstrichManager - Declaration of Performance (DoP)
// ==========================================
// Assembled from Recipe + (optional) Batch + Test reports by
// engine::dop_generator; persisted as an immutable document.
// ==========================================

use crate::domain::types::{AvcpSystem, DopStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Harmonised standard every characteristic refers to
pub const HARMONISED_STANDARD: &str = "EN 13813:2002";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredCharacteristic {
    pub key: String,         // stable key, e.g. "compressive_strength"
    pub label: String,       // localized label
    pub performance: String, // "C25", "A1fl", "NPD"
    pub standard: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationOfPerformance {
    pub id: String,
    pub dop_number: String, // DoP-{YYYY}-{recipeCode}-{seq}
    pub recipe_id: String,
    pub recipe_version: i32,
    pub batch_id: Option<String>,

    pub title: String,
    pub product_designation: String, // CT-C25-F4
    pub intended_use: String,
    pub manufacturer: String,
    pub avcp_system: AvcpSystem,
    pub notified_body: Option<String>,
    pub characteristics: Vec<DeclaredCharacteristic>,
    pub test_report_numbers: Vec<String>,
    pub language: String,

    pub issued_on: NaiveDate,
    pub status: DopStatus,
    pub revoked_reason: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

impl DeclarationOfPerformance {
    pub fn is_public(&self) -> bool {
        self.status == DopStatus::Issued
    }
}
