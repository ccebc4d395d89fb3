// ==========================================
// EstrichManager - Production batch
// ==========================================
// A batch references exactly one recipe and carries the
// measured QC values used by the release gate.
// ==========================================

use crate::domain::types::BatchStatus;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// QcData - sparse lab measurements
// ==========================================
// Stored as JSON (qc_data_json); absent values are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QcData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressive_strength_28d: Option<f64>, // N/mm²
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flexural_strength_28d: Option<f64>, // N/mm²
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>, // kg/m³
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_diameter: Option<f64>, // mm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moisture: Option<f64>, // CM-%
}

impl QcData {
    pub fn is_empty(&self) -> bool {
        self.compressive_strength_28d.is_none()
            && self.flexural_strength_28d.is_none()
            && self.density.is_none()
            && self.flow_diameter.is_none()
            && self.ph_value.is_none()
            && self.moisture.is_none()
    }

    /// Overlay the values present in `other`
    pub fn merge(&mut self, other: &QcData) {
        if other.compressive_strength_28d.is_some() {
            self.compressive_strength_28d = other.compressive_strength_28d;
        }
        if other.flexural_strength_28d.is_some() {
            self.flexural_strength_28d = other.flexural_strength_28d;
        }
        if other.density.is_some() {
            self.density = other.density;
        }
        if other.flow_diameter.is_some() {
            self.flow_diameter = other.flow_diameter;
        }
        if other.ph_value.is_some() {
            self.ph_value = other.ph_value;
        }
        if other.moisture.is_some() {
            self.moisture = other.moisture;
        }
    }

    /// Names of present values that are negative or not finite
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        [
            ("compressive_strength_28d", self.compressive_strength_28d),
            ("flexural_strength_28d", self.flexural_strength_28d),
            ("density", self.density),
            ("flow_diameter", self.flow_diameter),
            ("ph_value", self.ph_value),
            ("moisture", self.moisture),
        ]
        .into_iter()
        .filter(|(_, v)| matches!(v, Some(x) if !x.is_finite() || *x < 0.0))
        .map(|(name, _)| name)
        .collect()
    }
}

// ==========================================
// Batch
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub batch_number: String, // {YYYYMMDD}-{recipeCode}-{seq}
    pub recipe_id: String,
    pub production_date: NaiveDate,
    pub quantity_t: f64,
    pub qc_data: QcData,
    pub status: BatchStatus,

    // ===== transition trail =====
    pub blocked_reason: Option<String>,
    pub released_by: Option<String>,
    pub released_at: Option<NaiveDateTime>,

    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Input for creating a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    pub recipe_id: String,
    pub production_date: NaiveDate,
    pub quantity_t: f64,
    #[serde(default)]
    pub qc_data: QcData,
}
