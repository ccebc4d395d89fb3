// ==========================================
// Test data builders for integration tests
// ==========================================

use chrono::NaiveDate;
use estrich_manager::domain::{
    AvcpSystem, BinderType, NewBatch, NewCalibration, NewRecipe, NewTestReport, QcData,
    TestReportType,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ==========================================
// NewRecipe builder
// ==========================================

pub struct RecipeBuilder {
    recipe: NewRecipe,
}

impl RecipeBuilder {
    /// Cement screed CT-C25-F4, AVCP 4
    pub fn new(recipe_code: &str) -> Self {
        Self {
            recipe: NewRecipe {
                recipe_code: recipe_code.to_string(),
                name: format!("Zementestrich {}", recipe_code),
                binder_type: BinderType::Ct,
                compressive_strength_class: "C25".to_string(),
                flexural_strength_class: "F4".to_string(),
                wear_resistance_class: None,
                fire_class: None,
                avcp_system: AvcpSystem::System4,
                manufacturer_name: "Estrichwerk Muster GmbH".to_string(),
                manufacturer_address: "Industriestr. 1, 12345 Musterstadt".to_string(),
                notified_body: None,
            },
        }
    }

    pub fn binder(mut self, binder: BinderType) -> Self {
        self.recipe.binder_type = binder;
        self
    }

    pub fn classes(mut self, compressive: &str, flexural: &str) -> Self {
        self.recipe.compressive_strength_class = compressive.to_string();
        self.recipe.flexural_strength_class = flexural.to_string();
        self
    }

    pub fn wear(mut self, wear: &str) -> Self {
        self.recipe.wear_resistance_class = Some(wear.to_string());
        self
    }

    pub fn avcp(mut self, avcp: AvcpSystem) -> Self {
        self.recipe.avcp_system = avcp;
        self
    }

    pub fn notified_body(mut self, nb: &str) -> Self {
        self.recipe.notified_body = Some(nb.to_string());
        self
    }

    pub fn build(self) -> NewRecipe {
        self.recipe
    }
}

// ==========================================
// NewBatch builder
// ==========================================

pub struct BatchBuilder {
    batch: NewBatch,
}

impl BatchBuilder {
    pub fn new(recipe_id: &str, production_date: NaiveDate) -> Self {
        Self {
            batch: NewBatch {
                recipe_id: recipe_id.to_string(),
                production_date,
                quantity_t: 24.0,
                qc_data: QcData::default(),
            },
        }
    }

    pub fn quantity(mut self, quantity_t: f64) -> Self {
        self.batch.quantity_t = quantity_t;
        self
    }

    pub fn strengths(mut self, compressive: f64, flexural: f64) -> Self {
        self.batch.qc_data.compressive_strength_28d = Some(compressive);
        self.batch.qc_data.flexural_strength_28d = Some(flexural);
        self
    }

    pub fn build(self) -> NewBatch {
        self.batch
    }
}

// ==========================================
// Other inputs
// ==========================================

pub fn itt_report(recipe_id: &str, report_number: &str, test_date: NaiveDate) -> NewTestReport {
    NewTestReport {
        recipe_id: recipe_id.to_string(),
        report_number: report_number.to_string(),
        report_type: TestReportType::InitialTypeTest,
        test_date,
        valid_until: None,
        laboratory: "MPA Musterstadt".to_string(),
        results: QcData {
            compressive_strength_28d: Some(28.4),
            flexural_strength_28d: Some(5.2),
            ..Default::default()
        },
    }
}

pub fn calibration(equipment_id: &str, calibrated_on: NaiveDate, interval_months: u32) -> NewCalibration {
    NewCalibration {
        equipment_id: equipment_id.to_string(),
        equipment_name: "Druckprüfmaschine".to_string(),
        calibrated_on,
        interval_months,
        performed_by: "Kalibrierdienst Süd".to_string(),
        certificate_ref: Some("KS-2025-117".to_string()),
        passed: true,
    }
}
