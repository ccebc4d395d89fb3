// ==========================================
// EstrichManager - DoP generator
// ==========================================
// Assembles the content of a Declaration of Performance from
// Recipe + optional Batch + Test reports. Pure: numbering and
// persistence are done by api::dop_api.
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::dop::{DeclaredCharacteristic, HARMONISED_STANDARD};
use crate::domain::recipe::Recipe;
use crate::domain::test_report::TestReport;
use crate::domain::types::{AvcpSystem, BatchStatus, RecipeStatus, TestReportType};
use crate::engine::test_report_validity::TestReportValidity;
use crate::i18n;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a DoP cannot be issued
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DopPrerequisiteError {
    #[error("recipe {recipe_code} must be locked before a DoP can be issued (status: {status})")]
    RecipeNotLocked {
        recipe_code: String,
        status: RecipeStatus,
    },

    #[error("recipe {recipe_code} has no valid initial type test on {on}")]
    MissingInitialTypeTest { recipe_code: String, on: NaiveDate },

    #[error("batch {batch_number} does not belong to recipe {recipe_code}")]
    BatchRecipeMismatch {
        batch_number: String,
        recipe_code: String,
    },

    #[error("batch {batch_number} is not released (status: {status})")]
    BatchNotReleased {
        batch_number: String,
        status: BatchStatus,
    },

    #[error("AVCP system {avcp} requires a notified body")]
    NotifiedBodyRequired { avcp: AvcpSystem },
}

/// Everything the generator looks at
pub struct DopInput<'a> {
    pub recipe: &'a Recipe,
    pub batch: Option<&'a Batch>,
    pub test_reports: &'a [TestReport],
    pub issued_on: NaiveDate,
    pub language: &'a str,
}

/// Generated DoP content (without number / id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DopContent {
    pub title: String,
    pub product_designation: String,
    pub intended_use: String,
    pub manufacturer: String,
    pub avcp_system: AvcpSystem,
    pub notified_body: Option<String>,
    pub characteristics: Vec<DeclaredCharacteristic>,
    pub test_report_numbers: Vec<String>,
    pub language: String,
}

pub struct DopGenerator;

impl DopGenerator {
    /// Check the legal prerequisites
    ///
    /// # Rules
    /// 1. recipe is locked
    /// 2. AVCP 1 / 1+ / 2+ names a notified body
    /// 3. a usable ITT for the recipe exists on the issue date
    /// 4. a given batch belongs to the recipe and is released (or consumed)
    pub fn check_prerequisites(input: &DopInput<'_>) -> Result<(), DopPrerequisiteError> {
        let recipe = input.recipe;

        if recipe.status != RecipeStatus::Locked {
            return Err(DopPrerequisiteError::RecipeNotLocked {
                recipe_code: recipe.recipe_code.clone(),
                status: recipe.status,
            });
        }

        let has_notified_body = recipe
            .notified_body
            .as_deref()
            .is_some_and(|nb| !nb.trim().is_empty());
        if recipe.avcp_system.requires_notified_body() && !has_notified_body {
            return Err(DopPrerequisiteError::NotifiedBodyRequired {
                avcp: recipe.avcp_system,
            });
        }

        let has_itt = input.test_reports.iter().any(|r| {
            r.recipe_id == recipe.id
                && r.report_type == TestReportType::InitialTypeTest
                && TestReportValidity::is_usable_on(r, input.issued_on)
        });
        if !has_itt {
            return Err(DopPrerequisiteError::MissingInitialTypeTest {
                recipe_code: recipe.recipe_code.clone(),
                on: input.issued_on,
            });
        }

        if let Some(batch) = input.batch {
            if batch.recipe_id != recipe.id {
                return Err(DopPrerequisiteError::BatchRecipeMismatch {
                    batch_number: batch.batch_number.clone(),
                    recipe_code: recipe.recipe_code.clone(),
                });
            }
            if !matches!(batch.status, BatchStatus::Released | BatchStatus::Consumed) {
                return Err(DopPrerequisiteError::BatchNotReleased {
                    batch_number: batch.batch_number.clone(),
                    status: batch.status,
                });
            }
        }

        Ok(())
    }

    /// Build the DoP content after checking prerequisites
    pub fn generate(input: &DopInput<'_>) -> Result<DopContent, DopPrerequisiteError> {
        Self::check_prerequisites(input)?;

        let recipe = input.recipe;
        let lang = i18n::normalize_locale(input.language);

        Ok(DopContent {
            title: i18n::t_in(lang, "dop.title", &[]),
            product_designation: recipe.designation(),
            intended_use: i18n::t_in(lang, "dop.intended_use", &[]),
            manufacturer: format!(
                "{}, {}",
                recipe.manufacturer_name.trim(),
                recipe.manufacturer_address.trim()
            ),
            avcp_system: recipe.avcp_system,
            notified_body: recipe
                .notified_body
                .clone()
                .filter(|nb| !nb.trim().is_empty()),
            characteristics: Self::characteristics(recipe, lang),
            test_report_numbers: Self::referenced_reports(recipe, input.test_reports, input.issued_on),
            language: lang.to_string(),
        })
    }

    /// Essential characteristics of EN 13813 table ZA.1.1 in declaration order
    pub fn characteristics(recipe: &Recipe, lang: &str) -> Vec<DeclaredCharacteristic> {
        let npd = i18n::t_in(lang, "common.npd", &[]);
        let wear = recipe
            .wear_resistance_class
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_uppercase)
            .unwrap_or(npd);

        [
            ("reaction_to_fire", recipe.fire_class.trim().to_string()),
            (
                "release_of_corrosive_substances",
                recipe.binder_type.as_str().to_string(),
            ),
            (
                "compressive_strength",
                recipe.compressive_strength_class.trim().to_uppercase(),
            ),
            (
                "flexural_strength",
                recipe.flexural_strength_class.trim().to_uppercase(),
            ),
            ("wear_resistance", wear),
        ]
        .into_iter()
        .map(|(key, performance)| DeclaredCharacteristic {
            key: key.to_string(),
            label: i18n::t_in(lang, &format!("characteristic.{}", key), &[]),
            performance,
            standard: HARMONISED_STANDARD.to_string(),
        })
        .collect()
    }

    /// Usable reports of the recipe: ITT first, then FPC, then audits, oldest first
    fn referenced_reports(recipe: &Recipe, reports: &[TestReport], on: NaiveDate) -> Vec<String> {
        let mut usable: Vec<&TestReport> = reports
            .iter()
            .filter(|r| r.recipe_id == recipe.id && TestReportValidity::is_usable_on(r, on))
            .collect();
        usable.sort_by_key(|r| (type_rank(r.report_type), r.test_date));
        usable.into_iter().map(|r| r.report_number.clone()).collect()
    }
}

fn type_rank(t: TestReportType) -> u8 {
    match t {
        TestReportType::InitialTypeTest => 0,
        TestReportType::FactoryControl => 1,
        TestReportType::Audit => 2,
    }
}
