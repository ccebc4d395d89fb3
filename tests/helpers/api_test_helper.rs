// ==========================================
// API integration test environment
// ==========================================

use std::error::Error;
use std::ops::Deref;

use chrono::NaiveDate;
use estrich_manager::api::ApiError;
use estrich_manager::app::AppState;
use estrich_manager::domain::{Batch, NewRecipe, Recipe};
use tempfile::NamedTempFile;

use super::test_data_builder::{BatchBuilder, RecipeBuilder};
use crate::test_helpers::create_test_db;

pub const ACTOR: &str = "qs.mueller";

/// AppState on a temporary database
pub struct ApiTestEnv {
    _temp_file: NamedTempFile,
    pub db_path: String,
    pub state: AppState,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        estrich_manager::logging::init_test();
        let (temp_file, db_path) = create_test_db()?;
        let state = AppState::new(db_path.clone())?;
        Ok(Self {
            _temp_file: temp_file,
            db_path,
            state,
        })
    }

    /// Create and lock a recipe
    pub fn locked_recipe_from(&self, input: NewRecipe) -> Recipe {
        let recipe = self.recipe_api.create_recipe(input, ACTOR).unwrap();
        self.recipe_api.lock_recipe(&recipe.id, ACTOR).unwrap()
    }

    /// Locked CT-C25-F4 recipe
    pub fn locked_recipe(&self, code: &str) -> Recipe {
        self.locked_recipe_from(RecipeBuilder::new(code).build())
    }

    /// Produced batch with 28-day strengths
    pub fn produced_batch(
        &self,
        recipe_id: &str,
        production_date: NaiveDate,
        compressive: f64,
        flexural: f64,
    ) -> Batch {
        self.batch_api
            .create_batch(
                BatchBuilder::new(recipe_id, production_date)
                    .strengths(compressive, flexural)
                    .build(),
                ACTOR,
            )
            .unwrap()
    }
}

impl Deref for ApiTestEnv {
    type Target = AppState;

    fn deref(&self) -> &AppState {
        &self.state
    }
}

/// Short name of an ApiError variant for assertions
pub fn error_kind(err: &ApiError) -> &'static str {
    match err {
        ApiError::ReleaseBlocked { .. } => "ReleaseBlocked",
        ApiError::RecipeLocked(_) => "RecipeLocked",
        ApiError::DopPrerequisite(_) => "DopPrerequisite",
        ApiError::InvalidTransition(_) => "InvalidTransition",
        ApiError::InvalidInput(_) => "InvalidInput",
        ApiError::NotFound(_) => "NotFound",
        ApiError::BusinessRuleViolation(_) => "BusinessRuleViolation",
        ApiError::ConcurrentModification(_) => "ConcurrentModification",
        ApiError::ConfigError(_) => "ConfigError",
        _ => "Other",
    }
}
