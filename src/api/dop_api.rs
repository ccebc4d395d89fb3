// ==========================================
// EstrichManager - DoP API
// ==========================================
// Issued DoPs are immutable; a wrong one is revoked and a new one
// issued. Only issued DoPs are visible through the public lookup.
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{optional, required, ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::dop::DeclarationOfPerformance;
use crate::domain::types::DopStatus;
use crate::engine::dop_generator::{DopGenerator, DopInput};
use crate::engine::numbering::Numbering;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::dop_repo::DopRepository;
use crate::repository::recipe_repo::RecipeRepository;
use crate::repository::sequence_repo::SequenceRepository;
use crate::repository::test_report_repo::TestReportRepository;

pub struct DopApi {
    dop_repo: Arc<DopRepository>,
    recipe_repo: Arc<RecipeRepository>,
    batch_repo: Arc<BatchRepository>,
    report_repo: Arc<TestReportRepository>,
    sequence_repo: Arc<SequenceRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl DopApi {
    pub fn new(
        dop_repo: Arc<DopRepository>,
        recipe_repo: Arc<RecipeRepository>,
        batch_repo: Arc<BatchRepository>,
        report_repo: Arc<TestReportRepository>,
        sequence_repo: Arc<SequenceRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            dop_repo,
            recipe_repo,
            batch_repo,
            report_repo,
            sequence_repo,
            action_log_repo,
        }
    }

    /// Generate and issue a DoP for a recipe (optionally a specific batch)
    ///
    /// # Errors
    /// - DopPrerequisite: recipe not locked, no valid ITT, missing
    ///   notified body, batch not released or of another recipe
    pub fn generate_dop(
        &self,
        recipe_id: &str,
        batch_id: Option<&str>,
        issued_on: NaiveDate,
        language: &str,
        actor: &str,
    ) -> ApiResult<DeclarationOfPerformance> {
        let actor = required(actor, "actor")?;
        let recipe = self
            .recipe_repo
            .find_by_id(recipe_id)?
            .ok_or_else(|| ApiError::NotFound(format!("recipe (id={})", recipe_id)))?;

        let batch = match optional(batch_id) {
            Some(id) => Some(
                self.batch_repo
                    .find_by_id(&id)?
                    .ok_or_else(|| ApiError::NotFound(format!("batch (id={})", id)))?,
            ),
            None => None,
        };
        let reports = self.report_repo.list_by_recipe(&recipe.id)?;

        let content = DopGenerator::generate(&DopInput {
            recipe: &recipe,
            batch: batch.as_ref(),
            test_reports: &reports,
            issued_on,
            language,
        })
        .map_err(|e| {
            warn!(recipe_code = %recipe.recipe_code, error = %e, "DoP prerequisites not met");
            ApiError::from(e)
        })?;

        let seq = self
            .sequence_repo
            .next_value(&Numbering::dop_key(&recipe.recipe_code, issued_on), 0)?;

        let dop = DeclarationOfPerformance {
            id: uuid::Uuid::new_v4().to_string(),
            dop_number: Numbering::dop_number(issued_on, &recipe.recipe_code, seq),
            recipe_id: recipe.id.clone(),
            recipe_version: recipe.version,
            batch_id: batch.as_ref().map(|b| b.id.clone()),
            title: content.title,
            product_designation: content.product_designation,
            intended_use: content.intended_use,
            manufacturer: content.manufacturer,
            avcp_system: content.avcp_system,
            notified_body: content.notified_body,
            characteristics: content.characteristics,
            test_report_numbers: content.test_report_numbers,
            language: content.language,
            issued_on,
            status: DopStatus::Issued,
            revoked_reason: None,
            created_by: actor.clone(),
            created_at: Local::now().naive_local(),
        };

        self.dop_repo.insert(&dop)?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::IssueDop, "dop", &dop.id, &actor)
                .with_payload(&json!({
                    "dop_number": dop.dop_number,
                    "recipe_version": dop.recipe_version,
                    "batch_id": dop.batch_id,
                    "test_reports": dop.test_report_numbers,
                }))
                .with_detail(format!("issued {} ({})", dop.dop_number, dop.product_designation)),
        )?;

        info!(dop_number = %dop.dop_number, designation = %dop.product_designation, language = %dop.language, "DoP issued");
        Ok(dop)
    }

    /// Public lookup by number; revoked DoPs are reported as not found
    pub fn get_public_dop(&self, dop_number: &str) -> ApiResult<DeclarationOfPerformance> {
        self.dop_repo
            .find_by_number(dop_number.trim())?
            .filter(DeclarationOfPerformance::is_public)
            .ok_or_else(|| ApiError::NotFound(format!("DoP {}", dop_number)))
    }

    pub fn get_dop(&self, dop_id: &str) -> ApiResult<DeclarationOfPerformance> {
        self.dop_repo
            .find_by_id(dop_id)?
            .ok_or_else(|| ApiError::NotFound(format!("DoP (id={})", dop_id)))
    }

    pub fn revoke_dop(&self, dop_id: &str, reason: &str, actor: &str) -> ApiResult<DeclarationOfPerformance> {
        let actor = required(actor, "actor")?;
        let reason = required(reason, "reason")?;
        let dop = self.get_dop(dop_id)?;

        if !self.dop_repo.revoke(&dop.id, &reason)? {
            return Err(ApiError::BusinessRuleViolation(format!(
                "DoP {} is already revoked",
                dop.dop_number
            )));
        }
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RevokeDop, "dop", &dop.id, &actor)
                .with_payload(&json!({ "reason": reason }))
                .with_detail(format!("revoked {}", dop.dop_number)),
        )?;

        warn!(dop_number = %dop.dop_number, reason = %reason, "DoP revoked");
        self.get_dop(&dop.id)
    }

    pub fn list_dops(&self, recipe_id: &str) -> ApiResult<Vec<DeclarationOfPerformance>> {
        Ok(self.dop_repo.list_by_recipe(recipe_id)?)
    }
}
