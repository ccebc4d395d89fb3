// ==========================================
// EstrichManager - Test report API
// ==========================================
// Initial type tests expire after `itt_validity_years` (config,
// default 3) unless the report carries its own expiry date.
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::json;
use tracing::{info, warn};

use crate::api::error::{required, ApiError, ApiResult};
use crate::config::ComplianceConfigReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::test_report::{NewTestReport, TestReport};
use crate::domain::types::TestReportStatus;
use crate::engine::test_report_validity::TestReportValidity;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::recipe_repo::RecipeRepository;
use crate::repository::test_report_repo::TestReportRepository;

pub struct TestReportApi {
    report_repo: Arc<TestReportRepository>,
    recipe_repo: Arc<RecipeRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config: Arc<dyn ComplianceConfigReader>,
}

impl TestReportApi {
    pub fn new(
        report_repo: Arc<TestReportRepository>,
        recipe_repo: Arc<RecipeRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config: Arc<dyn ComplianceConfigReader>,
    ) -> Self {
        Self {
            report_repo,
            recipe_repo,
            action_log_repo,
            config,
        }
    }

    /// Register a report for a recipe
    ///
    /// # Rules
    /// - explicit `valid_until` wins; ITTs otherwise get test_date + N years
    /// - `valid_until` before `test_date` is rejected
    pub async fn create_test_report(&self, input: NewTestReport, actor: &str) -> ApiResult<TestReport> {
        let actor = required(actor, "actor")?;
        let report_number = required(&input.report_number, "report_number")?;
        let laboratory = required(&input.laboratory, "laboratory")?;

        if let Some(until) = input.valid_until {
            if until < input.test_date {
                return Err(ApiError::InvalidInput(format!(
                    "valid_until {} is before test date {}",
                    until, input.test_date
                )));
            }
        }
        let invalid = input.results.invalid_fields();
        if !invalid.is_empty() {
            return Err(ApiError::InvalidInput(format!(
                "test results must be finite and non-negative: {}",
                invalid.join(", ")
            )));
        }

        let recipe = self
            .recipe_repo
            .find_by_id(&input.recipe_id)?
            .ok_or_else(|| ApiError::NotFound(format!("recipe (id={})", input.recipe_id)))?;

        let itt_years = self
            .config
            .get_itt_validity_years()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let valid_until = TestReportValidity::resolve_valid_until(
            input.report_type,
            input.test_date,
            input.valid_until,
            itt_years,
        )
        .map_err(|e| {
            warn!(report_number = %report_number, error = %e, "ITT expiry not computable");
            ApiError::ConfigError(e.to_string())
        })?;

        let report = TestReport {
            id: uuid::Uuid::new_v4().to_string(),
            recipe_id: recipe.id.clone(),
            report_number,
            report_type: input.report_type,
            test_date: input.test_date,
            valid_until,
            laboratory,
            results: input.results,
            status: TestReportStatus::Valid,
            revoked_reason: None,
            created_by: actor.clone(),
            created_at: Local::now().naive_local(),
        };

        self.report_repo.insert(&report)?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateTestReport, "test_report", &report.id, &actor)
                .with_payload(&report)
                .with_detail(format!(
                    "{} {} for {}",
                    report.report_type, report.report_number, recipe.recipe_code
                )),
        )?;

        info!(
            report_number = %report.report_number,
            report_type = %report.report_type,
            valid_until = ?report.valid_until,
            "test report registered"
        );
        Ok(report)
    }

    pub fn revoke_test_report(&self, report_id: &str, reason: &str, actor: &str) -> ApiResult<TestReport> {
        let actor = required(actor, "actor")?;
        let reason = required(reason, "reason")?;
        let report = self.load(report_id)?;

        if !self.report_repo.revoke(&report.id, &reason)? {
            return Err(ApiError::BusinessRuleViolation(format!(
                "test report {} is already revoked",
                report.report_number
            )));
        }
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RevokeTestReport, "test_report", &report.id, &actor)
                .with_payload(&json!({ "reason": reason }))
                .with_detail(format!("revoked {}", report.report_number)),
        )?;

        warn!(report_number = %report.report_number, reason = %reason, "test report revoked");
        self.load(&report.id)
    }

    /// Persist `expired` for every valid report past its date
    ///
    /// # Returns
    /// number of reports expired
    pub fn expire_overdue(&self, today: NaiveDate, actor: &str) -> ApiResult<usize> {
        let actor = required(actor, "actor")?;
        let ids = self.report_repo.expire_before(today)?;
        if ids.is_empty() {
            return Ok(0);
        }

        let logs: Vec<ActionLog> = ids
            .iter()
            .map(|id| {
                ActionLog::new(ActionType::ExpireTestReports, "test_report", id, &actor)
                    .with_detail(format!("expired as of {}", today))
            })
            .collect();
        self.action_log_repo.batch_insert(&logs)?;

        info!(count = ids.len(), today = %today, "test reports expired");
        Ok(ids.len())
    }

    pub fn get_test_report(&self, report_id: &str) -> ApiResult<TestReport> {
        self.load(report_id)
    }

    /// Reports of a recipe with the status they have on `on`
    pub fn list_by_recipe(&self, recipe_id: &str, on: NaiveDate) -> ApiResult<Vec<TestReport>> {
        let mut reports = self.report_repo.list_by_recipe(recipe_id)?;
        for report in &mut reports {
            report.status = TestReportValidity::effective_status(report, on);
        }
        Ok(reports)
    }

    fn load(&self, id: &str) -> ApiResult<TestReport> {
        self.report_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("test report (id={})", id)))
    }
}
