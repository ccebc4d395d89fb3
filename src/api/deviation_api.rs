// ==========================================
// EstrichManager - Deviation / CAPA API
// ==========================================
// Workflow rules live in engine::capa_workflow; this layer
// validates input, numbers deviations, persists and audits.
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::error::{optional, required, ApiError, ApiResult};
use crate::config::ComplianceConfigReader;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::calendar::days_after;
use crate::domain::deviation::{
    CorrectiveAction, Deviation, DeviationDetail, EffectivenessCheck, NewCorrectiveAction,
    NewDeviation, RootCauseAnalysis,
};
use crate::domain::types::{ActionStatus, CheckResult, DeviationStatus};
use crate::engine::capa_workflow::{ActionOperation, CapaEvent, CapaWorkflow};
use crate::engine::numbering::Numbering;
use crate::engine::transition::TransitionError;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::batch_repo::BatchRepository;
use crate::repository::deviation_repo::{DeviationRepository, DeviationStatusChange};
use crate::repository::recipe_repo::RecipeRepository;
use crate::repository::sequence_repo::SequenceRepository;

// ==========================================
// DeviationApi
// ==========================================

/// Deviation and CAPA tracking
///
/// Responsibilities:
/// 1. open deviations (numbered `DEV-{YYYY}-{seq}`)
/// 2. root cause, corrective actions, effectiveness checks
/// 3. drive the deviation status through CapaWorkflow
/// 4. ActionLog for every write
pub struct DeviationApi {
    deviation_repo: Arc<DeviationRepository>,
    recipe_repo: Arc<RecipeRepository>,
    batch_repo: Arc<BatchRepository>,
    sequence_repo: Arc<SequenceRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config: Arc<dyn ComplianceConfigReader>,
}

impl DeviationApi {
    pub fn new(
        deviation_repo: Arc<DeviationRepository>,
        recipe_repo: Arc<RecipeRepository>,
        batch_repo: Arc<BatchRepository>,
        sequence_repo: Arc<SequenceRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config: Arc<dyn ComplianceConfigReader>,
    ) -> Self {
        Self {
            deviation_repo,
            recipe_repo,
            batch_repo,
            sequence_repo,
            action_log_repo,
            config,
        }
    }

    // ==========================================
    // deviations
    // ==========================================

    /// Open a deviation in status `open`
    ///
    /// A linked batch also fills in its recipe when none is given.
    pub fn open_deviation(&self, input: NewDeviation, actor: &str) -> ApiResult<Deviation> {
        let actor = required(actor, "actor")?;
        let title = required(&input.title, "title")?;
        let description = required(&input.description, "description")?;

        let mut recipe_id = optional(input.recipe_id.as_deref());
        let batch_id = optional(input.batch_id.as_deref());

        if let Some(batch_id) = &batch_id {
            let batch = self
                .batch_repo
                .find_by_id(batch_id)?
                .ok_or_else(|| ApiError::NotFound(format!("batch (id={})", batch_id)))?;
            match &recipe_id {
                Some(r) if *r != batch.recipe_id => {
                    return Err(ApiError::InvalidInput(format!(
                        "batch {} does not belong to recipe {}",
                        batch.batch_number, r
                    )));
                }
                Some(_) => {}
                None => recipe_id = Some(batch.recipe_id),
            }
        }
        if let Some(recipe_id) = &recipe_id {
            if self.recipe_repo.find_by_id(recipe_id)?.is_none() {
                return Err(ApiError::NotFound(format!("recipe (id={})", recipe_id)));
            }
        }

        let now = Local::now().naive_local();
        let today = now.date();
        let seq = self.sequence_repo.next_value(&Numbering::deviation_key(today), 0)?;

        let deviation = Deviation {
            id: uuid::Uuid::new_v4().to_string(),
            deviation_number: Numbering::deviation_number(today, seq),
            title,
            description,
            deviation_type: input.deviation_type,
            severity: input.severity,
            source: input.source,
            status: DeviationStatus::Open,
            recipe_id,
            batch_id,
            root_cause: None,
            created_by: actor.clone(),
            created_at: now,
            updated_at: now,
            closed_at: None,
        };

        self.deviation_repo.insert(&deviation)?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::OpenDeviation, "deviation", &deviation.id, &actor)
                .with_payload(&json!({
                    "deviation_number": deviation.deviation_number,
                    "severity": deviation.severity.as_str(),
                    "source": deviation.source.as_str(),
                    "batch_id": deviation.batch_id,
                }))
                .with_detail(deviation.title.clone()),
        )?;

        info!(
            deviation_number = %deviation.deviation_number,
            severity = %deviation.severity,
            "deviation opened"
        );
        Ok(deviation)
    }

    /// Attach (or refine) the root-cause analysis; moves to `investigation`
    pub fn record_root_cause(
        &self,
        deviation_id: &str,
        analysis: RootCauseAnalysis,
        actor: &str,
    ) -> ApiResult<Deviation> {
        let actor = required(actor, "actor")?;
        let analysis = RootCauseAnalysis {
            summary: required(&analysis.summary, "summary")?,
            analysed_by: required(&analysis.analysed_by, "analysed_by")?,
            contributing_factors: analysis
                .contributing_factors
                .iter()
                .filter_map(|f| optional(Some(f)))
                .collect(),
            ..analysis
        };

        let mut deviation = self.load(deviation_id)?;
        let target = self.transition(&deviation, CapaEvent::RootCauseRecorded)?;
        let change = self.change(&deviation, target);

        if !self.deviation_repo.set_root_cause(&deviation.id, &analysis, change)? {
            return Err(self.stale(&deviation));
        }
        deviation.status = target;
        deviation.updated_at = change.at;
        deviation.root_cause = Some(analysis.clone());

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RecordRootCause, "deviation", &deviation.id, &actor)
                .with_payload(&analysis)
                .with_detail(format!("{}: {}", deviation.deviation_number, analysis.method)),
        )?;

        info!(deviation_number = %deviation.deviation_number, method = %analysis.method, "root cause recorded");
        Ok(deviation)
    }

    pub fn get_deviation(&self, deviation_id: &str) -> ApiResult<DeviationDetail> {
        let deviation = self.load(deviation_id)?;
        let actions = self.deviation_repo.list_actions(&deviation.id)?;
        let checks = self.deviation_repo.list_checks(&deviation.id)?;
        Ok(DeviationDetail {
            deviation,
            actions,
            checks,
        })
    }

    pub fn get_deviation_by_number(&self, deviation_number: &str) -> ApiResult<DeviationDetail> {
        let deviation = self
            .deviation_repo
            .find_by_number(deviation_number.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("deviation {}", deviation_number)))?;
        self.get_deviation(&deviation.id)
    }

    pub fn list_deviations(&self, status: Option<DeviationStatus>) -> ApiResult<Vec<Deviation>> {
        let deviations = self.deviation_repo.list(status)?;
        debug!(count = deviations.len(), "deviations listed");
        Ok(deviations)
    }

    // ==========================================
    // corrective actions
    // ==========================================

    pub fn add_corrective_action(
        &self,
        deviation_id: &str,
        input: NewCorrectiveAction,
        actor: &str,
    ) -> ApiResult<CorrectiveAction> {
        let actor = required(actor, "actor")?;
        if input.planned_due < input.planned_start {
            return Err(ApiError::InvalidInput(format!(
                "planned due date {} is before planned start {}",
                input.planned_due, input.planned_start
            )));
        }

        let deviation = self.load(deviation_id)?;
        let target = self.transition(&deviation, CapaEvent::ActionAdded)?;

        let action = CorrectiveAction {
            id: uuid::Uuid::new_v4().to_string(),
            deviation_id: deviation.id.clone(),
            kind: input.kind,
            description: required(&input.description, "description")?,
            responsible_person: required(&input.responsible_person, "responsible_person")?,
            planned_start: input.planned_start,
            planned_due: input.planned_due,
            actual_start: None,
            actual_completion: None,
            status: ActionStatus::Planned,
            completion_note: None,
            created_at: Local::now().naive_local(),
        };

        // guarded even without a status change: the action must not land
        // in a deviation that moved on meanwhile
        let change = self.change(&deviation, target);
        if !self.deviation_repo.insert_action(&action, Some(change))? {
            return Err(self.stale(&deviation));
        }

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::AddCorrectiveAction, "deviation", &deviation.id, &actor)
                .with_payload(&action)
                .with_detail(format!(
                    "{}: {} action for {}",
                    deviation.deviation_number, action.kind, action.responsible_person
                )),
        )?;

        info!(
            deviation_number = %deviation.deviation_number,
            kind = %action.kind,
            due = %action.planned_due,
            "corrective action added"
        );
        Ok(action)
    }

    pub fn start_action(&self, action_id: &str, started_on: NaiveDate, actor: &str) -> ApiResult<CorrectiveAction> {
        self.progress_action(action_id, ActionOperation::Start, started_on, None, actor)
    }

    pub fn complete_action(
        &self,
        action_id: &str,
        completed_on: NaiveDate,
        note: Option<&str>,
        actor: &str,
    ) -> ApiResult<CorrectiveAction> {
        self.progress_action(action_id, ActionOperation::Complete, completed_on, note, actor)
    }

    pub fn cancel_action(
        &self,
        action_id: &str,
        cancelled_on: NaiveDate,
        reason: &str,
        actor: &str,
    ) -> ApiResult<CorrectiveAction> {
        let reason = required(reason, "reason")?;
        self.progress_action(action_id, ActionOperation::Cancel, cancelled_on, Some(&reason), actor)
    }

    /// Start / complete / cancel one action and derive the deviation status
    ///
    /// Once every non-cancelled action is completed the deviation moves
    /// to `effectiveness_check_pending`.
    fn progress_action(
        &self,
        action_id: &str,
        operation: ActionOperation,
        on: NaiveDate,
        note: Option<&str>,
        actor: &str,
    ) -> ApiResult<CorrectiveAction> {
        let actor = required(actor, "actor")?;
        let mut action = self
            .deviation_repo
            .find_action(action_id)?
            .ok_or_else(|| ApiError::NotFound(format!("corrective action (id={})", action_id)))?;
        let deviation = self.load(&action.deviation_id)?;

        if !CapaWorkflow::accepts_action_updates(deviation.status) {
            return Err(TransitionError::new("Deviation", "given action updates", deviation.status).into());
        }

        let expected = action.status;
        action.status = CapaWorkflow::action_target(expected, operation)?;
        match operation {
            ActionOperation::Start => action.actual_start = Some(on),
            ActionOperation::Complete => {
                action.actual_start.get_or_insert(on);
                action.actual_completion = Some(on);
                action.completion_note = optional(note);
            }
            ActionOperation::Cancel => {
                action.actual_completion = Some(on);
                action.completion_note = optional(note);
            }
        }

        // re-derived inside the write transaction from the stored actions
        let derive = |current: DeviationStatus, actions: &[CorrectiveAction]| {
            let event = match operation {
                ActionOperation::Start => Some(CapaEvent::ActionStarted),
                ActionOperation::Complete | ActionOperation::Cancel => {
                    CapaWorkflow::all_actions_completed(actions).then_some(CapaEvent::ActionsCompleted)
                }
            };
            event.and_then(|event| CapaWorkflow::apply(current, event).ok())
        };

        let deviation_status = self
            .deviation_repo
            .update_action(&action, expected, Local::now().naive_local(), derive)?
            .ok_or_else(|| {
                ApiError::ConcurrentModification(format!(
                    "corrective action {} of {} changed meanwhile",
                    action.id, deviation.deviation_number
                ))
            })?;
        let moved = (deviation_status != deviation.status).then_some(deviation_status);

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::UpdateCorrectiveAction, "deviation", &deviation.id, &actor)
                .with_payload(&json!({
                    "action_id": action.id,
                    "from": expected.as_str(),
                    "to": action.status.as_str(),
                    "deviation_status": moved.map(|s| s.as_str()),
                }))
                .with_detail(format!("{}: action {}", deviation.deviation_number, action.status)),
        )?;

        info!(
            deviation_number = %deviation.deviation_number,
            action_status = %action.status,
            deviation_status = %deviation_status,
            "corrective action updated"
        );
        Ok(action)
    }

    // ==========================================
    // effectiveness checks
    // ==========================================

    /// Plan an effectiveness check
    ///
    /// Without a date the check is planned `effectiveness_check_lead_days`
    /// (config, default 90) from today. Only one pending check per deviation.
    pub async fn schedule_effectiveness_check(
        &self,
        deviation_id: &str,
        success_criteria: &str,
        planned_date: Option<NaiveDate>,
        actor: &str,
    ) -> ApiResult<EffectivenessCheck> {
        let actor = required(actor, "actor")?;
        let success_criteria = required(success_criteria, "success_criteria")?;

        let deviation = self.load(deviation_id)?;
        self.transition(&deviation, CapaEvent::CheckScheduled)?;

        if self
            .deviation_repo
            .list_checks(&deviation.id)?
            .iter()
            .any(|c| c.result == CheckResult::Pending)
        {
            return Err(ApiError::BusinessRuleViolation(format!(
                "{} already has a pending effectiveness check",
                deviation.deviation_number
            )));
        }

        let now = Local::now().naive_local();
        let planned_date = match planned_date {
            Some(d) => d,
            None => {
                let lead = self
                    .config
                    .get_effectiveness_check_lead_days()
                    .await
                    .map_err(|e| ApiError::ConfigError(e.to_string()))?;
                days_after(now.date(), lead).ok_or_else(|| {
                    ApiError::ConfigError(format!("effectiveness check lead of {} days is out of range", lead))
                })?
            }
        };

        let check = EffectivenessCheck {
            id: uuid::Uuid::new_v4().to_string(),
            deviation_id: deviation.id.clone(),
            success_criteria,
            planned_date,
            performed_on: None,
            performed_by: None,
            result: CheckResult::Pending,
            notes: None,
            created_at: now,
        };

        if !self.deviation_repo.insert_check(&check, None)? {
            return Err(self.stale(&deviation));
        }
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::ScheduleEffectivenessCheck, "deviation", &deviation.id, &actor)
                .with_payload(&check)
                .with_detail(format!("{}: check planned {}", deviation.deviation_number, planned_date)),
        )?;

        info!(deviation_number = %deviation.deviation_number, planned = %planned_date, "effectiveness check scheduled");
        Ok(check)
    }

    /// Record the outcome of a check
    ///
    /// Passed closes the deviation; failed returns it to
    /// `corrective_action_planned` for further actions.
    pub fn perform_effectiveness_check(
        &self,
        check_id: &str,
        passed: bool,
        performed_on: NaiveDate,
        notes: Option<&str>,
        actor: &str,
    ) -> ApiResult<DeviationDetail> {
        let actor = required(actor, "actor")?;
        let mut check = self
            .deviation_repo
            .find_check(check_id)?
            .ok_or_else(|| ApiError::NotFound(format!("effectiveness check (id={})", check_id)))?;
        if check.result != CheckResult::Pending {
            return Err(TransitionError::new("Effectiveness check", "performed", check.result).into());
        }

        let deviation = self.load(&check.deviation_id)?;
        let event = if passed {
            CapaEvent::CheckPassed
        } else {
            CapaEvent::CheckFailed
        };
        let target = self.transition(&deviation, event)?;
        let change = self.change(&deviation, target);

        check.performed_on = Some(performed_on);
        check.performed_by = Some(actor.clone());
        check.result = if passed { CheckResult::Passed } else { CheckResult::Failed };
        check.notes = optional(notes);

        if !self.deviation_repo.record_check_result(&check, change)? {
            return Err(self.stale(&deviation));
        }
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::PerformEffectivenessCheck, "deviation", &deviation.id, &actor)
                .with_payload(&check)
                .with_detail(format!("{}: check {}", deviation.deviation_number, check.result)),
        )?;

        if passed {
            info!(deviation_number = %deviation.deviation_number, "effectiveness check passed, deviation closed");
        } else {
            warn!(deviation_number = %deviation.deviation_number, "effectiveness check failed, corrective actions reopened");
        }
        self.get_deviation(&deviation.id)
    }

    // ==========================================
    // helpers
    // ==========================================

    fn load(&self, id: &str) -> ApiResult<Deviation> {
        self.deviation_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("deviation (id={})", id)))
    }

    fn transition(&self, deviation: &Deviation, event: CapaEvent) -> ApiResult<DeviationStatus> {
        CapaWorkflow::apply(deviation.status, event).map_err(|e| {
            warn!(deviation_number = %deviation.deviation_number, error = %e, "CAPA transition rejected");
            ApiError::from(e)
        })
    }

    fn change(&self, deviation: &Deviation, to: DeviationStatus) -> DeviationStatusChange {
        DeviationStatusChange {
            from: deviation.status,
            to,
            at: Local::now().naive_local(),
        }
    }

    fn stale(&self, deviation: &Deviation) -> ApiError {
        ApiError::ConcurrentModification(format!(
            "deviation {} is no longer {}",
            deviation.deviation_number, deviation.status
        ))
    }
}
