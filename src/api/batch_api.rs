// ==========================================
// EstrichManager - Batch API
// ==========================================
// Lifecycle rules: engine::batch_state
// QC comparison: engine::qc_gate
// Release is refused (ApiError::ReleaseBlocked) while the QC gate
// reports issues or an unclosed deviation references the batch.
// ==========================================

use std::sync::Arc;

use chrono::Local;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::deviation_api::DeviationApi;
use crate::api::error::{required, ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::batch::{Batch, NewBatch, QcData};
use crate::domain::deviation::{Deviation, NewDeviation};
use crate::domain::recipe::Recipe;
use crate::domain::types::{
    BatchStatus, DeviationSeverity, DeviationSource, DeviationType, RecipeStatus,
};
use crate::engine::batch_state::{BatchStateMachine, BatchTransition, ReleaseDecision};
use crate::engine::numbering::Numbering;
use crate::engine::qc_gate::{BatchQcGate, QcValidation};
use crate::engine::transition::TransitionError;
use crate::i18n;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::batch_repo::{BatchRepository, BatchStatusChange};
use crate::repository::deviation_repo::DeviationRepository;
use crate::repository::recipe_repo::RecipeRepository;
use crate::repository::sequence_repo::SequenceRepository;

// ==========================================
// BatchApi
// ==========================================

/// Production batches and the release gate
pub struct BatchApi {
    batch_repo: Arc<BatchRepository>,
    recipe_repo: Arc<RecipeRepository>,
    deviation_repo: Arc<DeviationRepository>,
    sequence_repo: Arc<SequenceRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    deviation_api: Arc<DeviationApi>,
}

impl BatchApi {
    pub fn new(
        batch_repo: Arc<BatchRepository>,
        recipe_repo: Arc<RecipeRepository>,
        deviation_repo: Arc<DeviationRepository>,
        sequence_repo: Arc<SequenceRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        deviation_api: Arc<DeviationApi>,
    ) -> Self {
        Self {
            batch_repo,
            recipe_repo,
            deviation_repo,
            sequence_repo,
            action_log_repo,
            deviation_api,
        }
    }

    // ==========================================
    // creation / QC data
    // ==========================================

    /// Register a produced batch of a locked recipe
    ///
    /// The number `{YYYYMMDD}-{recipeCode}-{seq}` is drawn from the
    /// sequence store; numbers already present for the day act as floor.
    pub fn create_batch(&self, input: NewBatch, actor: &str) -> ApiResult<Batch> {
        let actor = required(actor, "actor")?;
        if !input.quantity_t.is_finite() || input.quantity_t <= 0.0 {
            return Err(ApiError::InvalidInput(format!(
                "quantity must be a positive number of tonnes, got {}",
                input.quantity_t
            )));
        }
        reject_invalid_qc(&input.qc_data)?;

        let recipe = self.load_recipe(&input.recipe_id)?;
        if recipe.status != RecipeStatus::Locked {
            return Err(ApiError::BusinessRuleViolation(format!(
                "recipe {} is {}; batches require a locked recipe",
                recipe.recipe_code, recipe.status
            )));
        }

        let floor = self
            .batch_repo
            .numbers_for_day(&recipe.id, input.production_date)?
            .iter()
            .filter_map(|n| Numbering::parse_batch_sequence(n))
            .max()
            .unwrap_or(0);
        let seq = self.sequence_repo.next_value(
            &Numbering::batch_key(&recipe.recipe_code, input.production_date),
            floor,
        )?;

        let now = Local::now().naive_local();
        let batch = Batch {
            id: uuid::Uuid::new_v4().to_string(),
            batch_number: Numbering::batch_number(input.production_date, &recipe.recipe_code, seq),
            recipe_id: recipe.id.clone(),
            production_date: input.production_date,
            quantity_t: input.quantity_t,
            qc_data: input.qc_data,
            status: BatchStatus::Produced,
            blocked_reason: None,
            released_by: None,
            released_at: None,
            created_by: actor.clone(),
            created_at: now,
            updated_at: now,
        };

        self.batch_repo.insert(&batch)?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateBatch, "batch", &batch.id, &actor)
                .with_payload(&batch)
                .with_detail(format!("batch {} of {}", batch.batch_number, recipe.designation())),
        )?;

        info!(
            batch_number = %batch.batch_number,
            recipe_code = %recipe.recipe_code,
            quantity_t = batch.quantity_t,
            "batch created"
        );
        Ok(batch)
    }

    /// Merge measured QC values into the batch (produced / blocked only)
    pub fn record_qc(&self, batch_id: &str, qc: QcData, actor: &str) -> ApiResult<Batch> {
        let actor = required(actor, "actor")?;
        if qc.is_empty() {
            return Err(ApiError::InvalidInput("no QC values given".to_string()));
        }
        reject_invalid_qc(&qc)?;

        let mut batch = self.load(batch_id)?;
        if !BatchStateMachine::can_record_qc(batch.status) {
            return Err(TransitionError::new("Batch", "given QC data", batch.status).into());
        }

        batch.qc_data.merge(&qc);
        batch.updated_at = Local::now().naive_local();
        if !self
            .batch_repo
            .update_qc_data(&batch.id, batch.status, &batch.qc_data, batch.updated_at)?
        {
            return Err(self.stale(&batch));
        }

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::RecordQc, "batch", &batch.id, &actor)
                .with_payload(&qc)
                .with_detail(format!("QC recorded for {}", batch.batch_number)),
        )?;

        debug!(batch_number = %batch.batch_number, qc = ?batch.qc_data, "QC data recorded");
        Ok(batch)
    }

    /// Run the QC gate without changing anything (target `released`)
    pub fn validate_batch(&self, batch_id: &str) -> ApiResult<QcValidation> {
        let batch = self.load(batch_id)?;
        let recipe = self.load_recipe(&batch.recipe_id)?;
        Ok(BatchQcGate::validate_for_recipe(
            &batch.qc_data,
            &recipe,
            BatchStatus::Released,
        ))
    }

    /// Full release evaluation (QC gate plus open deviations)
    pub fn evaluate_release(&self, batch_id: &str) -> ApiResult<ReleaseDecision> {
        let batch = self.load(batch_id)?;
        self.decide_release(&batch)
    }

    // ==========================================
    // transitions
    // ==========================================

    /// produced -> released
    ///
    /// # Errors
    /// - InvalidTransition: the batch is not `produced`
    /// - ReleaseBlocked: QC issues or open deviations (all reasons listed)
    pub fn release_batch(&self, batch_id: &str, actor: &str) -> ApiResult<Batch> {
        let actor = required(actor, "actor")?;
        let mut batch = self.load(batch_id)?;
        let decision = self.decide_release(&batch)?;

        if !decision.allowed {
            warn!(
                batch_number = %batch.batch_number,
                issues = ?decision.issues,
                "release rejected"
            );
            return Err(ApiError::ReleaseBlocked {
                batch_number: batch.batch_number,
                reasons: decision.issues,
            });
        }

        let change = BatchStatusChange {
            from: batch.status,
            to: BatchStatus::Released,
            blocked_reason: None,
            released_by: Some(actor.as_str()),
            at: Local::now().naive_local(),
        };
        if !self.batch_repo.update_status(&batch.id, &change)? {
            return Err(self.stale(&batch));
        }
        batch.status = change.to;
        batch.blocked_reason = None;
        batch.released_by = Some(actor.clone());
        batch.released_at = Some(change.at);
        batch.updated_at = change.at;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::ReleaseBatch, "batch", &batch.id, &actor)
                .with_payload(&json!({ "qc_data": batch.qc_data }))
                .with_detail(format!("released {}", batch.batch_number)),
        )?;

        info!(batch_number = %batch.batch_number, released_by = %actor, "batch released");
        Ok(batch)
    }

    /// produced | released | blocked -> blocked (reason required)
    pub fn block_batch(&self, batch_id: &str, reason: &str, actor: &str) -> ApiResult<Batch> {
        let reason = required(reason, "reason")?;
        self.transition(batch_id, BatchTransition::Block, Some(&reason), ActionType::BlockBatch, actor)
    }

    /// blocked -> produced; the next release is validated again
    pub fn unblock_batch(&self, batch_id: &str, reason: &str, actor: &str) -> ApiResult<Batch> {
        let reason = required(reason, "reason")?;
        self.transition(batch_id, BatchTransition::Unblock, Some(&reason), ActionType::UnblockBatch, actor)
    }

    /// released -> consumed
    pub fn consume_batch(&self, batch_id: &str, actor: &str) -> ApiResult<Batch> {
        self.transition(batch_id, BatchTransition::Consume, None, ActionType::ConsumeBatch, actor)
    }

    /// Open an internal-QC deviation listing the gate issues of a batch
    pub fn raise_deviation_from_qc(&self, batch_id: &str, actor: &str) -> ApiResult<Deviation> {
        let batch = self.load(batch_id)?;
        let recipe = self.load_recipe(&batch.recipe_id)?;
        let validation =
            BatchQcGate::validate_for_recipe(&batch.qc_data, &recipe, BatchStatus::Released);
        if validation.is_valid {
            return Err(ApiError::BusinessRuleViolation(format!(
                "batch {} passes the QC gate, no deviation to raise",
                batch.batch_number
            )));
        }

        let issues = validation.messages().join("; ");
        let deviation = self.deviation_api.open_deviation(
            NewDeviation {
                title: i18n::t_with_args("deviation.qc_title", &[("batch", batch.batch_number.as_str())]),
                description: i18n::t_with_args(
                    "deviation.qc_description",
                    &[("batch", batch.batch_number.as_str()), ("issues", issues.as_str())],
                ),
                deviation_type: DeviationType::Product,
                severity: DeviationSeverity::Major,
                source: DeviationSource::InternalQc,
                recipe_id: Some(recipe.id.clone()),
                batch_id: Some(batch.id.clone()),
            },
            actor,
        )?;

        warn!(
            batch_number = %batch.batch_number,
            deviation_number = %deviation.deviation_number,
            "QC deviation raised"
        );
        Ok(deviation)
    }

    // ==========================================
    // reads
    // ==========================================

    pub fn get_batch(&self, batch_id: &str) -> ApiResult<Batch> {
        self.load(batch_id)
    }

    pub fn get_batch_by_number(&self, batch_number: &str) -> ApiResult<Batch> {
        self.batch_repo
            .find_by_number(batch_number.trim())?
            .ok_or_else(|| ApiError::NotFound(format!("batch {}", batch_number)))
    }

    pub fn list_batches(
        &self,
        recipe_id: Option<&str>,
        status: Option<BatchStatus>,
    ) -> ApiResult<Vec<Batch>> {
        Ok(self.batch_repo.list(recipe_id, status)?)
    }

    // ==========================================
    // helpers
    // ==========================================

    fn transition(
        &self,
        batch_id: &str,
        transition: BatchTransition,
        reason: Option<&str>,
        action_type: ActionType,
        actor: &str,
    ) -> ApiResult<Batch> {
        let actor = required(actor, "actor")?;
        let mut batch = self.load(batch_id)?;
        let target = BatchStateMachine::target(batch.status, transition).map_err(|e| {
            warn!(batch_number = %batch.batch_number, error = %e, "batch transition rejected");
            ApiError::from(e)
        })?;

        // the reason is kept only while the batch stays blocked
        let blocked_reason = (target == BatchStatus::Blocked).then_some(reason).flatten();
        let change = BatchStatusChange {
            from: batch.status,
            to: target,
            blocked_reason,
            released_by: None,
            at: Local::now().naive_local(),
        };
        if !self.batch_repo.update_status(&batch.id, &change)? {
            return Err(self.stale(&batch));
        }

        let from = batch.status;
        batch.status = target;
        batch.blocked_reason = blocked_reason.map(str::to_string);
        batch.updated_at = change.at;

        self.action_log_repo.insert(
            &ActionLog::new(action_type, "batch", &batch.id, &actor)
                .with_payload(&json!({
                    "from": from.as_str(),
                    "to": target.as_str(),
                    "reason": reason,
                }))
                .with_detail(format!("{}: {} -> {}", batch.batch_number, from, target)),
        )?;

        info!(batch_number = %batch.batch_number, from = %from, to = %target, "batch status changed");
        Ok(batch)
    }

    fn decide_release(&self, batch: &Batch) -> ApiResult<ReleaseDecision> {
        let recipe = self.load_recipe(&batch.recipe_id)?;
        let open = self.deviation_repo.open_numbers_for_batch(&batch.id)?;
        Ok(BatchStateMachine::evaluate_release(batch, &recipe, &open)?)
    }

    fn load(&self, id: &str) -> ApiResult<Batch> {
        self.batch_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("batch (id={})", id)))
    }

    fn load_recipe(&self, id: &str) -> ApiResult<Recipe> {
        self.recipe_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("recipe (id={})", id)))
    }

    fn stale(&self, batch: &Batch) -> ApiError {
        ApiError::ConcurrentModification(format!(
            "batch {} is no longer {}",
            batch.batch_number, batch.status
        ))
    }
}

fn reject_invalid_qc(qc: &QcData) -> ApiResult<()> {
    let invalid = qc.invalid_fields();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "QC values must be finite and non-negative: {}",
            invalid.join(", ")
        )))
    }
}
