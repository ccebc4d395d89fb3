// ==========================================
// EstrichManager - Batch state machine
// ==========================================
// produced --release--> released --consume--> consumed (terminal)
// produced | released | blocked --block--> blocked
// blocked --unblock--> produced
// A blocked batch is never released directly; it is unblocked
// and the next release request is validated again.
// ==========================================

use crate::domain::batch::Batch;
use crate::domain::recipe::Recipe;
use crate::domain::types::BatchStatus;
use crate::engine::qc_gate::{BatchQcGate, QcValidation};
use crate::engine::transition::TransitionError;
use crate::i18n;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchTransition {
    Release,
    Block,
    Unblock,
    Consume,
}

impl BatchTransition {
    fn past_participle(&self) -> &'static str {
        match self {
            BatchTransition::Release => "released",
            BatchTransition::Block => "blocked",
            BatchTransition::Unblock => "unblocked",
            BatchTransition::Consume => "consumed",
        }
    }
}

/// Outcome of a release evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseDecision {
    pub allowed: bool,
    pub validation: QcValidation,
    pub blocking_deviations: Vec<String>, // deviation numbers
    pub issues: Vec<String>,              // QC messages, then deviation messages
}

pub struct BatchStateMachine;

impl BatchStateMachine {
    /// Target status of a transition, or why it is not allowed
    pub fn target(
        current: BatchStatus,
        transition: BatchTransition,
    ) -> Result<BatchStatus, TransitionError> {
        let next = match (current, transition) {
            (BatchStatus::Produced, BatchTransition::Release) => Some(BatchStatus::Released),
            (BatchStatus::Consumed, BatchTransition::Block) => None,
            (_, BatchTransition::Block) => Some(BatchStatus::Blocked),
            (BatchStatus::Blocked, BatchTransition::Unblock) => Some(BatchStatus::Produced),
            (BatchStatus::Released, BatchTransition::Consume) => Some(BatchStatus::Consumed),
            _ => None,
        };

        next.ok_or_else(|| TransitionError::new("Batch", transition.past_participle(), current))
    }

    /// QC values may be (re-)recorded until the batch is released
    pub fn can_record_qc(current: BatchStatus) -> bool {
        matches!(current, BatchStatus::Produced | BatchStatus::Blocked)
    }

    /// Evaluate a release request
    ///
    /// # Rules
    /// 1. the status must allow `release` (else Err)
    /// 2. the QC gate must pass for target `released`
    /// 3. no unclosed deviation may reference the batch
    pub fn evaluate_release(
        batch: &Batch,
        recipe: &Recipe,
        open_deviation_numbers: &[String],
    ) -> Result<ReleaseDecision, TransitionError> {
        Self::target(batch.status, BatchTransition::Release)?;

        let validation =
            BatchQcGate::validate_for_recipe(&batch.qc_data, recipe, BatchStatus::Released);

        let mut issues = validation.messages();
        for number in open_deviation_numbers {
            issues.push(i18n::t_with_args(
                "qc.open_deviation",
                &[("number", number.as_str())],
            ));
        }

        Ok(ReleaseDecision {
            allowed: issues.is_empty(),
            validation,
            blocking_deviations: open_deviation_numbers.to_vec(),
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BatchStatus::*;
    use BatchTransition::*;

    #[test]
    fn test_release_only_from_produced() {
        assert_eq!(BatchStateMachine::target(Produced, Release), Ok(Released));
        for from in [Released, Blocked, Consumed] {
            let err = BatchStateMachine::target(from, Release).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Batch cannot be released from status: {}", from)
            );
        }
    }

    #[test]
    fn test_block_allowed_until_consumed() {
        for from in [Produced, Released, Blocked] {
            assert_eq!(BatchStateMachine::target(from, Block), Ok(Blocked));
        }
        let err = BatchStateMachine::target(Consumed, Block).unwrap_err();
        assert_eq!(err.to_string(), "Batch cannot be blocked from status: consumed");
    }

    #[test]
    fn test_consumed_is_terminal() {
        for t in [Release, Block, Unblock, Consume] {
            assert!(BatchStateMachine::target(Consumed, t).is_err());
        }
    }

    #[test]
    fn test_unblock_and_consume() {
        assert_eq!(BatchStateMachine::target(Blocked, Unblock), Ok(Produced));
        assert!(BatchStateMachine::target(Produced, Unblock).is_err());
        assert_eq!(BatchStateMachine::target(Released, Consume), Ok(Consumed));
        assert!(BatchStateMachine::target(Produced, Consume).is_err());
    }

    #[test]
    fn test_qc_recording_window() {
        assert!(BatchStateMachine::can_record_qc(Produced));
        assert!(BatchStateMachine::can_record_qc(Blocked));
        assert!(!BatchStateMachine::can_record_qc(Released));
        assert!(!BatchStateMachine::can_record_qc(Consumed));
    }
}
