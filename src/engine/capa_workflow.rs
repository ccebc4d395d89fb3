// ==========================================
// EstrichManager - Deviation / CAPA workflow
// ==========================================
// open -> investigation -> corrective_action_planned
//      -> corrective_action_in_progress -> effectiveness_check_pending
//      -> closed
// A failed effectiveness check returns the deviation to
// corrective_action_planned so that new actions can be added.
// ==========================================

use crate::domain::deviation::CorrectiveAction;
use crate::domain::types::{ActionStatus, DeviationStatus};
use crate::engine::transition::TransitionError;
use serde::{Deserialize, Serialize};

/// Workflow events raised by the deviation operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapaEvent {
    RootCauseRecorded,
    ActionAdded,
    ActionStarted,
    /// every non-cancelled action is completed (at least one)
    ActionsCompleted,
    CheckScheduled,
    CheckPassed,
    CheckFailed,
}

impl CapaEvent {
    fn past_participle(&self) -> &'static str {
        match self {
            CapaEvent::RootCauseRecorded => "investigated",
            CapaEvent::ActionAdded => "given corrective actions",
            CapaEvent::ActionStarted => "worked on",
            CapaEvent::ActionsCompleted => "completed",
            CapaEvent::CheckScheduled => "scheduled for an effectiveness check",
            CapaEvent::CheckPassed | CapaEvent::CheckFailed => "verified",
        }
    }
}

/// Operations on a single corrective action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOperation {
    Start,
    Complete,
    Cancel,
}

impl ActionOperation {
    fn past_participle(&self) -> &'static str {
        match self {
            ActionOperation::Start => "started",
            ActionOperation::Complete => "completed",
            ActionOperation::Cancel => "cancelled",
        }
    }
}

pub struct CapaWorkflow;

impl CapaWorkflow {
    /// Next deviation status for an event
    pub fn apply(current: DeviationStatus, event: CapaEvent) -> Result<DeviationStatus, TransitionError> {
        use DeviationStatus::*;

        let next = match (current, event) {
            (Open | Investigation, CapaEvent::RootCauseRecorded) => Some(Investigation),

            (Investigation | CorrectiveActionPlanned, CapaEvent::ActionAdded) => {
                Some(CorrectiveActionPlanned)
            }
            (CorrectiveActionInProgress, CapaEvent::ActionAdded) => Some(CorrectiveActionInProgress),

            (CorrectiveActionPlanned | CorrectiveActionInProgress, CapaEvent::ActionStarted) => {
                Some(CorrectiveActionInProgress)
            }

            (CorrectiveActionPlanned | CorrectiveActionInProgress, CapaEvent::ActionsCompleted) => {
                Some(EffectivenessCheckPending)
            }

            (
                s @ (CorrectiveActionPlanned | CorrectiveActionInProgress | EffectivenessCheckPending),
                CapaEvent::CheckScheduled,
            ) => Some(s),

            (EffectivenessCheckPending, CapaEvent::CheckPassed) => Some(Closed),
            (EffectivenessCheckPending, CapaEvent::CheckFailed) => Some(CorrectiveActionPlanned),

            _ => None,
        };

        next.ok_or_else(|| TransitionError::new("Deviation", event.past_participle(), current))
    }

    /// Next status of a single corrective action
    pub fn action_target(
        current: ActionStatus,
        operation: ActionOperation,
    ) -> Result<ActionStatus, TransitionError> {
        let next = match (current, operation) {
            (ActionStatus::Planned, ActionOperation::Start) => Some(ActionStatus::InProgress),
            (ActionStatus::Planned | ActionStatus::InProgress, ActionOperation::Complete) => {
                Some(ActionStatus::Completed)
            }
            (ActionStatus::Planned | ActionStatus::InProgress, ActionOperation::Cancel) => {
                Some(ActionStatus::Cancelled)
            }
            _ => None,
        };

        next.ok_or_else(|| {
            TransitionError::new("Corrective action", operation.past_participle(), current)
        })
    }

    /// Single actions may be started, completed or cancelled
    pub fn accepts_action_updates(current: DeviationStatus) -> bool {
        matches!(
            current,
            DeviationStatus::CorrectiveActionPlanned | DeviationStatus::CorrectiveActionInProgress
        )
    }

    /// True when at least one action is completed and none is still open
    pub fn all_actions_completed(actions: &[CorrectiveAction]) -> bool {
        let any_completed = actions
            .iter()
            .any(|a| a.status == ActionStatus::Completed);
        any_completed && !actions.iter().any(|a| a.is_open())
    }
}
