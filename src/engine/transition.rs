// ==========================================
// EstrichManager - Transition error shared by the state machines
// ==========================================

use thiserror::Error;

/// A lifecycle transition that is not allowed from the current status
///
/// Display: `"Batch cannot be released from status: blocked"`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{entity} cannot be {action} from status: {from}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub action: &'static str,
    pub from: String,
}

impl TransitionError {
    pub fn new(entity: &'static str, action: &'static str, from: impl ToString) -> Self {
        Self {
            entity,
            action,
            from: from.to_string(),
        }
    }
}
