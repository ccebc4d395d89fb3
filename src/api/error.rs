// ==========================================
// EstrichManager - API error type
// ==========================================
// Converts repository / engine errors into caller-facing errors.
// Every rejection names its reason.
// ==========================================

use crate::engine::dop_generator::DopPrerequisiteError;
use crate::engine::transition::TransitionError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API layer error
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // compliance rule violations
    // ==========================================
    /// Batch QC gate failed or an open deviation blocks the release
    #[error("batch {batch_number} cannot be released: {}", .reasons.join("; "))]
    ReleaseBlocked {
        batch_number: String,
        reasons: Vec<String>,
    },

    /// Locked / archived recipes are immutable
    #[error("recipe is locked: {0}")]
    RecipeLocked(String),

    #[error("DoP cannot be issued: {0}")]
    DopPrerequisite(#[from] DopPrerequisiteError),

    /// `"<Entity> cannot be <action> from status: <status>"`
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    // ==========================================
    // business errors
    // ==========================================
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("business rule violated: {0}")]
    BusinessRuleViolation(String),

    /// A guarded update found the record in another state
    #[error("record was modified concurrently: {0}")]
    ConcurrentModification(String),

    // ==========================================
    // data access
    // ==========================================
    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("database transaction failed: {0}")]
    DatabaseTransactionError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    // ==========================================
    // generic
    // ==========================================
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// From RepositoryError
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => ApiError::DatabaseTransactionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("failed to acquire database lock: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("duplicate value: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("unknown reference: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InternalError(format!("column {}: {}", field, message))
            }
            RepositoryError::JsonError(msg) => ApiError::InternalError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result alias
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// input helpers
// ==========================================

/// Trimmed value or InvalidInput naming the field
pub(crate) fn required(value: &str, field: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(value.to_string())
}

/// Trimmed optional value; blank becomes None
pub(crate) fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
