use thiserror::Error;

/// Errors produced while building an off-plan payment schedule.
#[derive(Debug, Error)]
pub enum FinancingError {
    /// The request violates an input constraint. Nothing is computed.
    #[error("Invalid input: {field} ({reason})")]
    Validation { field: String, reason: String },

    /// The recurrence lost track of the previous row.
    #[error("Internal inconsistency at month {month}: {reason}")]
    InternalInconsistency { month: u32, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FinancingError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FinancingError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The terms are valid one by one but push a value past what `Decimal` can hold.
    pub(crate) fn out_of_range(field: impl Into<String>) -> Self {
        FinancingError::validation(field, "is too large to compute the schedule")
    }

    /// Whether the failure was caused by the caller's request rather than by the calculator.
    pub fn is_client_error(&self) -> bool {
        match self {
            FinancingError::Validation { .. } | FinancingError::Serialization(_) => true,
            FinancingError::InternalInconsistency { .. } => false,
        }
    }
}

impl From<serde_json::Error> for FinancingError {
    fn from(e: serde_json::Error) -> Self {
        FinancingError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FinancingError>;
