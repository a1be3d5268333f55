use thiserror::Error;

/// Top-level application error.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Persistence errors ───────────────────────────────────────────────────
    #[error("Database connection failed: {0}")]
    DatabaseConnectionFailed(#[source] sqlx::Error),

    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Session store is not configured")]
    StoreUnavailable,

    // ── AI agent errors ──────────────────────────────────────────────────────
    #[error("AI agent is not configured: {reason}")]
    AgentNotConfigured { reason: String },

    #[error("AI agent did not answer within {seconds}s")]
    AgentTimeout { seconds: u64 },

    #[error("Inference error: {message}")]
    InferenceError { message: String },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    // ── Session errors ───────────────────────────────────────────────────────
    #[error("Session '{id}' not found")]
    SessionNotFound { id: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::SessionNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::EmptyField { .. } | AppError::FieldTooLong { .. })
    }

    pub fn is_agent_unavailable(&self) -> bool {
        matches!(
            self,
            AppError::AgentNotConfigured { .. } | AppError::AgentTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_helpers() {
        assert!(AppError::SessionNotFound { id: "x".into() }.is_not_found());
        assert!(AppError::EmptyField { field_name: "my_nickname".into() }.is_validation());
        assert!(AppError::AgentTimeout { seconds: 60 }.is_agent_unavailable());
        assert!(!AppError::StoreUnavailable.is_agent_unavailable());
        assert!(!AppError::InferenceError { message: "boom".into() }.is_validation());
    }

    #[test]
    fn test_display_includes_field_details() {
        let err = AppError::FieldTooLong {
            field_name: "worry_content".into(),
            max_length: 10,
            actual_length: 12,
        };
        assert_eq!(
            err.to_string(),
            "Field 'worry_content' exceeds max length of 10 (actual: 12)"
        );
    }
}
