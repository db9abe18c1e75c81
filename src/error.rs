use thiserror::Error;

use crate::core::extractor::ExtractionError;

/// Main error type for the planner
#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Completion endpoint error: {0}")]
    Completion(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid AI response format: {source}")]
    Extraction {
        #[source]
        source: ExtractionError,
        /// Verbatim completion text the extraction ran against
        raw: String,
    },

    #[error("Record not found: {table}/{id}")]
    RecordNotFound { table: String, id: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Rate limit exceeded: retry after {retry_after}s")]
    RateLimit { retry_after: u64 },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlannerError::Extraction { .. }
                | PlannerError::RateLimit { .. }
                | PlannerError::Timeout(_)
        )
    }

    /// Get the error code for structured responses
    pub fn error_code(&self) -> &'static str {
        match self {
            PlannerError::Config(_) => "CONFIG_ERROR",
            PlannerError::Completion(_) => "COMPLETION_ERROR",
            PlannerError::Serialization(_) => "SERIALIZATION_ERROR",
            PlannerError::Io(_) => "IO_ERROR",
            PlannerError::Validation(_) => "VALIDATION_ERROR",
            PlannerError::Extraction { .. } => "EXTRACTION_ERROR",
            PlannerError::RecordNotFound { .. } => "RECORD_NOT_FOUND",
            PlannerError::Storage(_) => "STORAGE_ERROR",
            PlannerError::Timeout(_) => "TIMEOUT_ERROR",
            PlannerError::RateLimit { .. } => "RATE_LIMIT_ERROR",
            PlannerError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// Raw completion text attached to an extraction failure, for diagnostics
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            PlannerError::Extraction { raw, .. } => Some(raw.as_str()),
            _ => None,
        }
    }

    /// Convert to a structured error payload
    pub fn to_error_payload(&self) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
                "retryable": self.is_retryable()
            }
        });

        if let PlannerError::Extraction { source, .. } = self {
            payload["error"]["reason"] = serde_json::json!(source.reason().as_str());
        }

        payload
    }
}
