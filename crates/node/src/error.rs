//! Errors a node's `execute` may return.

/// Error returned from a node's `execute`, distinguishing failure classes
/// the engine needs to treat differently.
///
/// Every variant maps to `ErrorKind::NodeExecution` at the
/// `weave-error` boundary — node errors are always recovered locally and
/// applied via the workflow's failure policy, never bubbled as a fatal
/// engine error.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum NodeError {
    /// The node's own validation of its resolved parameters failed before
    /// any side effect occurred.
    #[error("validation: {0}")]
    Validation(String),

    /// The node attempted an operation and it failed (upstream HTTP error,
    /// subprocess failure, credential rejected by the remote service).
    #[error("execution failed: {message}")]
    Failed {
        /// Human-readable description.
        message: String,
        /// Optional structured detail (response body, exit code, ...).
        detail: Option<serde_json::Value>,
    },

    /// The node observed cancellation via its `abortSignal` and stopped.
    #[error("cancelled")]
    Cancelled,
}

impl NodeError {
    /// Build a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build an execution failure with no structured detail.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            detail: None,
        }
    }

    /// Build an execution failure carrying structured detail.
    pub fn failed_with_detail(message: impl Into<String>, detail: serde_json::Value) -> Self {
        Self::Failed {
            message: message.into(),
            detail: Some(detail),
        }
    }

    /// Normalize this error into the `{ message, name?, stack? }` shape
    /// `weave-persistence` stores on `NodeExecution.error`.
    #[must_use]
    pub fn to_persisted_error(&self) -> serde_json::Value {
        match self {
            Self::Validation(msg) => serde_json::json!({"message": msg, "name": "ValidationError"}),
            Self::Failed { message, detail } => {
                let mut value = serde_json::json!({"message": message, "name": "NodeExecutionError"});
                if let Some(detail) = detail {
                    value["detail"] = detail.clone();
                }
                value
            }
            Self::Cancelled => serde_json::json!({"message": "cancelled", "name": "CancelledError"}),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = NodeError::validation("missing url");
        assert_eq!(err.to_string(), "validation: missing url");
    }

    #[test]
    fn failed_with_detail_round_trips_into_persisted_shape() {
        let err = NodeError::failed_with_detail("HTTP 500", serde_json::json!({"status": 500}));
        let persisted = err.to_persisted_error();
        assert_eq!(persisted["message"], "HTTP 500");
        assert_eq!(persisted["detail"]["status"], 500);
    }

    #[test]
    fn cancelled_persists_without_detail() {
        let persisted = NodeError::Cancelled.to_persisted_error();
        assert_eq!(persisted["name"], "CancelledError");
    }
}
