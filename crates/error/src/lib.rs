#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Error
//!
//! The error taxonomy every other crate in the workspace returns. Each
//! variant of [`EngineError`] carries an [`ErrorKind`] that the API layer
//! maps to an HTTP status; internal crates only ever construct and
//! propagate [`EngineError`], never format HTTP responses directly.

use serde::{Deserialize, Serialize};

/// Coarse classification used by the API layer to pick an HTTP status and
/// by callers to decide whether an error is worth surfacing to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad request shape, missing required field, unknown workflow id. 400.
    Validation,
    /// Webhook auth failed, missing or invalid credential. 401.
    Authentication,
    /// Caller lacks access to a workflow or credential. 403.
    Permission,
    /// Execution/webhook/credential id not present. 404.
    NotFound,
    /// HTTP method mismatch on a webhook route. 405.
    MethodNotAllowed,
    /// A single node's execution failed; recorded on the node, not fatal
    /// to the process.
    NodeExecution,
    /// Engine-level failure: corrupt snapshot, scheduler invariant violated.
    WorkflowExecution,
    /// `maxDurationMs` exceeded.
    Timeout,
    /// Unexpected failure; never leak internals past this kind at the edge.
    Internal,
}

/// The error type returned by every fallible operation in the workflow
/// engine. Construct with the `ErrorKind`-named helpers rather than the
/// struct literal so call sites read as intent, not plumbing.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct EngineError {
    /// Classification used for HTTP status mapping and logging.
    pub kind: ErrorKind,
    /// Human-readable message. Never includes secret payloads (credential
    /// values, upstream node data) — see the expression-evaluator note in
    /// the spec's Design Notes.
    pub message: String,
    /// Optional structured detail (e.g. the offending expression fragment).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl EngineError {
    /// Build an error of the given kind with a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach structured detail to an existing error.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// 400 — bad request shape or unknown reference.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// 401 — webhook or credential authentication failed.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// 403 — caller lacks access.
    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Permission, message)
    }

    /// 404 — entity not found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// 405 — HTTP method mismatch on a webhook route.
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, message)
    }

    /// A single node's execution failed.
    pub fn node_execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NodeExecution, message)
    }

    /// Engine-level failure (scheduler invariant, corrupt snapshot).
    pub fn workflow_execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::WorkflowExecution, message)
    }

    /// `maxDurationMs` exceeded.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Unexpected internal failure. The caller-facing message should never
    /// leak internals; pass a generic message and log the real cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Returns `true` if this error originated from a single node and
    /// should be handled via the workflow's failure policy rather than
    /// aborting the engine.
    #[must_use]
    pub fn is_node_scoped(&self) -> bool {
        matches!(self.kind, ErrorKind::NodeExecution)
    }
}

/// Convenience alias used throughout the workspace.
pub type EngineResult<T> = Result<T, EngineError>;
