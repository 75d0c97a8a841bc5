//! Runtime context handed to a node's `execute`.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use weave_core::{ExecutionId, NodeId, PortItems};

use crate::error::NodeError;

/// A decrypted credential value, keyed by the field name declared in the
/// node definition's `credentialTypes` — never a hardcoded literal.
#[derive(Clone)]
pub struct ResolvedCredential {
    /// The credential type key (e.g. `"httpBasicAuth"`), safe to log.
    pub credential_type: String,
    /// Decrypted payload. Never logged or included in a `Debug` output.
    pub data: serde_json::Value,
}

impl std::fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("credential_type", &self.credential_type)
            .field("data", &"<redacted>")
            .finish()
    }
}

/// Port for structured logging from within a node. Implemented by the
/// engine so nodes never depend on a concrete tracing backend.
pub trait NodeLogger: Send + Sync {
    /// Emit an informational message scoped to this node's run.
    fn info(&self, message: &str);
    /// Emit a warning scoped to this node's run.
    fn warn(&self, message: &str);
}

/// Everything a node needs to execute one run.
#[non_exhaustive]
pub struct NodeContext {
    /// The execution this run belongs to.
    pub execution_id: ExecutionId,
    /// The node being run.
    pub node_id: NodeId,
    /// Parameters with expressions already resolved against this run's data.
    pub parameters: HashMap<String, serde_json::Value>,
    /// Accumulated outputs of upstream nodes, keyed by input port.
    pub inputs: PortItems,
    /// Materialized credentials, keyed by the field name the node
    /// definition declared.
    pub credentials: HashMap<String, ResolvedCredential>,
    /// Cooperative cancellation signal.
    pub cancellation: CancellationToken,
    logger: Option<std::sync::Arc<dyn NodeLogger>>,
}

impl NodeContext {
    /// Build a context for one node run.
    #[must_use]
    pub fn new(execution_id: ExecutionId, node_id: NodeId) -> Self {
        Self {
            execution_id,
            node_id,
            parameters: HashMap::new(),
            inputs: PortItems::new(),
            credentials: HashMap::new(),
            cancellation: CancellationToken::new(),
            logger: None,
        }
    }

    /// Attach resolved inputs, builder-style.
    #[must_use]
    pub fn with_inputs(mut self, inputs: PortItems) -> Self {
        self.inputs = inputs;
        self
    }

    /// Attach resolved parameters, builder-style.
    #[must_use]
    pub fn with_parameters(mut self, parameters: HashMap<String, serde_json::Value>) -> Self {
        self.parameters = parameters;
        self
    }

    /// Attach resolved credentials, builder-style.
    #[must_use]
    pub fn with_credentials(mut self, credentials: HashMap<String, ResolvedCredential>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Attach a cancellation token, builder-style.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attach a logger, builder-style.
    #[must_use]
    pub fn with_logger(mut self, logger: std::sync::Arc<dyn NodeLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Items accumulated on the `"main"` input port, the common case for
    /// single-input nodes.
    #[must_use]
    pub fn main_input(&self) -> &[weave_core::Item] {
        self.inputs.get(crate::MAIN_PORT).map_or(&[], Vec::as_slice)
    }

    /// Fail fast if this run has been cancelled; call before and between
    /// expensive steps for cooperative cancellation.
    pub fn check_cancelled(&self) -> Result<(), NodeError> {
        if self.cancellation.is_cancelled() {
            Err(NodeError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Emit an info-level log line scoped to this node's run. No-op if no
    /// logger is attached.
    pub fn log_info(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.info(message);
        }
    }

    /// Emit a warning scoped to this node's run. No-op if no logger is
    /// attached.
    pub fn log_warn(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.warn(message);
        }
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("execution_id", &self.execution_id)
            .field("node_id", &self.node_id)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish_non_exhaustive()
    }
}
