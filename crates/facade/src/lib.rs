#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Facade
//!
//! The Execution Façade : the single public entry point unifying
//! full-workflow dispatch, single-node dispatch, execution lookup, and
//! progress lookup behind one contract, so `weave-api`, `weave-trigger`,
//! and `weave-cli` all call through the same surface instead of poking
//! the engine, persistence, and tracker directly.

/// Environment-shaped tunables (`MAX_EXECUTION_CONCURRENCY`, grace period).
pub mod config;
/// The façade itself.
pub mod facade;
/// The `POST /executions` request shape.
pub mod request;
/// The unified execution response shapes.
pub mod response;
/// The `workflowId -> Workflow` lookup port.
pub mod workflow_source;

pub use config::FacadeConfig;
pub use facade::ExecutionFacade;
pub use request::StartExecutionRequest;
pub use response::{ExecutionDetail, ExecutionResponse};
pub use workflow_source::{InMemoryWorkflowSource, WorkflowSource};
