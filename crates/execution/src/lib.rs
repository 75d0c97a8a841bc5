#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Execution
//!
//! Per-execution, per-node progress tracking : [`NodeState`],
//! [`ExecutionStatus`], the per-run [`attempt::NodeAttempt`] record, and
//! the [`ProgressTracker`] that partitions all of it by `executionId` so
//! concurrent runs of the same workflow can never observe each other's
//! state.

/// Per-node run records.
pub mod attempt;
/// The `NodeState`/`ExecutionStatus` state machines.
pub mod state;
/// The `executionId`-partitioned progress tracker.
pub mod tracker;

pub use attempt::NodeAttempt;
pub use state::{ExecutionStatus, NodeState};
pub use tracker::{ExecutionProgress, ProgressTracker};
