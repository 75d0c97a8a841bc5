#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Engine
//!
//! The flow execution engine: affected-node scheduling, branch
//! semantics, failure policy, cancellation with a grace period, and
//! single-node mode, built on top of `weave-workflow`'s graph,
//! `weave-node`'s execution contract, `weave-execution`'s progress
//! tracker, `weave-credential`'s resolver, `weave-persistence`'s store,
//! and `weave-eventbus`'s pub/sub.

/// Per-execution scheduling context.
pub mod context;
/// The restricted `{{ }}` expression sandbox (`$json`, `$input.all()`,
/// `$node["<name>"]`).
pub mod expression;
/// Parameter and credential resolution for one node run.
pub mod params;
/// Maps a node type key to its runnable implementation.
pub mod registry;
/// The dispatch loop itself.
pub mod scheduler;

pub use context::ExecutionContext;
pub use expression::{ExpressionError, ExpressionScope};
pub use registry::{NodeRegistry, RegisteredType};
pub use scheduler::{EngineOutcome, FlowExecutionEngine};
