#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Node
//!
//! The node runtime interface : the `execute(ctx) → result` contract
//! every node type implements, the context it receives, and the result
//! shape it returns. This crate knows nothing about scheduling, the
//! workflow graph, or persistence — see `weave-engine` for the caller of
//! this contract.

/// The `Node`/`SimpleNode`/`TriggerNode` traits.
pub mod action;
/// Runtime context handed to `execute`.
pub mod context;
/// Errors a node's `execute` may return.
pub mod error;
/// The result shape `execute` produces on success.
pub mod result;

/// The default output/input port name when a node type declares only one.
pub const MAIN_PORT: &str = "main";

pub use action::{Node, SimpleNode, TriggerAdapter, TriggerNode};
pub use context::{NodeContext, NodeLogger, ResolvedCredential};
pub use error::NodeError;
pub use result::NodeResult;
