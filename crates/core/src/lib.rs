#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Core
//!
//! Shared identifier and value types used by every other crate in the
//! workflow engine: typed IDs ([`id`]), the item/port shape nodes exchange
//! ([`item`]), and timestamp helpers ([`time`]).

/// Strongly-typed entity identifiers.
pub mod id;
/// The `Item`/`Items`/`PortItems` data shape nodes produce and consume.
pub mod item;
/// UTC timestamp helpers.
pub mod time;

pub use id::{ConnectionId, CredentialId, ExecutionId, NodeId, TriggerId, UserId, WorkflowId};
pub use item::{Binary, Item, Items, PortItems};
