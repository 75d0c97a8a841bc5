#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Event Bus
//!
//! Real-time delivery of execution events to interested observers :
//! an in-process, topic-routed, bounded, at-most-once pub/sub built on
//! `tokio::sync::broadcast`.

/// The bus and its backpressure policy.
pub mod bus;
/// Event payloads published on the bus.
pub mod event;
/// The `workflow:{id}` / `execution:{id}` topic families.
pub mod topic;

pub use bus::{warn_on_lag, EventBus, TOPIC_CAPACITY};
pub use event::{Event, EventKind};
pub use topic::Topic;
