//! An edge in a workflow graph.

use serde::{Deserialize, Serialize};
use weave_core::NodeId;

/// The default output/input port name when a node type declares only one.
pub const MAIN_PORT: &str = "main";

/// A directed edge from one node's output port to another node's input
/// port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    /// Unique within the owning workflow.
    pub id: weave_core::ConnectionId,
    /// Upstream node.
    pub source_node_id: NodeId,
    /// Upstream output port name.
    #[serde(default = "default_port")]
    pub source_output: String,
    /// Downstream node.
    pub target_node_id: NodeId,
    /// Downstream input port name.
    #[serde(default = "default_port")]
    pub target_input: String,
}

fn default_port() -> String {
    MAIN_PORT.to_string()
}

impl Connection {
    /// Build a connection between two nodes' default `"main"` ports.
    #[must_use]
    pub fn main(source_node_id: NodeId, target_node_id: NodeId) -> Self {
        Self {
            id: weave_core::ConnectionId::new(),
            source_node_id,
            source_output: MAIN_PORT.to_string(),
            target_node_id,
            target_input: MAIN_PORT.to_string(),
        }
    }
}
