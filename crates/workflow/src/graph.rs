//! A workflow's nodes and connections, plus the dependency analysis the
//! engine needs to schedule them.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use weave_core::{NodeId, WorkflowId};
use weave_error::{EngineError, EngineResult};

use crate::connection::Connection;
use crate::node::Node;
use crate::settings::WorkflowSettings;

/// A complete workflow: its nodes, the connections between them, and its
/// execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Stable identifier.
    pub id: WorkflowId,
    /// Display name.
    pub name: String,
    /// All nodes in the graph, in no particular order.
    pub nodes: Vec<Node>,
    /// All edges in the graph.
    pub connections: Vec<Connection>,
    /// Execution configuration.
    #[serde(default)]
    pub settings: WorkflowSettings,
    /// Whether this workflow is eligible to run (disabled workflows
    /// reject new executions and trigger registrations at the facade).
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Workflow {
    /// Validate structural invariants: unique node ids, and every
    /// connection endpoint referencing a node that exists and declares
    /// the port it's wired to.
    ///
    /// Does not require a `NodeDefinition` registry lookup — port
    /// existence against a type's declared outputs is the engine's job at
    /// dispatch time, not a graph-shape concern.
    pub fn validate(&self) -> EngineResult<()> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(&node.id) {
                return Err(EngineError::validation(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
        }

        let ids: HashSet<&NodeId> = self.nodes.iter().map(|n| &n.id).collect();
        for conn in &self.connections {
            if !ids.contains(&conn.source_node_id) {
                return Err(EngineError::validation(format!(
                    "connection {} references unknown source node {}",
                    conn.id, conn.source_node_id
                )));
            }
            if !ids.contains(&conn.target_node_id) {
                return Err(EngineError::validation(format!(
                    "connection {} references unknown target node {}",
                    conn.id, conn.target_node_id
                )));
            }
        }

        Ok(())
    }

    /// Find a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// All nodes capable of starting an execution.
    #[must_use]
    pub fn triggers(&self) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.execution_capability == crate::node::ExecutionCapability::Trigger)
            .collect()
    }

    /// Build the dependency graph used for scheduling.
    #[must_use]
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::build(self)
    }
}

/// The nodes and edges of a [`Workflow`], indexed for the traversals the
/// scheduler needs: "what feeds this node" and "what does this node feed".
pub struct DependencyGraph {
    graph: DiGraph<NodeId, ()>,
    index_of: HashMap<NodeId, NodeIndex>,
    /// Connection matching an edge, keyed by (source, target) node ids —
    /// the engine needs the port names, not just graph adjacency, to
    /// decide whether a dependent actually received items.
    edges: Vec<Connection>,
}

impl DependencyGraph {
    fn build(workflow: &Workflow) -> Self {
        let mut graph = DiGraph::new();
        let mut index_of = HashMap::with_capacity(workflow.nodes.len());
        for node in &workflow.nodes {
            let idx = graph.add_node(node.id.clone());
            index_of.insert(node.id.clone(), idx);
        }
        for conn in &workflow.connections {
            if let (Some(&src), Some(&tgt)) = (
                index_of.get(&conn.source_node_id),
                index_of.get(&conn.target_node_id),
            ) {
                graph.add_edge(src, tgt, ());
            }
        }
        Self {
            graph,
            index_of,
            edges: workflow.connections.clone(),
        }
    }

    /// Connections whose target is `node_id`.
    #[must_use]
    pub fn incoming(&self, node_id: &NodeId) -> Vec<&Connection> {
        self.edges
            .iter()
            .filter(|c| &c.target_node_id == node_id)
            .collect()
    }

    /// Connections whose source is `node_id`.
    #[must_use]
    pub fn outgoing(&self, node_id: &NodeId) -> Vec<&Connection> {
        self.edges
            .iter()
            .filter(|c| &c.source_node_id == node_id)
            .collect()
    }

    /// Every node reachable from `start` by following edges forward,
    /// including `start` itself. Used to scope single-node-mode runs and
    /// to compute which nodes a trigger can possibly activate.
    #[must_use]
    pub fn affected_from(&self, start: &NodeId) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        let Some(&start_idx) = self.index_of.get(start) else {
            return visited;
        };
        let mut queue = VecDeque::from([start_idx]);
        visited.insert(start.clone());
        while let Some(idx) = queue.pop_front() {
            for neighbor in self.graph.neighbors(idx) {
                let id = &self.graph[neighbor];
                if visited.insert(id.clone()) {
                    queue.push_back(neighbor);
                }
            }
        }
        visited
    }

    /// `true` if every incoming edge of `node_id` originates at a node in
    /// `completed`. A node with no incoming edges is always ready.
    #[must_use]
    pub fn dependencies_satisfied(&self, node_id: &NodeId, completed: &HashSet<NodeId>) -> bool {
        self.incoming(node_id)
            .iter()
            .all(|c| completed.contains(&c.source_node_id))
    }
}
