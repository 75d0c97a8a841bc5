//! The value a node's `execute` produces on success.

use weave_core::{Items, PortItems};

/// Outcome of a successful node execution.
///
/// The engine's dispatch loop only ultimately needs a [`PortItems`] map
/// (the wire contract's `{ outputs: map<outputPort, Item[]> }`) plus
/// whether the node asked to be recorded as skipped rather than completed.
/// This enum keeps that distinction explicit at the node-authoring
/// boundary instead of asking every node to hand-build the map itself,
/// mirroring how richer node kinds (conditionals, routers, fan-out nodes)
/// naturally produce their output.
#[derive(Debug, Clone)]
pub enum NodeResult {
    /// Plain completion: items land on the ports named in the map.
    Success(PortItems),

    /// The node chose not to produce output for this run. The engine
    /// records the node as `SKIPPED` rather than `COMPLETED`, and its
    /// dependents are also transitioned to `SKIPPED` regardless of what
    /// connections exist — distinct from the "empty port" skip a
    /// conditional produces.
    Skip {
        /// Why the node chose to skip.
        reason: String,
    },

    /// A conditional/switch node's decision: only `output` is delivered,
    /// on the named branch port; every other declared output port is
    /// treated as empty (so its dependents are `SKIPPED`).
    Branch {
        /// The output port matching the taken branch.
        selected: String,
        /// Items produced for the taken branch.
        output: Items,
    },

    /// Route all output to a single named port.
    Route {
        /// Target output port.
        port: String,
        /// Items for that port.
        items: Items,
    },

    /// Fan-out to more than one port in the same run.
    MultiOutput(PortItems),
}

impl NodeResult {
    /// Build a `Success` result on the `"main"` port — the common case for
    /// simple nodes with a single output.
    #[must_use]
    pub fn main(items: Items) -> Self {
        let mut outputs = PortItems::new();
        outputs.insert(crate::MAIN_PORT.to_string(), items);
        Self::Success(outputs)
    }

    /// Flatten this result into the `PortItems` map the engine dispatches
    /// from, and the skip reason if this run should be recorded as
    /// `SKIPPED` instead of `COMPLETED`.
    #[must_use]
    pub fn into_port_items(self) -> (PortItems, Option<String>) {
        match self {
            Self::Success(outputs) | Self::MultiOutput(outputs) => (outputs, None),
            Self::Skip { reason } => (PortItems::new(), Some(reason)),
            Self::Branch { selected, output } => {
                let mut outputs = PortItems::new();
                outputs.insert(selected, output);
                (outputs, None)
            }
            Self::Route { port, items } => {
                let mut outputs = PortItems::new();
                outputs.insert(port, items);
                (outputs, None)
            }
        }
    }

    /// Returns `true` if this result should be recorded as `SKIPPED`.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::Item;

    #[test]
    fn main_puts_items_on_main_port() {
        let result = NodeResult::main(vec![Item::json(serde_json::json!({"x": 1}))]);
        let (outputs, skip) = result.into_port_items();
        assert!(skip.is_none());
        assert_eq!(outputs.get("main").unwrap().len(), 1);
    }

    #[test]
    fn skip_produces_no_outputs() {
        let result = NodeResult::Skip {
            reason: "condition false".into(),
        };
        assert!(result.is_skip());
        let (outputs, skip) = result.into_port_items();
        assert!(outputs.is_empty());
        assert_eq!(skip.as_deref(), Some("condition false"));
    }

    #[test]
    fn branch_only_populates_selected_port() {
        let result = NodeResult::Branch {
            selected: "true".into(),
            output: vec![Item::json(serde_json::json!({}))],
        };
        let (outputs, _) = result.into_port_items();
        assert_eq!(outputs.len(), 1);
        assert!(outputs.contains_key("true"));
    }

    #[test]
    fn route_targets_a_single_port() {
        let result = NodeResult::Route {
            port: "errors".into(),
            items: vec![Item::json(serde_json::json!({"err": true}))],
        };
        let (outputs, _) = result.into_port_items();
        assert!(outputs.contains_key("errors"));
        assert!(!outputs.contains_key("main"));
    }

    #[test]
    fn multi_output_keeps_every_port() {
        let mut outputs = PortItems::new();
        outputs.insert("main".into(), vec![Item::json(serde_json::json!({"a": 1}))]);
        outputs.insert("overflow".into(), vec![Item::json(serde_json::json!({"b": 2}))]);
        let result = NodeResult::MultiOutput(outputs);
        let (flattened, _) = result.into_port_items();
        assert_eq!(flattened.len(), 2);
    }
}
