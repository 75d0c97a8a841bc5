//! A small set of demo node types so `weave run` can execute workflow
//! files end to end without linking a real node library (the node
//! library itself is out of scope for this workspace). These mirror the
//! node types used across the worked examples: a manual trigger, an
//! identity pass-through, a field-setter, and a boolean branch node.

use std::sync::Arc;

use async_trait::async_trait;
use weave_core::Items;
use weave_engine::NodeRegistry;
use weave_node::{Node, NodeContext, NodeError, NodeResult, SimpleNode, TriggerAdapter, TriggerNode};
use weave_workflow::{ExecutionCapability, NodeDefinition, NodeProperty, PropertySource};

/// `manualTrigger`: starts an execution, carrying whatever `triggerData`
/// the façade was given as its sole output item.
struct ManualTrigger;

#[async_trait]
impl TriggerNode for ManualTrigger {
    async fn fire(
        &self,
        trigger_data: serde_json::Value,
        _ctx: &NodeContext,
    ) -> Result<NodeResult, NodeError> {
        Ok(NodeResult::main(vec![weave_core::Item::json(trigger_data)]))
    }
}

/// `noOp`: forwards its main input unchanged. Useful for linear-chain
/// scenarios where the point is the scheduler, not the node logic.
struct NoOp;

#[async_trait]
impl SimpleNode for NoOp {
    async fn run(&self, ctx: &NodeContext) -> Result<Items, NodeError> {
        Ok(ctx.main_input().to_vec())
    }
}

/// `set`: merges the `values` parameter (a JSON object) into every input
/// item's `json`, the minimal stand-in for the node library's field-setter.
struct Set;

#[async_trait]
impl SimpleNode for Set {
    async fn run(&self, ctx: &NodeContext) -> Result<Items, NodeError> {
        let values = ctx
            .parameters
            .get("values")
            .cloned()
            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
        let serde_json::Value::Object(values) = values else {
            return Err(NodeError::validation("`values` parameter must be an object"));
        };
        let base = ctx.main_input().to_vec();
        let items = if base.is_empty() {
            vec![weave_core::Item::json(serde_json::Value::Object(values))]
        } else {
            base.into_iter()
                .map(|mut item| {
                    if let serde_json::Value::Object(target) = &mut item.json {
                        for (k, v) in values.clone() {
                            target.insert(k, v);
                        }
                    }
                    item
                })
                .collect()
        };
        Ok(items)
    }
}

/// `switch`: reads the boolean `condition` parameter and routes all input
/// items to either the `"true"` or `"false"` output port, demonstrating
/// branch semantics where the port that didn't fire leaves its
/// dependents `SKIPPED`, not `IDLE`.
struct Switch;

#[async_trait]
impl Node for Switch {
    async fn execute(&self, ctx: &NodeContext) -> Result<NodeResult, NodeError> {
        let condition = ctx
            .parameters
            .get("condition")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);
        let selected = if condition { "true" } else { "false" };
        Ok(NodeResult::Branch {
            selected: selected.to_string(),
            output: ctx.main_input().to_vec(),
        })
    }
}

/// `fail`: always returns a node error, for exercising the failure-policy
/// scenarios without a real failing integration.
struct Fail;

#[async_trait]
impl SimpleNode for Fail {
    async fn run(&self, ctx: &NodeContext) -> Result<Items, NodeError> {
        let message = ctx
            .parameters
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("fail node always fails")
            .to_string();
        Err(NodeError::failed(message))
    }
}

/// Register every built-in demo type into a fresh [`NodeRegistry`].
#[must_use]
pub fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    registry.register(
        NodeDefinition {
            type_key: "manualTrigger".into(),
            display_name: "Manual Trigger".into(),
            group: vec!["trigger".into()],
            inputs: vec![],
            outputs: vec!["main".into()],
            execution_capability: ExecutionCapability::Trigger,
            properties: PropertySource::Static(vec![]),
            credential_types: vec![],
        },
        Arc::new(TriggerAdapter::new(ManualTrigger)),
    );

    registry.register(
        NodeDefinition {
            type_key: "noOp".into(),
            display_name: "No Operation".into(),
            group: vec!["transform".into()],
            inputs: vec!["main".into()],
            outputs: vec!["main".into()],
            execution_capability: ExecutionCapability::Action,
            properties: PropertySource::Static(vec![]),
            credential_types: vec![],
        },
        Arc::new(NoOp),
    );

    registry.register(
        NodeDefinition {
            type_key: "set".into(),
            display_name: "Set".into(),
            group: vec!["transform".into()],
            inputs: vec!["main".into()],
            outputs: vec!["main".into()],
            execution_capability: ExecutionCapability::Action,
            properties: PropertySource::Static(vec![NodeProperty::string("values", "Values")]),
            credential_types: vec![],
        },
        Arc::new(Set),
    );

    registry.register(
        NodeDefinition {
            type_key: "switch".into(),
            display_name: "Switch".into(),
            group: vec!["transform".into()],
            inputs: vec!["main".into()],
            outputs: vec!["true".into(), "false".into()],
            execution_capability: ExecutionCapability::Action,
            properties: PropertySource::Static(vec![NodeProperty::string("condition", "Condition")]),
            credential_types: vec![],
        },
        Arc::new(Switch),
    );

    registry.register(
        NodeDefinition {
            type_key: "fail".into(),
            display_name: "Fail".into(),
            group: vec!["transform".into()],
            inputs: vec!["main".into()],
            outputs: vec!["main".into()],
            execution_capability: ExecutionCapability::Action,
            properties: PropertySource::Static(vec![NodeProperty::string("message", "Message")]),
            credential_types: vec![],
        },
        Arc::new(Fail),
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_type_is_registered() {
        let registry = registry();
        for type_key in ["manualTrigger", "noOp", "set", "switch", "fail"] {
            assert!(registry.get(type_key).is_some(), "{type_key} missing");
        }
    }
}
