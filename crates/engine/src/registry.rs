//! The node-type registry: the dispatch loop's only way to turn a
//! `Node::node_type` string into a runnable implementation.

use std::collections::HashMap;
use std::sync::Arc;

use weave_workflow::NodeDefinition;

/// One registered node type: its static schema plus the implementation
/// the engine calls `execute`/`fire` on.
pub struct RegisteredType {
    /// Registration-time schema (ports, credential declarations, properties).
    pub definition: NodeDefinition,
    /// The runnable implementation, held as `Arc<dyn Node>` so the
    /// registry can be shared across concurrently-dispatched node runs.
    pub node: Arc<dyn weave_node::Node>,
}

/// Maps `Node::node_type` to its registered implementation.
#[derive(Default)]
pub struct NodeRegistry {
    types: HashMap<String, RegisteredType>,
}

impl NodeRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node type, keyed by its definition's `type_key`.
    pub fn register(&mut self, definition: NodeDefinition, node: Arc<dyn weave_node::Node>) {
        self.types
            .insert(definition.type_key.clone(), RegisteredType { definition, node });
    }

    /// Look up a registered type by its key.
    #[must_use]
    pub fn get(&self, type_key: &str) -> Option<&RegisteredType> {
        self.types.get(type_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use weave_node::{NodeContext, NodeError, NodeResult, SimpleNode};
    use weave_workflow::{ExecutionCapability, PropertySource};

    struct NoOp;

    #[async_trait]
    impl SimpleNode for NoOp {
        async fn run(&self, ctx: &NodeContext) -> Result<weave_core::Items, NodeError> {
            Ok(ctx.main_input().to_vec())
        }
    }

    fn no_op_definition() -> NodeDefinition {
        NodeDefinition {
            type_key: "noOp".into(),
            display_name: "No Op".into(),
            group: vec![],
            inputs: vec!["main".into()],
            outputs: vec!["main".into()],
            execution_capability: ExecutionCapability::Action,
            properties: PropertySource::Static(vec![]),
            credential_types: vec![],
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let mut registry = NodeRegistry::new();
        registry.register(no_op_definition(), Arc::new(NoOp));
        let registered = registry.get("noOp").unwrap();
        assert_eq!(registered.definition.display_name, "No Op");
    }

    #[test]
    fn unknown_type_key_returns_none() {
        let registry = NodeRegistry::new();
        assert!(registry.get("ghost").is_none());
    }

    #[tokio::test]
    async fn registered_node_is_callable_through_the_trait_object() {
        let mut registry = NodeRegistry::new();
        registry.register(no_op_definition(), Arc::new(NoOp));
        let registered = registry.get("noOp").unwrap();
        let mut inputs = weave_core::PortItems::new();
        inputs.insert("main".into(), vec![weave_core::Item::json(serde_json::json!(1))]);
        let ctx = NodeContext::new(weave_core::ExecutionId::new(), "n1".into()).with_inputs(inputs);
        let result = registered.node.execute(&ctx).await.unwrap();
        let (outputs, _) = result.into_port_items();
        assert_eq!(outputs.get("main").unwrap().len(), 1);
    }
}
