//! The node execution contract.

use async_trait::async_trait;

use crate::context::NodeContext;
use crate::error::NodeError;
use crate::result::NodeResult;

/// The contract every node type implements: `execute(ctx) → result`.
///
/// Object-safe so the engine can hold node implementations as
/// `Arc<dyn Node>` in its type registry, dispatching to whichever concrete
/// node a workflow's `Node::node_type` names.
#[async_trait]
pub trait Node: Send + Sync + 'static {
    /// Run this node once against the given context.
    ///
    /// Implementations should call [`NodeContext::check_cancelled`]
    /// before and between expensive steps to support cooperative
    /// cancellation. A node that returns `Err` has its error
    /// captured and applied via the workflow's failure policy — it must
    /// never panic for an expected failure mode.
    async fn execute(&self, ctx: &NodeContext) -> Result<NodeResult, NodeError>;
}

/// Simplified node trait for the common case: consume the `"main"` input
/// port, produce the `"main"` output port, no branching.
///
/// A blanket impl adapts every `SimpleNode` into [`Node`], so simple node
/// authors never touch `NodeResult` or `PortItems` directly.
#[async_trait]
pub trait SimpleNode: Send + Sync + 'static {
    /// Process the main-port input items, producing the main-port output.
    async fn run(&self, ctx: &NodeContext) -> Result<weave_core::Items, NodeError>;
}

#[async_trait]
impl<T> Node for T
where
    T: SimpleNode,
{
    async fn execute(&self, ctx: &NodeContext) -> Result<NodeResult, NodeError> {
        let items = self.run(ctx).await?;
        Ok(NodeResult::main(items))
    }
}

/// A node type that can start an execution. Declares `inputs: []` and
/// receives `triggerData` as its sole input item rather than
/// upstream output.
#[async_trait]
pub trait TriggerNode: Send + Sync + 'static {
    /// Produce the trigger's single output item from raw trigger data
    /// (webhook body/headers/query, schedule fire time, workflow-call
    /// payload — already assembled by the trigger dispatcher).
    async fn fire(
        &self,
        trigger_data: serde_json::Value,
        ctx: &NodeContext,
    ) -> Result<NodeResult, NodeError>;
}

/// Adapts a [`TriggerNode`] into [`Node`] so trigger types can sit in the
/// same `NodeRegistry` as everything else.
///
/// `TriggerNode` can't get a blanket `impl Node` the way `SimpleNode`
/// does — the two blanket impls would overlap for any type implementing
/// both. This wrapper is the explicit adapter instead. `execute` reads
/// `triggerData` off the `"main"` input port, which is exactly where the
/// engine's dispatch loop seeds it for a trigger node.
pub struct TriggerAdapter<T>(T);

impl<T> TriggerAdapter<T> {
    /// Wrap a trigger implementation for registration.
    pub fn new(inner: T) -> Self {
        Self(inner)
    }
}

#[async_trait]
impl<T> Node for TriggerAdapter<T>
where
    T: TriggerNode,
{
    async fn execute(&self, ctx: &NodeContext) -> Result<NodeResult, NodeError> {
        let trigger_data = ctx
            .main_input()
            .first()
            .map_or(serde_json::Value::Null, |item| item.json.clone());
        self.0.fire(trigger_data, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_core::{ExecutionId, Item};

    struct DoubleNode;

    #[async_trait]
    impl SimpleNode for DoubleNode {
        async fn run(&self, ctx: &NodeContext) -> Result<weave_core::Items, NodeError> {
            let doubled: weave_core::Items = ctx
                .main_input()
                .iter()
                .map(|item| {
                    let n = item.json.as_i64().unwrap_or(0) * 2;
                    Item::json(serde_json::json!(n))
                })
                .collect();
            Ok(doubled)
        }
    }

    fn ctx_with(values: &[i64]) -> NodeContext {
        let mut inputs = weave_core::PortItems::new();
        inputs.insert(
            "main".into(),
            values
                .iter()
                .map(|v| Item::json(serde_json::json!(v)))
                .collect(),
        );
        NodeContext::new(ExecutionId::new(), "n1".into()).with_inputs(inputs)
    }

    #[tokio::test]
    async fn simple_node_adapts_to_node_via_blanket_impl() {
        let node = DoubleNode;
        let ctx = ctx_with(&[1, 2, 3]);
        let result = Node::execute(&node, &ctx).await.unwrap();
        let (outputs, skip) = result.into_port_items();
        assert!(skip.is_none());
        let main = outputs.get("main").unwrap();
        assert_eq!(main.len(), 3);
        assert_eq!(main[0].json, serde_json::json!(2));
    }

    struct FailingNode;

    #[async_trait]
    impl SimpleNode for FailingNode {
        async fn run(&self, _ctx: &NodeContext) -> Result<weave_core::Items, NodeError> {
            Err(NodeError::failed("upstream returned 500"))
        }
    }

    #[tokio::test]
    async fn simple_node_error_propagates() {
        let node = FailingNode;
        let ctx = ctx_with(&[]);
        let err = Node::execute(&node, &ctx).await.unwrap_err();
        assert!(matches!(err, NodeError::Failed { .. }));
    }

    struct EchoTrigger;

    #[async_trait]
    impl TriggerNode for EchoTrigger {
        async fn fire(
            &self,
            trigger_data: serde_json::Value,
            _ctx: &NodeContext,
        ) -> Result<NodeResult, NodeError> {
            Ok(NodeResult::main(vec![Item::json(trigger_data)]))
        }
    }

    #[tokio::test]
    async fn trigger_node_wraps_trigger_data_as_sole_item() {
        let trigger = EchoTrigger;
        let ctx = ctx_with(&[]);
        let result = trigger
            .fire(serde_json::json!({"body": {"x": 1}}), &ctx)
            .await
            .unwrap();
        let (outputs, _) = result.into_port_items();
        assert_eq!(outputs.get("main").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn trigger_adapter_reads_trigger_data_off_main_input() {
        let adapter = TriggerAdapter::new(EchoTrigger);
        let mut inputs = weave_core::PortItems::new();
        inputs.insert(
            "main".into(),
            vec![Item::json(serde_json::json!({"fired_at": "now"}))],
        );
        let ctx = NodeContext::new(ExecutionId::new(), "trigger".into()).with_inputs(inputs);
        let result = Node::execute(&adapter, &ctx).await.unwrap();
        let (outputs, _) = result.into_port_items();
        assert_eq!(outputs.get("main").unwrap()[0].json, serde_json::json!({"fired_at": "now"}));
    }

    #[tokio::test]
    async fn trigger_adapter_defaults_to_null_with_no_seeded_input() {
        let adapter = TriggerAdapter::new(EchoTrigger);
        let ctx = ctx_with(&[]);
        let result = Node::execute(&adapter, &ctx).await.unwrap();
        let (outputs, _) = result.into_port_items();
        assert_eq!(outputs.get("main").unwrap()[0].json, serde_json::Value::Null);
    }
}
