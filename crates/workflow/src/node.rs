//! A single vertex in a workflow graph.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use weave_core::{CredentialId, NodeId};

/// Whether a node can start an execution (`Trigger`) or only participate
/// downstream of one (`Action`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionCapability {
    /// Entry point; only entered when the engine starts at this node.
    Trigger,
    /// Ordinary graph participant.
    Action,
}

/// A literal parameter value, or an unresolved `{{ expression }}` template.
///
/// The engine resolves `Expression` values against the current item's data
/// before calling a node's `execute`; `Literal` values (including
/// non-string ones) pass through untouched, matching its "non-string
/// parameters are left untouched" rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// A value containing no `{{ }}` template, or any non-string value.
    Literal(serde_json::Value),
    /// A string containing at least one `{{ expression }}` substring.
    Expression(String),
}

impl ParameterValue {
    /// Build the correctly-tagged variant for an arbitrary JSON value,
    /// detecting `{{ }}` templates in string values.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) if s.contains("{{") && s.contains("}}") => {
                Self::Expression(s)
            }
            other => Self::Literal(other),
        }
    }

    /// Returns `true` if this value requires expression resolution.
    #[must_use]
    pub fn needs_resolution(&self) -> bool {
        matches!(self, Self::Expression(_))
    }
}

/// A vertex in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique within the owning workflow.
    pub id: NodeId,
    /// Key into the node-type registry (e.g. `"httpRequest"`).
    #[serde(rename = "type")]
    pub node_type: String,
    /// Display name (opaque to the engine beyond logging/errors).
    pub name: String,
    /// Opaque UI placement; the engine never reads this.
    #[serde(default)]
    pub position: serde_json::Value,
    /// Parameter name to value (literal or templated).
    #[serde(default)]
    pub parameters: HashMap<String, ParameterValue>,
    /// Credential field name (declared by the node type) to stored
    /// credential id.
    #[serde(default)]
    pub credentials: HashMap<String, CredentialId>,
    /// Disabled nodes pass inputs straight through to outputs unchanged.
    #[serde(default)]
    pub disabled: bool,
    /// Whether this node can start an execution.
    pub execution_capability: ExecutionCapability,
    /// Per-node override of the workflow's `errorPolicy`: if `true`, this
    /// node's failure is treated as `continue` regardless of the
    /// workflow-level policy.
    #[serde(default)]
    pub continue_on_fail: bool,
    /// Grouping metadata with no semantic effect on execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    /// Grouping metadata with no semantic effect on execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extent: Option<String>,
}

impl Node {
    /// Resolve a parameter by name, preferring a per-run override (used by
    /// single-node mode, §4.6.8) over the node's own stored value.
    #[must_use]
    pub fn parameter<'a>(
        &'a self,
        name: &str,
        overrides: Option<&'a HashMap<String, ParameterValue>>,
    ) -> Option<&'a ParameterValue> {
        overrides
            .and_then(|o| o.get(name))
            .or_else(|| self.parameters.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node {
            id: "n1".into(),
            node_type: "noOp".into(),
            name: "No Op".into(),
            position: serde_json::Value::Null,
            parameters: HashMap::new(),
            credentials: HashMap::new(),
            disabled: false,
            execution_capability: ExecutionCapability::Action,
            continue_on_fail: false,
            parent_id: None,
            extent: None,
        }
    }

    #[test]
    fn parameter_value_detects_expression_strings() {
        let value = ParameterValue::from_value(serde_json::json!("{{ $json.name }}"));
        assert!(value.needs_resolution());
    }

    #[test]
    fn parameter_value_leaves_non_expression_strings_literal() {
        let value = ParameterValue::from_value(serde_json::json!("plain text"));
        assert!(!value.needs_resolution());
        assert_eq!(value, ParameterValue::Literal(serde_json::json!("plain text")));
    }

    #[test]
    fn parameter_value_leaves_non_string_values_literal() {
        let value = ParameterValue::from_value(serde_json::json!(42));
        assert!(!value.needs_resolution());
    }

    #[test]
    fn parameter_override_takes_precedence_over_stored_value() {
        let mut n = node();
        n.parameters
            .insert("url".into(), ParameterValue::Literal(serde_json::json!("stored")));
        let mut overrides = HashMap::new();
        overrides.insert(
            "url".into(),
            ParameterValue::Literal(serde_json::json!("override")),
        );
        let resolved = n.parameter("url", Some(&overrides)).unwrap();
        assert_eq!(resolved, &ParameterValue::Literal(serde_json::json!("override")));
    }

    #[test]
    fn parameter_falls_back_to_stored_value_without_override() {
        let mut n = node();
        n.parameters
            .insert("url".into(), ParameterValue::Literal(serde_json::json!("stored")));
        let resolved = n.parameter("url", None).unwrap();
        assert_eq!(resolved, &ParameterValue::Literal(serde_json::json!("stored")));
    }
}
