//! The static schema a node type is registered with — distinct from [`crate::node::Node`],
//! which is one configured instance of a type inside a particular workflow.

use serde::{Deserialize, Serialize};

use crate::node::ExecutionCapability;
use crate::property::PropertySource;

/// One credential type a node type declares it needs.
///
/// `field_name` must match a [`crate::property::NodeProperty::name`] of
/// type `Credential` — the engine resolves the credential stored under
/// `Node::credentials[field_name]` and injects it into `NodeContext`
/// keyed by this same name, never a hardcoded key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialDeclaration {
    /// The property name this credential is delivered under.
    pub field_name: String,
    /// Credential type keys this field accepts (e.g. `"httpBasicAuth"`).
    pub allowed_types: Vec<String>,
    /// Whether the node can run without this credential resolved.
    #[serde(default)]
    pub required: bool,
}

/// Registration-time description of a node type: what it's called, what
/// ports it exposes, and what configuration it accepts. Held by the node
/// type registry, looked up by [`crate::node::Node::node_type`].
pub struct NodeDefinition {
    /// Registry key, matches `Node::node_type`.
    pub type_key: String,
    /// Human-readable name.
    pub display_name: String,
    /// Category used for editor grouping (opaque to the engine).
    pub group: Vec<String>,
    /// Named input ports this node type accepts.
    pub inputs: Vec<String>,
    /// Named output ports this node type may produce.
    pub outputs: Vec<String>,
    /// Whether instances of this type may start an execution.
    pub execution_capability: ExecutionCapability,
    /// Configurable parameter schema.
    pub properties: PropertySource,
    /// Credential types this node type may require.
    #[allow(clippy::struct_field_names)]
    pub credential_types: Vec<CredentialDeclaration>,
}

impl NodeDefinition {
    /// Look up a declared credential by the property field name it's
    /// delivered under.
    #[must_use]
    pub fn credential_declaration(&self, field_name: &str) -> Option<&CredentialDeclaration> {
        self.credential_types
            .iter()
            .find(|c| c.field_name == field_name)
    }

    /// Returns `true` if `port` is a recognized output port for this type.
    #[must_use]
    pub fn has_output(&self, port: &str) -> bool {
        self.outputs.iter().any(|o| o == port)
    }
}
