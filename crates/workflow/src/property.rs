//! Static schema for a node type's configurable parameters.

use serde::{Deserialize, Serialize};

/// The primitive type a [`NodeProperty`] holds.
///
/// `Credential` is special: the engine (not the node) resolves the stored
/// `credentialId` into a materialized secret and delivers it under the
/// property's own `name` — never a hardcoded field like `"authentication"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// Free-form string, may contain `{{ expression }}` substrings.
    String,
    /// Numeric value.
    Number,
    /// Boolean flag.
    Bool,
    /// One of a fixed set of options (`NodeProperty::options`).
    Options,
    /// Arbitrary JSON value.
    Json,
    /// A credential id; resolved by the engine before `execute` is called.
    Credential,
}

/// One configurable field on a node type.
///
/// When `property_type` is [`PropertyType::Credential`], `name` doubles as
/// the field name under which the resolved credential is placed in
/// `NodeContext::credentials` — see [`crate::definition::CredentialDeclaration`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeProperty {
    /// Key used in `Node::parameters`.
    pub name: String,
    /// Human-readable label for the editor UI (opaque to the engine).
    pub display_name: String,
    /// The property's primitive type.
    pub property_type: PropertyType,
    /// Default value applied when the node omits this parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Whether the node must supply a value.
    #[serde(default)]
    pub required: bool,
    /// Allowed values when `property_type` is `Options`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<serde_json::Value>>,
    /// Editor-facing help text (opaque to the engine).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeProperty {
    /// Build a required string property with no default.
    #[must_use]
    pub fn string(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            property_type: PropertyType::String,
            default: None,
            required: false,
            options: None,
            description: None,
        }
    }

    /// Build a credential property; `name` becomes the field name the
    /// resolved credential is delivered under.
    #[must_use]
    pub fn credential(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            property_type: PropertyType::Credential,
            default: None,
            required: true,
            options: None,
            description: None,
        }
    }

    /// Mark this property as required, builder-style.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A node type's property schema: either a fixed list, or a function that
/// materializes the list lazily (used by nodes whose fields depend on
/// other configuration — e.g. a form generator).
///
/// A closure variant rather than a trait object lets simple nodes use a
/// plain `Vec` literal while dynamic nodes still type-check against the
/// same enum.
pub enum PropertySource {
    /// A fixed schema known at definition time.
    Static(Vec<NodeProperty>),
    /// A schema computed on demand (e.g. depends on other properties).
    Dynamic(Box<dyn Fn() -> Vec<NodeProperty> + Send + Sync>),
}

impl PropertySource {
    /// Materialize the property list, invoking the producer function if
    /// this source is [`PropertySource::Dynamic`].
    #[must_use]
    pub fn resolve(&self) -> Vec<NodeProperty> {
        match self {
            Self::Static(props) => props.clone(),
            Self::Dynamic(producer) => producer(),
        }
    }
}

impl std::fmt::Debug for PropertySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(props) => f.debug_tuple("Static").field(props).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}
