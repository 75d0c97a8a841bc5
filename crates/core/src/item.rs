//! The unit of data flowing between nodes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Binary attachment carried alongside an item's JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binary {
    /// MIME type of `data`.
    pub mime_type: String,
    /// Base64-encoded payload, or a reference the node library resolves.
    pub data: String,
}

/// One unit of data exchanged between nodes on a port.
///
/// Nodes produce and consume arrays of items (`Items`); cardinality need not
/// match between a node's inputs and outputs (filters, aggregations, and
/// fan-out are all just items arrays of different lengths).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// The item's structured data.
    pub json: serde_json::Value,
    /// Named binary attachments, if any.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub binary: HashMap<String, Binary>,
}

impl Item {
    /// Build an item from a bare JSON value with no binary attachments.
    #[must_use]
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            json: value,
            binary: HashMap::new(),
        }
    }
}

/// An ordered sequence of items flowing on a single port.
pub type Items = Vec<Item>;

/// A node's complete output: items grouped by the output port they landed on.
///
/// The default port is `"main"`. Multi-output nodes (switches, conditionals)
/// populate additional named ports; the engine only activates dependents
/// connected to ports that received items (see the branch-semantics rules).
pub type PortItems = HashMap<String, Items>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_json_has_no_binary_by_default() {
        let item = Item::json(serde_json::json!({"x": 1}));
        assert!(item.binary.is_empty());
    }

    #[test]
    fn item_serializes_without_binary_field_when_empty() {
        let item = Item::json(serde_json::json!({"x": 1}));
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("binary").is_none());
    }

    #[test]
    fn item_serializes_binary_when_present() {
        let mut item = Item::json(serde_json::json!({}));
        item.binary.insert(
            "file".into(),
            Binary {
                mime_type: "text/plain".into(),
                data: "aGVsbG8=".into(),
            },
        );
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("binary").is_some());
    }
}
