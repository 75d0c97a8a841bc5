//! A deliberately restricted `{{ }}` expression resolver.
//!
//! No filesystem, no network, no arbitrary globals: an expression can read
//! the current item's JSON via `$json`, every item on the node's main
//! input via `$input.all()`, or an upstream node's main output via
//! `$node["<name>"]`. Anything richer (helper functions, cross-item
//! aggregation) is out of scope here.

use std::collections::HashMap;

use weave_core::Item;

/// An expression referenced a path the sandbox doesn't support, or the
/// path didn't resolve against the current item.
#[derive(Debug, Clone, thiserror::Error)]
#[error("failed to resolve expression `{fragment}`")]
pub struct ExpressionError {
    /// The offending `{{ ... }}` fragment, verbatim. Never includes the
    /// resolved `$json` payload — only the template text, which the
    /// workflow author already wrote.
    pub fragment: String,
}

/// Read-only view an expression may reference: the current item (`$json`),
/// every item on the node's main input (`$input.all()`), and upstream
/// nodes' main output keyed by display name (`$node["<name>"]`).
pub struct ExpressionScope<'a> {
    /// The current item, used by `$json`.
    pub item: Option<&'a Item>,
    /// All items on the node's main input port, used by `$input.all()`.
    pub input_items: &'a [Item],
    /// Upstream nodes' main-port output, keyed by node display name.
    pub node_outputs: &'a HashMap<String, Vec<Item>>,
}

impl<'a> Default for ExpressionScope<'a> {
    fn default() -> Self {
        static EMPTY: std::sync::OnceLock<HashMap<String, Vec<Item>>> = std::sync::OnceLock::new();
        Self {
            item: None,
            input_items: &[],
            node_outputs: EMPTY.get_or_init(HashMap::new),
        }
    }
}

/// Evaluate every `{{ ... }}` occurrence in `template` against `scope`,
/// substituting each with its resolved value's string form. A template
/// that is *entirely* one expression (e.g. `"{{ $json.user }}"`) instead
/// returns the resolved value unconverted, preserving its JSON type.
pub fn resolve(template: &str, scope: &ExpressionScope<'_>) -> Result<serde_json::Value, ExpressionError> {
    let trimmed = template.trim();
    if trimmed.starts_with("{{") && trimmed.ends_with("}}") && count_expressions(trimmed) == 1 {
        let path = &trimmed[2..trimmed.len() - 2];
        return resolve_path(path.trim(), scope);
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start..].find("}}") else {
            out.push_str(rest);
            rest = "";
            break;
        };
        out.push_str(&rest[..start]);
        let path = &rest[start + 2..start + end];
        let value = resolve_path(path.trim(), scope)?;
        out.push_str(&value_to_string(&value));
        rest = &rest[start + end + 2..];
    }
    out.push_str(rest);
    Ok(serde_json::Value::String(out))
}

fn count_expressions(s: &str) -> usize {
    s.matches("{{").count()
}

fn resolve_path(path: &str, scope: &ExpressionScope<'_>) -> Result<serde_json::Value, ExpressionError> {
    if path == "$input.all()" {
        let items: Vec<serde_json::Value> =
            scope.input_items.iter().map(|item| item.json.clone()).collect();
        return Ok(serde_json::Value::Array(items));
    }

    if let Some(rest) = path.strip_prefix("$node[") {
        return resolve_node_ref(path, rest, scope);
    }

    let Some(rest) = path.strip_prefix("$json") else {
        return Err(ExpressionError {
            fragment: format!("{{{{ {path} }}}}"),
        });
    };

    let Some(item) = scope.item else {
        return Ok(serde_json::Value::Null);
    };

    if rest.is_empty() {
        return Ok(item.json.clone());
    }

    let Some(field_path) = rest.strip_prefix('.') else {
        return Err(ExpressionError {
            fragment: format!("{{{{ $json{rest} }}}}"),
        });
    };

    let mut current = &item.json;
    for segment in field_path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Ok(serde_json::Value::Null),
        }
    }
    Ok(current.clone())
}

/// Parse `$node["<name>"]` (or `$node['<name>']`), optionally followed by
/// `.json` (the node's first output item) or `.all()` (every output item).
fn resolve_node_ref(
    full_path: &str,
    rest: &str,
    scope: &ExpressionScope<'_>,
) -> Result<serde_json::Value, ExpressionError> {
    let malformed = || ExpressionError {
        fragment: format!("{{{{ {full_path} }}}}"),
    };

    let quote = rest.chars().next().ok_or_else(malformed)?;
    if quote != '"' && quote != '\'' {
        return Err(malformed());
    }
    let after_quote = &rest[1..];
    let name_end = after_quote.find(quote).ok_or_else(malformed)?;
    let name = &after_quote[..name_end];
    let after_name = &after_quote[name_end + 1..];
    let after_bracket = after_name.strip_prefix(']').ok_or_else(malformed)?;

    let items = scope.node_outputs.get(name);

    match after_bracket {
        "" | ".json" => Ok(items
            .and_then(|items| items.first())
            .map_or(serde_json::Value::Null, |item| item.json.clone())),
        ".all()" => Ok(items.map_or(serde_json::Value::Array(Vec::new()), |items| {
            serde_json::Value::Array(items.iter().map(|item| item.json.clone()).collect())
        })),
        _ => Err(malformed()),
    }
}

fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
