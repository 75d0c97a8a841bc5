//! Resolving a node's configured parameters and credential requirements
//! for one run.

use std::collections::{HashMap, HashSet};

use weave_core::CredentialId;
use weave_credential::{CredentialRequirement, CredentialResolver};
use weave_error::{EngineError, EngineResult};
use weave_node::ResolvedCredential;
use weave_workflow::{Node, NodeDefinition, ParameterValue, PropertyType};

use crate::expression::{self, ExpressionError, ExpressionScope};

impl From<ExpressionError> for EngineError {
    fn from(err: ExpressionError) -> Self {
        EngineError::validation(format!("expression error: {}", err.fragment))
    }
}

/// Resolve every stored parameter (falling back to the node's defaults
/// from its definition, then to per-run overrides) against `scope`,
/// evaluating `{{ }}` expressions and leaving literal values untouched.
///
/// `Credential`-typed properties are skipped here: their value lives in
/// `node.credentials`, not `node.parameters`, and is materialized by
/// [`resolve_credentials`] instead.
pub fn resolve_parameters(
    node: &Node,
    definition: &NodeDefinition,
    overrides: Option<&HashMap<String, ParameterValue>>,
    scope: &ExpressionScope<'_>,
) -> EngineResult<HashMap<String, serde_json::Value>> {
    let mut resolved = HashMap::new();

    for property in definition.properties.resolve() {
        if property.property_type == PropertyType::Credential {
            continue;
        }

        let value = node
            .parameter(&property.name, overrides)
            .cloned()
            .or_else(|| property.default.clone().map(ParameterValue::Literal));

        let Some(value) = value else {
            if property.required {
                return Err(EngineError::validation(format!(
                    "missing required parameter {}",
                    property.name
                )));
            }
            continue;
        };

        let json = match value {
            ParameterValue::Literal(v) => v,
            ParameterValue::Expression(template) => expression::resolve(&template, scope)?,
        };
        resolved.insert(property.name, json);
    }

    Ok(resolved)
}

/// One credential this node type needs, staged as owned data so a
/// `CredentialRequirement` can borrow from it after the gathering loop
/// below is done mutating.
struct PendingRequirement {
    field_name: String,
    credential_id: CredentialId,
    allowed_types: Vec<String>,
}

/// Resolve every credential this node type declares, keyed by the field
/// name the definition assigns it (never a hardcoded literal).
///
/// Requirements come from two places that must agree on field name: a
/// `Credential`-typed entry in `definition.properties` (the source of
/// truth for which field holds a credential id) and, optionally, a
/// matching `CredentialDeclaration` in `definition.credential_types` (the
/// source of `allowed_types`). A declaration with no paired property is
/// still honored, for node types that haven't migrated to declaring the
/// field via a property.
pub fn resolve_credentials(
    node: &Node,
    definition: &NodeDefinition,
    resolver: &CredentialResolver,
) -> EngineResult<HashMap<String, ResolvedCredential>> {
    let mut seen = HashSet::new();
    let mut pending = Vec::new();

    for property in definition.properties.resolve() {
        if property.property_type != PropertyType::Credential {
            continue;
        }
        let declaration = definition.credential_declaration(&property.name);
        let allowed_types = declaration.map_or_else(Vec::new, |d| d.allowed_types.clone());
        let required = property.required || declaration.is_some_and(|d| d.required);
        seen.insert(property.name.clone());
        stage_requirement(node, property.name, required, allowed_types, &mut pending)?;
    }

    for declaration in &definition.credential_types {
        if !seen.insert(declaration.field_name.clone()) {
            continue;
        }
        stage_requirement(
            node,
            declaration.field_name.clone(),
            declaration.required,
            declaration.allowed_types.clone(),
            &mut pending,
        )?;
    }

    let requirements: Vec<CredentialRequirement<'_>> = pending
        .iter()
        .map(|p| CredentialRequirement {
            field_name: &p.field_name,
            credential_id: &p.credential_id,
            allowed_types: &p.allowed_types,
        })
        .collect();

    let resolved = resolver
        .resolve_all(&requirements)
        .map_err(|e| EngineError::validation(e.to_string()))?;

    Ok(resolved
        .into_iter()
        .map(|(field_name, credential)| {
            (
                field_name,
                ResolvedCredential {
                    credential_type: credential.credential_type,
                    data: credential.data,
                },
            )
        })
        .collect())
}

fn stage_requirement(
    node: &Node,
    field_name: String,
    required: bool,
    allowed_types: Vec<String>,
    pending: &mut Vec<PendingRequirement>,
) -> EngineResult<()> {
    let Some(credential_id) = node.credentials.get(&field_name) else {
        if required {
            return Err(EngineError::validation(format!(
                "node {} missing required credential for field {}",
                node.id, field_name
            )));
        }
        return Ok(());
    };
    pending.push(PendingRequirement {
        field_name,
        credential_id: credential_id.clone(),
        allowed_types,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;
    use weave_core::Item;
    use weave_workflow::{ExecutionCapability, NodeProperty, PropertySource};

    fn node() -> Node {
        Node {
            id: "n1".into(),
            node_type: "httpRequest".into(),
            name: "HTTP".into(),
            position: serde_json::Value::Null,
            parameters: Map::new(),
            credentials: Map::new(),
            disabled: false,
            execution_capability: ExecutionCapability::Action,
            continue_on_fail: false,
            parent_id: None,
            extent: None,
        }
    }

    fn definition() -> NodeDefinition {
        NodeDefinition {
            type_key: "httpRequest".into(),
            display_name: "HTTP Request".into(),
            group: vec![],
            inputs: vec!["main".into()],
            outputs: vec!["main".into()],
            execution_capability: ExecutionCapability::Action,
            properties: PropertySource::Static(vec![
                NodeProperty::string("url", "URL").required(),
                NodeProperty {
                    name: "method".into(),
                    display_name: "Method".into(),
                    property_type: weave_workflow::PropertyType::String,
                    default: Some(serde_json::json!("GET")),
                    required: false,
                    options: None,
                    description: None,
                },
            ]),
            credential_types: vec![],
        }
    }

    #[test]
    fn missing_required_parameter_is_rejected() {
        let err = resolve_parameters(&node(), &definition(), None, &ExpressionScope::default())
            .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::Validation);
    }

    #[test]
    fn default_value_used_when_parameter_absent() {
        let mut n = node();
        n.parameters
            .insert("url".into(), ParameterValue::Literal(serde_json::json!("https://x")));
        let resolved =
            resolve_parameters(&n, &definition(), None, &ExpressionScope::default()).unwrap();
        assert_eq!(resolved["method"], serde_json::json!("GET"));
    }

    #[test]
    fn expression_parameter_resolves_against_item() {
        let mut n = node();
        n.parameters.insert(
            "url".into(),
            ParameterValue::Expression("{{ $json.endpoint }}".into()),
        );
        let item = Item::json(serde_json::json!({"endpoint": "https://example.test"}));
        let scope = ExpressionScope {
            item: Some(&item),
            ..ExpressionScope::default()
        };
        let resolved = resolve_parameters(&n, &definition(), None, &scope).unwrap();
        assert_eq!(resolved["url"], serde_json::json!("https://example.test"));
    }

    #[test]
    fn override_takes_precedence_over_stored_parameter() {
        let mut n = node();
        n.parameters
            .insert("url".into(), ParameterValue::Literal(serde_json::json!("stored")));
        let mut overrides = Map::new();
        overrides.insert(
            "url".into(),
            ParameterValue::Literal(serde_json::json!("overridden")),
        );
        let resolved = resolve_parameters(
            &n,
            &definition(),
            Some(&overrides),
            &ExpressionScope::default(),
        )
        .unwrap();
        assert_eq!(resolved["url"], serde_json::json!("overridden"));
    }

    fn definition_with_credential() -> NodeDefinition {
        let mut def = definition();
        if let PropertySource::Static(props) = &mut def.properties {
            props.push(NodeProperty::credential("authentication", "Authentication"));
        }
        def.credential_types = vec![weave_workflow::CredentialDeclaration {
            field_name: "authentication".into(),
            allowed_types: vec!["httpBasicAuth".into()],
            required: true,
        }];
        def
    }

    #[test]
    fn credential_typed_property_is_skipped_by_resolve_parameters() {
        let mut n = node();
        n.parameters
            .insert("url".into(), ParameterValue::Literal(serde_json::json!("https://x")));
        let resolved = resolve_parameters(
            &n,
            &definition_with_credential(),
            None,
            &ExpressionScope::default(),
        )
        .unwrap();
        assert!(!resolved.contains_key("authentication"));
    }

    #[test]
    fn resolve_credentials_materializes_credential_typed_property() {
        use weave_core::CredentialId;
        use weave_credential::{cipher, CredentialResolver, EncryptedCredential, EncryptionKey, InMemoryCredentialStore};
        use std::sync::Arc;

        let store = Arc::new(InMemoryCredentialStore::new());
        let credential_id = CredentialId::new("cred-1");
        let key = EncryptionKey::from_bytes(&[0u8; 32]).unwrap();
        let plaintext = serde_json::to_vec(&serde_json::json!({"user": "ada"})).unwrap();
        store.put(EncryptedCredential {
            id: credential_id.clone(),
            owner_id: weave_core::UserId::new(),
            credential_type: "httpBasicAuth".into(),
            encrypted_data: cipher::encrypt(&plaintext, &key),
            expires_at: None,
        });
        let resolver = CredentialResolver::new(store, key);

        let mut n = node();
        n.parameters
            .insert("url".into(), ParameterValue::Literal(serde_json::json!("https://x")));
        n.credentials.insert("authentication".into(), credential_id);

        let resolved = resolve_credentials(&n, &definition_with_credential(), &resolver).unwrap();
        assert_eq!(resolved["authentication"].credential_type, "httpBasicAuth");
        assert_eq!(resolved["authentication"].data, serde_json::json!({"user": "ada"}));
    }

    #[test]
    fn resolve_credentials_rejects_missing_required_credential() {
        let n = node();
        let err = resolve_credentials(&n, &definition_with_credential(), &unusable_resolver())
            .unwrap_err();
        assert_eq!(err.kind, weave_error::ErrorKind::Validation);
    }

    fn unusable_resolver() -> weave_credential::CredentialResolver {
        use std::sync::Arc;
        use weave_credential::{CredentialResolver, EncryptionKey, InMemoryCredentialStore};
        CredentialResolver::new(
            Arc::new(InMemoryCredentialStore::new()),
            EncryptionKey::from_bytes(&[0u8; 32]).unwrap(),
        )
    }
}
