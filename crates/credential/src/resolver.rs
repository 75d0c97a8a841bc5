//! Resolving a stored credential id into a materialized, type-checked
//! [`Credential`].

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use weave_core::CredentialId;

use crate::cipher::{self, EncryptionKey};
use crate::credential::{Credential, EncryptedCredential};
use crate::error::CredentialError;

/// Looks up encrypted credential rows by id.
///
/// `weave-persistence` provides the concrete implementation backed by the
/// `credentials` table; tests and `weave-cli` can use an in-process
/// implementation like [`InMemoryCredentialStore`].
pub trait CredentialStore: Send + Sync {
    /// Fetch the encrypted row for `id`, if it exists.
    fn get(&self, id: &CredentialId) -> Option<EncryptedCredential>;
}

/// A node-definition credential requirement: the field name it's resolved
/// under and the stored types it accepts.
pub struct CredentialRequirement<'a> {
    /// Field name in `Node::credentials` this requirement reads from, and
    /// the key the resolved value is returned under.
    pub field_name: &'a str,
    /// Credential id configured on the node for this field.
    pub credential_id: &'a CredentialId,
    /// Stored types this field accepts.
    pub allowed_types: &'a [String],
}

/// Resolves credential ids into decrypted, type-checked credentials.
/// System-scoped: ownership is enforced by the CRUD layer, not
/// here — this resolver is reachable from trigger/webhook paths where no
/// interactive user is present.
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
    key: EncryptionKey,
}

impl CredentialResolver {
    /// Build a resolver over the given store and encryption key.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, key: EncryptionKey) -> Self {
        Self { store, key }
    }

    /// Resolve one credential id, verifying its type and expiry.
    ///
    /// Never logs the decrypted payload — only `id` and `credential_type`.
    pub fn resolve(
        &self,
        credential_id: &CredentialId,
        allowed_types: &[String],
    ) -> Result<Credential, CredentialError> {
        let row = self
            .store
            .get(credential_id)
            .ok_or_else(|| CredentialError::NotFound(credential_id.clone()))?;

        if !allowed_types.iter().any(|t| t == &row.credential_type) {
            return Err(CredentialError::TypeMismatch {
                id: credential_id.clone(),
                actual: row.credential_type,
                expected: allowed_types.to_vec(),
            });
        }

        if let Some(expires_at) = row.expires_at {
            if expires_at <= weave_core::time::now() {
                return Err(CredentialError::Expired(credential_id.clone()));
            }
        }

        let plaintext = cipher::decrypt(&row.encrypted_data, &self.key)?;
        let data: serde_json::Value = serde_json::from_slice(&plaintext)
            .map_err(|e| CredentialError::Corrupt(e.to_string()))?;

        debug!(credential_id = %credential_id, credential_type = %row.credential_type, "resolved credential");

        Ok(Credential {
            id: credential_id.clone(),
            credential_type: row.credential_type,
            data,
            expires_at: row.expires_at,
        })
    }

    /// Resolve every declared requirement of a node, keyed by field name —
    /// the Rust expression of `resolveAll(node)` in §4.2. A requirement
    /// whose `credential_id` fails to resolve short-circuits the whole
    /// call; callers that want partial success should call [`Self::resolve`]
    /// directly per requirement instead.
    pub fn resolve_all(
        &self,
        requirements: &[CredentialRequirement<'_>],
    ) -> Result<HashMap<String, Credential>, CredentialError> {
        let mut resolved = HashMap::with_capacity(requirements.len());
        for req in requirements {
            let credential = self.resolve(req.credential_id, req.allowed_types)?;
            info!(field_name = req.field_name, "credential injected into node context");
            resolved.insert(req.field_name.to_string(), credential);
        }
        Ok(resolved)
    }
}

/// In-process credential store, used by tests and `weave-cli`. Production
/// deployments back `CredentialStore` with `weave-persistence`.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    rows: DashMap<CredentialId, EncryptedCredential>,
}

impl InMemoryCredentialStore {
    /// Construct an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row.
    pub fn put(&self, row: EncryptedCredential) {
        self.rows.insert(row.id.clone(), row);
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, id: &CredentialId) -> Option<EncryptedCredential> {
        self.rows.get(id).map(|entry| entry.clone())
    }
}
