#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # Weave Credential
//!
//! Credential encryption at rest (AES-256-CBC, §4.2) and resolution:
//! turning a stored `credentialId` plus a node definition's declared
//! field name into a materialized, type-checked [`Credential`] delivered
//! to [`weave_node::NodeContext`].

/// AES-256-CBC encrypt/decrypt for credential payloads at rest.
pub mod cipher;
/// The decrypted credential value and its still-encrypted row shape.
pub mod credential;
/// Credential resolution failure modes.
pub mod error;
/// Resolving a stored credential id into a materialized credential.
pub mod resolver;

pub use cipher::EncryptionKey;
pub use credential::{Credential, EncryptedCredential};
pub use error::CredentialError;
pub use resolver::{CredentialRequirement, CredentialResolver, CredentialStore, InMemoryCredentialStore};
