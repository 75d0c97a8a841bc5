//! Credential resolution failure modes.

use weave_error::EngineError;

/// Failure modes for credential storage and resolution.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum CredentialError {
    /// No credential exists with the given id.
    #[error("credential {0} not found")]
    NotFound(weave_core::CredentialId),

    /// The stored credential's type isn't one of the caller's allowed types.
    #[error("credential {id} has type {actual}, expected one of {expected:?}")]
    TypeMismatch {
        /// The credential that was looked up.
        id: weave_core::CredentialId,
        /// Its actual stored type.
        actual: String,
        /// The types the caller would have accepted.
        expected: Vec<String>,
    },

    /// `expiresAt` has passed.
    #[error("credential {0} has expired")]
    Expired(weave_core::CredentialId),

    /// The configured encryption key is malformed.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// Stored ciphertext could not be decrypted (truncated, wrong key,
    /// tampered).
    #[error("corrupt ciphertext: {0}")]
    Corrupt(String),
}

impl From<CredentialError> for EngineError {
    fn from(err: CredentialError) -> Self {
        match &err {
            CredentialError::NotFound(id) => {
                EngineError::not_found(format!("credential {id} not found"))
            }
            CredentialError::TypeMismatch { .. } | CredentialError::Expired(_) => {
                EngineError::authentication(err.to_string())
            }
            CredentialError::InvalidKey(_) | CredentialError::Corrupt(_) => {
                EngineError::internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_error::ErrorKind;

    #[test]
    fn not_found_maps_to_not_found_kind() {
        let err: EngineError = CredentialError::NotFound("cred-1".into()).into();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn type_mismatch_maps_to_authentication_kind() {
        let err: EngineError = CredentialError::TypeMismatch {
            id: "cred-1".into(),
            actual: "httpBasicAuth".into(),
            expected: vec!["httpHeaderAuth".into()],
        }
        .into();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn expired_maps_to_authentication_kind() {
        let err: EngineError = CredentialError::Expired("cred-1".into()).into();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn corrupt_maps_to_internal_kind() {
        let err: EngineError = CredentialError::Corrupt("bad padding".into()).into();
        assert_eq!(err.kind, ErrorKind::Internal);
    }
}
