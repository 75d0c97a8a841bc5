//! The decrypted credential value nodes receive.

use chrono::{DateTime, Utc};
use weave_core::CredentialId;

/// A decrypted credential, ready to hand to a node's `execute`.
#[derive(Clone)]
pub struct Credential {
    /// Stable identifier.
    pub id: CredentialId,
    /// Type key (e.g. `"httpBasicAuth"`), safe to log.
    pub credential_type: String,
    /// Decrypted payload. Never logged — only `id` and `credential_type`
    /// may appear in log lines.
    pub data: serde_json::Value,
    /// Optional expiry; checked against the current time at resolution.
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("credential_type", &self.credential_type)
            .field("data", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Credential {
    /// `true` if `expires_at` is set and in the past.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// A stored, still-encrypted credential row, as persisted.
#[derive(Clone)]
pub struct EncryptedCredential {
    /// Stable identifier.
    pub id: CredentialId,
    /// Owning user; ownership enforcement itself is the CRUD layer's job
    /// (out of scope), but the row carries it for that layer's use.
    pub owner_id: weave_core::UserId,
    /// Type key.
    pub credential_type: String,
    /// `IV || ciphertext` blob produced by [`crate::cipher::encrypt`].
    pub encrypted_data: Vec<u8>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn credential(expires_at: Option<DateTime<Utc>>) -> Credential {
        Credential {
            id: "cred-1".into(),
            credential_type: "httpBasicAuth".into(),
            data: serde_json::json!({"username": "u", "password": "p"}),
            expires_at,
        }
    }

    #[test]
    fn not_expired_without_expiry() {
        assert!(!credential(None).is_expired(Utc::now()));
    }

    #[test]
    fn expired_when_past_deadline() {
        let past = Utc::now() - Duration::hours(1);
        assert!(credential(Some(past)).is_expired(Utc::now()));
    }

    #[test]
    fn not_expired_before_deadline() {
        let future = Utc::now() + Duration::hours(1);
        assert!(!credential(Some(future)).is_expired(Utc::now()));
    }

    #[test]
    fn debug_redacts_data() {
        let debug = format!("{:?}", credential(None));
        assert!(!debug.contains('u'), "username leaked into debug output");
        assert!(debug.contains("redacted"));
    }
}
