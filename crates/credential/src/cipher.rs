//! AES-256-CBC encryption at rest for credential payloads.
//!
//! The wire format is fixed by the data already persisted by deployments
//! of this engine: ciphertext is prefixed by its 16-byte IV, so a single
//! opaque `Vec<u8>` round-trips through storage. PKCS7 padding comes from
//! the `cbc` crate's `Encryptor`/`Decryptor` types.

use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;

use crate::error::CredentialError;

const IV_LEN: usize = 16;
const KEY_LEN: usize = 32;

type Encryptor = cbc::Encryptor<Aes256>;
type Decryptor = cbc::Decryptor<Aes256>;

/// A 32-byte AES-256 key, typically loaded once from
/// `CREDENTIAL_ENCRYPTION_KEY` at process start.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Parse a 64-hex-character (32-byte) key, as configured by
    /// `CREDENTIAL_ENCRYPTION_KEY`.
    pub fn from_hex(hex_str: &str) -> Result<Self, CredentialError> {
        let bytes = hex::decode(hex_str)
            .map_err(|_| CredentialError::InvalidKey("not valid hex".into()))?;
        Self::from_bytes(&bytes)
    }

    /// Wrap raw key bytes; must be exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CredentialError> {
        let array: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CredentialError::InvalidKey(format!("expected {KEY_LEN} bytes")))?;
        Ok(Self(array))
    }
}

/// Encrypt `plaintext`, returning `IV || ciphertext`.
pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Vec<u8> {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    let encryptor = Encryptor::new(&key.0.into(), &iv.into());
    let ciphertext = encryptor.encrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(plaintext);
    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out
}

/// Decrypt a blob produced by [`encrypt`]: the leading 16 bytes are the IV.
pub fn decrypt(blob: &[u8], key: &EncryptionKey) -> Result<Vec<u8>, CredentialError> {
    if blob.len() < IV_LEN {
        return Err(CredentialError::Corrupt("ciphertext shorter than IV".into()));
    }
    let (iv, ciphertext) = blob.split_at(IV_LEN);
    let decryptor = Decryptor::new(&key.0.into(), iv.into());
    decryptor
        .decrypt_padded_vec_mut::<cbc::cipher::block_padding::Pkcs7>(ciphertext)
        .map_err(|_| CredentialError::Corrupt("padding or key mismatch".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> EncryptionKey {
        EncryptionKey::from_bytes(&[7u8; KEY_LEN]).unwrap()
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let key = key();
        let plaintext = br#"{"username":"u","password":"p"}"#;
        let ciphertext = encrypt(plaintext, &key);
        let decrypted = decrypt(&ciphertext, &key).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ciphertext_is_prefixed_with_a_16_byte_iv() {
        let ciphertext = encrypt(b"hello", &key());
        assert!(ciphertext.len() >= IV_LEN);
    }

    #[test]
    fn two_encryptions_of_the_same_plaintext_differ() {
        let key = key();
        let a = encrypt(b"same plaintext", &key);
        let b = encrypt(b"same plaintext", &key);
        assert_ne!(a, b, "random IV must vary ciphertext");
    }

    #[test]
    fn decrypt_rejects_truncated_blob() {
        let err = decrypt(&[0u8; 4], &key()).unwrap_err();
        assert!(matches!(err, CredentialError::Corrupt(_)));
    }

    #[test]
    fn decrypt_rejects_wrong_key() {
        let ciphertext = encrypt(b"secret", &key());
        let wrong_key = EncryptionKey::from_bytes(&[9u8; KEY_LEN]).unwrap();
        assert!(decrypt(&ciphertext, &wrong_key).is_err());
    }

    #[test]
    fn from_hex_rejects_wrong_length() {
        assert!(EncryptionKey::from_hex("abcd").is_err());
    }

    #[test]
    fn from_hex_accepts_64_char_key() {
        let hex_key = "ab".repeat(KEY_LEN);
        assert!(EncryptionKey::from_hex(&hex_key).is_ok());
    }
}
