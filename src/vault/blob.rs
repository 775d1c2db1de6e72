//! At-rest representation of an encrypted secret

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// PBKDF2 salt length
pub const SALT_LEN: usize = 16;
/// AES-GCM nonce length
pub const NONCE_LEN: usize = 12;
/// AES-GCM authentication tag length
pub const TAG_LEN: usize = 16;
/// Shortest blob that can possibly verify (empty plaintext)
pub const MIN_BLOB_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// `salt(16) ‖ nonce(12) ‖ ciphertext ‖ tag(16)`
///
/// The only form in which a secret key is ever persisted. Serializes as
/// base64 text.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBlob(Vec<u8>);

impl SecretBlob {
    pub(crate) fn pack(salt: &[u8; SALT_LEN], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        bytes.extend_from_slice(salt);
        bytes.extend_from_slice(nonce);
        bytes.extend_from_slice(ciphertext);
        Self(bytes)
    }

    /// Split into `(salt, nonce, ciphertext_with_tag)`, or `None` if too short
    pub(crate) fn unpack(&self) -> Option<(&[u8], &[u8], &[u8])> {
        if self.0.len() < MIN_BLOB_LEN {
            return None;
        }
        let (salt, rest) = self.0.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        Some((salt, nonce, ciphertext))
    }

    /// Wrap raw bytes read from storage; validity is only established by decryption
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        BASE64.decode(encoded.trim()).map(Self)
    }
}

impl std::fmt::Debug for SecretBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBlob")
            .field("len", &self.0.len())
            .finish()
    }
}

impl Serialize for SecretBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for SecretBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_then_unpack_splits_fields() {
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];
        let ciphertext = [3u8; 48];
        let blob = SecretBlob::pack(&salt, &nonce, &ciphertext);

        assert_eq!(blob.len(), SALT_LEN + NONCE_LEN + 48);
        let (s, n, c) = blob.unpack().unwrap();
        assert_eq!(s, &salt);
        assert_eq!(n, &nonce);
        assert_eq!(c, &ciphertext);
    }

    #[test]
    fn short_blob_does_not_unpack() {
        let blob = SecretBlob::from_bytes(vec![0u8; MIN_BLOB_LEN - 1]);
        assert!(blob.unpack().is_none());
    }

    #[test]
    fn serializes_as_base64_string() {
        let blob = SecretBlob::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let json = serde_json::to_string(&blob).unwrap();
        assert_eq!(json, "\"3q2+7w==\"");
        let back: SecretBlob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn debug_hides_contents() {
        let blob = SecretBlob::from_bytes(vec![0xab; 60]);
        let debug = format!("{:?}", blob);
        assert!(debug.contains("len"));
        assert!(!debug.contains("171"));
    }
}
