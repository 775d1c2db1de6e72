//! Ed25519 account keys
//!
//! SECURITY: `Keypair` and `UnlockedSecret` are the only types that hold a
//! decrypted seed.
//! - Neither implements `Clone`, `Serialize` or a revealing `Debug`
//! - Seeds live in `Zeroizing` buffers; `SigningKey` zeroizes on drop
//! - Instances are created per signing operation and dropped right after

use crate::{Error, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Raw seed length
pub const SEED_LEN: usize = 32;

/// Account public key, rendered as a `G...` StrKey
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Last four bytes, used as the signature hint
    pub fn hint(&self) -> [u8; 4] {
        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.0[28..]);
        hint
    }

    /// Check an ed25519 signature made by this key
    pub fn verify(&self, message: &[u8], signature: &[u8; 64]) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        key.verify(message, &Signature::from_bytes(signature)).is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stellar_strkey::ed25519::PublicKey(self.0).to_string())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl FromStr for PublicKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s
            .trim()
            .parse::<stellar_strkey::ed25519::PublicKey>()
            .map_err(|e| Error::InvalidKeyFormat(format!("public key: {:?}", e)))?;
        Ok(Self(key.0))
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}

/// Signing keypair derived from a seed
pub struct Keypair {
    signing: SigningKey,
    public: PublicKey,
}

impl Keypair {
    /// Fresh keypair from OS entropy
    pub fn generate() -> Result<Self> {
        let mut seed = Zeroizing::new([0u8; SEED_LEN]);
        OsRng
            .try_fill_bytes(&mut seed[..])
            .map_err(|e| Error::Entropy(e.to_string()))?;
        Ok(Self::from_seed_array(&seed))
    }

    /// Keypair from raw seed bytes
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let seed: &[u8; SEED_LEN] = seed.try_into().map_err(|_| {
            Error::InvalidKeyFormat(format!("seed must be {} bytes, got {}", SEED_LEN, seed.len()))
        })?;
        Ok(Self::from_seed_array(seed))
    }

    /// Keypair from an `S...` secret seed
    ///
    /// # Security
    /// The decoded seed is wiped before returning.
    pub fn from_secret_seed(secret: &SecretString) -> Result<Self> {
        let decoded = secret
            .expose_secret()
            .trim()
            .parse::<stellar_strkey::ed25519::PrivateKey>()
            .map_err(|_| Error::InvalidKeyFormat("not a valid secret seed".to_string()))?;
        let seed = Zeroizing::new(decoded.0);
        Ok(Self::from_seed_array(&seed))
    }

    fn from_seed_array(seed: &[u8; SEED_LEN]) -> Self {
        let signing = SigningKey::from_bytes(seed);
        let public = PublicKey(signing.verifying_key().to_bytes());
        Self { signing, public }
    }

    /// Get the public key (safe to share)
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }

    /// Raw seed, for re-encryption under a PIN
    pub(crate) fn seed(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing.to_bytes().to_vec())
    }

    /// `S...` rendering of the seed, for user backups
    pub fn secret_seed(&self) -> SecretString {
        let seed = Zeroizing::new(self.signing.to_bytes());
        SecretString::from(stellar_strkey::ed25519::PrivateKey(*seed).to_string())
    }
}

// Implement Debug manually to avoid exposing the seed
impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .field("signing", &"[REDACTED]")
            .finish()
    }
}

/// Decrypted seed handed out by `Session::unlock` for one operation
pub struct UnlockedSecret {
    seed: Zeroizing<Vec<u8>>,
}

impl UnlockedSecret {
    pub(crate) fn new(seed: Zeroizing<Vec<u8>>) -> Self {
        Self { seed }
    }

    /// Derive the signing keypair
    pub fn keypair(&self) -> Result<Keypair> {
        Keypair::from_seed(&self.seed)
    }
}

impl fmt::Debug for UnlockedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UnlockedSecret([REDACTED])")
    }
}
