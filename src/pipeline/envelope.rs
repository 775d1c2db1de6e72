//! Unsigned and signed transaction envelopes
//!
//! The builder hands back the transaction body as opaque bytes. Signing
//! commits to `sha256(network_id ‖ ENVELOPE_TYPE_TX ‖ payload)` where
//! `network_id = sha256(passphrase)`; the same digest is the transaction
//! hash the network deduplicates on. The signed wire form appends the
//! decorated signatures after the payload:
//!
//! `ENVELOPE_TYPE_TX ‖ payload ‖ u32(n) ‖ n × (hint[4] ‖ u32(64) ‖ sig[64])`

use crate::config::Network;
use crate::wallet::{Keypair, PublicKey};
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Big-endian envelope discriminant for a v1 transaction
pub const ENVELOPE_TYPE_TX: [u8; 4] = [0, 0, 0, 2];

/// Envelope produced by the transaction builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedEnvelope {
    /// Opaque transaction body
    pub payload: Vec<u8>,
    /// Passphrase of the network the transaction was built for
    pub network_id: String,
    /// After this instant the envelope must be rebuilt
    pub expires_at: DateTime<Utc>,
}

impl UnsignedEnvelope {
    /// Check the envelope may be signed for `network` at `now`
    ///
    /// # Errors
    /// `Error::StaleEnvelope` on network mismatch or expiry.
    pub fn validate(&self, network: Network, now: DateTime<Utc>) -> Result<()> {
        if self.network_id != network.passphrase() {
            return Err(Error::StaleEnvelope(format!(
                "built for '{}', session is on {}",
                self.network_id, network
            )));
        }
        if self.expires_at <= now {
            return Err(Error::StaleEnvelope(format!(
                "expired at {}",
                self.expires_at.to_rfc3339()
            )));
        }
        if self.payload.is_empty() {
            return Err(Error::StaleEnvelope("empty payload".to_string()));
        }
        Ok(())
    }

    /// Digest that gets signed; also the transaction hash
    pub fn signature_base_hash(&self) -> [u8; 32] {
        let network_id = Sha256::digest(self.network_id.as_bytes());
        let mut hasher = Sha256::new();
        hasher.update(network_id);
        hasher.update(ENVELOPE_TYPE_TX);
        hasher.update(&self.payload);
        hasher.finalize().into()
    }

    /// Sign and attach the signature
    pub(crate) fn sign(self, keypair: &Keypair) -> SignedEnvelope {
        let hash = self.signature_base_hash();
        let signature = DecoratedSignature {
            hint: keypair.public_key().hint(),
            signature: keypair.sign(&hash),
        };
        SignedEnvelope {
            payload: self.payload,
            network_id: self.network_id,
            hash,
            signatures: vec![signature],
        }
    }
}

/// Signature plus the hint of the key that made it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoratedSignature {
    pub hint: [u8; 4],
    pub signature: [u8; 64],
}

/// Envelope ready for submission
///
/// Contains no key material; resubmitting it is safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub payload: Vec<u8>,
    pub network_id: String,
    /// Transaction hash
    pub hash: [u8; 32],
    pub signatures: Vec<DecoratedSignature>,
}

impl SignedEnvelope {
    pub fn hash_hex(&self) -> String {
        self.hash.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Wire bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            ENVELOPE_TYPE_TX.len() + self.payload.len() + 4 + self.signatures.len() * 72,
        );
        out.extend_from_slice(&ENVELOPE_TYPE_TX);
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&(self.signatures.len() as u32).to_be_bytes());
        for sig in &self.signatures {
            out.extend_from_slice(&sig.hint);
            out.extend_from_slice(&(sig.signature.len() as u32).to_be_bytes());
            out.extend_from_slice(&sig.signature);
        }
        out
    }

    /// Base64 of the wire bytes, as submitted to Horizon
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Whether `signer` produced one of the attached signatures
    pub fn is_signed_by(&self, signer: &PublicKey) -> bool {
        self.signatures
            .iter()
            .filter(|s| s.hint == signer.hint())
            .any(|s| signer.verify(&self.hash, &s.signature))
    }
}

/// Network answer to a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    pub hash: String,
    #[serde(default)]
    pub ledger: Option<u32>,
    pub successful: bool,
}

/// Builder response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeDto {
    /// Base64 transaction body
    pub payload: String,
    pub network_id: String,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<EnvelopeDto> for UnsignedEnvelope {
    type Error = Error;

    fn try_from(dto: EnvelopeDto) -> Result<Self> {
        let payload = BASE64
            .decode(dto.payload.trim())
            .map_err(|e| Error::Builder(format!("payload is not base64: {}", e)))?;
        Ok(UnsignedEnvelope {
            payload,
            network_id: dto.network_id,
            expires_at: dto.expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn envelope(network: Network, expires_in: Duration) -> UnsignedEnvelope {
        UnsignedEnvelope {
            payload: b"transaction body".to_vec(),
            network_id: network.passphrase().to_string(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[test]
    fn test_validate_accepts_fresh_matching_envelope() {
        let env = envelope(Network::Testnet, Duration::minutes(5));
        assert!(env.validate(Network::Testnet, Utc::now()).is_ok());
    }

    #[test]
    fn test_validate_rejects_network_mismatch() {
        let env = envelope(Network::Public, Duration::minutes(5));
        assert!(matches!(
            env.validate(Network::Testnet, Utc::now()),
            Err(Error::StaleEnvelope(_))
        ));
    }

    #[test]
    fn test_validate_rejects_expired() {
        let env = envelope(Network::Testnet, Duration::seconds(-1));
        assert!(matches!(
            env.validate(Network::Testnet, Utc::now()),
            Err(Error::StaleEnvelope(_))
        ));
    }

    #[test]
    fn test_hash_commits_to_network() {
        let testnet = envelope(Network::Testnet, Duration::minutes(5));
        let mut public = testnet.clone();
        public.network_id = Network::Public.passphrase().to_string();
        assert_ne!(testnet.signature_base_hash(), public.signature_base_hash());
    }

    #[test]
    fn test_sign_attaches_verifiable_signature() {
        let keypair = Keypair::generate().unwrap();
        let env = envelope(Network::Testnet, Duration::minutes(5));
        let expected_hash = env.signature_base_hash();

        let signed = env.sign(&keypair);
        assert_eq!(signed.hash, expected_hash);
        assert_eq!(signed.signatures.len(), 1);
        assert_eq!(signed.signatures[0].hint, keypair.public_key().hint());
        assert!(signed.is_signed_by(&keypair.public_key()));

        let other = Keypair::generate().unwrap().public_key();
        assert!(!signed.is_signed_by(&other));
    }

    #[test]
    fn test_wire_layout() {
        let keypair = Keypair::generate().unwrap();
        let signed = envelope(Network::Testnet, Duration::minutes(5)).sign(&keypair);
        let bytes = signed.to_bytes();
        let body_len = b"transaction body".len();

        assert_eq!(&bytes[..4], &ENVELOPE_TYPE_TX);
        assert_eq!(&bytes[4..4 + body_len], b"transaction body");
        assert_eq!(&bytes[4 + body_len..8 + body_len], &[0, 0, 0, 1]);
        assert_eq!(bytes.len(), 4 + body_len + 4 + 4 + 4 + 64);
        assert_eq!(signed.hash_hex().len(), 64);
    }

    #[test]
    fn test_dto_conversion() {
        let dto = EnvelopeDto {
            payload: BASE64.encode(b"tx"),
            network_id: Network::Testnet.passphrase().to_string(),
            expires_at: Utc::now(),
        };
        let env = UnsignedEnvelope::try_from(dto).unwrap();
        assert_eq!(env.payload, b"tx");

        let bad = EnvelopeDto {
            payload: "%%%".to_string(),
            network_id: String::new(),
            expires_at: Utc::now(),
        };
        assert!(matches!(
            UnsignedEnvelope::try_from(bad),
            Err(Error::Builder(_))
        ));
    }
}
