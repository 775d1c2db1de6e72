//! Key vault: PIN-based authenticated encryption of secret keys
//!
//! PBKDF2-HMAC-SHA256 stretches the PIN with a fresh 16-byte salt, and
//! AES-256-GCM seals the secret under a fresh 12-byte nonce. The vault is
//! stateless; it holds only its cost parameter.
//!
//! SECURITY NOTE:
//! - Every decryption failure is reported as `Error::Authentication`
//! - The KDF always runs before any blob validation so that malformed
//!   blobs and wrong PINs cost the same
//! - Derived keys and plaintexts live in `Zeroizing` buffers

mod blob;

pub use blob::{SecretBlob, MIN_BLOB_LEN, NONCE_LEN, SALT_LEN, TAG_LEN};

use crate::config::{DEFAULT_KDF_ITERATIONS, MIN_KDF_ITERATIONS};
use crate::{Error, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroizing;

const KEY_LEN: usize = 32;

/// Stateless encrypt/decrypt of secrets under a PIN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyVault {
    iterations: u32,
}

impl Default for KeyVault {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

impl KeyVault {
    /// Vault with the default cost (600 000 iterations)
    pub fn new() -> Self {
        Self::default()
    }

    /// Vault with an explicit cost; values below the floor are rejected
    pub fn with_iterations(iterations: u32) -> Result<Self> {
        if iterations < MIN_KDF_ITERATIONS {
            return Err(Error::Config(format!(
                "PBKDF2 iteration count {} is below the minimum of {}",
                iterations, MIN_KDF_ITERATIONS
            )));
        }
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Encrypt `secret` under `pin` with a fresh salt and nonce
    pub fn encrypt(&self, secret: &[u8], pin: &SecretString) -> Result<SecretBlob> {
        self.encrypt_raw(secret, pin.expose_secret().as_bytes())
    }

    /// Decrypt and verify a blob
    ///
    /// # Errors
    /// `Error::Authentication` for a wrong PIN, a truncated blob, or any
    /// modified byte. No other failure is observable.
    pub fn decrypt(&self, blob: &SecretBlob, pin: &SecretString) -> Result<Zeroizing<Vec<u8>>> {
        self.decrypt_raw(blob, pin.expose_secret().as_bytes())
    }

    /// `encrypt` on the blocking pool
    pub async fn encrypt_async(
        &self,
        secret: Zeroizing<Vec<u8>>,
        pin: &SecretString,
    ) -> Result<SecretBlob> {
        let vault = *self;
        let pin = Zeroizing::new(pin.expose_secret().as_bytes().to_vec());
        tokio::task::spawn_blocking(move || vault.encrypt_raw(&secret, &pin))
            .await
            .map_err(|e| Error::Task(format!("encryption task: {}", e)))?
    }

    /// `decrypt` on the blocking pool
    pub async fn decrypt_async(
        &self,
        blob: &SecretBlob,
        pin: &SecretString,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let vault = *self;
        let blob = blob.clone();
        let pin = Zeroizing::new(pin.expose_secret().as_bytes().to_vec());
        tokio::task::spawn_blocking(move || vault.decrypt_raw(&blob, &pin))
            .await
            .map_err(|e| Error::Task(format!("decryption task: {}", e)))?
    }

    fn encrypt_raw(&self, secret: &[u8], pin: &[u8]) -> Result<SecretBlob> {
        if pin.is_empty() {
            return Err(Error::InvalidArgument("PIN must not be empty".to_string()));
        }

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .and_then(|_| OsRng.try_fill_bytes(&mut nonce))
            .map_err(|e| Error::Entropy(e.to_string()))?;

        let key = self.derive_key(pin, &salt);
        let cipher = Aes256Gcm::new_from_slice(key.as_slice())
            .map_err(|e| Error::InvalidArgument(format!("cipher key: {}", e)))?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), secret)
            .map_err(|_| Error::InvalidArgument("secret could not be sealed".to_string()))?;

        Ok(SecretBlob::pack(&salt, &nonce, &ciphertext))
    }

    fn decrypt_raw(&self, blob: &SecretBlob, pin: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let Some((salt, nonce, ciphertext)) = blob.unpack() else {
            // Pay the KDF cost anyway.
            let _ = self.derive_key(pin, &[0u8; SALT_LEN]);
            return Err(Error::Authentication);
        };

        let key = self.derive_key(pin, salt);
        open_sealed(&key, nonce, ciphertext)
    }

    fn derive_key(&self, pin: &[u8], salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2_hmac::<Sha256>(pin, salt, self.iterations, &mut key[..]);
        key
    }
}

fn open_sealed(key: &[u8; KEY_LEN], nonce: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::Authentication)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| Error::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> KeyVault {
        KeyVault::with_iterations(MIN_KDF_ITERATIONS).unwrap()
    }

    fn pin(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_round_trip() {
        let vault = vault();
        let secret = [7u8; 32];

        let blob = vault.encrypt(&secret, &pin("1234")).unwrap();
        assert_eq!(blob.len(), SALT_LEN + NONCE_LEN + secret.len() + TAG_LEN);

        let plain = vault.decrypt(&blob, &pin("1234")).unwrap();
        assert_eq!(plain.as_slice(), &secret);
    }

    #[test]
    fn test_wrong_pin_fails_authentication() {
        let vault = vault();
        let blob = vault.encrypt(b"secret seed bytes", &pin("1234")).unwrap();

        for wrong in ["9999", "12345", "123", "4321"] {
            let err = vault.decrypt(&blob, &pin(wrong)).unwrap_err();
            assert!(matches!(err, Error::Authentication), "pin {wrong}");
        }
    }

    #[test]
    fn test_encryption_is_not_deterministic() {
        let vault = vault();
        let a = vault.encrypt(&[1u8; 32], &pin("1234")).unwrap();
        let b = vault.encrypt(&[1u8; 32], &pin("1234")).unwrap();

        assert_ne!(a, b);
        assert_ne!(&a.as_bytes()[..SALT_LEN], &b.as_bytes()[..SALT_LEN]);
    }

    fn flip(blob: &SecretBlob, bit: usize) -> SecretBlob {
        let mut bytes = blob.as_bytes().to_vec();
        bytes[bit / 8] ^= 1 << (bit % 8);
        SecretBlob::from_bytes(bytes)
    }

    #[test]
    fn test_any_flipped_salt_bit_fails_authentication() {
        let vault = vault();
        let blob = vault.encrypt(&[9u8; 32], &pin("1234")).unwrap();

        for bit in 0..SALT_LEN * 8 {
            let err = vault.decrypt(&flip(&blob, bit), &pin("1234")).unwrap_err();
            assert!(matches!(err, Error::Authentication), "salt bit {bit}");
        }
    }

    #[test]
    fn test_any_flipped_sealed_bit_fails_authentication() {
        let vault = vault();
        let blob = vault.encrypt(&[9u8; 32], &pin("1234")).unwrap();
        let (salt, _, _) = blob.unpack().unwrap();
        // Nonce, ciphertext and tag bits leave the salt, so the key is shared.
        let key = vault.derive_key(b"1234", salt);

        for bit in SALT_LEN * 8..blob.len() * 8 {
            let tampered = flip(&blob, bit);
            let (_, nonce, ciphertext) = tampered.unpack().unwrap();
            let err = open_sealed(&key, nonce, ciphertext).unwrap_err();
            assert!(matches!(err, Error::Authentication), "bit {bit}");
        }

        // A sample through the full path, KDF included.
        for bit in [SALT_LEN * 8, (SALT_LEN + NONCE_LEN) * 8 + 3, blob.len() * 8 - 1] {
            let err = vault.decrypt(&flip(&blob, bit), &pin("1234")).unwrap_err();
            assert!(matches!(err, Error::Authentication), "bit {bit}");
        }
    }

    #[test]
    fn test_truncated_blob_fails_authentication() {
        let vault = vault();
        let blob = vault.encrypt(&[9u8; 32], &pin("1234")).unwrap();
        let truncated = SecretBlob::from_bytes(blob.as_bytes()[..MIN_BLOB_LEN - 1].to_vec());

        assert!(matches!(
            vault.decrypt(&truncated, &pin("1234")),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_blob_needs_matching_iterations() {
        let blob = vault().encrypt(&[5u8; 32], &pin("1234")).unwrap();
        let stronger = KeyVault::with_iterations(MIN_KDF_ITERATIONS + 1).unwrap();

        assert!(matches!(
            stronger.decrypt(&blob, &pin("1234")),
            Err(Error::Authentication)
        ));
    }

    #[test]
    fn test_low_iteration_count_rejected() {
        assert!(matches!(
            KeyVault::with_iterations(1_000),
            Err(Error::Config(_))
        ));
        assert_eq!(KeyVault::new().iterations(), DEFAULT_KDF_ITERATIONS);
    }

    #[test]
    fn test_empty_pin_rejected() {
        assert!(matches!(
            vault().encrypt(&[1u8; 32], &pin("")),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_async_round_trip() {
        let vault = vault();
        let blob = vault
            .encrypt_async(Zeroizing::new(vec![3u8; 32]), &pin("2580"))
            .await
            .unwrap();

        let plain = vault.decrypt_async(&blob, &pin("2580")).await.unwrap();
        assert_eq!(plain.as_slice(), &[3u8; 32]);

        let err = vault.decrypt_async(&blob, &pin("0000")).await.unwrap_err();
        assert!(matches!(err, Error::Authentication));
    }
}
