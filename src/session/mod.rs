//! Wallet session state machine
//!
//! `NoWallet → (create | import) → wallet present, unlocked
//!  wallet present → lock → locked (idempotent, never touches the secret)
//!  wallet present → unlock(pin) → one-shot `UnlockedSecret`, unlocked
//!  wallet present → switch_network → metadata only
//!  wallet present → delete → NoWallet`
//!
//! The session owns only the encrypted blob. Every operation that needs
//! the seed decrypts it from the blob with the caller's PIN; nothing
//! decrypted is cached on the session.

mod store;

pub use store::{FileSessionStore, MemorySessionStore, PersistedSession, SessionStore};

use crate::config::Network;
use crate::vault::{KeyVault, SecretBlob};
use crate::wallet::{Keypair, PublicKey, UnlockedSecret};
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Session shared between callers; signing holds the lock across unlock and sign
pub type SharedSession<S> = Arc<Mutex<Session<S>>>;

/// Externally visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletStatus {
    NoWallet,
    Locked,
    Unlocked,
}

/// Public key and blob are always stored and replaced together
#[derive(Debug, Clone)]
struct StoredWallet {
    public_key: PublicKey,
    secret_blob: SecretBlob,
}

pub struct Session<S: SessionStore> {
    vault: KeyVault,
    store: S,
    wallet: Option<StoredWallet>,
    network: Network,
    default_network: Network,
    locked: bool,
}

impl<S: SessionStore> Session<S> {
    /// Load the persisted session; a restored wallet starts locked
    pub async fn open(vault: KeyVault, store: S, default_network: Network) -> Result<Self> {
        let persisted = store.load().await?;
        let (wallet, network) = match persisted {
            Some(p) => {
                info!(
                    public_key = %p.public_key,
                    network = %p.network,
                    "Restored encrypted wallet"
                );
                (
                    Some(StoredWallet {
                        public_key: p.public_key,
                        secret_blob: p.secret_blob,
                    }),
                    p.network,
                )
            }
            None => (None, default_network),
        };

        Ok(Self {
            vault,
            store,
            wallet,
            network,
            default_network,
            locked: true,
        })
    }

    /// Wrap for sharing between pipeline and callers
    pub fn into_shared(self) -> SharedSession<S> {
        Arc::new(Mutex::new(self))
    }

    pub fn status(&self) -> WalletStatus {
        match (&self.wallet, self.locked) {
            (None, _) => WalletStatus::NoWallet,
            (Some(_), true) => WalletStatus::Locked,
            (Some(_), false) => WalletStatus::Unlocked,
        }
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn public_key(&self) -> Option<PublicKey> {
        self.wallet.as_ref().map(|w| w.public_key)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Durable form of the current state, if a wallet exists
    pub fn persisted(&self) -> Option<PersistedSession> {
        self.wallet.as_ref().map(|w| PersistedSession {
            public_key: w.public_key,
            secret_blob: w.secret_blob.clone(),
            network: self.network,
        })
    }

    /// Generate a new keypair and keep only its encrypted seed
    pub async fn create_wallet(&mut self, pin: &SecretString) -> Result<PublicKey> {
        self.ensure_empty()?;
        let keypair = Keypair::generate()?;
        self.install(keypair, pin).await
    }

    /// Import an `S...` secret seed
    ///
    /// # Errors
    /// `Error::InvalidKeyFormat` if the secret does not decode to a keypair.
    pub async fn import_wallet(
        &mut self,
        secret: &SecretString,
        pin: &SecretString,
    ) -> Result<PublicKey> {
        self.ensure_empty()?;
        let keypair = Keypair::from_secret_seed(secret)?;
        self.install(keypair, pin).await
    }

    fn ensure_empty(&self) -> Result<()> {
        if self.wallet.is_some() {
            return Err(Error::WalletExists);
        }
        Ok(())
    }

    async fn install(&mut self, keypair: Keypair, pin: &SecretString) -> Result<PublicKey> {
        let public_key = keypair.public_key();
        let secret_blob = self.vault.encrypt_async(keypair.seed(), pin).await?;
        drop(keypair);

        let wallet = StoredWallet {
            public_key,
            secret_blob,
        };
        self.store
            .save(&PersistedSession {
                public_key,
                secret_blob: wallet.secret_blob.clone(),
                network: self.network,
            })
            .await?;

        self.wallet = Some(wallet);
        self.locked = false;
        info!(public_key = %public_key, network = %self.network, "Wallet installed");
        Ok(public_key)
    }

    /// Mark the session locked; idempotent and never touches the blob
    pub fn lock(&mut self) {
        if !self.locked {
            debug!("Session locked");
        }
        self.locked = true;
    }

    /// Decrypt the seed for a single operation
    ///
    /// The returned value is the only copy of the plaintext; the session
    /// keeps nothing.
    ///
    /// # Errors
    /// `Error::NoWallet` without a wallet, `Error::Authentication` for a
    /// wrong PIN, a corrupted blob, or a blob that does not match the
    /// stored public key.
    pub async fn unlock(&mut self, pin: &SecretString) -> Result<UnlockedSecret> {
        let wallet = self.wallet.as_ref().ok_or(Error::NoWallet)?;
        let seed = match self.vault.decrypt_async(&wallet.secret_blob, pin).await {
            Ok(seed) => seed,
            Err(e) => {
                warn!("Unlock failed");
                return Err(e);
            }
        };

        let secret = UnlockedSecret::new(seed);
        let derived = secret.keypair().map_err(|_| Error::Authentication)?;
        if derived.public_key() != wallet.public_key {
            warn!(public_key = %wallet.public_key, "Decrypted seed does not match stored key");
            return Err(Error::Authentication);
        }

        self.locked = false;
        Ok(secret)
    }

    /// Change the active network; the blob is untouched
    pub async fn switch_network(&mut self, network: Network) -> Result<()> {
        if network == self.network {
            return Ok(());
        }
        let previous = self.network;
        self.network = network;

        if let Some(persisted) = self.persisted() {
            if let Err(e) = self.store.save(&persisted).await {
                self.network = previous;
                return Err(e);
            }
        }
        info!(from = %previous, to = %network, "Switched network");
        Ok(())
    }

    /// Backup export of the `S...` seed; requires the PIN
    pub async fn export_secret(&mut self, pin: &SecretString) -> Result<SecretString> {
        let unlocked = self.unlock(pin).await?;
        Ok(unlocked.keypair()?.secret_seed())
    }

    /// Drop the wallet and its persisted form; the network returns to the
    /// configured default
    pub async fn delete_wallet(&mut self) -> Result<()> {
        self.store.clear().await?;
        if let Some(wallet) = self.wallet.take() {
            info!(public_key = %wallet.public_key, "Wallet deleted");
        }
        self.network = self.default_network;
        self.locked = true;
        Ok(())
    }
}

impl<S: SessionStore> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("public_key", &self.public_key())
            .field("network", &self.network)
            .field("locked", &self.locked)
            .finish()
    }
}
