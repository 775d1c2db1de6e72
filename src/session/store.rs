//! Session persistence port
//!
//! Only `{public_key, secret_blob, network}` is ever written. The blob is
//! the packed `salt ‖ nonce ‖ ciphertext` form, base64 encoded.

use crate::config::Network;
use crate::vault::SecretBlob;
use crate::wallet::PublicKey;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable form of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub public_key: PublicKey,
    pub secret_blob: SecretBlob,
    pub network: Network,
}

/// Storage port injected into `Session`
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any
    async fn load(&self) -> Result<Option<PersistedSession>>;

    /// Replace the persisted session
    async fn save(&self, session: &PersistedSession) -> Result<()>;

    /// Remove the persisted session; succeeds when nothing is stored
    async fn clear(&self) -> Result<()>;
}

/// JSON file store with atomic replace
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error(&self.path, e)),
        };
        let session = serde_json::from_str(&content).map_err(|e| storage_error(&self.path, e))?;
        Ok(Some(session))
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(parent, e))?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| storage_error(&temp_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| storage_error(&temp_path, e))?;
        }

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| storage_error(&self.path, e))
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&self.path, e)),
        }
    }
}

/// In-process store; clones share the same slot
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    slot: Arc<RwLock<Option<PersistedSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents
    pub async fn snapshot(&self) -> Option<PersistedSession> {
        self.slot.read().await.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<PersistedSession>> {
        Ok(self.snapshot().await)
    }

    async fn save(&self, session: &PersistedSession) -> Result<()> {
        *self.slot.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }
}
