//! Collaborator endpoint configuration
//!
//! Resolution order per endpoint:
//! 1. `WALLET_*` environment variables - highest priority
//! 2. Values from the JSON config file
//! 3. Public SDF Horizon instances (rate limited)
//!
//! The transaction builder has no public default; signing requests fail with
//! a configuration error until `WALLET_BUILDER_URL` or `builder_url` is set.
//!
//! ```bash
//! export WALLET_HORIZON_URL="https://horizon.example.org"
//! export WALLET_HORIZON_TESTNET_URL="https://horizon-testnet.example.org"
//! export WALLET_BUILDER_URL="https://builder.example.org"
//! ```

use super::Network;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

mod env_vars {
    pub const HORIZON_URL: &str = "WALLET_HORIZON_URL";
    pub const HORIZON_TESTNET_URL: &str = "WALLET_HORIZON_TESTNET_URL";
    pub const BUILDER_URL: &str = "WALLET_BUILDER_URL";
}

/// Public Horizon endpoints
pub mod public_horizon {
    pub const PUBLIC: &str = "https://horizon.stellar.org";
    pub const TESTNET: &str = "https://horizon-testnet.stellar.org";
}

/// URLs of the external collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    /// Horizon for the public network
    pub horizon_public: String,
    /// Horizon for the test network
    pub horizon_testnet: String,
    /// Transaction-builder service
    #[serde(default)]
    pub builder_url: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            horizon_public: public_horizon::PUBLIC.to_string(),
            horizon_testnet: public_horizon::TESTNET.to_string(),
            builder_url: None,
        }
    }
}

impl Endpoints {
    /// Overlay endpoint env vars
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(env_vars::HORIZON_URL) {
            tracing::debug!("Using WALLET_HORIZON_URL for the public network");
            self.horizon_public = url;
        }
        if let Ok(url) = std::env::var(env_vars::HORIZON_TESTNET_URL) {
            tracing::debug!("Using WALLET_HORIZON_TESTNET_URL for testnet");
            self.horizon_testnet = url;
        }
        if let Ok(url) = std::env::var(env_vars::BUILDER_URL) {
            tracing::debug!("Using WALLET_BUILDER_URL for the transaction builder");
            self.builder_url = Some(url);
        }
    }

    /// Horizon base URL for a network
    pub fn horizon(&self, network: Network) -> Result<Url> {
        let raw = match network {
            Network::Public => &self.horizon_public,
            Network::Testnet => &self.horizon_testnet,
        };
        parse_base(raw)
    }

    /// Builder base URL, if configured
    pub fn builder(&self) -> Result<Url> {
        let raw = self
            .builder_url
            .as_deref()
            .ok_or_else(|| Error::Config("builder_url is not configured".to_string()))?;
        parse_base(raw)
    }
}

/// Parse a base URL, guaranteeing a trailing slash so `join` appends
fn parse_base(raw: &str) -> Result<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&with_slash).map_err(|e| Error::Config(format!("Invalid URL {}: {}", raw, e)))
}
