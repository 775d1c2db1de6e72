//! Configuration for the wallet core

pub mod endpoints;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use endpoints::Endpoints;

/// Default PBKDF2 iteration count for new blobs
pub const DEFAULT_KDF_ITERATIONS: u32 = 600_000;

/// Lowest iteration count the vault accepts
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Environment variable names
pub mod env_vars {
    pub const NETWORK: &str = "WALLET_NETWORK";
    pub const SESSION_PATH: &str = "WALLET_SESSION_PATH";
    pub const KDF_ITERATIONS: &str = "WALLET_KDF_ITERATIONS";
    pub const PIN: &str = "WALLET_PIN";
}

/// Ledger networks the wallet can sign for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Testnet,
    Public,
}

impl Network {
    /// Passphrase identifying the network; signatures commit to its hash.
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Testnet => "Test SDF Network ; September 2015",
            Network::Public => "Public Global Stellar Network ; September 2015",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Public => "public",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "testnet" | "test" => Ok(Network::Testnet),
            "public" | "mainnet" | "pubnet" => Ok(Network::Public),
            other => Err(Error::InvalidArgument(format!("Unknown network: {}", other))),
        }
    }
}

/// Risk management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Maximum slippage tolerance for swaps (e.g., 0.5 for 0.5%)
    pub max_slippage_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_slippage_percent: 1.0,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network new sessions start on
    #[serde(default)]
    pub network: Network,
    /// Collaborator endpoints
    #[serde(default)]
    pub endpoints: Endpoints,
    /// PBKDF2 iterations used for new blobs
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
    /// Timeout for builder, Horizon and quote requests
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Where the encrypted session is persisted
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
    /// Path to audit log file
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
    /// Risk management settings
    #[serde(default)]
    pub risk: RiskConfig,
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_KDF_ITERATIONS
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_session_path() -> PathBuf {
    PathBuf::from("wallet-session.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::default(),
            endpoints: Endpoints::default(),
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            request_timeout_secs: default_request_timeout_secs(),
            session_path: default_session_path(),
            audit_log_path: Some(PathBuf::from("audit.jsonl")),
            risk: RiskConfig::default(),
        }
    }
}

impl Config {
    /// Load from an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                serde_json::from_str(&content)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?
            }
            None => Config::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from `WALLET_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(network) = std::env::var(env_vars::NETWORK) {
            self.network = network.parse()?;
        }
        if let Ok(path) = std::env::var(env_vars::SESSION_PATH) {
            tracing::debug!("Using WALLET_SESSION_PATH for session storage");
            self.session_path = PathBuf::from(path);
        }
        if let Ok(iterations) = std::env::var(env_vars::KDF_ITERATIONS) {
            self.kdf_iterations = iterations.parse().map_err(|e| {
                Error::Config(format!("Invalid {}: {}", env_vars::KDF_ITERATIONS, e))
            })?;
        }
        self.endpoints.apply_env();
        Ok(())
    }

    /// Reject settings that would weaken custody
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(Error::Config(format!(
                "kdf_iterations {} is below the minimum of {}",
                self.kdf_iterations, MIN_KDF_ITERATIONS
            )));
        }
        if !(0.0..=50.0).contains(&self.risk.max_slippage_percent) {
            return Err(Error::Config(format!(
                "max_slippage_percent {} must be between 0 and 50",
                self.risk.max_slippage_percent
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
