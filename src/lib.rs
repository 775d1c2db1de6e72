//! PIN-protected wallet core
//!
//! Keeps an ed25519 account seed encrypted at rest and coordinates a
//! Build → Sign → Submit pipeline against a Stellar-style ledger:
//! - Transactions are built by an external service
//! - Signing happens locally, with the seed decrypted for one signature only
//! - Signed envelopes are submitted to Horizon
//!
//! # Security Model
//!
//! - The seed is stored only as a PBKDF2/AES-256-GCM blob
//! - A wrong PIN and a corrupted blob are indistinguishable to callers
//! - The PIN and the decrypted seed never reach the builder, the submitter,
//!   interceptors or logs
//! - Every executed request passes through the interceptor chain before Build

pub mod assets;
pub mod config;
pub mod interceptors;
pub mod pipeline;
pub mod quotes;
pub mod runner;
pub mod services;
pub mod session;
pub mod vault;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use assets::AssetRef;
pub use config::{Config, Network};
pub use error::{Error, Result};
pub use pipeline::{SigningPipeline, SigningRequest, SubmitResult};
pub use quotes::{Quote, QuoteBook, QuoteQuery, Slippage};
pub use runner::WalletRunner;
pub use session::{Session, WalletStatus};
pub use vault::{KeyVault, SecretBlob};
pub use wallet::PublicKey;
