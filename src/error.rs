//! Error types for the wallet core
//!
//! No variant carries key material or a PIN. Vault failures collapse into
//! a single `Authentication` variant so callers cannot tell a wrong PIN
//! from a corrupted blob.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Authentication failed: wrong PIN or corrupted secret")]
    Authentication,

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Stale envelope: {0}")]
    StaleEnvelope(String),

    #[error("Quote list was refreshed; select a current quote")]
    StaleQuote,

    #[error("No quote selected")]
    NoQuoteSelected,

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Transaction rejected: {reason}")]
    TransactionRejected {
        reason: String,
        result_codes: Option<serde_json::Value>,
    },

    #[error("Transaction builder error: {0}")]
    Builder(String),

    #[error("No wallet present")]
    NoWallet,

    #[error("A wallet already exists; delete it first")]
    WalletExists,

    #[error("Interceptor blocked: {0}")]
    Blocked(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Entropy source unavailable: {0}")]
    Entropy(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller may retry the same call unchanged.
    ///
    /// Only transport failures qualify; a retried submission of the same
    /// signed bytes is deduplicated by hash on the network side.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::Submission(_))
    }

    /// Whether recovery needs a fresh Build phase.
    pub fn requires_rebuild(&self) -> bool {
        matches!(
            self,
            Error::StaleEnvelope(_) | Error::TransactionRejected { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_submission_errors_are_retriable() {
        assert!(Error::Submission("timeout".to_string()).is_retriable());
        assert!(!Error::Authentication.is_retriable());
        assert!(!Error::TransactionRejected {
            reason: "tx_bad_seq".to_string(),
            result_codes: None,
        }
        .is_retriable());
    }

    #[test]
    fn rejected_and_stale_need_rebuild() {
        assert!(Error::StaleEnvelope("expired".to_string()).requires_rebuild());
        assert!(Error::TransactionRejected {
            reason: "tx_bad_seq".to_string(),
            result_codes: None,
        }
        .requires_rebuild());
        assert!(!Error::Submission("504".to_string()).requires_rebuild());
    }

    #[test]
    fn authentication_message_does_not_distinguish_causes() {
        let msg = Error::Authentication.to_string();
        assert!(msg.contains("wrong PIN or corrupted"));
    }
}
