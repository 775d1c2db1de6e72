//! Wallet runner
//!
//! Wires configuration, the file-backed session and the HTTP collaborators
//! into a signing pipeline for the CLI.

use crate::config::Config;
use crate::interceptors::{AuditLogInterceptor, SlippageGuardInterceptor};
use crate::pipeline::{SigningPipeline, SigningRequest, SubmitResult};
use crate::quotes::{Quote, QuoteBook, QuoteQuery, Slippage};
use crate::services::{HorizonPathQuotes, HorizonSubmitter, HttpTransactionBuilder};
use crate::session::{FileSessionStore, Session, SharedSession, WalletStatus};
use crate::vault::KeyVault;
use crate::wallet::PublicKey;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Pipeline over the HTTP collaborators and the file store
pub type HttpPipeline = SigningPipeline<HttpTransactionBuilder, HorizonSubmitter, FileSessionStore>;

/// Public view of the session
#[derive(Debug, Clone, Serialize)]
pub struct WalletReport {
    pub status: WalletStatus,
    pub public_key: Option<PublicKey>,
    pub network: String,
}

pub struct WalletRunner {
    config: Config,
    session: SharedSession<FileSessionStore>,
}

impl WalletRunner {
    /// Open the persisted session named by the configuration
    pub async fn open(config: Config) -> Result<Self> {
        let vault = KeyVault::with_iterations(config.kdf_iterations)?;
        let store = FileSessionStore::new(&config.session_path);
        info!(
            session_path = %config.session_path.display(),
            kdf_iterations = config.kdf_iterations,
            "Opening wallet session"
        );
        let session = Session::open(vault, store, config.network).await?;
        Ok(Self {
            config,
            session: session.into_shared(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SharedSession<FileSessionStore> {
        &self.session
    }

    pub async fn report(&self) -> WalletReport {
        let session = self.session.lock().await;
        WalletReport {
            status: session.status(),
            public_key: session.public_key(),
            network: session.network().to_string(),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// Pipeline against the Horizon instance of the session's network
    pub async fn pipeline(&self) -> Result<HttpPipeline> {
        let network = self.session.lock().await.network();
        let builder = HttpTransactionBuilder::new(&self.config.endpoints.builder()?, self.timeout())?;
        let submitter =
            HorizonSubmitter::new(&self.config.endpoints.horizon(network)?, self.timeout())?;

        // Audit first so blocked requests are logged too.
        let mut pipeline = SigningPipeline::new(builder, submitter, Arc::clone(&self.session));
        if let Some(path) = &self.config.audit_log_path {
            pipeline = pipeline.with_interceptor(Arc::new(AuditLogInterceptor::new(path)));
        }
        Ok(pipeline.with_interceptor(Arc::new(SlippageGuardInterceptor::new(
            self.config.risk.max_slippage_percent,
        ))))
    }

    pub async fn quote_source(&self) -> Result<HorizonPathQuotes> {
        let network = self.session.lock().await.network();
        HorizonPathQuotes::new(&self.config.endpoints.horizon(network)?, self.timeout())
    }

    /// Execute a request; Ctrl-C cancels a pending Build or Submit
    pub async fn execute(&self, request: SigningRequest) -> Result<SubmitResult> {
        let pipeline = self.pipeline().await?;
        let cancel = CancellationToken::new();

        let on_interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling request");
                on_interrupt.cancel();
            }
        });

        let result = pipeline.execute(request, &cancel).await;
        watcher.abort();
        result
    }

    pub async fn quotes(&self, query: &QuoteQuery) -> Result<Vec<Quote>> {
        let mut book = QuoteBook::new();
        let source = self.quote_source().await?;
        Ok(book.refresh_from(&source, query).await?.to_vec())
    }

    /// Quote, select by source label (first quote if none given), confirm
    /// and execute
    pub async fn swap(
        &self,
        query: &QuoteQuery,
        source_label: Option<&str>,
        slippage: Slippage,
        pin: SecretString,
    ) -> Result<SubmitResult> {
        let mut book = QuoteBook::new();
        let source = self.quote_source().await?;
        book.refresh_from(&source, query).await?;

        let handle = match source_label {
            Some(label) => book.handle_for_source(label).ok_or_else(|| {
                Error::InvalidArgument(format!("No quote from source {}", label))
            })?,
            None => book
                .handles()
                .first()
                .copied()
                .ok_or_else(|| Error::InvalidArgument("No route found".to_string()))?,
        };
        let quote = book.select(handle)?;
        info!(
            source = %quote.source,
            source_amount = %quote.source_amount,
            dest_amount = %quote.dest_amount,
            "Selected quote"
        );

        let request = book.confirm(slippage, pin)?;
        self.execute(request).await
    }
}
