//! External collaborators
//!
//! The wallet core owns no wire protocol. Building transactions, submitting
//! them and pricing swaps are delegated through these traits; the HTTP
//! implementations talk to a transaction-builder service and to Horizon.

mod builder;
mod horizon;

pub use builder::HttpTransactionBuilder;
pub use horizon::{HorizonPathQuotes, HorizonSubmitter};

use crate::pipeline::{IntentKind, IntentParams, SignedEnvelope, SubmitResult, UnsignedEnvelope};
use crate::quotes::{Quote, QuoteQuery};
use crate::wallet::PublicKey;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Body sent to the transaction builder; carries no secret
#[derive(Debug, Clone, Serialize)]
pub struct BuildRequest {
    pub kind: IntentKind,
    pub source_account: PublicKey,
    pub network_passphrase: String,
    pub params: IntentParams,
}

/// Turns a semantic request into an unsigned envelope
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    /// # Errors
    /// Builder failures are returned as `Error::Builder` with the
    /// collaborator's own message.
    async fn build_unsigned(&self, request: &BuildRequest) -> Result<UnsignedEnvelope>;
}

/// Transmits signed envelopes to the network
#[async_trait]
pub trait NetworkSubmitter: Send + Sync {
    /// # Errors
    /// `Error::Submission` for transport failures (retriable with the same
    /// envelope), `Error::TransactionRejected` when the network refuses it.
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResult>;
}

/// Produces ordered swap alternatives
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quotes(&self, query: &QuoteQuery) -> Result<Vec<Quote>>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vault-wallet/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

#[cfg(test)]
pub(crate) mod test_server {
    //! One-shot HTTP responder for exercising the reqwest clients

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use url::Url;

    /// Raw request as received
    pub(crate) struct Captured {
        pub head: String,
        pub body: String,
    }

    /// Serve one response; returns the base URL and the captured request
    pub(crate) async fn serve_once(
        status: u16,
        body: &'static str,
    ) -> (Url, oneshot::Receiver<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let (head_end, content_length) = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    break (pos + 4, length);
                }
                if n == 0 {
                    break (buf.len(), 0);
                }
            };
            while buf.len() < head_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            let _ = tx.send(Captured {
                head: String::from_utf8_lossy(&buf[..head_end]).to_string(),
                body: String::from_utf8_lossy(&buf[head_end..]).to_string(),
            });
        });

        (Url::parse(&format!("http://{}/", addr)).unwrap(), rx)
    }

    /// Accept and never answer
    pub(crate) async fn serve_silent() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        });
        Url::parse(&format!("http://{}/", addr)).unwrap()
    }
}
