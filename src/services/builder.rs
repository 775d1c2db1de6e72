//! HTTP transaction-builder client

use super::{http_client, BuildRequest, TransactionBuilder};
use crate::pipeline::{EnvelopeDto, UnsignedEnvelope};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Client for a builder exposing `POST /build`
#[derive(Debug, Clone)]
pub struct HttpTransactionBuilder {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransactionBuilder {
    pub fn new(base: &Url, timeout: Duration) -> Result<Self> {
        let endpoint = base
            .join("build")
            .map_err(|e| Error::Config(format!("Invalid builder URL: {}", e)))?;
        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
        })
    }
}

#[async_trait]
impl TransactionBuilder for HttpTransactionBuilder {
    async fn build_unsigned(&self, request: &BuildRequest) -> Result<UnsignedEnvelope> {
        tracing::debug!(kind = %request.kind, endpoint = %self.endpoint, "Requesting unsigned envelope");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Builder(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.to_string()
            } else {
                body
            };
            return Err(Error::Builder(message));
        }

        let dto: EnvelopeDto = response
            .json()
            .await
            .map_err(|e| Error::Builder(format!("Failed to parse response: {}", e)))?;
        UnsignedEnvelope::try_from(dto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::pipeline::IntentKind;
    use crate::services::test_server::serve_once;
    use crate::wallet::Keypair;
    use serde_json::Map;

    fn request() -> BuildRequest {
        BuildRequest {
            kind: IntentKind::Payment,
            source_account: Keypair::generate().unwrap().public_key(),
            network_passphrase: Network::Testnet.passphrase().to_string(),
            params: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_parses_envelope() {
        let (base, captured) = serve_once(
            200,
            r#"{"payload":"dHg=","network_id":"Test SDF Network ; September 2015","expires_at":"2030-01-01T00:00:00Z"}"#,
        )
        .await;
        let builder = HttpTransactionBuilder::new(&base, Duration::from_secs(5)).unwrap();

        let envelope = builder.build_unsigned(&request()).await.unwrap();
        assert_eq!(envelope.payload, b"tx");
        assert_eq!(envelope.network_id, Network::Testnet.passphrase());

        let captured = captured.await.unwrap();
        assert!(captured.head.starts_with("POST /build"));
        assert!(captured.body.contains("\"kind\":\"payment\""));
        assert!(captured.body.contains("source_account"));
    }

    #[tokio::test]
    async fn test_surfaces_builder_message() {
        let (base, _) = serve_once(422, r#"{"error":"insufficient balance"}"#).await;
        let builder = HttpTransactionBuilder::new(&base, Duration::from_secs(5)).unwrap();

        match builder.build_unsigned(&request()).await {
            Err(Error::Builder(message)) => assert!(message.contains("insufficient balance")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
