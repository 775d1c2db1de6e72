//! Horizon clients: transaction submission and strict-send path quotes

use super::{http_client, NetworkSubmitter, QuoteSource};
use crate::assets::AssetRef;
use crate::pipeline::{SignedEnvelope, SubmitResult};
use crate::quotes::{Quote, QuoteQuery};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// `POST /transactions` client
#[derive(Debug, Clone)]
pub struct HorizonSubmitter {
    client: reqwest::Client,
    endpoint: Url,
}

impl HorizonSubmitter {
    pub fn new(horizon: &Url, timeout: Duration) -> Result<Self> {
        let endpoint = horizon
            .join("transactions")
            .map_err(|e| Error::Config(format!("Invalid Horizon URL: {}", e)))?;
        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
        })
    }
}

/// Horizon problem document
#[derive(Debug, Deserialize)]
struct Problem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Deserialize)]
struct ProblemExtras {
    #[serde(default)]
    result_codes: Option<Value>,
}

fn rejection(body: &str) -> Error {
    match serde_json::from_str::<Problem>(body) {
        Ok(problem) => {
            let reason = match (problem.title, problem.detail) {
                (Some(title), Some(detail)) => format!("{}: {}", title, detail),
                (Some(title), None) => title,
                (None, Some(detail)) => detail,
                (None, None) => "Transaction Failed".to_string(),
            };
            Error::TransactionRejected {
                reason,
                result_codes: problem.extras.and_then(|e| e.result_codes),
            }
        }
        Err(_) => Error::TransactionRejected {
            reason: body.trim().to_string(),
            result_codes: None,
        },
    }
}

#[async_trait]
impl NetworkSubmitter for HorizonSubmitter {
    async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResult> {
        let tx_hash = envelope.hash_hex();
        tracing::debug!(tx_hash = %tx_hash, "Submitting transaction");

        let response = self
            .client
            .post(self.endpoint.clone())
            .form(&[("tx", envelope.to_base64())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Submission(format!("timed out submitting {}", tx_hash))
                } else {
                    Error::Submission(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Submission(format!("Failed to read response: {}", e)))?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| Error::Submission(format!("Unexpected response: {}", e)));
        }
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(rejection(&body));
        }
        Err(Error::Submission(format!("HTTP {}: {}", status.as_u16(), body.trim())))
    }
}

/// Strict-send path finding on Horizon as a quote source
#[derive(Debug, Clone)]
pub struct HorizonPathQuotes {
    client: reqwest::Client,
    endpoint: Url,
}

impl HorizonPathQuotes {
    pub fn new(horizon: &Url, timeout: Duration) -> Result<Self> {
        let endpoint = horizon
            .join("paths/strict-send")
            .map_err(|e| Error::Config(format!("Invalid Horizon URL: {}", e)))?;
        Ok(Self {
            client: http_client(timeout)?,
            endpoint,
        })
    }
}

#[derive(Debug, Deserialize)]
struct PathPage {
    #[serde(rename = "_embedded")]
    embedded: PathRecords,
}

#[derive(Debug, Deserialize)]
struct PathRecords {
    records: Vec<PathRecord>,
}

#[derive(Debug, Deserialize)]
struct PathRecord {
    source_asset_type: String,
    source_asset_code: Option<String>,
    source_asset_issuer: Option<String>,
    source_amount: String,
    destination_asset_type: String,
    destination_asset_code: Option<String>,
    destination_asset_issuer: Option<String>,
    destination_amount: String,
    #[serde(default)]
    path: Vec<HorizonAsset>,
}

#[derive(Debug, Deserialize)]
struct HorizonAsset {
    asset_type: String,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
}

fn asset(kind: &str, code: Option<&str>, issuer: Option<&str>) -> Result<AssetRef> {
    if kind == "native" {
        return Ok(AssetRef::Native);
    }
    match (code, issuer) {
        (Some(code), Some(issuer)) => AssetRef::credit(code, issuer.parse()?),
        _ => Err(Error::InvalidArgument(format!(
            "Credit asset of type {} without code or issuer",
            kind
        ))),
    }
}

fn quotes_from_page(page: PathPage) -> Result<Vec<Quote>> {
    page.embedded
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let path = record
                .path
                .iter()
                .map(|a| asset(&a.asset_type, a.asset_code.as_deref(), a.asset_issuer.as_deref()))
                .collect::<Result<Vec<_>>>()?;
            let rate = Quote::implied_rate(&record.source_amount, &record.destination_amount)?;
            Ok(Quote {
                source: format!("horizon-{}", index),
                source_asset: asset(
                    &record.source_asset_type,
                    record.source_asset_code.as_deref(),
                    record.source_asset_issuer.as_deref(),
                )?,
                dest_asset: asset(
                    &record.destination_asset_type,
                    record.destination_asset_code.as_deref(),
                    record.destination_asset_issuer.as_deref(),
                )?,
                source_amount: record.source_amount,
                dest_amount: record.destination_amount,
                path,
                price_impact: None,
                fee: None,
                rate,
            })
        })
        .collect()
}

#[async_trait]
impl QuoteSource for HorizonPathQuotes {
    async fn quotes(&self, query: &QuoteQuery) -> Result<Vec<Quote>> {
        let mut params = query.source_asset.query_pairs("source");
        params.push(("source_amount".to_string(), query.source_amount.clone()));
        params.push(("destination_assets".to_string(), query.dest_asset.to_string()));

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Submission(format!("Path query failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Submission(format!("HTTP {}: {}", status.as_u16(), body.trim())));
        }

        let page: PathPage = response
            .json()
            .await
            .map_err(|e| Error::Submission(format!("Failed to parse paths: {}", e)))?;
        let quotes = quotes_from_page(page)?;
        tracing::debug!(count = quotes.len(), "Received path quotes");
        Ok(quotes)
    }
}
