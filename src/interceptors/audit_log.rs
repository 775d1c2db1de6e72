//! Audit log interceptor
//!
//! Appends one JSON line when a request starts and one when it finishes.
//! Entries identify the request and its outcome; parameters are not
//! recorded and the PIN never reaches an interceptor.

use super::{InterceptorDecision, RequestContext, RequestInterceptor};
use crate::pipeline::{IntentKind, SubmitResult};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct AuditEntry {
    timestamp: DateTime<Utc>,
    entry_type: &'static str,
    request_id: Uuid,
    kind: IntentKind,
    source_account: String,
    network: &'static str,
    tx_hash: Option<String>,
    ledger: Option<u32>,
    error: Option<String>,
    duration_ms: u64,
    status: &'static str,
}

impl AuditEntry {
    fn new(context: &RequestContext, entry_type: &'static str, status: &'static str) -> Self {
        Self {
            timestamp: Utc::now(),
            entry_type,
            request_id: context.request_id,
            kind: context.kind,
            source_account: context.source_account.to_string(),
            network: context.network.name(),
            tx_hash: None,
            ledger: None,
            error: None,
            duration_ms: 0,
            status,
        }
    }
}

struct AuditLogWriter {
    path: PathBuf,
}

impl AuditLogWriter {
    fn write(&self, entry: &AuditEntry) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?;
        Ok(())
    }
}

/// Interceptor that records every request to a JSONL file
pub struct AuditLogInterceptor {
    writer: Arc<Mutex<AuditLogWriter>>,
}

impl AuditLogInterceptor {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(AuditLogWriter {
                path: log_path.into(),
            })),
        }
    }

    async fn append(&self, entry: &AuditEntry) {
        let writer = self.writer.lock().await;
        if let Err(e) = writer.write(entry) {
            tracing::warn!(error = %e, path = %writer.path.display(), "Failed to write audit log entry");
        }
    }
}

fn status_of(result: &Result<SubmitResult>) -> &'static str {
    match result {
        Ok(r) if r.successful => "success",
        Ok(_) => "failed",
        Err(Error::Blocked(_)) => "blocked",
        Err(Error::Cancelled) => "cancelled",
        Err(_) => "error",
    }
}

#[async_trait]
impl RequestInterceptor for AuditLogInterceptor {
    async fn intercept(&self, context: &RequestContext) -> Result<InterceptorDecision> {
        self.append(&AuditEntry::new(context, "request_start", "pending"))
            .await;

        // Audit logging never blocks
        Ok(InterceptorDecision::Allow)
    }

    async fn on_complete(
        &self,
        context: &RequestContext,
        result: &Result<SubmitResult>,
        duration_ms: u64,
    ) {
        let mut entry = AuditEntry::new(context, "request_complete", status_of(result));
        entry.duration_ms = duration_ms;
        match result {
            Ok(r) => {
                entry.tx_hash = Some(r.hash.clone());
                entry.ledger = r.ledger;
            }
            Err(e) => entry.error = Some(e.to_string()),
        }
        self.append(&entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::wallet::Keypair;
    use serde_json::{json, Value};
    use tempfile::NamedTempFile;

    fn context() -> RequestContext {
        RequestContext {
            request_id: Uuid::new_v4(),
            kind: IntentKind::Payment,
            params: json!({ "amount": "12.5", "memo": "rent" })
                .as_object()
                .cloned()
                .unwrap(),
            source_account: Keypair::generate().unwrap().public_key(),
            network: Network::Testnet,
        }
    }

    fn entries(file: &NamedTempFile) -> Vec<Value> {
        std::fs::read_to_string(file.path())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_logs_request_lifecycle() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());
        let context = context();

        let decision = interceptor.intercept(&context).await.unwrap();
        assert_eq!(decision, InterceptorDecision::Allow);

        let result = Ok(SubmitResult {
            hash: "abc123".to_string(),
            ledger: Some(7),
            successful: true,
        });
        interceptor.on_complete(&context, &result, 150).await;

        let entries = entries(&temp_file);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["entry_type"], "request_start");
        assert_eq!(entries[0]["status"], "pending");
        assert_eq!(entries[1]["status"], "success");
        assert_eq!(entries[1]["tx_hash"], "abc123");
        assert_eq!(entries[1]["duration_ms"], 150);
        assert_eq!(entries[1]["request_id"], context.request_id.to_string());
    }

    #[tokio::test]
    async fn test_does_not_record_params() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());
        let context = context();

        interceptor.intercept(&context).await.unwrap();
        interceptor
            .on_complete(&context, &Err(Error::Authentication), 3)
            .await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(!content.contains("rent"));
        assert!(!content.contains("12.5"));
        assert_eq!(entries(&temp_file)[1]["status"], "error");
    }

    #[tokio::test]
    async fn test_blocked_status() {
        let temp_file = NamedTempFile::new().unwrap();
        let interceptor = AuditLogInterceptor::new(temp_file.path());
        interceptor
            .on_complete(&context(), &Err(Error::Blocked("too much".to_string())), 0)
            .await;
        assert_eq!(entries(&temp_file)[0]["status"], "blocked");
    }
}
