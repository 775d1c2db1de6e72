//! Risk and audit interceptors
//!
//! Every signing request passes through the configured interceptors before
//! the Build phase. Any interceptor may block the request; all of them are
//! told the outcome once the pipeline finishes.

mod audit_log;
mod slippage_guard;

pub use audit_log::AuditLogInterceptor;
pub use slippage_guard::SlippageGuardInterceptor;

use crate::config::Network;
use crate::pipeline::{IntentKind, IntentParams, SigningRequest, SubmitResult};
use crate::wallet::PublicKey;
use crate::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// What an interceptor sees of a request; never the PIN
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub kind: IntentKind,
    pub params: IntentParams,
    pub source_account: PublicKey,
    pub network: Network,
}

impl RequestContext {
    pub fn new(request: &SigningRequest, source_account: PublicKey, network: Network) -> Self {
        Self {
            request_id: request.id,
            kind: request.kind,
            params: request.params.clone(),
            source_account,
            network,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterceptorDecision {
    Allow,
    Block(String),
}

#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    /// Runs before Build
    async fn intercept(&self, context: &RequestContext) -> Result<InterceptorDecision>;

    /// Runs once the request has finished, successfully or not; skipped for
    /// interceptors whose `intercept` never ran because an earlier one blocked
    async fn on_complete(
        &self,
        context: &RequestContext,
        result: &Result<SubmitResult>,
        duration_ms: u64,
    );
}
