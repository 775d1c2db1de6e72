//! Build → Sign → Submit
//!
//! SECURITY:
//! - The PIN is passed only to `Session::unlock`; Build and Submit never see it
//! - The decrypted seed and keypair live inside `sign` and are dropped there
//! - The session mutex is held from unlock until the signature is attached,
//!   so no `lock()`/`unlock()` can interleave with a signature
//!
//! Build and Submit are network bound and race against a cancellation
//! token. Sign is local and always runs to completion or fails whole.

mod envelope;
mod request;

pub use envelope::{
    DecoratedSignature, EnvelopeDto, SignedEnvelope, SubmitResult, UnsignedEnvelope,
    ENVELOPE_TYPE_TX,
};
pub use request::{IntentKind, IntentParams, SigningRequest};

use crate::interceptors::{InterceptorDecision, RequestContext, RequestInterceptor};
use crate::services::{BuildRequest, NetworkSubmitter, TransactionBuilder};
use crate::session::{SessionStore, SharedSession};
use crate::{Error, Result};
use chrono::Utc;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How often a submission is retried on transport failure
///
/// Only `Error::Submission` is retried, always with the same signed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (0-based), doubling up to the cap
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.min(16)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

pub struct SigningPipeline<B, N, S: SessionStore> {
    builder: B,
    submitter: N,
    session: SharedSession<S>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    retry: RetryPolicy,
}

impl<B, N, S> SigningPipeline<B, N, S>
where
    B: TransactionBuilder,
    N: NetworkSubmitter,
    S: SessionStore,
{
    pub fn new(builder: B, submitter: N, session: SharedSession<S>) -> Self {
        Self {
            builder,
            submitter,
            session,
            interceptors: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Add an interceptor; they run in insertion order
    pub fn with_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn session(&self) -> &SharedSession<S> {
        &self.session
    }

    /// Snapshot of account and network for one request
    async fn context(&self, request: &SigningRequest) -> Result<RequestContext> {
        let session = self.session.lock().await;
        let source_account = session.public_key().ok_or(Error::NoWallet)?;
        Ok(RequestContext::new(request, source_account, session.network()))
    }

    /// Consult interceptors in order until one refuses
    ///
    /// Returns how many were consulted; only those are told the outcome.
    async fn admit(&self, context: &RequestContext) -> (usize, Result<()>) {
        for (i, interceptor) in self.interceptors.iter().enumerate() {
            match interceptor.intercept(context).await {
                Ok(InterceptorDecision::Allow) => {}
                Ok(InterceptorDecision::Block(reason)) => {
                    warn!(request_id = %context.request_id, kind = %context.kind, reason = %reason, "Request blocked");
                    return (i + 1, Err(Error::Blocked(reason)));
                }
                Err(e) => return (i + 1, Err(e)),
            }
        }
        (self.interceptors.len(), Ok(()))
    }

    async fn build_for(&self, context: &RequestContext) -> Result<UnsignedEnvelope> {
        let request = BuildRequest {
            kind: context.kind,
            source_account: context.source_account,
            network_passphrase: context.network.passphrase().to_string(),
            params: context.params.clone(),
        };
        let envelope = self.builder.build_unsigned(&request).await?;
        envelope.validate(context.network, Utc::now())?;
        debug!(
            request_id = %context.request_id,
            expires_at = %envelope.expires_at,
            "Unsigned envelope received"
        );
        Ok(envelope)
    }

    /// Phase 1: the external builder
    ///
    /// Interceptors are not consulted here; they see a request only when it
    /// runs through `execute`, which also reports its outcome.
    ///
    /// # Errors
    /// The builder's own error, or `Error::StaleEnvelope` if the envelope is
    /// expired or for another network.
    pub async fn build(&self, request: &SigningRequest) -> Result<UnsignedEnvelope> {
        let context = self.context(request).await?;
        self.build_for(&context).await
    }

    /// Phase 2: unlock with `pin`, sign, drop the key
    ///
    /// # Errors
    /// `Error::StaleEnvelope` if the envelope no longer matches the session
    /// or has expired, `Error::Authentication` for a wrong PIN. Either way
    /// the envelope is consumed.
    pub async fn sign(&self, envelope: UnsignedEnvelope, pin: &SecretString) -> Result<SignedEnvelope> {
        let mut session = self.session.lock().await;
        envelope.validate(session.network(), Utc::now())?;

        let secret = session.unlock(pin).await?;
        let keypair = secret.keypair()?;
        drop(secret);
        let signed = envelope.sign(&keypair);
        drop(keypair);
        drop(session);

        info!(tx_hash = %signed.hash_hex(), "Transaction signed");
        Ok(signed)
    }

    /// Phase 3: a single submission attempt
    pub async fn submit(&self, envelope: &SignedEnvelope) -> Result<SubmitResult> {
        let result = self.submitter.submit(envelope).await?;
        info!(
            tx_hash = %result.hash,
            ledger = ?result.ledger,
            successful = result.successful,
            "Transaction submitted"
        );
        Ok(result)
    }

    /// Submit, retrying transport failures with the same signed bytes
    pub async fn submit_with_retry(&self, envelope: &SignedEnvelope) -> Result<SubmitResult> {
        let mut retry = 0;
        loop {
            match self.submit(envelope).await {
                Err(e) if e.is_retriable() && retry + 1 < self.retry.max_attempts => {
                    let delay = self.retry.backoff(retry);
                    warn!(
                        tx_hash = %envelope.hash_hex(),
                        attempt = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Submission failed, resubmitting same envelope"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                other => return other,
            }
        }
    }

    /// Run interceptors, then all three phases
    ///
    /// Cancelling `cancel` aborts a pending Build or Submit with
    /// `Error::Cancelled`; a signature already in progress completes first.
    /// Every interceptor that was consulted is told the outcome.
    pub async fn execute(
        &self,
        request: SigningRequest,
        cancel: &CancellationToken,
    ) -> Result<SubmitResult> {
        let started = Instant::now();
        let context = self.context(&request).await?;
        info!(request_id = %request.id, kind = %request.kind, "Executing signing request");

        let (consulted, admitted) = self.admit(&context).await;
        let result = match admitted {
            Ok(()) => self.run(&request, &context, cancel).await,
            Err(e) => Err(e),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        for interceptor in &self.interceptors[..consulted] {
            interceptor.on_complete(&context, &result, duration_ms).await;
        }
        if let Err(e) = &result {
            warn!(request_id = %request.id, error = %e, "Signing request failed");
        }
        result
    }

    async fn run(
        &self,
        request: &SigningRequest,
        context: &RequestContext,
        cancel: &CancellationToken,
    ) -> Result<SubmitResult> {
        let unsigned = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            built = self.build_for(context) => built?,
        };

        let signed = self.sign(unsigned, &request.pin).await?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            submitted = self.submit_with_retry(&signed) => submitted,
        }
    }
}
