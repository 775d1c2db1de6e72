//! Slippage guard interceptor
//!
//! Blocks swaps whose requested slippage exceeds the configured maximum.

use super::{InterceptorDecision, RequestContext, RequestInterceptor};
use crate::pipeline::{IntentKind, SubmitResult};
use crate::quotes::Slippage;
use crate::Result;
use async_trait::async_trait;

pub struct SlippageGuardInterceptor {
    /// e.g. 1.0 for 1%
    max_slippage_percent: f64,
}

impl SlippageGuardInterceptor {
    pub fn new(max_slippage_percent: f64) -> Self {
        Self {
            max_slippage_percent,
        }
    }
}

#[async_trait]
impl RequestInterceptor for SlippageGuardInterceptor {
    async fn intercept(&self, context: &RequestContext) -> Result<InterceptorDecision> {
        if context.kind != IntentKind::Swap {
            return Ok(InterceptorDecision::Allow);
        }

        let slippage = context
            .params
            .get("slippage_percent")
            .and_then(|v| v.as_f64())
            .unwrap_or_else(|| Slippage::default().as_percent());

        if slippage > self.max_slippage_percent {
            return Ok(InterceptorDecision::Block(format!(
                "Requested slippage {:.2}% exceeds maximum allowed {:.2}%",
                slippage, self.max_slippage_percent
            )));
        }

        tracing::debug!(
            requested_slippage = slippage,
            max_slippage = self.max_slippage_percent,
            "Slippage check passed"
        );

        Ok(InterceptorDecision::Allow)
    }

    async fn on_complete(
        &self,
        _context: &RequestContext,
        _result: &Result<SubmitResult>,
        _duration_ms: u64,
    ) {
    }
}
