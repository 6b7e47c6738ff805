//! Throttled, retrying client around one [`LlmAdapter`].
//!
//! Every call first claims a slot from the shared [`Throttle`], then makes a
//! single adapter call. Rate-limit and transient failures back off
//! exponentially and try again until `max_attempts`; rejected requests stop
//! at once. Whatever is left after that is surfaced as
//! [`SummarizerError::Terminal`].

use crate::llm_adapter::{LlmAdapter, SummaryRequest, SummaryResponse};
use crate::throttle::Throttle;
use crate::types::SummarizerError;
use async_trait::async_trait;
use rand::{rng, Rng};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Where backoff delays are spent. Tests swap in a recorder.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound of the random extra added to each delay.
    pub jitter: Duration,
    /// Per-call ceiling; an adapter call running longer counts as transient.
    pub call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(60),
            jitter: Duration::from_secs(1),
            call_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn without_jitter(mut self) -> Self {
        self.jitter = Duration::ZERO;
        self
    }

    /// Delay before retry number `retry` (1-based), capped and jittered.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1u32 << exponent).min(self.max_delay);
        if self.jitter.is_zero() {
            return delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=self.jitter.as_millis() as u64);
        delay + Duration::from_millis(jitter_ms)
    }
}

pub struct RateLimitedSummarizer {
    adapter: Arc<dyn LlmAdapter>,
    throttle: Arc<Throttle>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for RateLimitedSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedSummarizer")
            .field("adapter", &self.adapter.adapter_name())
            .field("throttle", &self.throttle)
            .field("policy", &self.policy)
            .finish()
    }
}

impl RateLimitedSummarizer {
    pub fn new(adapter: Arc<dyn LlmAdapter>, throttle: Arc<Throttle>, policy: RetryPolicy) -> Self {
        Self {
            adapter,
            throttle,
            policy,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub async fn summarize(&self, request: &SummaryRequest) -> Result<SummaryResponse, SummarizerError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let waited = self.throttle.acquire().await;
            if !waited.is_zero() {
                debug!(attempt, waited_ms = waited.as_millis() as u64, "Throttle delayed summarizer call");
            }

            let attempt_t0 = Instant::now();
            let outcome = match tokio::time::timeout(self.policy.call_timeout, self.adapter.summarize(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(SummarizerError::Transient(format!(
                    "call timed out after {}s",
                    self.policy.call_timeout.as_secs()
                ))),
            };

            let e = match outcome {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !e.is_retryable() {
                warn!(attempt, error = %e, "Summarizer rejected request; not retrying");
                return Err(SummarizerError::Terminal {
                    attempts: attempt,
                    reason: e.to_string(),
                });
            }

            if attempt >= max_attempts {
                error!(
                    attempt,
                    max = max_attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %e,
                    "Summarizer exhausted retries"
                );
                return Err(SummarizerError::Terminal {
                    attempts: attempt,
                    reason: e.to_string(),
                });
            }

            let mut delay = self.policy.delay_for(attempt);
            if let SummarizerError::RateLimited { retry_after: Some(hint) } = &e {
                delay = delay.max(*hint);
            }

            warn!(
                attempt,
                max = max_attempts,
                elapsed_ms_attempt = attempt_t0.elapsed().as_millis() as u64,
                elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                ?delay,
                error = %e,
                "Summarizer attempt failed; backing off"
            );
            self.sleeper.sleep(delay).await;
        }
    }
}
