use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::classifier::{classify, Classification};
use crate::errors::{TraderError, TraderResult, ValidationError};
use crate::metrics::Metrics;

/// Extra matcher that marks a network failure retryable
#[derive(Debug, Clone)]
pub enum RetryPredicate {
    /// Retry when the failure carries this status code
    Status(u16),
    /// Retry when the message contains this substring (case-insensitive)
    MessageContains(String),
    /// Retry when the message matches this pattern
    Pattern(Regex),
}

impl RetryPredicate {
    fn matches(&self, error: &TraderError) -> bool {
        match self {
            RetryPredicate::Status(code) => error.status() == Some(*code),
            RetryPredicate::MessageContains(needle) => error
                .message()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            RetryPredicate::Pattern(re) => re.is_match(&error.message()),
        }
    }
}

/// Backoff configuration. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    factor: f64,
    jitter: bool,
    predicates: Vec<RetryPredicate>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            factor: 2.0,
            jitter: true,
            predicates: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// Create a validated policy
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        factor: f64,
        jitter: bool,
    ) -> TraderResult<Self> {
        let policy = Self {
            max_attempts,
            initial_delay,
            max_delay,
            factor,
            jitter,
            predicates: Vec::new(),
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Add a retry predicate
    pub fn with_predicate(mut self, predicate: RetryPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Disable jitter (deterministic delays)
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }

    fn validate(&self) -> TraderResult<()> {
        let reason = if self.max_attempts < 1 {
            Some("max_attempts must be >= 1".to_string())
        } else if self.initial_delay.is_zero() {
            Some("initial_delay must be > 0".to_string())
        } else if self.max_delay < self.initial_delay {
            Some(format!(
                "max_delay ({}ms) must be >= initial_delay ({}ms)",
                self.max_delay.as_millis(),
                self.initial_delay.as_millis()
            ))
        } else if !self.factor.is_finite() || self.factor <= 1.0 {
            Some(format!("factor must be > 1, got {}", self.factor))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ValidationError::InvalidPolicy(reason).into()),
            None => Ok(()),
        }
    }

    /// Apply overrides on top of this policy, re-validating the result
    pub fn merged(&self, overrides: &PolicyOverrides) -> TraderResult<Self> {
        let mut policy = self.clone();
        if let Some(n) = overrides.max_attempts {
            policy.max_attempts = n;
        }
        if let Some(ms) = overrides.initial_delay_ms {
            policy.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.max_delay_ms {
            policy.max_delay = Duration::from_millis(ms);
        }
        if let Some(f) = overrides.factor {
            policy.factor = f;
        }
        if let Some(j) = overrides.jitter {
            policy.jitter = j;
        }
        for code in &overrides.retry_on_status {
            policy.predicates.push(RetryPredicate::Status(*code));
        }
        for needle in &overrides.retry_on_messages {
            policy
                .predicates
                .push(RetryPredicate::MessageContains(needle.clone()));
        }
        policy.validate()?;
        Ok(policy)
    }

    /// Whether `error` should be retried under this policy.
    ///
    /// Predicates only widen the retryable set for network-kind failures.
    pub fn is_retryable(&self, error: &TraderError) -> bool {
        if classify(error) == Classification::Retryable {
            return true;
        }
        matches!(error, TraderError::Api { .. } | TraderError::Rpc { .. })
            && self.predicates.iter().any(|p| p.matches(error))
    }

    /// Next backoff step
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Actual sleep for one attempt; jitter is drawn fresh on each call
    fn sleep_for(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let scale = rand::thread_rng().gen_range(0.5..1.5);
        Duration::try_from_secs_f64(delay.as_secs_f64() * scale).unwrap_or(delay)
    }
}

/// Caller-supplied partial policy, merged onto a base [`RetryPolicy`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverrides {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub initial_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    #[serde(default)]
    pub factor: Option<f64>,
    #[serde(default)]
    pub jitter: Option<bool>,
    #[serde(default)]
    pub retry_on_status: Vec<u16>,
    #[serde(default)]
    pub retry_on_messages: Vec<String>,
}

impl PolicyOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Bounded exponential backoff around a fallible async operation.
///
/// Holds only an immutable default policy; each call owns its own attempt
/// counter and delay, so one executor can be shared by concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Executor using this executor's policy with `overrides` applied
    pub fn with_overrides(&self, overrides: &PolicyOverrides) -> TraderResult<Self> {
        Ok(Self {
            policy: self.policy.merged(overrides)?,
            metrics: self.metrics.clone(),
        })
    }

    /// Run `operation` under the default policy
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, operation: F) -> TraderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TraderResult<T>>,
    {
        self.execute_with(operation_name, &self.policy, operation)
            .await
    }

    /// Run `operation` under an explicit policy.
    ///
    /// Fatal failures propagate unchanged with no delay. Retryable failures
    /// back off and retry; once `max_attempts` calls have failed the last
    /// failure is re-expressed as [`TraderError::Retry`].
    pub async fn execute_with<F, Fut, T>(
        &self,
        operation_name: &str,
        policy: &RetryPolicy,
        mut operation: F,
    ) -> TraderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TraderResult<T>>,
    {
        let start_time = Instant::now();
        let mut delay = policy.initial_delay;
        let mut attempt: u32 = 1;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(
                            operation = operation_name,
                            attempts = attempt,
                            duration_ms = start_time.elapsed().as_millis() as u64,
                            "Operation succeeded after retry"
                        );
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !policy.is_retryable(&err) {
                        warn!(
                            operation = operation_name,
                            attempt,
                            category = err.category(),
                            error = %err,
                            "Permanent error, not retrying"
                        );
                        return Err(err);
                    }

                    if attempt >= policy.max_attempts {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %err,
                            "All retry attempts exhausted"
                        );
                        return Err(TraderError::Retry {
                            attempts: attempt,
                            last_message: err.message(),
                        });
                    }

                    let backoff = policy.sleep_for(delay);
                    debug!(
                        operation = operation_name,
                        attempt,
                        max_attempts = policy.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient error, backing off before retry"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.retries_total.inc();
                    }
                    sleep(backoff).await;

                    delay = policy.next_delay(delay);
                    attempt += 1;
                }
            }
        }
    }
}
