use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{BalanceSource, SwapService};
use crate::error::{ExecutionError, SwapError};
use crate::models::{Asset, FillResult, TradeIntent};

/// Bounded exponential backoff applied to rate-limited external calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay after the given zero-based attempt index: base × 2^attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Reliability wrapper around trade submission.
///
/// Responsibilities, in order: the at-most-one-trade gate, the
/// insufficient-balance pre-check, retrying rate-limited calls with
/// exponential backoff, and verifying the fill by balance delta after a
/// fixed settlement delay.
pub struct ExecutionGateway<S, B> {
    swap: S,
    balances: B,
    retry: RetryPolicy,
    settlement_delay: Duration,
    in_flight: Arc<AtomicBool>,
}

impl<S: SwapService, B: BalanceSource> ExecutionGateway<S, B> {
    pub fn new(swap: S, balances: B, retry: RetryPolicy, settlement_delay: Duration) -> Self {
        Self {
            swap,
            balances,
            retry,
            settlement_delay,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process-wide gate; while set, the orchestrator must not evaluate
    /// or dispatch new decisions.
    pub fn in_flight_handle(&self) -> Arc<AtomicBool> {
        self.in_flight.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submit a trade and verify the fill.
    ///
    /// A non-positive fill is reported via `FillResult`, not as an
    /// error: the position change the caller already applied is left
    /// standing either way (see DESIGN.md on the reconciliation gap).
    pub async fn execute(&self, intent: &TradeIntent) -> Result<FillResult, ExecutionError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(ExecutionError::TradeInFlight);
        }

        let result = self.execute_inner(intent).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn execute_inner(&self, intent: &TradeIntent) -> Result<FillResult, ExecutionError> {
        let acquired = intent.acquired_asset();
        let disposed = intent.disposed_asset();

        let available = self.fetch_balance(disposed).await?;
        if available < intent.amount {
            return Err(ExecutionError::InsufficientBalance {
                asset: disposed,
                available,
                required: intent.amount,
            });
        }

        let before = self.fetch_balance(acquired).await?;

        self.submit_with_retry(intent).await?;

        // No synchronous fill confirmation from the execution service;
        // wait out settlement, then compare balances.
        tokio::time::sleep(self.settlement_delay).await;

        let after = self.fetch_balance(acquired).await?;
        let fill = FillResult::from_balances(before, after);

        if fill.success {
            tracing::info!(
                side = ?intent.side,
                filled = fill.filled_amount,
                asset = %acquired,
                "fill verified by balance delta"
            );
        } else {
            tracing::warn!(
                side = ?intent.side,
                balance_before = before,
                balance_after = after,
                "no balance increase after settlement delay, treating trade as unfilled"
            );
        }

        Ok(fill)
    }

    async fn submit_with_retry(&self, intent: &TradeIntent) -> Result<(), ExecutionError> {
        self.retry_rate_limited("swap submission", || self.swap.submit(intent))
            .await
            .map_err(|e| match e {
                RetryError::Terminal(msg) => ExecutionError::Submission(msg),
                RetryError::Exhausted => ExecutionError::MaxRetriesExceeded {
                    attempts: self.retry.max_attempts,
                },
            })
    }

    /// Balance reads go through the same backoff as submissions; the RPC
    /// node rate-limits them just the same.
    async fn fetch_balance(&self, asset: Asset) -> Result<f64, ExecutionError> {
        self.retry_rate_limited("balance fetch", || self.balances.balance(asset))
            .await
            .map_err(|e| match e {
                RetryError::Terminal(msg) => ExecutionError::Balance(msg),
                RetryError::Exhausted => ExecutionError::MaxRetriesExceeded {
                    attempts: self.retry.max_attempts,
                },
            })
    }

    /// One bounded-backoff loop for every external call. Only rate
    /// limits are retried; anything else is terminal on the first hit.
    async fn retry_rate_limited<T, Fut>(
        &self,
        what: &'static str,
        mut call: impl FnMut() -> Fut,
    ) -> Result<T, RetryError>
    where
        Fut: Future<Output = Result<T, SwapError>>,
    {
        for attempt in 0..self.retry.max_attempts {
            match call().await {
                Ok(value) => return Ok(value),
                Err(SwapError::RateLimited(msg)) => {
                    if attempt + 1 == self.retry.max_attempts {
                        break;
                    }
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        what,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        %msg,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(SwapError::Other(msg)) => return Err(RetryError::Terminal(msg)),
            }
        }
        Err(RetryError::Exhausted)
    }
}

enum RetryError {
    Terminal(String),
    Exhausted,
}
