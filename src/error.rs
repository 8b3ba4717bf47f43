use crate::models::Asset;
use thiserror::Error;

/// Problems loading configuration at startup. All of these are fatal;
/// the process refuses to start without its credentials and endpoints.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    InvalidVar { var: &'static str, value: String },
}

/// Failure of a single call into an external service (RPC node or swap
/// execution service). The gateway only retries the rate-limited kind.
#[derive(Debug, Error)]
pub enum SwapError {
    /// Transient rejection due to request volume.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Anything else; propagated immediately without retry.
    #[error("{0}")]
    Other(String),
}

impl SwapError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SwapError::RateLimited(_))
    }
}

/// Errors surfaced by the execution gateway. Each one is fatal to the
/// current trade attempt only; the orchestrator logs it and carries on
/// with the next cycle.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("another trade is already in flight")]
    TradeInFlight,

    #[error("insufficient {asset} balance: available {available:.6}, required {required:.6}")]
    InsufficientBalance {
        asset: Asset,
        available: f64,
        required: f64,
    },

    #[error("rate limited on every attempt ({attempts} tries)")]
    MaxRetriesExceeded { attempts: u32 },

    #[error("swap submission failed: {0}")]
    Submission(String),

    #[error("balance fetch failed: {0}")]
    Balance(String),
}
