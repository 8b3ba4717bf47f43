pub mod coinbase;
pub mod solana;
pub mod swap;
pub mod synthetic;

pub use coinbase::CoinbaseFeed;
pub use solana::SolanaRpcClient;
pub use swap::SwapExecutionClient;
pub use synthetic::SyntheticFeed;

use async_trait::async_trait;

/// One-shot tick source: each call opens a subscription, waits for the
/// first valid price and tears the transport down again. No connection
/// is reused between calls.
#[async_trait]
pub trait PriceFeed {
    /// Next price, or None when no valid tick could be obtained
    /// (malformed payload, non-positive price, transport failure). The
    /// caller polls again next cycle; there is no internal retry.
    async fn next_tick(&self) -> Option<f64>;
}

/// Gas-fee estimate in quote currency (USD). Failures degrade to 0.0,
/// never to an error — the fee is reporting detail, not a decision
/// input.
#[async_trait]
pub trait FeeOracle {
    async fn estimate_fee(&self) -> f64;
}
