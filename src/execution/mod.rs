pub mod gateway;
pub mod price_window;

pub use gateway::{ExecutionGateway, RetryPolicy};
pub use price_window::PriceWindow;

use crate::error::SwapError;
use crate::models::{Asset, TradeIntent};
use async_trait::async_trait;

/// Broadcast-only swap submission. The service constructs, signs and
/// sends the transaction; there is no synchronous fill confirmation, so
/// the gateway verifies fills by balance delta afterwards.
#[async_trait]
pub trait SwapService: Send + Sync {
    async fn submit(&self, intent: &TradeIntent) -> Result<(), SwapError>;
}

/// On-chain balance lookups for either leg of the pair.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn balance(&self, asset: Asset) -> Result<f64, SwapError>;
}
