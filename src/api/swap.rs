use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::error::SwapError;
use crate::execution::SwapService;
use crate::models::{TradeIntent, TradeSide};

/// Client for the external swap-execution service.
///
/// Route construction and transaction signing live in that service;
/// this client only broadcasts the trade parameters and splits
/// transport failures into the retryable/terminal halves the gateway
/// cares about. There is no synchronous fill confirmation.
#[derive(Clone)]
pub struct SwapExecutionClient {
    client: Client,
    endpoint: String,
    signer: String,
    pool_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapRequest<'a> {
    side: &'a str,
    /// Amount in the spent asset: USDC notional for buys, SOL for sells.
    amount: f64,
    target_mint: &'a str,
    pool_address: &'a str,
    decimals: u8,
    signer: &'a str,
}

impl SwapExecutionClient {
    pub fn new(endpoint: &str, signer: &str, pool_address: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            signer: signer.to_string(),
            pool_address: pool_address.to_string(),
        }
    }
}

#[async_trait]
impl SwapService for SwapExecutionClient {
    async fn submit(&self, intent: &TradeIntent) -> Result<(), SwapError> {
        let target = intent.acquired_asset();
        let request = SwapRequest {
            side: match intent.side {
                TradeSide::Buy => "buy",
                TradeSide::Sell => "sell",
            },
            amount: intent.amount,
            target_mint: target.mint_address(),
            pool_address: &self.pool_address,
            decimals: target.decimals(),
            signer: &self.signer,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SwapError::Other(format!("swap transport: {e}")))?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(
                    trade_id = %intent.id,
                    side = ?intent.side,
                    amount = intent.amount,
                    "swap broadcast accepted"
                );
                Ok(())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                Err(SwapError::RateLimited("429 from swap service".to_string()))
            }
            status => Err(SwapError::Other(format!("swap service returned {status}"))),
        }
    }
}
