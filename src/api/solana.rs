use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::FeeOracle;
use crate::error::SwapError;
use crate::execution::BalanceSource;
use crate::models::Asset;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;
/// Flat per-signature fee; priority fees are out of scope here.
const BASE_FEE_LAMPORTS: f64 = 5_000.0;
const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

/// Thin JSON-RPC client for balance lookups plus a USD fee estimate.
///
/// Balance errors are surfaced so the gateway can retry rate limits;
/// the fee estimate degrades to 0.0 on any failure because it is only
/// used for reporting.
#[derive(Clone)]
pub struct SolanaRpcClient {
    client: Client,
    endpoint: String,
    wallet: String,
    price_api: String,
}

impl SolanaRpcClient {
    pub fn new(endpoint: &str, wallet: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            wallet: wallet.to_string(),
            price_api: COINGECKO_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_price_api(mut self, price_api: &str) -> Self {
        self.price_api = price_api.to_string();
        self
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, SwapError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SwapError::Other(format!("rpc transport: {e}")))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(SwapError::RateLimited(format!("{method}: 429 from rpc node")));
            }
            status if !status.is_success() => {
                return Err(SwapError::Other(format!("{method}: rpc returned {status}")));
            }
            _ => {}
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SwapError::Other(format!("{method}: bad rpc body: {e}")))?;

        if let Some(error) = body.get("error") {
            return Err(SwapError::Other(format!("{method}: rpc error: {error}")));
        }
        Ok(body)
    }

    async fn sol_balance(&self) -> Result<f64, SwapError> {
        let body = self
            .rpc_call("getBalance", json!([self.wallet]))
            .await?;

        let lamports = body
            .pointer("/result/value")
            .and_then(Value::as_u64)
            .ok_or_else(|| SwapError::Other("getBalance: missing result.value".to_string()))?;

        Ok(lamports as f64 / LAMPORTS_PER_SOL)
    }

    async fn usdc_balance(&self) -> Result<f64, SwapError> {
        let body = self
            .rpc_call(
                "getTokenAccountsByOwner",
                json!([
                    self.wallet,
                    { "mint": Asset::Usdc.mint_address() },
                    { "encoding": "jsonParsed" },
                ]),
            )
            .await?;

        let accounts = body
            .pointer("/result/value")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SwapError::Other("getTokenAccountsByOwner: missing result.value".to_string())
            })?;

        // No token account simply means a zero balance.
        let Some(account) = accounts.first() else {
            tracing::warn!(wallet = %self.wallet, "no USDC token account found");
            return Ok(0.0);
        };

        account
            .pointer("/account/data/parsed/info/tokenAmount/uiAmount")
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                SwapError::Other("getTokenAccountsByOwner: missing uiAmount".to_string())
            })
    }

    async fn sol_price_usd(&self) -> Option<f64> {
        let url = format!(
            "{}/simple/price?ids=solana&vs_currencies=usd",
            self.price_api
        );
        let body: Value = self.client.get(&url).send().await.ok()?.json().await.ok()?;
        body.pointer("/solana/usd").and_then(Value::as_f64)
    }
}

#[async_trait]
impl BalanceSource for SolanaRpcClient {
    async fn balance(&self, asset: Asset) -> Result<f64, SwapError> {
        match asset {
            Asset::Sol => self.sol_balance().await,
            Asset::Usdc => self.usdc_balance().await,
        }
    }
}

#[async_trait]
impl FeeOracle for SolanaRpcClient {
    async fn estimate_fee(&self) -> f64 {
        match self.sol_price_usd().await {
            Some(price) => BASE_FEE_LAMPORTS / LAMPORTS_PER_SOL * price,
            None => {
                tracing::debug!("fee estimate unavailable, reporting 0");
                0.0
            }
        }
    }
}
