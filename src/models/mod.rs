use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One leg of the traded pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Sol,
    Usdc,
}

impl Asset {
    pub fn mint_address(&self) -> &'static str {
        match self {
            Asset::Sol => "So11111111111111111111111111111111111111112",
            Asset::Usdc => "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Asset::Sol => 9,
            Asset::Usdc => 6,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Sol => "SOL",
            Asset::Usdc => "USDC",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

/// A trade the engine wants executed.
///
/// Ephemeral: built per decision, consumed by the gateway. The amount is
/// denominated in the asset being spent — USDC notional for a buy, SOL
/// quantity for a sell.
#[derive(Debug, Clone)]
pub struct TradeIntent {
    pub id: Uuid,
    pub side: TradeSide,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

impl TradeIntent {
    pub fn buy(notional_usdc: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            side: TradeSide::Buy,
            amount: notional_usdc,
            created_at: Utc::now(),
        }
    }

    pub fn sell(quantity_sol: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            side: TradeSide::Sell,
            amount: quantity_sol,
            created_at: Utc::now(),
        }
    }

    /// Asset whose balance should grow if the trade fills.
    pub fn acquired_asset(&self) -> Asset {
        match self.side {
            TradeSide::Buy => Asset::Sol,
            TradeSide::Sell => Asset::Usdc,
        }
    }

    /// Asset being spent; its balance gates submission.
    pub fn disposed_asset(&self) -> Asset {
        match self.side {
            TradeSide::Buy => Asset::Usdc,
            TradeSide::Sell => Asset::Sol,
        }
    }
}

/// Outcome of a trade, verified by balance delta rather than by trusting
/// a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillResult {
    pub filled_amount: f64,
    pub success: bool,
}

impl FillResult {
    pub fn from_balances(before: f64, after: f64) -> Self {
        let filled_amount = after - before;
        Self {
            filled_amount,
            success: filled_amount > 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_asset_mapping() {
        let buy = TradeIntent::buy(50.0);
        assert_eq!(buy.acquired_asset(), Asset::Sol);
        assert_eq!(buy.disposed_asset(), Asset::Usdc);

        let sell = TradeIntent::sell(0.5);
        assert_eq!(sell.acquired_asset(), Asset::Usdc);
        assert_eq!(sell.disposed_asset(), Asset::Sol);
    }

    #[test]
    fn test_fill_from_unchanged_balance_is_failure() {
        let fill = FillResult::from_balances(10.0, 10.0);
        assert!(!fill.success);
        assert_eq!(fill.filled_amount, 0.0);
    }

    #[test]
    fn test_fill_from_increased_balance_is_success() {
        let fill = FillResult::from_balances(10.0, 10.6);
        assert!(fill.success);
        assert!((fill.filled_amount - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_fill_from_decreased_balance_is_failure() {
        let fill = FillResult::from_balances(10.0, 9.4);
        assert!(!fill.success);
        assert!(fill.filled_amount < 0.0);
    }

    #[test]
    fn test_asset_metadata() {
        assert_eq!(Asset::Sol.decimals(), 9);
        assert_eq!(Asset::Usdc.decimals(), 6);
        assert_eq!(Asset::Sol.to_string(), "SOL");
        assert!(Asset::Usdc.mint_address().starts_with("EPjF"));
    }
}
