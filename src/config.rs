use std::time::Duration;

use crate::error::ConfigError;

/// Runtime configuration, loaded once at startup from the environment.
/// Never re-read while the bot is running.
#[derive(Debug, Clone)]
pub struct Config {
    /// Solana RPC endpoint; also where swaps are broadcast.
    pub rpc_endpoint: String,
    /// Opaque signing credential, forwarded to the execution service.
    pub private_key: String,
    pub pool_address: String,
    pub wallet_address: String,

    /// Base USDC notional per buy.
    pub trade_notional_usdc: f64,
    /// Delay between decision cycles.
    pub timeframe: Duration,

    pub window_size: usize,
    pub sma_short: usize,
    pub sma_long: usize,
    pub volatility_margin: f64,

    pub settlement_delay: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,

    /// Legacy knobs still accepted from the environment but not wired
    /// into the decision logic; logged at startup so nobody assumes
    /// they are active.
    pub take_profit_pct: Option<f64>,
    pub stop_loss_pct: Option<f64>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let rpc_endpoint = required("RPC_PROVIDER")?;
        let private_key = required("PRIVATE_KEY")?;
        let pool_address = required("POOL_ADDRESS")?;
        let wallet_address = required("WALLET_ADDRESS")?;

        let trade_notional_usdc = parse_f64("AMOUNT_IN_USDC", required("AMOUNT_IN_USDC")?)?;
        if trade_notional_usdc <= 0.0 {
            return Err(ConfigError::InvalidVar {
                var: "AMOUNT_IN_USDC",
                value: trade_notional_usdc.to_string(),
            });
        }

        let timeframe_secs = match std::env::var("TIMEFRAME") {
            Ok(value) => parse_f64("TIMEFRAME", value)?,
            Err(_) => 10.0,
        };
        if timeframe_secs <= 0.0 {
            return Err(ConfigError::InvalidVar {
                var: "TIMEFRAME",
                value: timeframe_secs.to_string(),
            });
        }

        Ok(Self {
            rpc_endpoint,
            private_key,
            pool_address,
            wallet_address,
            trade_notional_usdc,
            timeframe: Duration::from_secs_f64(timeframe_secs),
            window_size: 30,
            sma_short: 9,
            sma_long: 30,
            volatility_margin: 1.2,
            settlement_delay: Duration::from_secs(5),
            max_retries: 5,
            retry_base_delay: Duration::from_millis(500),
            take_profit_pct: optional_f64("TAKE_PROFIT")?,
            stop_loss_pct: optional_f64("STOP_LOSS")?,
        })
    }

    /// Warn about anything accepted but ignored.
    pub fn log_unused_knobs(&self) {
        if self.take_profit_pct.is_some() || self.stop_loss_pct.is_some() {
            tracing::warn!(
                take_profit = ?self.take_profit_pct,
                stop_loss = ?self.stop_loss_pct,
                "TAKE_PROFIT / STOP_LOSS are set but not consulted by the decision \
                 logic; exits are driven by the volatility band and trailing stop"
            );
        }
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigError::MissingVar(var))
}

fn parse_f64(var: &'static str, value: String) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidVar { var, value })
}

fn optional_f64(var: &'static str) -> Result<Option<f64>, ConfigError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => parse_f64(var, value).map(Some),
        _ => Ok(None),
    }
}
