pub mod position;

pub use position::{ClosedTrade, ExitTrigger, OpenPosition, PositionState, PositionStateMachine};

use std::time::Duration;

use tokio::sync::watch;

use crate::api::{FeeOracle, PriceFeed};
use crate::config::Config;
use crate::execution::{BalanceSource, ExecutionGateway, PriceWindow, SwapService};
use crate::indicators::{estimate_band, sma, VolatilityBand};
use crate::models::TradeIntent;

/// Decision-engine knobs, separated from the live-wiring config so
/// tests can build an engine without touching the environment.
#[derive(Debug, Clone)]
pub struct EngineParams {
    pub window_size: usize,
    pub sma_short: usize,
    pub sma_long: usize,
    pub volatility_margin: f64,
    /// Base USDC notional per buy; realized profit compounds on top.
    pub trade_notional: f64,
    pub loop_delay: Duration,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            window_size: 30,
            sma_short: 9,
            sma_long: 30,
            volatility_margin: 1.2,
            trade_notional: 50.0,
            loop_delay: Duration::from_secs(10),
        }
    }
}

impl From<&Config> for EngineParams {
    fn from(config: &Config) -> Self {
        Self {
            window_size: config.window_size,
            sma_short: config.sma_short,
            sma_long: config.sma_long,
            volatility_margin: config.volatility_margin,
            trade_notional: config.trade_notional_usdc,
            loop_delay: config.timeframe,
        }
    }
}

/// The whole trading state in one owned aggregate: rolling window,
/// volatility band, position machine and session P&L. There is exactly
/// one writer — the control loop below — which is what keeps the window
/// and position mutation-safe without locks.
pub struct TradingEngine<F, S, B, O> {
    feed: F,
    gateway: ExecutionGateway<S, B>,
    fees: O,
    params: EngineParams,
    window: PriceWindow,
    machine: PositionStateMachine,
    /// None means stale: recompute from the window before the next
    /// entry evaluation. Every sell resets this.
    band: Option<VolatilityBand>,
    /// Next buy's notional: base amount plus realized session profit.
    buy_notional: f64,
    total_net_profit: f64,
}

impl<F, S, B, O> TradingEngine<F, S, B, O>
where
    F: PriceFeed,
    S: SwapService,
    B: BalanceSource,
    O: FeeOracle,
{
    pub fn new(feed: F, gateway: ExecutionGateway<S, B>, fees: O, params: EngineParams) -> Self {
        let window = PriceWindow::new(params.window_size);
        let buy_notional = params.trade_notional;
        Self {
            feed,
            gateway,
            fees,
            params,
            window,
            machine: PositionStateMachine::new(),
            band: None,
            buy_notional,
            total_net_profit: 0.0,
        }
    }

    pub fn state(&self) -> PositionState {
        self.machine.state()
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        self.machine.position()
    }

    pub fn band(&self) -> Option<VolatilityBand> {
        self.band
    }

    pub fn session_pnl(&self) -> f64 {
        self.total_net_profit
    }

    pub fn window(&self) -> &PriceWindow {
        &self.window
    }

    /// Control loop: tick, then delay, until shutdown flips.
    ///
    /// Decisions are fully serialized on this loop; an in-flight trade
    /// always drains inside `tick` before shutdown is observed. A hard
    /// kill mid-trade can still leave engine state behind on-chain
    /// reality — that limitation is logged, not hidden.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            window = self.params.window_size,
            sma_short = self.params.sma_short,
            sma_long = self.params.sma_long,
            notional = self.params.trade_notional,
            delay_secs = self.params.loop_delay.as_secs(),
            "trading engine started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if let Err(e) = self.tick().await {
                // Position state is deliberately not rolled back here;
                // see DESIGN.md on the reconciliation gap.
                tracing::error!(error = %e, "cycle failed, continuing next cycle");
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.params.loop_delay) => {}
            }
        }

        if self.machine.state() == PositionState::Long {
            tracing::warn!(
                "shutting down while long; position state is not persisted and any \
                 in-flight settlement will not be reconciled on restart"
            );
        }
        tracing::info!(session_pnl = self.total_net_profit, "trading engine stopped");
    }

    /// One full cycle: ingest tick, maintain the window, evaluate the
    /// state machine, dispatch at most one trade.
    pub async fn tick(&mut self) -> anyhow::Result<()> {
        let Some(price) = self.feed.next_tick().await else {
            tracing::debug!("no valid tick this cycle, skipping");
            return Ok(());
        };

        self.window.push(price);

        if !self.window.is_full() {
            tracing::info!(
                collected = self.window.len(),
                needed = self.window.capacity(),
                price,
                "warming up price window"
            );
            return Ok(());
        }

        if self.gateway.is_in_flight() {
            tracing::debug!("trade in flight, skipping decision phase");
            return Ok(());
        }

        let prices = self.window.snapshot();
        let band = self.ensure_band(&prices);
        let sma_short = sma(&prices, self.params.sma_short);
        let sma_long = sma(&prices, self.params.sma_long);
        let price_change = self.window.latest_change();

        tracing::info!(
            price,
            change = price_change,
            sma_short,
            sma_long,
            state = ?self.machine.state(),
            "tick"
        );

        match self.machine.state() {
            PositionState::Flat => {
                if self.machine.should_enter(price_change, sma_short, sma_long, &band) {
                    self.enter(price, &band).await?;
                }
            }
            PositionState::Long => {
                self.machine.track(price, price_change, &band);
                if let Some(trigger) = self.machine.should_exit(price, sma_short, sma_long, &band)
                {
                    self.exit(price, trigger).await?;
                }
            }
        }

        Ok(())
    }

    /// Current band, recomputing from the window if stale. Kept stable
    /// across a position cycle so thresholds do not jitter per tick.
    fn ensure_band(&mut self, prices: &[f64]) -> VolatilityBand {
        if let Some(band) = self.band {
            return band;
        }
        let band = estimate_band(prices, self.params.window_size, self.params.volatility_margin);
        tracing::info!(
            positive = band.positive,
            negative = band.negative,
            "recomputed volatility band"
        );
        self.band = Some(band);
        band
    }

    async fn enter(&mut self, price: f64, band: &VolatilityBand) -> anyhow::Result<()> {
        let quantity = self.buy_notional / price;

        // State is applied before dispatch; a failed or unverified fill
        // leaves it standing (logged, never silently reconciled).
        self.machine.open(price, quantity, band)?;

        tracing::info!(
            entry = price,
            quantity,
            notional = self.buy_notional,
            trailing_stop = price - band.negative,
            "BUY confirmed, opening long"
        );

        self.dispatch(TradeIntent::buy(self.buy_notional)).await
    }

    async fn exit(&mut self, price: f64, trigger: ExitTrigger) -> anyhow::Result<()> {
        let trade = match self.machine.close(price, trigger) {
            Ok(trade) => trade,
            Err(e) => {
                // Corrupted position; refuse to sell, keep running.
                tracing::error!(error = %e, "sell aborted");
                return Ok(());
            }
        };

        let fee_usd = self.fees.estimate_fee().await;
        self.total_net_profit += trade.gross_profit;
        self.buy_notional = self.params.trade_notional + self.total_net_profit;
        // Next entry must re-derive thresholds from fresh data.
        self.band = None;

        tracing::info!(
            exit = trade.exit_price,
            entry = trade.entry_price,
            quantity = trade.quantity,
            profit = trade.gross_profit,
            fee_usd,
            session_pnl = self.total_net_profit,
            held_secs = (chrono::Utc::now() - trade.entry_time).num_seconds(),
            trigger = ?trade.trigger,
            "SELL triggered, closing long"
        );

        self.dispatch(TradeIntent::sell(trade.quantity)).await
    }

    async fn dispatch(&mut self, intent: TradeIntent) -> anyhow::Result<()> {
        let fill = self.gateway.execute(&intent).await?;
        if !fill.success {
            tracing::warn!(
                trade_id = %intent.id,
                side = ?intent.side,
                "fill not verified; position state left as decided"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SwapError;
    use crate::execution::RetryPolicy;
    use crate::models::Asset;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedFeed {
        ticks: Mutex<Vec<Option<f64>>>,
    }

    impl ScriptedFeed {
        fn new(ticks: Vec<Option<f64>>) -> Self {
            Self {
                ticks: Mutex::new(ticks),
            }
        }
    }

    #[async_trait]
    impl PriceFeed for ScriptedFeed {
        async fn next_tick(&self) -> Option<f64> {
            let mut ticks = self.ticks.lock().unwrap();
            if ticks.is_empty() {
                None
            } else {
                ticks.remove(0)
            }
        }
    }

    struct AlwaysOkSwap;

    #[async_trait]
    impl SwapService for AlwaysOkSwap {
        async fn submit(&self, _intent: &TradeIntent) -> Result<(), SwapError> {
            Ok(())
        }
    }

    /// Balances that grow on every read so fills always verify.
    struct GrowingBalances {
        calls: Mutex<u32>,
    }

    impl GrowingBalances {
        fn new() -> Self {
            Self {
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl BalanceSource for GrowingBalances {
        async fn balance(&self, asset: Asset) -> Result<f64, SwapError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            let base = match asset {
                Asset::Sol => 100.0,
                Asset::Usdc => 10_000.0,
            };
            Ok(base + *calls as f64)
        }
    }

    struct FreeFees;

    #[async_trait]
    impl FeeOracle for FreeFees {
        async fn estimate_fee(&self) -> f64 {
            0.0
        }
    }

    fn engine(
        ticks: Vec<Option<f64>>,
    ) -> TradingEngine<ScriptedFeed, AlwaysOkSwap, GrowingBalances, FreeFees> {
        let gateway = ExecutionGateway::new(
            AlwaysOkSwap,
            GrowingBalances::new(),
            RetryPolicy::default(),
            Duration::from_millis(0),
        );
        TradingEngine::new(
            ScriptedFeed::new(ticks),
            gateway,
            FreeFees,
            EngineParams::default(),
        )
    }

    #[tokio::test]
    async fn test_invalid_tick_skipped() {
        let mut eng = engine(vec![None, Some(100.0)]);

        eng.tick().await.unwrap();
        assert_eq!(eng.window().len(), 0);

        eng.tick().await.unwrap();
        assert_eq!(eng.window().len(), 1);
    }

    #[tokio::test]
    async fn test_no_decisions_during_warmup() {
        let ticks: Vec<Option<f64>> = (0..29).map(|i| Some(100.0 + i as f64)).collect();
        let mut eng = engine(ticks);

        for _ in 0..29 {
            eng.tick().await.unwrap();
        }

        assert_eq!(eng.state(), PositionState::Flat);
        // Band is never computed before the window fills.
        assert!(eng.band().is_none());
    }

    #[tokio::test]
    async fn test_band_computed_once_window_full() {
        let ticks: Vec<Option<f64>> = (0..30).map(|i| Some(100.0 + (i % 3) as f64)).collect();
        let mut eng = engine(ticks);

        for _ in 0..30 {
            eng.tick().await.unwrap();
        }

        let band = eng.band().expect("band after full window");
        assert!(band.positive > 0.0);
        assert!(band.negative > 0.0);
    }

    #[tokio::test]
    async fn test_band_stable_across_ticks_until_sell() {
        let mut ticks: Vec<Option<f64>> = (0..30).map(|i| Some(100.0 + (i % 3) as f64)).collect();
        // A few extra quiet ticks that would change a per-tick estimate.
        ticks.extend([Some(101.0), Some(101.0), Some(101.0)]);
        let mut eng = engine(ticks);

        for _ in 0..30 {
            eng.tick().await.unwrap();
        }
        let first = eng.band().unwrap();

        for _ in 0..3 {
            eng.tick().await.unwrap();
        }
        assert_eq!(eng.band().unwrap(), first);
    }

    #[tokio::test]
    async fn test_in_flight_gate_skips_decision_phase() {
        // Flat tape, then a breakout tick that would otherwise buy.
        let mut ticks: Vec<Option<f64>> = (0..30)
            .map(|i| Some(100.0 + if i % 2 == 0 { 0.1 } else { 0.0 }))
            .collect();
        ticks.push(Some(105.0));
        let mut eng = engine(ticks);

        for _ in 0..30 {
            eng.tick().await.unwrap();
        }

        eng.gateway.in_flight_handle().store(true, std::sync::atomic::Ordering::SeqCst);
        eng.tick().await.unwrap();

        // The breakout tick was ingested but no position was opened.
        assert_eq!(eng.state(), PositionState::Flat);
        assert_eq!(eng.window().last(), Some(105.0));
    }

    #[tokio::test]
    async fn test_breakout_with_trend_opens_long() {
        // Rising tape: alternating +0.25 / -0.20 keeps both buckets
        // populated while trending up, so sma9 >= sma30.
        let mut price = 100.0;
        let mut ticks = vec![Some(price)];
        for i in 0..29 {
            price += if i % 2 == 0 { 0.25 } else { -0.20 };
            ticks.push(Some(price));
        }
        let breakout = price + 0.35;
        ticks.push(Some(breakout));

        let mut eng = engine(ticks);
        for _ in 0..31 {
            eng.tick().await.unwrap();
        }

        assert_eq!(eng.state(), PositionState::Long);
        let pos = eng.position().unwrap();
        assert!((pos.entry_price - breakout).abs() < 1e-9);
        assert!((pos.quantity - 50.0 / breakout).abs() < 1e-9);
    }
}
