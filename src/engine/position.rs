use crate::indicators::VolatilityBand;
use chrono::{DateTime, Utc};

/// The machine only knows two states; there is no scaling in or out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
}

/// Which exit condition closed the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    /// Cumulative adverse move since entry breached the negative band.
    MomentumReversal,
    /// Price fell to the ratcheted stop.
    TrailingStop,
}

/// An open long position with its ratcheting stop state.
#[derive(Debug, Clone)]
pub struct OpenPosition {
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_time: DateTime<Utc>,
    pub highest_price: f64,
    pub trailing_stop: f64,
    /// Sum of tick-over-tick changes since entry.
    pub cumulative_move: f64,
}

/// A completed flat → long → flat cycle.
#[derive(Debug, Clone)]
pub struct ClosedTrade {
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub gross_profit: f64,
    pub entry_time: DateTime<Utc>,
    pub trigger: ExitTrigger,
}

/// Two-state position machine driving all buy/sell decisions.
///
/// Entries need both a volatility breakout and trend confirmation at
/// the same tick; exits fire on either of two triggers, both gated by
/// the trend filter pointing down.
#[derive(Debug, Default)]
pub struct PositionStateMachine {
    position: Option<OpenPosition>,
}

impl PositionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PositionState {
        if self.position.is_some() {
            PositionState::Long
        } else {
            PositionState::Flat
        }
    }

    pub fn position(&self) -> Option<&OpenPosition> {
        self.position.as_ref()
    }

    /// Flat → Long test: the last tick-over-tick move must clear the
    /// positive band AND the short average must confirm the uptrend.
    /// One condition alone never fires.
    pub fn should_enter(
        &self,
        price_change: f64,
        sma_short: f64,
        sma_long: f64,
        band: &VolatilityBand,
    ) -> bool {
        self.position.is_none() && price_change >= band.positive && sma_short >= sma_long
    }

    pub fn open(
        &mut self,
        entry_price: f64,
        quantity: f64,
        band: &VolatilityBand,
    ) -> anyhow::Result<()> {
        if self.position.is_some() {
            anyhow::bail!("position already open");
        }
        if !entry_price.is_finite() || entry_price <= 0.0 {
            anyhow::bail!("refusing to open at invalid price {entry_price}");
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            anyhow::bail!("refusing to open with invalid quantity {quantity}");
        }

        self.position = Some(OpenPosition {
            entry_price,
            quantity,
            entry_time: Utc::now(),
            highest_price: entry_price,
            trailing_stop: entry_price - band.negative,
            cumulative_move: 0.0,
        });
        Ok(())
    }

    /// Per-tick bookkeeping while long. The stop only ratchets upward,
    /// never down, regardless of the price path.
    pub fn track(&mut self, price: f64, price_change: f64, band: &VolatilityBand) {
        let Some(pos) = self.position.as_mut() else {
            return;
        };

        pos.cumulative_move += price_change;

        if price > pos.highest_price {
            pos.highest_price = price;
        }
        let candidate = pos.highest_price - band.negative;
        if candidate > pos.trailing_stop {
            pos.trailing_stop = candidate;
        }
    }

    /// Long → Flat test. Both triggers require the trend filter to point
    /// down (`sma_short <= sma_long`); a dip inside an intact uptrend
    /// is ridden out.
    pub fn should_exit(
        &self,
        price: f64,
        sma_short: f64,
        sma_long: f64,
        band: &VolatilityBand,
    ) -> Option<ExitTrigger> {
        let pos = self.position.as_ref()?;

        if sma_short > sma_long {
            return None;
        }
        if pos.cumulative_move <= -band.negative {
            return Some(ExitTrigger::MomentumReversal);
        }
        if price <= pos.trailing_stop {
            return Some(ExitTrigger::TrailingStop);
        }
        None
    }

    /// Close the position and report the realized result.
    ///
    /// An invalid entry price means the position got corrupted; the sell
    /// is aborted rather than booking nonsense P&L.
    pub fn close(&mut self, exit_price: f64, trigger: ExitTrigger) -> anyhow::Result<ClosedTrade> {
        let pos = self
            .position
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no open position to close"))?;

        if !pos.entry_price.is_finite() || pos.entry_price <= 0.0 {
            anyhow::bail!(
                "invalid entry price {}; aborting sell",
                pos.entry_price
            );
        }

        let trade = ClosedTrade {
            entry_price: pos.entry_price,
            exit_price,
            quantity: pos.quantity,
            gross_profit: (exit_price - pos.entry_price) * pos.quantity,
            entry_time: pos.entry_time,
            trigger,
        };

        self.position = None;
        Ok(trade)
    }
}
