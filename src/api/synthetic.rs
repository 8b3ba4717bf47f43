use std::sync::Mutex;

use async_trait::async_trait;
use rand::Rng;

use super::PriceFeed;

/// Random-walk price source with alternating trend segments.
///
/// Stands in for the live feed during development (`--simulate`) and in
/// tests: price drifts up or down for a random number of ticks, then
/// the trend flips.
pub struct SyntheticFeed {
    state: Mutex<WalkState>,
}

#[derive(Debug)]
struct WalkState {
    price: f64,
    volatility: f64,
    trending_up: bool,
    ticks_left_in_segment: u32,
}

impl SyntheticFeed {
    pub fn new(start_price: f64) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            state: Mutex::new(WalkState {
                price: start_price,
                volatility: 0.01,
                trending_up: rng.gen_bool(0.5),
                ticks_left_in_segment: rng.gen_range(1..=5),
            }),
        }
    }
}

#[async_trait]
impl PriceFeed for SyntheticFeed {
    async fn next_tick(&self) -> Option<f64> {
        let mut state = self.state.lock().ok()?;
        let mut rng = rand::thread_rng();

        let step = state.price * rng.gen_range(0.0..state.volatility);
        if state.trending_up {
            state.price += step;
        } else {
            state.price -= step;
        }

        if state.ticks_left_in_segment == 0 {
            state.trending_up = !state.trending_up;
            state.ticks_left_in_segment = rng.gen_range(5..=15);
        } else {
            state.ticks_left_in_segment -= 1;
        }

        Some((state.price * 100.0).round() / 100.0)
    }
}
