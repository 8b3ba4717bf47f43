pub mod moving_average;
pub mod volatility;

pub use moving_average::sma;
pub use volatility::{estimate_band, VolatilityBand};
