/// Simple moving average over the last `period` samples.
///
/// Returns 0.0 when there is not enough data. Callers treat a zero SMA
/// as "insufficient data", never as an error; the trend filter is only
/// consulted once the rolling window is full anyway.
pub fn sma(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period {
        return 0.0;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    sum / period as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        assert_eq!(sma(&prices, 5), 104.0);
    }

    #[test]
    fn test_sma_uses_only_last_period_samples() {
        // Older samples outside the lookback must not affect the result.
        let prices = vec![1.0, 999.0, 100.0, 102.0, 104.0];
        assert_eq!(sma(&prices, 3), 102.0);

        let reordered = vec![999.0, 1.0, 100.0, 102.0, 104.0];
        assert_eq!(sma(&reordered, 3), 102.0);
    }

    #[test]
    fn test_sma_insufficient_data_is_zero() {
        let prices = vec![100.0, 102.0];
        assert_eq!(sma(&prices, 5), 0.0);
        assert_eq!(sma(&[], 1), 0.0);
    }

    #[test]
    fn test_sma_exact_length() {
        let prices = vec![1.0, 2.0, 3.0];
        assert_eq!(sma(&prices, 3), 2.0);
    }
}
