/// Adaptive buy/sell thresholds derived from recent tick-to-tick deltas.
///
/// Both values are non-negative; `negative` is the mean magnitude of the
/// down moves, not a signed number.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolatilityBand {
    pub positive: f64,
    pub negative: f64,
}

impl VolatilityBand {
    pub fn is_zero(&self) -> bool {
        self.positive == 0.0 && self.negative == 0.0
    }
}

/// Estimate the band from a full price window.
///
/// Consecutive deltas are partitioned by sign (zero deltas belong to
/// neither bucket), each bucket is averaged, and both means are scaled
/// by `margin` to compensate for using only the mean rather than the
/// variance. A window shorter than `min_samples` yields zero bands.
pub fn estimate_band(prices: &[f64], min_samples: usize, margin: f64) -> VolatilityBand {
    if prices.len() < min_samples {
        return VolatilityBand::default();
    }

    let mut up_moves = Vec::new();
    let mut down_moves = Vec::new();

    for pair in prices.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > 0.0 {
            up_moves.push(delta);
        } else if delta < 0.0 {
            down_moves.push(delta.abs());
        }
    }

    VolatilityBand {
        positive: mean(&up_moves) * margin,
        negative: mean(&down_moves) * margin,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARGIN: f64 = 1.2;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_band_partitions_deltas_by_sign() {
        // Deltas: +1, -2, +3, -4
        let prices = vec![100.0, 101.0, 99.0, 102.0, 98.0];
        let band = estimate_band(&prices, 5, MARGIN);

        assert_close(band.positive, 2.0 * MARGIN); // mean(1, 3)
        assert_close(band.negative, 3.0 * MARGIN); // mean(2, 4)
    }

    #[test]
    fn test_band_discards_zero_deltas() {
        // Deltas: 0, +2, 0, -1; zeros must not drag either mean down.
        let prices = vec![100.0, 100.0, 102.0, 102.0, 101.0];
        let band = estimate_band(&prices, 5, MARGIN);

        assert_close(band.positive, 2.0 * MARGIN);
        assert_close(band.negative, 1.0 * MARGIN);
    }

    #[test]
    fn test_band_empty_bucket_is_zero() {
        // Monotonic rise: no down moves at all.
        let prices = vec![100.0, 101.0, 102.0, 103.0];
        let band = estimate_band(&prices, 4, MARGIN);

        assert!(band.positive > 0.0);
        assert_eq!(band.negative, 0.0);
    }

    #[test]
    fn test_band_requires_full_window() {
        let prices = vec![100.0, 105.0, 95.0];
        let band = estimate_band(&prices, 30, MARGIN);
        assert!(band.is_zero());
    }

    #[test]
    fn test_band_both_values_non_negative() {
        let prices = vec![100.0, 90.0, 95.0, 85.0, 92.0];
        let band = estimate_band(&prices, 5, MARGIN);
        assert!(band.positive >= 0.0);
        assert!(band.negative >= 0.0);
    }
}
