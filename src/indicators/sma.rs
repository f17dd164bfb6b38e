// =============================================================================
// Simple Moving Average (SMA) — fixed-length output
// =============================================================================
//
// For each index i >= period-1 the value is the mean of the trailing
// `period` inputs.  The leading `period - 1` slots are filled with the first
// valid average so the output never shrinks below the input length.
//
// Padding policy: input shorter than `period` is returned unchanged
// (fallback-to-price) — degraded mode, not an error.
// =============================================================================

/// Compute the SMA series for `data` with window `period`.
///
/// # Edge cases
/// - empty input => empty vec
/// - `period == 0` or `data.len() < period` => the input copied verbatim
pub fn sma_series(data: &[f64], period: usize) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    if period == 0 || data.len() < period {
        return data.to_vec();
    }

    let mut result = Vec::with_capacity(data.len());

    // Rolling window sum over the valid range.
    let mut window_sum: f64 = data[..period].iter().sum();
    let first_valid = window_sum / period as f64;

    // Leading slots take the first valid average.
    result.resize(period - 1, first_valid);
    result.push(first_valid);

    for i in period..data.len() {
        window_sum += data[i] - data[i - period];
        result.push(window_sum / period as f64);
    }

    result
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_empty_input() {
        assert!(sma_series(&[], 7).is_empty());
    }

    #[test]
    fn sma_short_input_returns_prices() {
        let data = vec![1.0, 2.0, 3.0];
        assert_eq!(sma_series(&data, 7), data);
    }

    #[test]
    fn sma_period_zero_returns_prices() {
        let data = vec![5.0, 6.0];
        assert_eq!(sma_series(&data, 0), data);
    }

    #[test]
    fn sma_length_matches_input() {
        let data: Vec<f64> = (1..=50).map(|x| x as f64).collect();
        assert_eq!(sma_series(&data, 7).len(), data.len());
        assert_eq!(sma_series(&data, 25).len(), data.len());
    }

    #[test]
    fn sma_valid_region_is_trailing_mean() {
        let data: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let period = 5;
        let sma = sma_series(&data, period);
        for i in (period - 1)..data.len() {
            let mean: f64 =
                data[i + 1 - period..=i].iter().sum::<f64>() / period as f64;
            assert!(
                (sma[i] - mean).abs() < 1e-10,
                "index {i}: got {}, expected {mean}",
                sma[i]
            );
        }
    }

    #[test]
    fn sma_leading_pad_is_first_valid_average() {
        let data = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let sma = sma_series(&data, 3);
        // First valid average = (2+4+6)/3 = 4.0; indices 0 and 1 carry it.
        assert!((sma[0] - 4.0).abs() < 1e-10);
        assert!((sma[1] - 4.0).abs() < 1e-10);
        assert!((sma[2] - 4.0).abs() < 1e-10);
        assert!((sma[3] - 6.0).abs() < 1e-10);
        assert!((sma[4] - 8.0).abs() < 1e-10);
    }

    #[test]
    fn sma_flat_series_is_flat() {
        let data = vec![42.0; 30];
        for &v in &sma_series(&data, 7) {
            assert!((v - 42.0).abs() < 1e-10);
        }
    }
}
