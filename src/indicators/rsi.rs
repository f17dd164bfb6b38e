// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing, fixed-length output
// =============================================================================
//
// Step 1 — Compute price deltas from consecutive closes.
// Step 2 — Seed average gain / average loss with the mean of the first
//          `period` gains / loss magnitudes.
// Step 3 — Wilder's exponential smoothing for the rest:
//            avg_gain = (avg_gain * (period - 1) + gain) / period
//            avg_loss = (avg_loss * (period - 1) + loss) / period
// Step 4 — RS = avg_gain / avg_loss, RSI = 100 - 100 / (1 + RS)
//
// Zero-loss boundary: when both averages are exactly zero (flat market) the
// RSI is 50; when only the loss average is zero (all gains) it is 100.
//
// Padding policy: the leading `period` slots are back-filled with the first
// computed RSI.  With fewer than `period` deltas available the raw price
// series is returned verbatim — degraded mode, not an error.
// =============================================================================

/// Compute the full RSI series for `closes` with the given `period`.
/// Output length always equals input length.
pub fn rsi_series(closes: &[f64], period: usize) -> Vec<f64> {
    if closes.is_empty() {
        return Vec::new();
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    if period == 0 || deltas.len() < period {
        // Raw-price fallback keeps consumers branch-free on absence.
        return closes.to_vec();
    }

    // --- Seed averages from the first `period` deltas ------------------------
    let (sum_gain, sum_loss) =
        deltas[..period].iter().fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l + d.abs())
            }
        });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let first_rsi = rsi_from_averages(avg_gain, avg_loss);

    // Leading `period` slots carry the first computed value.
    let mut result = vec![first_rsi; period];
    result.push(first_rsi);

    // --- Wilder's smoothing for subsequent deltas -----------------------------
    for &delta in &deltas[period..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        result.push(rsi_from_averages(avg_gain, avg_loss));
    }

    // Defensive length reconciliation: the output contract is exact.
    match result.len().cmp(&closes.len()) {
        std::cmp::Ordering::Less => {
            let last = *result.last().unwrap_or(&50.0);
            result.resize(closes.len(), last);
        }
        std::cmp::Ordering::Greater => {
            result.drain(..result.len() - closes.len());
        }
        std::cmp::Ordering::Equal => {}
    }

    result
}

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - Both averages zero (no movement) => 50.
/// - Loss average zero with gains present => 100.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(rsi_series(&[], 14).is_empty());
    }

    #[test]
    fn rsi_insufficient_deltas_returns_prices() {
        // 10 closes => 9 deltas < 14 => raw price fallback.
        let closes: Vec<f64> = (1..=10).map(|x| x as f64 * 10.0).collect();
        assert_eq!(rsi_series(&closes, 14), closes);
    }

    #[test]
    fn rsi_length_matches_input() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        assert_eq!(rsi_series(&closes, 14).len(), closes.len());
    }

    #[test]
    fn rsi_bounded_zero_to_hundred() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84,
            46.08, 45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
            43.5, 44.1, 43.9, 44.8,
        ];
        for &v in &rsi_series(&closes, 14) {
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_all_gains_is_hundred() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let series = rsi_series(&closes, 14);
        for &v in &series {
            assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
        }
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let series = rsi_series(&closes, 14);
        for &v in &series {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
    }

    #[test]
    fn rsi_flat_series_is_fifty() {
        // All deltas zero: gains and losses both zero, so the zero-division
        // boundary resolves to 50, not to the loss-only 100 edge.
        let closes = vec![100.0; 30];
        for &v in &rsi_series(&closes, 14) {
            assert!((v - 50.0).abs() < 1e-10, "expected 50.0, got {v}");
        }
    }

    #[test]
    fn rsi_leading_pad_equals_first_value() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).sin() * 3.0).collect();
        let series = rsi_series(&closes, 14);
        let first = series[0];
        for &v in &series[..14] {
            assert!((v - first).abs() < 1e-10);
        }
    }

    #[test]
    fn rsi_boundary_helper() {
        assert!((rsi_from_averages(0.0, 0.0) - 50.0).abs() < 1e-10);
        assert!((rsi_from_averages(1.5, 0.0) - 100.0).abs() < 1e-10);
        assert!((rsi_from_averages(0.0, 1.5)).abs() < 1e-10);
        assert!((rsi_from_averages(1.0, 1.0) - 50.0).abs() < 1e-10);
    }
}
