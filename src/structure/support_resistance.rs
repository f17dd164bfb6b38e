// =============================================================================
// Support / Resistance — percentile banding
// =============================================================================
//
// Over the trailing `lookback` closes, the 10th/25th/40th percentiles form
// the support candidates and the 60th/75th/90th the resistance candidates.
// Each list is returned ascending, truncated to the last `levels` entries;
// by convention the nearest / most relevant level is the LAST element.
// =============================================================================

use crate::types::SupportResistance;

const SUPPORT_PERCENTILES: [f64; 3] = [10.0, 25.0, 40.0];
const RESISTANCE_PERCENTILES: [f64; 3] = [60.0, 75.0, 90.0];

/// Estimate support and resistance bands from the trailing `lookback` closes.
///
/// Empty input yields empty bands.
pub fn estimate_support_resistance(
    closes: &[f64],
    lookback: usize,
    levels: usize,
) -> SupportResistance {
    if closes.is_empty() || lookback == 0 {
        return SupportResistance::default();
    }

    let tail = &closes[closes.len().saturating_sub(lookback)..];
    let mut sorted = tail.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let band = |ps: &[f64]| -> Vec<f64> {
        let all: Vec<f64> = ps.iter().map(|&p| percentile(&sorted, p)).collect();
        all[all.len().saturating_sub(levels)..].to_vec()
    };

    SupportResistance {
        support: band(&SUPPORT_PERCENTILES),
        resistance: band(&RESISTANCE_PERCENTILES),
    }
}

/// Linear-interpolation percentile over an already-sorted slice.
///
/// `p` is in [0, 100]; the rank `p/100 * (n-1)` is interpolated between its
/// two neighbouring order statistics.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
