// =============================================================================
// Trend Classification — EMA 12/26 crossover
// =============================================================================
//
// A crossover on the latest step decides the trend outright; without one,
// a relative gap of more than ±2% between the short and long EMA still
// counts as a trend, and anything else is neutral.
//
// Needs at least 26 closes — below that the classifier reports neutral
// unconditionally rather than guessing from a half-warmed EMA.
// =============================================================================

use crate::indicators::ema::ema_series;
use crate::types::Trend;

const SHORT_PERIOD: usize = 12;
const LONG_PERIOD: usize = 26;

/// Relative EMA gap beyond which a non-crossover step still classifies
/// as trending.
const GAP_THRESHOLD: f64 = 0.02;

/// Classify the market trend from the close series.
pub fn classify_trend(closes: &[f64]) -> Trend {
    if closes.len() < LONG_PERIOD {
        return Trend::Neutral;
    }

    let short = ema_series(closes, SHORT_PERIOD);
    let long = ema_series(closes, LONG_PERIOD);

    let n = short.len();
    let (s_prev, s_last) = (short[n - 2], short[n - 1]);
    let (l_prev, l_last) = (long[n - 2], long[n - 1]);

    // Crossover on the latest step wins.
    if s_last > l_last && s_prev <= l_prev {
        return Trend::Uptrend;
    }
    if s_last < l_last && s_prev >= l_prev {
        return Trend::Downtrend;
    }

    // Otherwise a significant standing gap still counts.
    let gap = (s_last - l_last) / (l_last + 1e-9);
    if gap > GAP_THRESHOLD {
        Trend::Uptrend
    } else if gap < -GAP_THRESHOLD {
        Trend::Downtrend
    } else {
        Trend::Neutral
    }
}
