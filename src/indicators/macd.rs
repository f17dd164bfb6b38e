// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// MACD line   = EMA(short) - EMA(long)          (defaults 12 / 26)
// Signal line = EMA(signal) of the MACD line    (default 9)
//
// Both returned series have exactly the input length because the underlying
// EMAs seed from the first input value rather than a warm-up window.
// =============================================================================

use crate::indicators::ema::ema_series;

pub const MACD_SHORT: usize = 12;
pub const MACD_LONG: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// Compute the MACD and signal series for `closes`.
///
/// Returns `(macd, signal)`, both the same length as the input; empty input
/// yields two empty vecs.
pub fn macd_series(
    closes: &[f64],
    short: usize,
    long: usize,
    signal: usize,
) -> (Vec<f64>, Vec<f64>) {
    if closes.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let ema_short = ema_series(closes, short);
    let ema_long = ema_series(closes, long);

    let macd: Vec<f64> = ema_short
        .iter()
        .zip(ema_long.iter())
        .map(|(s, l)| s - l)
        .collect();

    let signal_line = ema_series(&macd, signal);
    (macd, signal_line)
}

/// MACD with the standard 12/26/9 parameters.
pub fn macd_default(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    macd_series(closes, MACD_SHORT, MACD_LONG, MACD_SIGNAL)
}
