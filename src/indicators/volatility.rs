// =============================================================================
// Realized Volatility — annualized percentage
// =============================================================================
//
// Sample standard deviation (n - 1 divisor) of log returns over the trailing
// `period` closes, scaled by sqrt(252) and reported as a percent.
//
// The 252 annualization constant assumes one observation per trading day.
// For intraday candles this is an approximation, kept deliberately: the
// engine uses the figure as a relative risk gauge, not an absolute one.
// =============================================================================

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized realized volatility of the trailing `period` closes, in percent.
///
/// Returns 0.0 when fewer than 2 usable log returns exist.
pub fn realized_volatility_pct(closes: &[f64], period: usize) -> f64 {
    if closes.len() < 2 {
        return 0.0;
    }

    let tail = &closes[closes.len().saturating_sub(period)..];
    let log_returns: Vec<f64> = tail
        .windows(2)
        .map(|w| (w[1] + 1e-12).ln() - (w[0] + 1e-12).ln())
        .collect();
    if log_returns.len() < 2 {
        return 0.0;
    }

    let n = log_returns.len() as f64;
    let mean = log_returns.iter().sum::<f64>() / n;
    let variance = log_returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);

    variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0
}
