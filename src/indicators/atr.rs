// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing, fixed-length output
// =============================================================================
//
// True Range per bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
// The first bar has no predecessor, so it uses its own close as the
// "previous close".
//
// Smoothing:
//   atr[0] = tr[0]
//   atr[i] = (atr[i-1] * (period - 1) + tr[i]) / period
//
// Seeding from tr[0] (instead of an SMA warm-up) keeps the output exactly as
// long as the input, so the engine can always read `atr.last()`.
// =============================================================================

/// Compute the ATR series from aligned high/low/close slices.
///
/// Output length equals `closes.len()`; `period == 0` returns the raw true
/// ranges unsmoothed.
pub fn atr_series(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len().min(highs.len()).min(lows.len());
    if n == 0 {
        return Vec::new();
    }

    let mut tr = Vec::with_capacity(n);
    for i in 0..n {
        let prev_close = if i == 0 { closes[0] } else { closes[i - 1] };
        let hl = highs[i] - lows[i];
        let hc = (highs[i] - prev_close).abs();
        let lc = (lows[i] - prev_close).abs();
        tr.push(hl.max(hc).max(lc));
    }

    if period == 0 {
        return tr;
    }

    let period_f = period as f64;
    let mut atr = Vec::with_capacity(n);
    atr.push(tr[0]);
    for i in 1..n {
        let next = (atr[i - 1] * (period_f - 1.0) + tr[i]) / period_f;
        atr.push(next);
    }

    atr
}
