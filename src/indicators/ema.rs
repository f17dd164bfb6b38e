// =============================================================================
// Exponential Moving Average (EMA) — fixed-length output
// =============================================================================
//
// EMA gives more weight to recent prices than the SMA:
//
//   k      = 2 / (period + 1)
//   ema[0] = data[0]                      (seeded from the first input)
//   ema[i] = data[i] * k + ema[i-1] * (1 - k)
//
// Seeding from the first raw value (rather than an SMA warm-up) keeps the
// output exactly as long as the input, which the trend classifier and the
// MACD construction both rely on.
// =============================================================================

/// Compute the EMA series for `data` with look-back `period`.
///
/// Returns an empty vec for empty input or `period == 0`.
pub fn ema_series(data: &[f64], period: usize) -> Vec<f64> {
    if data.is_empty() || period == 0 {
        return Vec::new();
    }

    let k = 2.0 / (period + 1) as f64;
    let mut result = Vec::with_capacity(data.len());
    result.push(data[0]);

    let mut prev = data[0];
    for &value in &data[1..] {
        let ema = value * k + prev * (1.0 - k);
        result.push(ema);
        prev = ema;
    }

    result
}
