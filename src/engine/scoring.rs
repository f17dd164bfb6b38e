// =============================================================================
// Signal Scoring — additive indicator score, action mapping, confidence
// =============================================================================
//
// Every indicator reading contributes a fixed score delta; the cumulative
// score is unbounded and only becomes bounded through the confidence
// mapping `clamp(10, 95, 50 + score)`.  Human-readable rationale lines are
// accumulated alongside the score and travel with the recommendation.
//
// Score table:
//   EMA12 > EMA26            +20 / else -10
//   MA7 > MA25               +10 / else  -5
//   RSI < 25                 +25
//   25 <= RSI < 40            +5
//   RSI > 75                 -25
//   60 < RSI <= 75            -5
//   MACD golden cross        +15
//   MACD death cross         -15
//   vol% > 80                -15
//   40 < vol% <= 80           -5
//   price <= support * 1.02   +8
//   preference "RSI"         +10 below 30 / -10 above 70
//   preference "MA"           +8 / -8 on the MA7/MA25 relation
// =============================================================================

use crate::types::Action;

/// Caller indicator preference, matched case-insensitively against known
/// tokens; unknown values are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPreference {
    Rsi,
    Macd,
    Ma,
    Unspecified,
}

impl IndicatorPreference {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "RSI" => Self::Rsi,
            "MACD" => Self::Macd,
            "MA" => Self::Ma,
            _ => Self::Unspecified,
        }
    }
}

/// Latest indicator readings consumed by the scorer.
#[derive(Debug)]
pub struct SignalReadings<'a> {
    pub last_price: f64,
    pub ma7: f64,
    pub ma25: f64,
    pub ema12: f64,
    pub ema26: f64,
    pub rsi: f64,
    pub macd: &'a [f64],
    pub signal: &'a [f64],
    pub volatility_pct: f64,
    pub nearest_support: Option<f64>,
}

/// Accumulate the additive score and its rationale lines.
pub fn score_signals(
    r: &SignalReadings<'_>,
    preference: IndicatorPreference,
) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut rationale = Vec::new();

    // --- Trend and moving averages -------------------------------------------
    if r.ema12 > r.ema26 {
        score += 20.0;
        rationale.push(
            "Short-term EMA above long-term EMA, trend leans bullish.".to_string(),
        );
    } else {
        score -= 10.0;
        rationale.push(
            "Short-term EMA below long-term EMA, trend leans bearish.".to_string(),
        );
    }

    if r.ma7 > r.ma25 {
        score += 10.0;
        rationale.push("Short MA above long MA, momentum leans bullish.".to_string());
    } else {
        score -= 5.0;
    }

    // --- RSI bands ------------------------------------------------------------
    rationale.push(format!("RSI(14)={:.1}", r.rsi));
    if r.rsi < 25.0 {
        score += 25.0;
        rationale.push("RSI in oversold territory, a rebound is possible.".to_string());
    } else if r.rsi < 40.0 {
        score += 5.0;
    } else if r.rsi > 75.0 {
        score -= 25.0;
        rationale.push("RSI is stretched high, pullback risk.".to_string());
    } else if r.rsi > 60.0 {
        score -= 5.0;
    }

    // --- MACD crossover on the latest step ------------------------------------
    if r.macd.len() >= 2 && r.signal.len() >= 2 {
        let (m_prev, m_last) = (r.macd[r.macd.len() - 2], r.macd[r.macd.len() - 1]);
        let (s_prev, s_last) = (r.signal[r.signal.len() - 2], r.signal[r.signal.len() - 1]);
        if m_last > s_last && m_prev <= s_prev {
            score += 15.0;
            rationale
                .push("MACD golden cross, short-term momentum turning up.".to_string());
        } else if m_last < s_last && m_prev >= s_prev {
            score -= 15.0;
            rationale
                .push("MACD death cross, short-term momentum turning down.".to_string());
        }
    }

    // --- Volatility penalty -----------------------------------------------------
    if r.volatility_pct > 80.0 {
        score -= 15.0;
        rationale.push(format!(
            "High volatility ({:.1}%), elevated risk.",
            r.volatility_pct
        ));
    } else if r.volatility_pct > 40.0 {
        score -= 5.0;
    }

    // --- Support proximity ------------------------------------------------------
    if let Some(support) = r.nearest_support {
        if r.last_price <= support * 1.02 {
            score += 8.0;
            rationale.push(format!(
                "Price is near support {support:.4}, better risk/reward."
            ));
        }
    }

    // --- Indicator-preference override -------------------------------------------
    match preference {
        IndicatorPreference::Rsi => {
            if r.rsi < 30.0 {
                score += 10.0;
            } else if r.rsi > 70.0 {
                score -= 10.0;
            }
        }
        IndicatorPreference::Ma => {
            if r.ma7 > r.ma25 {
                score += 8.0;
            } else {
                score -= 8.0;
            }
        }
        // MACD preference is already covered by the crossover check above.
        IndicatorPreference::Macd | IndicatorPreference::Unspecified => {}
    }

    (score, rationale)
}

/// Map the cumulative score onto a discrete action.
pub fn action_for_score(score: f64) -> Action {
    if score >= 20.0 {
        Action::Buy
    } else if score >= 5.0 {
        Action::SmallBuy
    } else if score > -5.0 {
        Action::Hold
    } else if score > -20.0 {
        Action::SmallReduce
    } else {
        Action::Sell
    }
}

/// Confidence = clamp(10, 95, 50 + score); thin candle history (< 50)
/// shrinks it to 70% (floor 10) and appends a caveat to the rationale.
pub fn confidence_for(score: f64, candle_count: usize, rationale: &mut Vec<String>) -> u32 {
    let mut conf = ((50.0 + score) as i64).clamp(10, 95);
    if candle_count < 50 {
        conf = (((conf as f64) * 0.7) as i64).max(10);
        rationale.push(
            "Few data points available, treat the confidence estimate with caution."
                .to_string(),
        );
    }
    conf as u32
}
