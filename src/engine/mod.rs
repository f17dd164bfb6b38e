// =============================================================================
// Recommendation Engine
// =============================================================================
//
// `analyze_one_coin` is the synchronous, pure core: five aligned OHLCV
// arrays in, a structured recommendation out.  It never performs I/O; the
// async `analyze_with_narrative` wrapper layers the optional generative-AI
// explanation on top and is the only suspension point.
// =============================================================================

pub mod plan;
pub mod scoring;

use tracing::debug;

use crate::indicators::atr::atr_series;
use crate::indicators::ema::ema_series;
use crate::indicators::macd::macd_default;
use crate::indicators::rsi::rsi_series;
use crate::indicators::sma::sma_series;
use crate::indicators::volatility::realized_volatility_pct;
use crate::narrative::{NarrativeContext, NarrativeExplainer};
use crate::structure::{classify_trend, estimate_support_resistance};
use crate::types::{Action, IndicatorSnapshot, Recommendation, RiskTier};

use self::scoring::{
    action_for_score, confidence_for, score_signals, IndicatorPreference, SignalReadings,
};

/// Candle count below which no analysis is attempted.
const MIN_CANDLES: usize = 10;

/// Support/resistance lookback cap.
const SR_LOOKBACK: usize = 200;

/// Analyze one coin from aligned OHLCV arrays (oldest first).
///
/// Fewer than 10 closes yields the degenerate "cannot analyze" result;
/// everything else produces a fully-populated recommendation with the
/// narrative field left empty for the async wrapper to fill.
#[allow(clippy::too_many_arguments)]
pub fn analyze_one_coin(
    coin: &str,
    _opens: &[f64],
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    _volumes: &[f64],
    indicator: &str,
    risk_raw: &str,
) -> Recommendation {
    let risk = RiskTier::from_input(risk_raw);
    let preference = IndicatorPreference::parse(indicator);

    let n = closes.len();
    if n < MIN_CANDLES {
        debug!(coin, candles = n, "insufficient data for analysis");
        return Recommendation::insufficient_data(coin, risk);
    }

    // --- Indicator series ------------------------------------------------------
    let ma7 = sma_series(closes, 7);
    let ma25 = sma_series(closes, 25);
    let ema12 = ema_series(closes, 12);
    let ema26 = ema_series(closes, 26);
    let rsi = rsi_series(closes, 14);
    let (macd, signal) = macd_default(closes);
    let atr = atr_series(highs, lows, closes, 14);
    let volatility_pct = realized_volatility_pct(closes, 14);
    let sr = estimate_support_resistance(closes, SR_LOOKBACK.min(n), 3);
    let trend = classify_trend(closes);

    let last_price = closes[n - 1];
    let last_atr = atr.last().copied().unwrap_or(0.0);

    // --- Scoring ----------------------------------------------------------------
    let readings = SignalReadings {
        last_price,
        ma7: *ma7.last().unwrap_or(&last_price),
        ma25: *ma25.last().unwrap_or(&last_price),
        ema12: *ema12.last().unwrap_or(&last_price),
        ema26: *ema26.last().unwrap_or(&last_price),
        rsi: *rsi.last().unwrap_or(&50.0),
        macd: &macd,
        signal: &signal,
        volatility_pct,
        nearest_support: sr.nearest_support(),
    };
    let (score, mut rationale) = score_signals(&readings, preference);
    let action = action_for_score(score);
    let confidence = confidence_for(score, n, &mut rationale);

    // --- Sizing & plans ------------------------------------------------------------
    let position_pct = plan::position_size_pct(risk, volatility_pct);
    let (stop_loss, take_profits) = plan::protective_levels(last_price, last_atr, risk);
    let (entry_plan, stop_loss) = plan::build_entry_plan(
        action,
        last_price,
        position_pct,
        &sr,
        last_atr,
        risk,
        stop_loss,
    );

    let indicators = IndicatorSnapshot {
        last_price,
        ma7: readings.ma7,
        ma25: readings.ma25,
        ema12: readings.ema12,
        ema26: readings.ema26,
        rsi14: readings.rsi,
        macd: *macd.last().unwrap_or(&0.0),
        signal: *signal.last().unwrap_or(&0.0),
        atr: last_atr,
        volatility_pct,
    };

    debug!(
        coin,
        score,
        action = %action,
        confidence,
        trend = %trend,
        "analysis complete"
    );

    Recommendation {
        coin: coin.to_string(),
        action,
        confidence,
        position_pct: round3(position_pct),
        entry_plan,
        stop_loss,
        take_profits,
        rationale,
        trend,
        support_resistance: sr,
        indicators,
        risk,
        narrative: None,
    }
}

/// Analyze one coin and attach the generative-AI narrative.
///
/// The explainer call never propagates an error: failures collapse into a
/// sentinel string inside the narrative field and an unconfigured explainer
/// simply leaves it empty.  A caller-supplied credential override is
/// request-scoped and never touches process-wide state.
#[allow(clippy::too_many_arguments)]
pub async fn analyze_with_narrative(
    explainer: &NarrativeExplainer,
    override_key: Option<&str>,
    coin: &str,
    opens: &[f64],
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    volumes: &[f64],
    indicator: &str,
    risk_raw: &str,
) -> Recommendation {
    let mut rec = analyze_one_coin(
        coin, opens, highs, lows, closes, volumes, indicator, risk_raw,
    );

    if rec.action != Action::CannotAnalyze {
        let narrative = {
            let ctx = NarrativeContext {
                coin: &rec.coin,
                snapshot: &rec.indicators,
                trend: rec.trend,
                support_resistance: &rec.support_resistance,
                rationale: &rec.rationale,
                action: rec.action,
                risk: rec.risk,
            };
            explainer.explain(override_key, &ctx).await
        };
        rec.narrative = narrative;
    }

    rec
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
