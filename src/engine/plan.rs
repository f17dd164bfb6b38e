// =============================================================================
// Position Sizing, Protective Levels, and Tranche Entry Plans
// =============================================================================
//
// Sizing: base percent by risk tier (low 1%, medium 3%, high 7%) divided by
// (1 + vol%/100) so size shrinks as volatility rises, floored at 0.2%.
//
// Protective levels come from the last ATR: stop distance 1.5x / 2.0x / 2.5x
// by tier (floored at price 0), take-profit targets at +2.0x and +3.5x.
//
// Entry plans are staged in tranches.  Buy plans adapt to where the price
// sits relative to the nearest support band; sell plans to the nearest
// resistance; hold produces a single no-op entry recording the reason.
// =============================================================================

use crate::types::{Action, OrderType, RiskTier, SupportResistance, Tranche};

/// Percent-of-capital floor for any sized position.
const MIN_POSITION_PCT: f64 = 0.2;

/// Allocation floor after the small-buy halving.
const MIN_SMALL_BUY_PCT: f64 = 0.1;

/// Take-profit distances in ATR multiples.
const TP_MULTIPLIERS: [f64; 2] = [2.0, 3.5];

/// Position size in percent of capital for the given tier and volatility.
pub fn position_size_pct(risk: RiskTier, volatility_pct: f64) -> f64 {
    let base = match risk {
        RiskTier::Low => 0.01,
        RiskTier::Medium => 0.03,
        RiskTier::High => 0.07,
    };
    let adjusted = base / (1.0 + volatility_pct / 100.0);
    (adjusted * 100.0).max(MIN_POSITION_PCT)
}

/// Stop distance in ATR multiples by risk tier.
pub fn stop_loss_multiplier(risk: RiskTier) -> f64 {
    match risk {
        RiskTier::Low => 1.5,
        RiskTier::Medium => 2.0,
        RiskTier::High => 2.5,
    }
}

/// Initial stop-loss and take-profit targets from the last ATR reading.
///
/// Both are absent/empty when the ATR is not positive.
pub fn protective_levels(
    last_price: f64,
    last_atr: f64,
    risk: RiskTier,
) -> (Option<f64>, Vec<f64>) {
    if last_atr <= 0.0 {
        return (None, Vec::new());
    }
    let stop = (last_price - stop_loss_multiplier(risk) * last_atr).max(0.0);
    let targets = TP_MULTIPLIERS
        .iter()
        .map(|m| round_to(last_price + m * last_atr, 6))
        .collect();
    (Some(round_to(stop, 6)), targets)
}

/// Build the staged entry (or exit) plan for the decided action.
///
/// Returns the tranche list and the possibly-revised stop-loss: buy plans
/// anchored at a support band move the stop below that band (the wider,
/// more conservative placement).
pub fn build_entry_plan(
    action: Action,
    last_price: f64,
    position_pct: f64,
    sr: &SupportResistance,
    last_atr: f64,
    risk: RiskTier,
    stop_loss: Option<f64>,
) -> (Vec<Tranche>, Option<f64>) {
    let sl_mult = stop_loss_multiplier(risk);
    let nearest_support = sr.nearest_support();
    let nearest_resistance = sr.nearest_resistance();

    let mut total_pct = position_pct;
    if action == Action::SmallBuy {
        total_pct = (total_pct * 0.5).max(MIN_SMALL_BUY_PCT);
    }

    if action.is_buy() {
        // Initial / mid / add-on split.
        let ratios = normalized([0.5, 0.3, 0.2]);

        match nearest_support {
            Some(support) if last_price <= support * 1.02 => {
                // Already at the band: first tranche at market, the rest as
                // limits hugging the support level.
                let plan = vec![
                    market(last_price, total_pct * ratios[0]),
                    limit(support * 1.005, total_pct * ratios[1]),
                    limit(support * 0.995, total_pct * ratios[2]),
                ];
                let stop = if last_atr > 0.0 {
                    // Wider of price-based and support-based placements;
                    // the support-based one wins by convention.
                    Some(round_to((support - sl_mult * last_atr).max(0.0), 6))
                } else {
                    stop_loss
                };
                (plan, stop)
            }
            Some(support) => {
                // Wait for a pullback: limit ladder toward the band.
                let plan = vec![
                    limit(last_price * 0.997, total_pct * 0.2),
                    limit(support * 1.01, total_pct * 0.5),
                    limit(support * 0.995, total_pct * 0.3),
                ];
                let stop = if last_atr > 0.0 {
                    Some(round_to((support - sl_mult * last_atr).max(0.0), 6))
                } else {
                    stop_loss
                };
                (plan, stop)
            }
            None => {
                // No band at all: small market probe plus two limits
                // stepping down from the current price.
                let plan = vec![
                    market(last_price, total_pct * 0.2),
                    limit(last_price * 0.995, total_pct * 0.3),
                    limit(last_price * 0.99, total_pct * 0.5),
                ];
                let stop = if last_atr > 0.0 {
                    Some(round_to((last_price - sl_mult * last_atr).max(0.0), 6))
                } else {
                    stop_loss
                };
                (plan, stop)
            }
        }
    } else if action.is_sell() {
        let plan = match nearest_resistance {
            Some(resistance) if last_price >= resistance * 0.98 => vec![
                market(last_price, total_pct * 0.6),
                limit(resistance * 0.995, total_pct * 0.4),
            ],
            _ => vec![market(last_price, total_pct)],
        };
        (plan, stop_loss)
    } else {
        // Hold / watch: a single no-op entry recording the reason.
        let plan = vec![Tranche {
            order_type: OrderType::None,
            price: None,
            percent_of_capital: 0.0,
            reason: Some("Watching, wait for a clearer signal.".to_string()),
        }];
        (plan, stop_loss)
    }
}

// -----------------------------------------------------------------------------
// Internal helpers
// -----------------------------------------------------------------------------

fn normalized(ratios: [f64; 3]) -> [f64; 3] {
    let sum: f64 = ratios.iter().sum();
    [ratios[0] / sum, ratios[1] / sum, ratios[2] / sum]
}

fn market(price: f64, pct: f64) -> Tranche {
    Tranche {
        order_type: OrderType::Market,
        price: Some(round_to(price, 6)),
        percent_of_capital: round_to(pct, 4),
        reason: None,
    }
}

fn limit(price: f64, pct: f64) -> Tranche {
    Tranche {
        order_type: OrderType::Limit,
        price: Some(round_to(price, 6)),
        percent_of_capital: round_to(pct, 4),
        reason: None,
    }
}

fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}
