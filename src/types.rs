// =============================================================================
// Shared types used across the Lyra advisor backend
// =============================================================================
//
// Everything here is created fresh per request and discarded with the
// response — there is no cross-request state in any of these types.
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single OHLCV candle. `timestamp` is UNIX seconds.
///
/// Every consumer in this crate assumes candle slices are ordered oldest
/// first; the data-acquisition layer enforces that before handing them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Caller risk appetite, normalized from a free-form preference string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl Default for RiskTier {
    fn default() -> Self {
        Self::Medium
    }
}

impl RiskTier {
    /// Normalize a raw preference string via substring match.
    ///
    /// "low" / "conservative" => Low, "high" / "aggressive" => High,
    /// anything else (including empty) => Medium.
    pub fn from_input(raw: &str) -> Self {
        let s = raw.to_lowercase();
        if s.contains("low") || s.contains("conservative") {
            Self::Low
        } else if s.contains("high") || s.contains("aggressive") {
            Self::High
        } else {
            Self::Medium
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Discrete trade recommendation derived from the cumulative signal score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    #[serde(rename = "buy")]
    Buy,
    #[serde(rename = "small buy")]
    SmallBuy,
    #[serde(rename = "hold")]
    Hold,
    #[serde(rename = "small reduce")]
    SmallReduce,
    #[serde(rename = "sell")]
    Sell,
    #[serde(rename = "cannot analyze")]
    CannotAnalyze,
}

impl Action {
    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy | Self::SmallBuy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Self::Sell | Self::SmallReduce)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::SmallBuy => write!(f, "small buy"),
            Self::Hold => write!(f, "hold"),
            Self::SmallReduce => write!(f, "small reduce"),
            Self::Sell => write!(f, "sell"),
            Self::CannotAnalyze => write!(f, "cannot analyze"),
        }
    }
}

/// Market trend classification from the EMA crossover rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Neutral,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uptrend => write!(f, "uptrend"),
            Self::Downtrend => write!(f, "downtrend"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Order type for one tranche of a staged entry/exit plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
    None,
}

/// One stage of a multi-part execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tranche {
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub percent_of_capital: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Support/resistance price bands, each ascending with the nearest /
/// most relevant level last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

impl SupportResistance {
    pub fn nearest_support(&self) -> Option<f64> {
        self.support.last().copied()
    }

    pub fn nearest_resistance(&self) -> Option<f64> {
        self.resistance.last().copied()
    }
}

/// The most recent scalar value of each indicator plus the last price —
/// the summary handed to both the scoring logic and the narrative explainer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub last_price: f64,
    pub ma7: f64,
    pub ma25: f64,
    pub ema12: f64,
    pub ema26: f64,
    pub rsi14: f64,
    pub macd: f64,
    pub signal: f64,
    pub atr: f64,
    pub volatility_pct: f64,
}

/// Full per-coin analysis result returned to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub coin: String,
    pub action: Action,
    /// 0 only for the degenerate "cannot analyze" case; otherwise in [10, 95].
    pub confidence: u32,
    pub position_pct: f64,
    pub entry_plan: Vec<Tranche>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<f64>,
    pub take_profits: Vec<f64>,
    pub rationale: Vec<String>,
    pub trend: Trend,
    pub support_resistance: SupportResistance,
    pub indicators: IndicatorSnapshot,
    pub risk: RiskTier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl Recommendation {
    /// Degenerate result for inputs the engine refuses to score
    /// (fewer than 10 candles).
    pub fn insufficient_data(coin: &str, risk: RiskTier) -> Self {
        Self {
            coin: coin.to_string(),
            action: Action::CannotAnalyze,
            confidence: 0,
            position_pct: 0.0,
            entry_plan: Vec::new(),
            stop_loss: None,
            take_profits: Vec::new(),
            rationale: vec![
                "Not enough candle data for a rigorous analysis.".to_string(),
            ],
            trend: Trend::Neutral,
            support_resistance: SupportResistance::default(),
            indicators: IndicatorSnapshot::default(),
            risk,
            narrative: None,
        }
    }
}

/// Fallback object emitted when data acquisition fails for one coin of a
/// batch: carries the failure reason and empty indicator arrays so the
/// batch response still has one entry per requested coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub coin: String,
    pub action: Action,
    pub reason: String,
    pub trend: String,
    pub candles: Vec<Candle>,
    pub ma7: Vec<f64>,
    pub ma25: Vec<f64>,
    pub rsi: Vec<f64>,
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

impl FetchFailure {
    pub fn new(coin: &str, reason: String) -> Self {
        Self {
            coin: coin.to_string(),
            action: Action::CannotAnalyze,
            reason,
            trend: "unknown".to_string(),
            candles: Vec::new(),
            ma7: Vec::new(),
            ma25: Vec::new(),
            rsi: Vec::new(),
            macd: Vec::new(),
            signal: Vec::new(),
        }
    }
}

/// One entry of a batch analysis response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CoinResult {
    Analyzed(Box<Recommendation>),
    Failed(FetchFailure),
}
