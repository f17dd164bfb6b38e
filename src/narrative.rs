// =============================================================================
// Narrative Explainer — Google Gemini generateContent client
// =============================================================================
//
// Optional collaborator: given the computed indicator snapshot and derived
// context it produces a free-text rationale.  Absence or failure of this
// call must never break the numeric recommendation, so `explain` returns
// `Option<String>` — `None` when no credential is configured, a sentinel
// string when the upstream call fails.
//
// Credential model: one process-wide key (read from GEMINI_API_KEY at
// startup, replaceable only through the explicit `reconfigure` operation)
// plus a request-scoped override that is threaded through the call and
// never touches shared state.
//
// SECURITY: the key travels as a query parameter to the provider and is
// never logged or serialized.
// =============================================================================

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::types::{Action, IndicatorSnapshot, RiskTier, SupportResistance, Trend};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Sentinel prefixes for the three classified failure modes.
const QUOTA_SENTINEL: &str =
    "[quota exceeded] The AI provider quota is exhausted. Retry after the window resets.";
const CREDENTIAL_SENTINEL: &str =
    "[invalid credential] Check that the narrative API key is set correctly.";
const OTHER_SENTINEL: &str = "[narrative failed]";

/// Context handed to the explainer alongside the snapshot.
#[derive(Debug)]
pub struct NarrativeContext<'a> {
    pub coin: &'a str,
    pub snapshot: &'a IndicatorSnapshot,
    pub trend: Trend,
    pub support_resistance: &'a SupportResistance,
    pub rationale: &'a [String],
    pub action: Action,
    pub risk: RiskTier,
}

/// Gemini-backed narrative generator with an optional process-wide key.
pub struct NarrativeExplainer {
    client: reqwest::Client,
    base_url: String,
    default_key: RwLock<Option<String>>,
}

impl NarrativeExplainer {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, GEMINI_BASE_URL.to_string())
    }

    /// Custom base URL constructor (used by tests against a stub server).
    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        let key = api_key.filter(|k| is_plausible_key(k));
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("failed to build reqwest client"),
            base_url,
            default_key: RwLock::new(key),
        }
    }

    /// Read GEMINI_API_KEY from the environment; an absent or implausible
    /// value simply leaves the explainer unconfigured.
    pub fn from_env() -> Self {
        let key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self::new(key)
    }

    pub fn is_configured(&self) -> bool {
        self.default_key.read().is_some()
    }

    /// Replace the process-wide credential. Returns false (and changes
    /// nothing) when the key does not look plausible.
    pub fn reconfigure(&self, api_key: &str) -> bool {
        let key = api_key.trim();
        if !is_plausible_key(key) {
            warn!("rejected implausible narrative API key");
            return false;
        }
        *self.default_key.write() = Some(key.to_string());
        info!("narrative API key reconfigured");
        true
    }

    /// The key effective for one request: a plausible request-scoped
    /// override wins, otherwise the configured process-wide key.
    fn effective_key(&self, override_key: Option<&str>) -> Option<String> {
        if let Some(k) = override_key {
            let k = k.trim();
            if is_plausible_key(k) {
                return Some(k.to_string());
            }
        }
        self.default_key.read().clone()
    }

    /// Produce the narrative text for one analyzed coin.
    ///
    /// Never returns an error: `None` means unconfigured, and any upstream
    /// failure collapses into a categorized sentinel string.
    #[instrument(skip(self, override_key, ctx), fields(coin = ctx.coin))]
    pub async fn explain(
        &self,
        override_key: Option<&str>,
        ctx: &NarrativeContext<'_>,
    ) -> Option<String> {
        let key = self.effective_key(override_key)?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, GEMINI_MODEL, key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": build_prompt(ctx) }] }]
        });

        let resp = match self.client.post(&url).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(coin = ctx.coin, error = %e, "narrative request failed");
                return Some(classify_failure(None, &e.to_string()));
            }
        };

        let status = resp.status();
        let payload: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(coin = ctx.coin, error = %e, "narrative response unreadable");
                return Some(classify_failure(Some(status), &e.to_string()));
            }
        };

        if !status.is_success() {
            warn!(coin = ctx.coin, %status, "narrative call rejected upstream");
            return Some(classify_failure(Some(status), &payload.to_string()));
        }

        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string());

        match text {
            Some(t) => {
                debug!(coin = ctx.coin, "narrative generated");
                Some(t)
            }
            None => Some(classify_failure(Some(status), "empty candidate payload")),
        }
    }
}

impl std::fmt::Debug for NarrativeExplainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeExplainer")
            .field("base_url", &self.base_url)
            .field("configured", &self.is_configured())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Internal helpers
// -----------------------------------------------------------------------------

/// A credential is worth sending only if it has the provider's shape and
/// is not a placeholder left in an example .env file.
fn is_plausible_key(key: &str) -> bool {
    key.len() > 10 && key.starts_with("AIza") && !key.starts_with("your-")
}

/// Map an upstream failure onto one of the three user-facing sentinels.
fn classify_failure(status: Option<reqwest::StatusCode>, detail: &str) -> String {
    let lower = detail.to_lowercase();

    let quota = status.map(|s| s.as_u16() == 429).unwrap_or(false)
        || lower.contains("quota")
        || lower.contains("resource_exhausted");
    if quota {
        return QUOTA_SENTINEL.to_string();
    }

    let bad_credential = status
        .map(|s| matches!(s.as_u16(), 400 | 401 | 403))
        .unwrap_or(false)
        || lower.contains("api key not valid")
        || lower.contains("invalid_argument")
        || lower.contains("api_key_invalid");
    if bad_credential {
        return CREDENTIAL_SENTINEL.to_string();
    }

    let mut truncated: String = detail.chars().take(100).collect();
    if truncated.len() < detail.len() {
        truncated.push('…');
    }
    format!("{OTHER_SENTINEL} {truncated}")
}

/// Build the analyst prompt from the computed context.
fn build_prompt(ctx: &NarrativeContext<'_>) -> String {
    let s = ctx.snapshot;
    format!(
        "You are a professional crypto analyst. Provide investment advice based on:\n\
         \n\
         MARKET DATA ({coin}):\n\
         - Current Price: ${price:.2}\n\
         - Trend: {trend}\n\
         - Risk Preference: {risk} (low=conservative, medium=neutral, high=aggressive)\n\
         \n\
         TECHNICAL INDICATORS:\n\
         - RSI(14): {rsi:.2}\n\
         - MACD: {macd:.4}\n\
         - Signal: {signal:.4}\n\
         - ATR: {atr:.4}\n\
         - Volatility: {vol:.1}%\n\
         - MA(7): {ma7:.4}\n\
         - MA(25): {ma25:.4}\n\
         \n\
         SUPPORT & RESISTANCE:\n\
         - Support: {support:?}\n\
         - Resistance: {resistance:?}\n\
         \n\
         TECHNICAL ASSESSMENT:\n\
         {assessment}\n\
         \n\
         RECOMMENDATION:\n\
         {action}\n\
         \n\
         Please provide concise, practical advice (5 points):\n\
         1. Market analysis (2-3 sentences): current state and key signals\n\
         2. Entry strategy: suggested entry prices and batch allocation for the risk preference\n\
         3. Risk management: suggested stop-loss and profit targets\n\
         4. Risk warnings: the main current risk factors\n\
         5. Follow-up points: key levels or indicator changes to monitor\n\
         \n\
         Be concise and actionable.",
        coin = ctx.coin,
        price = s.last_price,
        trend = ctx.trend,
        risk = ctx.risk,
        rsi = s.rsi14,
        macd = s.macd,
        signal = s.signal,
        atr = s.atr,
        vol = s.volatility_pct,
        ma7 = s.ma7,
        ma25 = s.ma25,
        support = ctx.support_resistance.support,
        resistance = ctx.support_resistance.resistance,
        assessment = ctx.rationale.join("; "),
        action = ctx.action,
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(
        snapshot: &'a IndicatorSnapshot,
        sr: &'a SupportResistance,
        rationale: &'a [String],
    ) -> NarrativeContext<'a> {
        NarrativeContext {
            coin: "BTC",
            snapshot,
            trend: Trend::Uptrend,
            support_resistance: sr,
            rationale,
            action: Action::SmallBuy,
            risk: RiskTier::Medium,
        }
    }

    #[test]
    fn key_plausibility() {
        assert!(is_plausible_key("AIzaSyExampleExample"));
        assert!(!is_plausible_key("AIza")); // too short
        assert!(!is_plausible_key("your-api-key-here"));
        assert!(!is_plausible_key("sk-1234567890abcdef")); // wrong provider shape
        assert!(!is_plausible_key(""));
    }

    #[test]
    fn constructor_filters_implausible_keys() {
        assert!(!NarrativeExplainer::new(Some("your-key".to_string())).is_configured());
        assert!(!NarrativeExplainer::new(None).is_configured());
        assert!(
            NarrativeExplainer::new(Some("AIzaSyExampleExample".to_string())).is_configured()
        );
    }

    #[test]
    fn reconfigure_validates() {
        let explainer = NarrativeExplainer::new(None);
        assert!(!explainer.reconfigure("nonsense"));
        assert!(!explainer.is_configured());
        assert!(explainer.reconfigure("AIzaSyExampleExample"));
        assert!(explainer.is_configured());
    }

    #[test]
    fn override_key_wins_without_mutation() {
        let explainer =
            NarrativeExplainer::new(Some("AIzaDefaultDefault".to_string()));
        let effective = explainer.effective_key(Some("AIzaOverrideOverride"));
        assert_eq!(effective.as_deref(), Some("AIzaOverrideOverride"));
        // The configured key is untouched.
        assert_eq!(
            explainer.default_key.read().as_deref(),
            Some("AIzaDefaultDefault")
        );
        // An implausible override falls back to the configured key.
        let effective = explainer.effective_key(Some("garbage"));
        assert_eq!(effective.as_deref(), Some("AIzaDefaultDefault"));
    }

    #[test]
    fn failure_classification() {
        assert_eq!(
            classify_failure(Some(reqwest::StatusCode::TOO_MANY_REQUESTS), "anything"),
            QUOTA_SENTINEL
        );
        assert_eq!(
            classify_failure(None, "RESOURCE_EXHAUSTED: quota exceeded"),
            QUOTA_SENTINEL
        );
        assert_eq!(
            classify_failure(Some(reqwest::StatusCode::BAD_REQUEST), "x"),
            CREDENTIAL_SENTINEL
        );
        assert_eq!(
            classify_failure(None, "API key not valid. Please pass a valid key."),
            CREDENTIAL_SENTINEL
        );
        let other = classify_failure(None, "connection reset by peer");
        assert!(other.starts_with(OTHER_SENTINEL));
        assert!(other.contains("connection reset"));
    }

    #[test]
    fn failure_detail_is_truncated() {
        let long = "x".repeat(500);
        let msg = classify_failure(None, &long);
        assert!(msg.len() < 130);
    }

    #[test]
    fn prompt_carries_the_context() {
        let snapshot = IndicatorSnapshot {
            last_price: 61234.5,
            ma7: 61000.0,
            ma25: 60000.0,
            ema12: 60950.0,
            ema26: 60400.0,
            rsi14: 58.3,
            macd: 120.0,
            signal: 95.0,
            atr: 800.0,
            volatility_pct: 45.2,
        };
        let sr = SupportResistance {
            support: vec![59000.0, 59800.0, 60100.0],
            resistance: vec![62000.0, 63000.0, 64000.0],
        };
        let rationale = vec!["RSI(14)=58.3".to_string()];
        let prompt = build_prompt(&ctx(&snapshot, &sr, &rationale));

        assert!(prompt.contains("BTC"));
        assert!(prompt.contains("$61234.50"));
        assert!(prompt.contains("uptrend"));
        assert!(prompt.contains("small buy"));
        assert!(prompt.contains("RSI(14)=58.3"));
        assert!(prompt.contains("59000"));
    }

    #[tokio::test]
    async fn explain_is_none_when_unconfigured() {
        let explainer = NarrativeExplainer::new(None);
        let snapshot = IndicatorSnapshot::default();
        let sr = SupportResistance::default();
        let rationale: Vec<String> = Vec::new();
        let out = explainer.explain(None, &ctx(&snapshot, &sr, &rationale)).await;
        assert!(out.is_none());
    }

    /// Provider stand-in answering every path with a fixed status and body.
    async fn spawn_stub_provider(status: u16, body: serde_json::Value) -> String {
        let app = axum::Router::new().fallback(move || {
            let body = body.clone();
            async move {
                (
                    axum::http::StatusCode::from_u16(status).unwrap(),
                    axum::Json(body),
                )
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn explain_extracts_candidate_text() {
        let base = spawn_stub_provider(
            200,
            serde_json::json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "Momentum is constructive." }] }
                }]
            }),
        )
        .await;
        let explainer =
            NarrativeExplainer::with_base_url(Some("AIzaStubKeyStubKey".to_string()), base);
        let snapshot = IndicatorSnapshot::default();
        let sr = SupportResistance::default();
        let rationale: Vec<String> = Vec::new();
        let out = explainer.explain(None, &ctx(&snapshot, &sr, &rationale)).await;
        assert_eq!(out.as_deref(), Some("Momentum is constructive."));
    }

    #[tokio::test]
    async fn explain_maps_quota_rejection_to_sentinel() {
        let base = spawn_stub_provider(
            429,
            serde_json::json!({ "error": { "message": "rate limited" } }),
        )
        .await;
        let explainer =
            NarrativeExplainer::with_base_url(Some("AIzaStubKeyStubKey".to_string()), base);
        let snapshot = IndicatorSnapshot::default();
        let sr = SupportResistance::default();
        let rationale: Vec<String> = Vec::new();
        let out = explainer.explain(None, &ctx(&snapshot, &sr, &rationale)).await;
        assert_eq!(out.as_deref(), Some(QUOTA_SENTINEL));
    }
}
