// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Four routes: a public health probe, the batch analysis endpoint, raw
// candle history for charting, and the narrative-credential update.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::bybit::BybitClient;
use crate::engine;
use crate::types::{CoinResult, FetchFailure};

/// Candles requested per analyzed coin.
const ANALYZE_CANDLE_LIMIT: u32 = 200;

/// Hard cap on one history page.
const HISTORY_MAX_LIMIT: u32 = 2000;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/history", get(history))
        .route("/narrative/credential", post(set_narrative_credential))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "server_time": chrono::Utc::now().timestamp_millis(),
        "narrative_configured": state.narrative.is_configured(),
    }))
}

// =============================================================================
// Analysis
// =============================================================================

fn default_coins() -> Vec<String> {
    vec!["BTC".to_string(), "ETH".to_string()]
}

fn default_interval() -> String {
    "1h".to_string()
}

fn default_indicator() -> String {
    "RSI".to_string()
}

fn default_risk() -> String {
    "medium".to_string()
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    #[serde(default = "default_coins")]
    coins: Vec<String>,
    #[serde(default = "default_interval")]
    interval: String,
    #[serde(default = "default_indicator")]
    indicator: String,
    #[serde(default = "default_risk")]
    risk: String,
    /// Request-scoped narrative key; never stored.
    #[serde(default)]
    gemini_api_key: Option<String>,
}

/// POST /analyze — fetch candles for each requested coin and run the full
/// scoring pipeline. A fetch failure for one coin degrades only that coin's
/// entry; results keep the request order.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    let interval = BybitClient::map_interval(&req.interval);
    info!(coins = ?req.coins, interval, risk = %req.risk, "analysis requested");

    let futures = req.coins.iter().map(|coin| {
        let state = Arc::clone(&state);
        let indicator = req.indicator.clone();
        let risk = req.risk.clone();
        let override_key = req.gemini_api_key.clone();
        let coin = coin.clone();
        async move {
            let symbol = format!("{}USDT", coin.to_uppercase());
            match state
                .market
                .get_klines(&symbol, interval, ANALYZE_CANDLE_LIMIT, None)
                .await
            {
                Ok(candles) => {
                    let opens: Vec<f64> = candles.iter().map(|c| c.open).collect();
                    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
                    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
                    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
                    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

                    let rec = engine::analyze_with_narrative(
                        &state.narrative,
                        override_key.as_deref(),
                        &coin,
                        &opens,
                        &highs,
                        &lows,
                        &closes,
                        &volumes,
                        &indicator,
                        &risk,
                    )
                    .await;
                    CoinResult::Analyzed(Box::new(rec))
                }
                Err(e) => {
                    warn!(coin = %coin, error = %format!("{e:#}"), "candle fetch failed");
                    CoinResult::Failed(FetchFailure::new(&coin, format!("{e:#}")))
                }
            }
        }
    });

    let results: Vec<CoinResult> = futures_util::future::join_all(futures).await;

    Json(serde_json::json!({ "recommendations": results }))
}

// =============================================================================
// Candle history
// =============================================================================

fn default_history_interval() -> String {
    "60".to_string()
}

fn default_history_limit() -> u32 {
    500
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    symbol: String,
    #[serde(default = "default_history_interval")]
    interval: String,
    #[serde(default = "default_history_limit")]
    limit: u32,
    /// Exclusive right edge in milliseconds; pages backwards when set.
    #[serde(rename = "endTime", default)]
    end_time: Option<i64>,
}

/// GET /history — raw candles for charting. Errors come back as a JSON
/// body rather than an HTTP failure so the chart can render a message.
async fn history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    let symbol = {
        let s = q.symbol.to_uppercase();
        if s.ends_with("USDT") {
            s
        } else {
            format!("{s}USDT")
        }
    };
    let limit = q.limit.clamp(1, HISTORY_MAX_LIMIT);

    let from_ts = q.end_time.map(|end_ms| {
        let span = BybitClient::interval_seconds(&q.interval) * limit as i64;
        (end_ms / 1000 - span).max(0)
    });

    match state
        .market
        .get_klines(&symbol, &q.interval, limit, from_ts)
        .await
    {
        Ok(candles) => Json(serde_json::json!({ "candles": candles })),
        Err(e) => {
            warn!(symbol = %symbol, error = %format!("{e:#}"), "history fetch failed");
            Json(serde_json::json!({ "error": format!("{e:#}") }))
        }
    }
}

// =============================================================================
// Narrative credential
// =============================================================================

#[derive(Debug, Deserialize)]
struct CredentialRequest {
    api_key: String,
}

/// POST /narrative/credential — replace the process-wide narrative key.
async fn set_narrative_credential(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if !state.narrative.reconfigure(&req.api_key) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "API key rejected: wrong shape or placeholder value",
            })),
        ));
    }

    info!("narrative credential updated via API");
    Ok(Json(serde_json::json!({
        "status": "ok",
        "narrative_configured": true,
    })))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::narrative::NarrativeExplainer;

    /// Minimal exchange stand-in: a healthy 60-candle kline page for
    /// BTCUSDT (newest first, as the real wire format), an error envelope
    /// for every other symbol.
    async fn spawn_stub_exchange() -> String {
        async fn kline(
            Query(params): Query<std::collections::HashMap<String, String>>,
        ) -> Json<serde_json::Value> {
            if params.get("symbol").map(String::as_str) == Some("BTCUSDT") {
                let rows: Vec<serde_json::Value> = (0..60)
                    .rev()
                    .map(|i| {
                        let ts = 1_700_000_000_000i64 + i as i64 * 3_600_000;
                        let close = 100.0 + i as f64 * 0.5;
                        serde_json::json!([
                            ts.to_string(),
                            format!("{close}"),
                            format!("{}", close + 1.0),
                            format!("{}", close - 1.0),
                            format!("{close}"),
                            "1000",
                            "0"
                        ])
                    })
                    .collect();
                Json(serde_json::json!({
                    "retCode": 0,
                    "retMsg": "OK",
                    "result": { "category": "linear", "symbol": "BTCUSDT", "list": rows }
                }))
            } else {
                Json(serde_json::json!({ "retCode": 10001, "retMsg": "symbol not found" }))
            }
        }

        let app = Router::new().route("/v5/market/kline", get(kline));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn test_router(base_url: String) -> Router {
        let state = Arc::new(AppState::new(
            BybitClient::with_base_url(base_url),
            NarrativeExplainer::new(None),
        ));
        router(state)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_status_and_narrative_flag() {
        let app = test_router("http://127.0.0.1:9".to_string());
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["status"], "ok");
        assert_eq!(v["narrative_configured"], false);
        assert!(v["server_time"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn analyze_batch_isolates_failures_and_keeps_order() {
        let base = spawn_stub_exchange().await;
        let app = test_router(base);
        let req = Request::builder()
            .method("POST")
            .uri("/analyze")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"coins":["BTC","FAKE"],"interval":"1h","indicator":"RSI","risk":"medium"}"#,
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let v = body_json(resp).await;
        let recs = v["recommendations"].as_array().unwrap();
        // One entry per requested coin, in request order.
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0]["coin"], "BTC");
        assert_eq!(recs[1]["coin"], "FAKE");

        // The healthy coin is fully analyzed.
        assert_ne!(recs[0]["action"], "cannot analyze");
        assert!(recs[0]["entry_plan"].as_array().is_some());
        assert!(recs[0].get("reason").is_none());

        // The failed coin degrades into the fallback shape; the batch as a
        // whole still succeeds.
        assert_eq!(recs[1]["action"], "cannot analyze");
        assert_eq!(recs[1]["trend"], "unknown");
        assert!(recs[1]["reason"]
            .as_str()
            .unwrap()
            .contains("symbol not found"));
        assert!(recs[1]["ma7"].as_array().unwrap().is_empty());
        assert!(recs[1]["candles"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_returns_chronological_candles() {
        let base = spawn_stub_exchange().await;
        let app = test_router(base);
        // Lowercase symbol without the USDT suffix exercises normalization.
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/history?symbol=btc&interval=60&limit=50")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        let candles = v["candles"].as_array().unwrap();
        assert_eq!(candles.len(), 60);
        let first = candles.first().unwrap()["timestamp"].as_i64().unwrap();
        let last = candles.last().unwrap()["timestamp"].as_i64().unwrap();
        assert!(first < last);
    }

    #[tokio::test]
    async fn credential_update_validates_key_shape() {
        let app = test_router("http://127.0.0.1:9".to_string());

        let bad = Request::builder()
            .method("POST")
            .uri("/narrative/credential")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"api_key":"your-key-here"}"#))
            .unwrap();
        let resp = app.clone().oneshot(bad).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let good = Request::builder()
            .method("POST")
            .uri("/narrative/credential")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"api_key":"AIzaStubKeyStubKey"}"#))
            .unwrap();
        let resp = app.oneshot(good).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["narrative_configured"], true);
    }
}
