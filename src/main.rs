// =============================================================================
// Lyra Advisor — Main Entry Point
// =============================================================================
//
// Stateless analysis service: Bybit market data in, scored trade
// recommendations out, with an optional Gemini-generated narrative. The
// server holds no positions and places no orders.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod api;
mod app_state;
mod bybit;
mod engine;
mod indicators;
mod narrative;
mod structure;
mod types;

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::bybit::BybitClient;
use crate::narrative::NarrativeExplainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & logging ─────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Lyra Advisor — Starting Up                        ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    // ── 2. Build shared state ────────────────────────────────────────────
    let narrative = NarrativeExplainer::from_env();
    if narrative.is_configured() {
        info!("narrative generation enabled (Gemini)");
    } else {
        warn!("GEMINI_API_KEY not set — narratives disabled, numeric analysis unaffected");
    }

    let state = Arc::new(AppState::new(BybitClient::new(), narrative));

    // ── 3. Start the API server ──────────────────────────────────────────
    let bind_addr =
        std::env::var("LYRA_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".into());

    let app = api::rest::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            warn!("Shutdown signal received — stopping gracefully");
        })
        .await?;

    info!("Lyra Advisor shut down complete.");
    Ok(())
}
