// =============================================================================
// Shared Application State
// =============================================================================

use crate::bybit::BybitClient;
use crate::narrative::NarrativeExplainer;

/// Shared state handed to every request handler behind an `Arc`.
#[derive(Debug)]
pub struct AppState {
    /// Public market-data client.
    pub market: BybitClient,
    /// Optional narrative generator (may be unconfigured).
    pub narrative: NarrativeExplainer,
}

impl AppState {
    pub fn new(market: BybitClient, narrative: NarrativeExplainer) -> Self {
        Self { market, narrative }
    }
}
