// =============================================================================
// Structural Analysis Module
// =============================================================================
//
// Price-structure estimators built on top of the series primitives:
// percentile-band support/resistance and EMA-crossover trend classification.

pub mod support_resistance;
pub mod trend;

pub use support_resistance::estimate_support_resistance;
pub use trend::classify_trend;
