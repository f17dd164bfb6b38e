// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators used by the
// recommendation engine.  Every series function here honors a fixed-length
// contract: the output has exactly as many elements as the input, with
// leading entries filled according to a per-indicator padding policy
// (first valid value, raw price, or seeded recursion — see each module).
// Consumers therefore never branch on absent values.

pub mod atr;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volatility;
