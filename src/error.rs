use thiserror::Error;

/// Errors surfaced by the engine's public operations.
///
/// Insufficient history is deliberately *not* an error: runs over short
/// series produce empty, zeroed results instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Reserved or otherwise unevaluable strategy type in a profile.
    #[error("strategy type {0} has no evaluator; supported types are EMA_CROSS, RSI_EXTREMES, ATR_BREAKOUT")]
    UnsupportedStrategy(&'static str),

    /// A strategy parameter that makes the rule undefined (e.g. zero period).
    #[error("invalid strategy parameter for {kind}: {reason}")]
    InvalidParameter {
        kind: &'static str,
        reason: String,
    },

    /// Candle supplier failed to produce a series.
    #[error("candle supplier error: {0}")]
    Supplier(String),
}
