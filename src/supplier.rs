use crate::error::EngineError;
use crate::types::{Candle, Interval};

/// Contract for the external candle source.
///
/// Implementations return the `count` most recent *closed* bars, oldest
/// first, with unique open times; fewer than `count` if history is short.
/// The engine never validates bar spacing and performs no I/O of its own;
/// cached, exchange-backed and rate-limited suppliers all satisfy this trait
/// outside the engine.
pub trait CandleSupplier {
    fn get_candles(
        &self,
        symbol: &str,
        interval: Interval,
        count: usize,
    ) -> Result<Vec<Candle>, EngineError>;
}
