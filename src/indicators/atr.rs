use rust_decimal::Decimal;

use super::ema::Ema;
use super::Indicator;
use crate::types::Candle;

pub const DEFAULT_ATR_PERIOD: usize = 14;

/// Average True Range: true range per bar, EMA-smoothed over `period`.
///
/// True range = max(high - low, |high - prev close|, |low - prev close|);
/// the first bar has no previous close and uses the plain high-low range.
#[derive(Debug, Clone)]
pub struct Atr {
    smoother: Ema,
    prev_close: Option<Decimal>,
    value: Option<Decimal>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            smoother: Ema::new(period),
            prev_close: None,
            value: None,
        }
    }

    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Option<Decimal> {
        let tr = true_range(high, low, self.prev_close);
        self.prev_close = Some(close);
        self.value = self.smoother.update(tr);
        self.value
    }

    pub fn value(&self) -> Option<Decimal> {
        self.value
    }
}

impl Indicator for Atr {
    fn name(&self) -> &'static str {
        "ATR"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.smoother.reset();
        self.prev_close = None;
        self.value = None;
    }
}

pub fn true_range(high: Decimal, low: Decimal, prev_close: Option<Decimal>) -> Decimal {
    let hl = high - low;
    match prev_close {
        Some(prev) => hl.max((high - prev).abs()).max((low - prev).abs()),
        None => hl,
    }
}

/// End-aligned ATR series over a candle sequence.
pub fn atr_series(candles: &[Candle], period: usize) -> Vec<Decimal> {
    let mut atr = Atr::new(period);
    candles
        .iter()
        .filter_map(|c| atr.update(c.high, c.low, c.close))
        .collect()
}
