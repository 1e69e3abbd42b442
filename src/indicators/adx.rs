use rust_decimal::Decimal;

use super::atr::true_range;
use super::ema::Ema;
use super::Indicator;
use crate::types::Candle;

pub const DEFAULT_ADX_PERIOD: usize = 14;

/// Directional indicators plus the trend-strength ADX.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DmiOutput {
    pub plus_di: Decimal,
    pub minus_di: Decimal,
    pub adx: Decimal,
}

/// Average Directional Index with +DI/-DI.
///
/// Directional movement comes from consecutive high/low deltas, smoothed via
/// EMA alongside the true range; DX = |+DI - -DI| / (+DI + -DI) x 100 (zero
/// when the denominator is zero) and ADX is an EMA of DX.
#[derive(Debug, Clone)]
pub struct Adx {
    plus_smoother: Ema,
    minus_smoother: Ema,
    tr_smoother: Ema,
    dx_smoother: Ema,
    prev_high: Option<Decimal>,
    prev_low: Option<Decimal>,
    prev_close: Option<Decimal>,
    value: Option<DmiOutput>,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        Self {
            plus_smoother: Ema::new(period),
            minus_smoother: Ema::new(period),
            tr_smoother: Ema::new(period),
            dx_smoother: Ema::new(period),
            prev_high: None,
            prev_low: None,
            prev_close: None,
            value: None,
        }
    }

    pub fn update(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Option<DmiOutput> {
        let (prev_high, prev_low) = match (self.prev_high, self.prev_low) {
            (Some(h), Some(l)) => (h, l),
            _ => {
                self.prev_high = Some(high);
                self.prev_low = Some(low);
                self.prev_close = Some(close);
                return None;
            }
        };

        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let plus_dm = if up_move > down_move && up_move > Decimal::ZERO {
            up_move
        } else {
            Decimal::ZERO
        };
        let minus_dm = if down_move > up_move && down_move > Decimal::ZERO {
            down_move
        } else {
            Decimal::ZERO
        };
        let tr = true_range(high, low, self.prev_close);

        self.prev_high = Some(high);
        self.prev_low = Some(low);
        self.prev_close = Some(close);

        let smoothed_plus = self.plus_smoother.update(plus_dm);
        let smoothed_minus = self.minus_smoother.update(minus_dm);
        let smoothed_tr = self.tr_smoother.update(tr);

        let (smoothed_plus, smoothed_minus, smoothed_tr) =
            match (smoothed_plus, smoothed_minus, smoothed_tr) {
                (Some(p), Some(m), Some(t)) => (p, m, t),
                _ => return None,
            };

        let hundred = Decimal::from(100);
        let (plus_di, minus_di) = if smoothed_tr.is_zero() {
            (Decimal::ZERO, Decimal::ZERO)
        } else {
            (
                smoothed_plus / smoothed_tr * hundred,
                smoothed_minus / smoothed_tr * hundred,
            )
        };

        let di_sum = plus_di + minus_di;
        let dx = if di_sum.is_zero() {
            Decimal::ZERO
        } else {
            (plus_di - minus_di).abs() / di_sum * hundred
        };

        let adx = self.dx_smoother.update(dx)?;
        self.value = Some(DmiOutput {
            plus_di,
            minus_di,
            adx,
        });
        self.value
    }

    pub fn value(&self) -> Option<DmiOutput> {
        self.value
    }
}

impl Indicator for Adx {
    fn name(&self) -> &'static str {
        "ADX"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.plus_smoother.reset();
        self.minus_smoother.reset();
        self.tr_smoother.reset();
        self.dx_smoother.reset();
        self.prev_high = None;
        self.prev_low = None;
        self.prev_close = None;
        self.value = None;
    }
}

/// End-aligned DMI/ADX series over a candle sequence.
pub fn adx_series(candles: &[Candle], period: usize) -> Vec<DmiOutput> {
    let mut adx = Adx::new(period);
    candles
        .iter()
        .filter_map(|c| adx.update(c.high, c.low, c.close))
        .collect()
}
