use rust_decimal::Decimal;

use crate::indicators::{Atr, Ema, Rsi, DEFAULT_ATR_PERIOD, DEFAULT_RSI_PERIOD};
use crate::types::{candle, Candle, StrategyParams, StrategyProfile};

/// Trailing window over the ATR used by the breakout rule.
const ATR_AVERAGE_BARS: usize = 20;

/// Pre-computed indicator series for one strategy run.
///
/// Every series has exactly one slot per input candle, head-padded with
/// `None` until the indicator has enough look-back. Alignment between
/// differently-seeded indicators is therefore structural: `fast_ema[i]`,
/// `slow_ema[i]`, `rsi[i]` and `atr[i]` all describe bar `i`.
#[derive(Debug, Clone)]
pub struct IndicatorBundle {
    pub closes: Vec<Decimal>,
    pub fast_ema: Vec<Option<Decimal>>,
    pub slow_ema: Vec<Option<Decimal>>,
    pub rsi: Vec<Option<Decimal>>,
    pub atr: Vec<Option<Decimal>>,
    /// Trailing 20-bar mean of the ATR, aligned like the rest.
    pub atr_average: Vec<Option<Decimal>>,
}

impl IndicatorBundle {
    /// Compute the series a profile's rule reads, plus the ATR the loop uses
    /// for protective stops and R-multiple stop distances.
    pub fn build(profile: &StrategyProfile, candles: &[Candle]) -> Self {
        let closes = candle::closes(candles);
        let n = candles.len();

        let (fast_period, slow_period) = match profile.params {
            StrategyParams::EmaCross {
                fast_period,
                slow_period,
            } => (Some(fast_period), Some(slow_period)),
            _ => (None, None),
        };
        let rsi_period = match profile.params {
            StrategyParams::RsiExtremes { period, .. } => Some(period),
            _ => None,
        };
        let atr_period = match profile.params {
            StrategyParams::AtrBreakout { period, .. } => period,
            _ => DEFAULT_ATR_PERIOD,
        };

        let fast_ema = match fast_period {
            Some(p) => padded_ema(&closes, p),
            None => vec![None; n],
        };
        let slow_ema = match slow_period {
            Some(p) => padded_ema(&closes, p),
            None => vec![None; n],
        };
        let rsi = match rsi_period {
            Some(p) => padded_rsi(&closes, p),
            None => padded_rsi(&closes, DEFAULT_RSI_PERIOD),
        };
        let atr = padded_atr(candles, atr_period);
        let atr_average = trailing_average(&atr, ATR_AVERAGE_BARS);

        Self {
            closes,
            fast_ema,
            slow_ema,
            rsi,
            atr,
            atr_average,
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

fn padded_ema(closes: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut ema = Ema::new(period);
    closes.iter().map(|c| ema.update(*c)).collect()
}

fn padded_rsi(closes: &[Decimal], period: usize) -> Vec<Option<Decimal>> {
    let mut rsi = Rsi::new(period);
    closes.iter().map(|c| rsi.update(*c)).collect()
}

fn padded_atr(candles: &[Candle], period: usize) -> Vec<Option<Decimal>> {
    let mut atr = Atr::new(period);
    candles
        .iter()
        .map(|c| atr.update(c.high, c.low, c.close))
        .collect()
}

/// Trailing mean over the defined entries of a padded series; `None` until
/// `window` defined values have accumulated.
fn trailing_average(series: &[Option<Decimal>], window: usize) -> Vec<Option<Decimal>> {
    let mut values: Vec<Decimal> = Vec::with_capacity(window);
    series
        .iter()
        .map(|entry| {
            if let Some(v) = entry {
                values.push(*v);
                if values.len() > window {
                    values.remove(0);
                }
            }
            if values.len() == window {
                Some(values.iter().sum::<Decimal>() / Decimal::from(window as u32))
            } else {
                None
            }
        })
        .collect()
}
