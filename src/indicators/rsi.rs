use rust_decimal::Decimal;

use super::Indicator;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Relative Strength Index with Wilder's smoothing.
///
/// The first `period` price changes seed the average gain/loss; when the
/// average loss is exactly zero the RSI is defined as 100 rather than
/// dividing by zero.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_price: Option<Decimal>,
    gains: Vec<Decimal>,
    losses: Vec<Decimal>,
    avg_gain: Option<Decimal>,
    avg_loss: Option<Decimal>,
    value: Option<Decimal>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            prev_price: None,
            gains: Vec::with_capacity(period),
            losses: Vec::with_capacity(period),
            avg_gain: None,
            avg_loss: None,
            value: None,
        }
    }

    pub fn update(&mut self, price: Decimal) -> Option<Decimal> {
        if let Some(prev) = self.prev_price {
            let change = price - prev;
            let gain = change.max(Decimal::ZERO);
            let loss = (-change).max(Decimal::ZERO);

            if self.gains.len() < self.period {
                self.gains.push(gain);
                self.losses.push(loss);

                if self.gains.len() == self.period {
                    let period_dec = Decimal::from(self.period as u32);
                    self.avg_gain = Some(self.gains.iter().sum::<Decimal>() / period_dec);
                    self.avg_loss = Some(self.losses.iter().sum::<Decimal>() / period_dec);
                    self.value = self.current();
                }
            } else if let (Some(avg_gain), Some(avg_loss)) = (self.avg_gain, self.avg_loss) {
                let period_dec = Decimal::from(self.period as u32);
                self.avg_gain = Some((avg_gain * (period_dec - Decimal::ONE) + gain) / period_dec);
                self.avg_loss = Some((avg_loss * (period_dec - Decimal::ONE) + loss) / period_dec);
                self.value = self.current();
            }
        }

        self.prev_price = Some(price);
        self.value
    }

    fn current(&self) -> Option<Decimal> {
        let (avg_gain, avg_loss) = (self.avg_gain?, self.avg_loss?);
        if avg_loss.is_zero() {
            return Some(Decimal::from(100));
        }
        let rs = avg_gain / avg_loss;
        Some(Decimal::from(100) - Decimal::from(100) / (Decimal::ONE + rs))
    }

    pub fn value(&self) -> Option<Decimal> {
        self.value
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &'static str {
        "RSI"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.prev_price = None;
        self.gains.clear();
        self.losses.clear();
        self.avg_gain = None;
        self.avg_loss = None;
        self.value = None;
    }
}

/// End-aligned RSI series; empty below `period + 1` inputs (the first
/// `period` observations only seed the averages).
pub fn rsi_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    let mut rsi = Rsi::new(period);
    values.iter().filter_map(|v| rsi.update(*v)).collect()
}
