use rust_decimal::Decimal;

use super::{sma, stddev, Indicator};

/// Bollinger Bands: SMA middle band with bands at +/- k standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    multiplier: Decimal,
    window: Vec<Decimal>,
    value: Option<BollingerOutput>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BollingerOutput {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
    /// Band width relative to the middle band, in percent.
    pub bandwidth: Decimal,
    /// Position of the last price inside the bands (0 = lower, 1 = upper).
    pub percent_b: Decimal,
}

impl BollingerBands {
    pub fn new(period: usize, multiplier: Decimal) -> Self {
        Self {
            period,
            multiplier,
            window: Vec::with_capacity(period),
            value: None,
        }
    }

    pub fn default_params() -> Self {
        Self::new(20, Decimal::from(2))
    }

    pub fn update(&mut self, price: Decimal) -> Option<BollingerOutput> {
        self.window.push(price);
        if self.window.len() > self.period {
            self.window.remove(0);
        }
        if self.window.len() < self.period {
            return None;
        }

        let middle = sma(&self.window, self.period)?;
        let deviation = stddev(&self.window, self.period)? * self.multiplier;
        let upper = middle + deviation;
        let lower = middle - deviation;

        let bandwidth = if middle.is_zero() {
            Decimal::ZERO
        } else {
            (upper - lower) / middle * Decimal::from(100)
        };
        let band_range = upper - lower;
        let percent_b = if band_range.is_zero() {
            Decimal::ZERO
        } else {
            (price - lower) / band_range
        };

        self.value = Some(BollingerOutput {
            upper,
            middle,
            lower,
            bandwidth,
            percent_b,
        });
        self.value
    }

    pub fn value(&self) -> Option<BollingerOutput> {
        self.value
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &'static str {
        "BollingerBands"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.window.clear();
        self.value = None;
    }
}

/// End-aligned Bollinger series.
pub fn bollinger_series(values: &[Decimal], period: usize, multiplier: Decimal) -> Vec<BollingerOutput> {
    let mut bands = BollingerBands::new(period, multiplier);
    values.iter().filter_map(|v| bands.update(*v)).collect()
}
