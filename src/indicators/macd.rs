use rust_decimal::Decimal;

use super::ema::Ema;
use super::Indicator;

/// Moving Average Convergence Divergence.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_ema: Ema,
    slow_ema: Ema,
    signal_ema: Ema,
    value: Option<MacdOutput>,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MacdOutput {
    pub macd_line: Decimal,
    pub signal_line: Decimal,
    pub histogram: Decimal,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast_ema: Ema::new(fast_period),
            slow_ema: Ema::new(slow_period),
            signal_ema: Ema::new(signal_period),
            value: None,
        }
    }

    pub fn default_params() -> Self {
        Self::new(12, 26, 9)
    }

    pub fn update(&mut self, price: Decimal) -> Option<MacdOutput> {
        let fast = self.fast_ema.update(price);
        let slow = self.slow_ema.update(price);

        if let (Some(fast), Some(slow)) = (fast, slow) {
            let macd_line = fast - slow;
            if let Some(signal_line) = self.signal_ema.update(macd_line) {
                self.value = Some(MacdOutput {
                    macd_line,
                    signal_line,
                    histogram: macd_line - signal_line,
                });
                return self.value;
            }
        }
        None
    }

    pub fn value(&self) -> Option<MacdOutput> {
        self.value
    }
}

impl Indicator for Macd {
    fn name(&self) -> &'static str {
        "MACD"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.signal_ema.reset();
        self.value = None;
    }
}

/// End-aligned MACD series.
pub fn macd_series(
    values: &[Decimal],
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
) -> Vec<MacdOutput> {
    let mut macd = Macd::new(fast_period, slow_period, signal_period);
    values.iter().filter_map(|v| macd.update(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn flat_series_macd_is_zero() {
        let values = vec![dec!(100); 50];
        let out = macd_series(&values, 12, 26, 9);
        let last = out.last().unwrap();
        assert_eq!(last.macd_line, Decimal::ZERO);
        assert_eq!(last.signal_line, Decimal::ZERO);
        assert_eq!(last.histogram, Decimal::ZERO);
    }

    #[test]
    fn rally_pushes_macd_above_signal() {
        let mut values = vec![dec!(100); 40];
        for i in 0..20 {
            values.push(dec!(100) + Decimal::from(i * 3));
        }
        let out = macd_series(&values, 12, 26, 9);
        let last = out.last().unwrap();
        assert!(last.macd_line > Decimal::ZERO);
        assert!(last.histogram > Decimal::ZERO);
    }
}
