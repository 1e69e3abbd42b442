use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::Indicator;

/// Exponential moving average, seeded with the SMA of the first `period`
/// values, then `ema = (value - ema) * 2/(period+1) + ema`. The smoothing
/// constant is fixed.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: Decimal,
    seed: Vec<Decimal>,
    value: Option<Decimal>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            multiplier: Decimal::from(2) / Decimal::from(period as u32 + 1),
            seed: Vec::with_capacity(period),
            value: None,
        }
    }

    pub fn update(&mut self, value: Decimal) -> Option<Decimal> {
        match self.value {
            Some(prev) => {
                self.value = Some((value - prev) * self.multiplier + prev);
            }
            None => {
                self.seed.push(value);
                if self.seed.len() == self.period {
                    let sum: Decimal = self.seed.iter().sum();
                    self.value = Some(sum / Decimal::from(self.period as u32));
                    self.seed.clear();
                }
            }
        }
        self.value
    }

    pub fn value(&self) -> Option<Decimal> {
        self.value
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &'static str {
        "EMA"
    }

    fn is_ready(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.seed.clear();
        self.value = None;
    }
}

/// End-aligned EMA series: output[i] corresponds to input[i + period - 1].
/// Empty when the input is shorter than `period`.
pub fn ema_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    let mut ema = Ema::new(period);
    values.iter().filter_map(|v| ema.update(*v)).collect()
}

/// Trend classification from a fast/slow EMA pair. The 2% band keeps the
/// classification from flapping when the averages sit near parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum TrendDirection {
    Uptrend,
    Downtrend,
    Neutral,
}

pub fn detect_trend(values: &[Decimal], fast_period: usize, slow_period: usize) -> Option<TrendDirection> {
    let fast = ema_series(values, fast_period);
    let slow = ema_series(values, slow_period);
    let (fast, slow) = (fast.last()?, slow.last()?);

    if *fast > *slow * dec!(1.02) {
        Some(TrendDirection::Uptrend)
    } else if *fast < *slow * dec!(0.98) {
        Some(TrendDirection::Downtrend)
    } else {
        Some(TrendDirection::Neutral)
    }
}

/// Crossover state between the last two aligned points of a fast/slow EMA pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Crossover {
    Golden,
    Death,
    None,
}

pub fn detect_ema_crossover(values: &[Decimal], fast_period: usize, slow_period: usize) -> Crossover {
    let fast = ema_series(values, fast_period);
    let slow = ema_series(values, slow_period);
    if fast.len() < 2 || slow.len() < 2 {
        return Crossover::None;
    }

    // Both series are end-aligned to the input, so their tails line up.
    let (f_prev, f_cur) = (fast[fast.len() - 2], fast[fast.len() - 1]);
    let (s_prev, s_cur) = (slow[slow.len() - 2], slow[slow.len() - 1]);

    if f_prev <= s_prev && f_cur > s_cur {
        Crossover::Golden
    } else if f_prev >= s_prev && f_cur < s_cur {
        Crossover::Death
    } else {
        Crossover::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimals(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|v| Decimal::from(*v)).collect()
    }

    #[test]
    fn ema_seeds_with_sma() {
        let mut ema = Ema::new(3);
        assert_eq!(ema.update(dec!(1)), None);
        assert_eq!(ema.update(dec!(2)), None);
        assert_eq!(ema.update(dec!(3)), Some(dec!(2)));
        // multiplier = 2/4 = 0.5; (5 - 2) * 0.5 + 2 = 3.5
        assert_eq!(ema.update(dec!(5)), Some(dec!(3.5)));
    }

    #[test]
    fn reset_clears_seed_and_value() {
        let mut ema = Ema::new(3);
        for v in [dec!(1), dec!(2), dec!(3)] {
            ema.update(v);
        }
        assert!(ema.is_ready());
        ema.reset();
        assert!(!ema.is_ready());
        assert_eq!(ema.value(), None);
        // Re-seeds from scratch after a reset.
        assert_eq!(ema.update(dec!(10)), None);
    }

    #[test]
    fn ema_series_length_matches_alignment() {
        let values = decimals(&[1, 2, 3, 4, 5, 6]);
        let out = ema_series(&values, 4);
        assert_eq!(out.len(), 3);
        assert!(ema_series(&values[..3], 4).is_empty());
    }

    #[test]
    fn trend_uses_two_percent_band() {
        // Flat series: fast == slow, inside the band.
        let flat = vec![dec!(100); 60];
        assert_eq!(detect_trend(&flat, 9, 21), Some(TrendDirection::Neutral));

        // Strong ramp pushes the fast average well above the slow one.
        let ramp: Vec<Decimal> = (1..=120).map(|i| Decimal::from(i * 10)).collect();
        assert_eq!(detect_trend(&ramp, 9, 21), Some(TrendDirection::Uptrend));

        let drop: Vec<Decimal> = (1..=120).rev().map(|i| Decimal::from(i * 10)).collect();
        assert_eq!(detect_trend(&drop, 9, 21), Some(TrendDirection::Downtrend));
    }

    #[test]
    fn golden_cross_detected_on_reversal() {
        // Long decline keeps fast below slow, then a sharp rally crosses it over.
        let mut values: Vec<Decimal> = (0..60).map(|i| Decimal::from(200 - i)).collect();
        assert_eq!(detect_ema_crossover(&values, 5, 15), Crossover::None);

        for i in 0..25 {
            values.push(Decimal::from(141 + i * 12));
        }
        // Scan forward: exactly one golden cross occurs somewhere in the rally.
        let mut golden = 0;
        for end in 16..values.len() {
            if detect_ema_crossover(&values[..=end], 5, 15) == Crossover::Golden {
                golden += 1;
            }
        }
        assert_eq!(golden, 1);
    }
}
