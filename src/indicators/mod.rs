pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod levels;
pub mod macd;
pub mod rsi;
pub mod volatility;

pub use adx::*;
pub use atr::*;
pub use bollinger::*;
pub use ema::*;
pub use levels::*;
pub use macd::*;
pub use rsi::*;
pub use volatility::*;

use rust_decimal::Decimal;

pub trait Indicator {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    fn reset(&mut self);
}

/// Arithmetic mean of the trailing `period` values; `None` below `period`.
pub fn sma(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period {
        return None;
    }
    let sum: Decimal = values.iter().rev().take(period).sum();
    Some(sum / Decimal::from(period as u32))
}

/// Simple moving average as an end-aligned series: output[i] is the mean of
/// input[i ..= i + period - 1]. Empty when the input is shorter than `period`.
pub fn sma_series(values: &[Decimal], period: usize) -> Vec<Decimal> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<Decimal>() / Decimal::from(period as u32))
        .collect()
}

pub fn stddev(values: &[Decimal], period: usize) -> Option<Decimal> {
    if values.len() < period {
        return None;
    }
    let mean = sma(values, period)?;
    let variance: Decimal = values
        .iter()
        .rev()
        .take(period)
        .map(|v| {
            let diff = *v - mean;
            diff * diff
        })
        .sum::<Decimal>()
        / Decimal::from(period as u32);

    Some(sqrt_decimal(variance))
}

/// Newton's method square root; zero for non-positive inputs.
pub(crate) fn sqrt_decimal(value: Decimal) -> Decimal {
    if value.is_zero() || value.is_sign_negative() {
        return Decimal::ZERO;
    }

    let mut guess = value / Decimal::from(2);
    if guess.is_zero() {
        guess = value;
    }
    let epsilon = Decimal::new(1, 10);

    for _ in 0..50 {
        let new_guess = (guess + value / guess) / Decimal::from(2);
        if (new_guess - guess).abs() < epsilon {
            return new_guess;
        }
        guess = new_guess;
    }
    guess
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sma_requires_full_window() {
        let values = vec![dec!(1), dec!(2), dec!(3)];
        assert_eq!(sma(&values, 4), None);
        assert_eq!(sma(&values, 3), Some(dec!(2)));
    }

    #[test]
    fn sma_series_is_end_aligned() {
        let values = vec![dec!(1), dec!(2), dec!(3), dec!(4)];
        let out = sma_series(&values, 2);
        assert_eq!(out, vec![dec!(1.5), dec!(2.5), dec!(3.5)]);
        assert!(sma_series(&values, 5).is_empty());
    }

    #[test]
    fn sqrt_of_perfect_square() {
        let root = sqrt_decimal(dec!(144));
        assert!((root - dec!(12)).abs() < dec!(0.0000001));
    }
}
