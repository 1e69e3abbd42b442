use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Annualized historical (close-to-close) volatility in percent.
///
/// Standard deviation of log returns over the trailing `period` closes,
/// annualized for hourly bars: crypto trades around the clock, so a year is
/// 365 * 24 hourly observations. `None` when fewer than `period + 1` closes
/// or any close is non-positive.
pub fn historical_volatility(closes: &[Decimal], period: usize) -> Option<Decimal> {
    if period < 2 || closes.len() < period + 1 {
        return None;
    }

    let tail = &closes[closes.len() - (period + 1)..];
    let mut returns = Vec::with_capacity(period);
    for pair in tail.windows(2) {
        let prev = pair[0].to_f64()?;
        let cur = pair[1].to_f64()?;
        if prev <= 0.0 || cur <= 0.0 {
            return None;
        }
        returns.push((cur / prev).ln());
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let annualized = variance.sqrt() * (365.0_f64 * 24.0).sqrt() * 100.0;

    Decimal::try_from(annualized).ok()
}
