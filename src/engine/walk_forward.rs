use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::types::{Candle, StrategyProfile};

use super::backtest::{run_backtest, MIN_HISTORY_BARS};
use super::results::BacktestResult;

pub const DEFAULT_TRAIN_MONTHS: u32 = 6;
pub const DEFAULT_TEST_MONTHS: u32 = 1;

/// Floors below which a window is not emitted and partitioning stops.
const MIN_TRAIN_BARS: usize = MIN_HISTORY_BARS;
const MIN_TEST_BARS: usize = 50;

/// Out-of-sample efficiency above which a strategy counts as robust.
const ROBUSTNESS_THRESHOLD: Decimal = dec!(0.7);

/// One rolling train/test window with its independent pipeline runs.
///
/// `efficiency` is test Sharpe over train Sharpe; `None` when the train
/// Sharpe is zero and the ratio is undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardWindow {
    pub train_start: DateTime<Utc>,
    pub train_end: DateTime<Utc>,
    pub test_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
    pub train_result: BacktestResult,
    pub test_result: BacktestResult,
    pub efficiency: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub windows: Vec<WalkForwardWindow>,
    /// Mean over the windows whose efficiency is defined.
    pub avg_efficiency: Decimal,
    pub is_robust: bool,
}

/// Slice the series into rolling, non-overlapping train/test windows and
/// re-run the full pipeline on each slice.
///
/// The scheme is deliberately rolling rather than anchored/expanding: the
/// start advances by exactly the train period each iteration, so neither
/// train nor test windows overlap their predecessors of the same kind.
pub fn run_walk_forward(
    profile: &StrategyProfile,
    candles: &[Candle],
    initial_capital: Decimal,
    train_months: u32,
    test_months: u32,
) -> Result<WalkForwardResult, EngineError> {
    let mut windows = Vec::new();

    if let Some(first) = candles.first() {
        let mut start = first.open_time;

        loop {
            let train_end = start + Months::new(train_months);
            let test_end = train_end + Months::new(test_months);

            let train: Vec<Candle> = slice_by_time(candles, start, train_end);
            let test: Vec<Candle> = slice_by_time(candles, train_end, test_end);

            if train.len() < MIN_TRAIN_BARS || test.len() < MIN_TEST_BARS {
                debug!(
                    train_bars = train.len(),
                    test_bars = test.len(),
                    "window below minimum-history floor, stopping partitioning"
                );
                break;
            }

            let train_result = run_backtest(profile, &train, initial_capital)?;
            let test_result = run_backtest(profile, &test, initial_capital)?;

            let efficiency = if train_result.sharpe_ratio.is_zero() {
                None
            } else {
                Some(test_result.sharpe_ratio / train_result.sharpe_ratio)
            };

            windows.push(WalkForwardWindow {
                train_start: start,
                train_end,
                test_start: train_end,
                test_end,
                train_result,
                test_result,
                efficiency,
            });

            start = train_end;
        }
    }

    let defined: Vec<Decimal> = windows.iter().filter_map(|w| w.efficiency).collect();
    let avg_efficiency = if defined.is_empty() {
        Decimal::ZERO
    } else {
        defined.iter().sum::<Decimal>() / Decimal::from(defined.len() as u32)
    };
    let is_robust = avg_efficiency > ROBUSTNESS_THRESHOLD;

    info!(
        strategy = %profile.name,
        windows = windows.len(),
        avg_efficiency = %avg_efficiency,
        is_robust,
        "walk-forward complete"
    );

    Ok(WalkForwardResult {
        windows,
        avg_efficiency,
        is_robust,
    })
}

fn slice_by_time(candles: &[Candle], from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<Candle> {
    candles
        .iter()
        .filter(|c| c.open_time >= from && c.open_time < to)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StrategyParams;
    use chrono::TimeZone;

    /// Hourly candles oscillating enough to produce RSI trades in every slice.
    fn oscillating_candles(months: u32) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let end = start + Months::new(months);
        let mut candles = Vec::new();
        let mut t = start;
        let mut i: i64 = 0;
        while t < end {
            let phase = (i / 20) % 2;
            let step = if phase == 0 { 15 } else { -15 };
            let base = 500 + (i % 20) * step + if phase == 1 { 300 } else { 0 };
            let close = Decimal::from(base.max(50));
            candles.push(Candle {
                open_time: t,
                open: close,
                high: close + dec!(1),
                low: close - dec!(1),
                close,
                volume: dec!(10),
            });
            t += chrono::Duration::hours(1);
            i += 1;
        }
        candles
    }

    fn profile() -> StrategyProfile {
        StrategyProfile::new(
            "rsi",
            StrategyParams::rsi_extremes(14, dec!(30), dec!(70)),
        )
    }

    #[test]
    fn emits_expected_window_count() {
        // 14 months of hourly bars with 6+1 windows: starts at months 0 and 6
        // fit completely; the window starting at month 12 lacks train bars.
        let candles = oscillating_candles(14);
        let result =
            run_walk_forward(&profile(), &candles, dec!(10000), 6, 1).unwrap();
        assert_eq!(result.windows.len(), 2);

        for window in &result.windows {
            assert_eq!(window.train_end, window.test_start);
            assert!(window.train_start < window.train_end);
            assert!(window.test_start < window.test_end);
        }
        // Rolling scheme: each window starts where the previous train ended.
        assert_eq!(result.windows[1].train_start, result.windows[0].train_end);
    }

    #[test]
    fn short_series_emits_no_windows() {
        let candles = oscillating_candles(3);
        let result =
            run_walk_forward(&profile(), &candles, dec!(10000), 6, 1).unwrap();
        assert!(result.windows.is_empty());
        assert_eq!(result.avg_efficiency, Decimal::ZERO);
        assert!(!result.is_robust);
    }

    #[test]
    fn windows_are_chronological_and_non_overlapping() {
        let candles = oscillating_candles(22);
        let result =
            run_walk_forward(&profile(), &candles, dec!(10000), 6, 1).unwrap();
        assert!(result.windows.len() >= 3);

        for pair in result.windows.windows(2) {
            assert!(pair[1].train_start >= pair[0].train_end);
            assert!(pair[1].test_start >= pair[0].test_end);
        }
    }

    #[test]
    fn efficiency_is_ratio_of_sharpes() {
        let candles = oscillating_candles(14);
        let result =
            run_walk_forward(&profile(), &candles, dec!(10000), 6, 1).unwrap();

        for window in &result.windows {
            match window.efficiency {
                Some(eff) => {
                    assert!(!window.train_result.sharpe_ratio.is_zero());
                    let expected =
                        window.test_result.sharpe_ratio / window.train_result.sharpe_ratio;
                    assert_eq!(eff, expected);
                }
                None => assert!(window.train_result.sharpe_ratio.is_zero()),
            }
        }
    }
}
