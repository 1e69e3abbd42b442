use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::strategy::{evaluate, IndicatorBundle};
use crate::types::{Candle, Direction, Position, StrategyProfile};

use super::results::{
    BacktestResult, DrawdownPoint, EquityPoint, ExitReason, MetricsCalculator, TradeRecord,
};

/// Bars consumed before the loop starts scanning: the seed of the slowest
/// supported indicator (EMA 200). Earlier bars are never signaled on.
pub const MIN_HISTORY_BARS: usize = 200;

/// Stop distance fallback when no ATR stop is configured: 2% of entry.
const FALLBACK_STOP_PCT: Decimal = dec!(0.02);

/// Replay a candle series against a strategy profile.
///
/// Pure function of (profile, candles, initial capital): identical inputs
/// produce identical results. Series shorter than the warm-up floor yield an
/// empty zeroed result rather than an error. A position still open when the
/// series ends stays open and is excluded from closed-trade metrics.
pub fn run_backtest(
    profile: &StrategyProfile,
    candles: &[Candle],
    initial_capital: Decimal,
) -> Result<BacktestResult, EngineError> {
    if candles.len() <= MIN_HISTORY_BARS {
        debug!(
            strategy = %profile.name,
            bars = candles.len(),
            "insufficient history, returning empty result"
        );
        return Ok(BacktestResult::empty(initial_capital));
    }

    let bundle = IndicatorBundle::build(profile, candles);
    let mut loop_state = SimulationLoop::new(profile, initial_capital);

    for bar in MIN_HISTORY_BARS..candles.len() {
        loop_state.process_bar(bar, &candles[bar], &bundle)?;
    }

    let result = MetricsCalculator::calculate(
        initial_capital,
        &loop_state.trades,
        &loop_state.equity_curve,
        &loop_state.drawdown_curve,
    );

    info!(
        strategy = %profile.name,
        trades = result.total_trades,
        return_pct = %result.total_return_pct,
        "backtest complete"
    );

    Ok(result)
}

/// FLAT / IN_POSITION state machine over one run. Owns the only mutable
/// state in the pipeline; nothing survives across runs.
struct SimulationLoop<'a> {
    profile: &'a StrategyProfile,
    capital: Decimal,
    peak_capital: Decimal,
    position: Option<Position>,
    trades: Vec<TradeRecord>,
    equity_curve: Vec<EquityPoint>,
    drawdown_curve: Vec<DrawdownPoint>,
}

impl<'a> SimulationLoop<'a> {
    fn new(profile: &'a StrategyProfile, initial_capital: Decimal) -> Self {
        Self {
            profile,
            capital: initial_capital,
            peak_capital: initial_capital,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            drawdown_curve: Vec::new(),
        }
    }

    fn process_bar(
        &mut self,
        bar: usize,
        candle: &Candle,
        bundle: &IndicatorBundle,
    ) -> Result<(), EngineError> {
        // Protective levels first, against the bar's full range. A bar that
        // closes the position never re-enters.
        if let Some(position) = &self.position {
            if let Some((price, reason)) = protective_exit(position, candle) {
                self.close_position(price, candle.open_time, reason);
                return Ok(());
            }
        }

        let eval = evaluate(self.profile, bar, bundle)?;

        match &self.position {
            Some(position) => {
                let exits = match position.direction {
                    Direction::Long => eval.exit_long,
                    Direction::Short => eval.exit_short,
                };
                if exits {
                    self.close_position(candle.close, candle.open_time, ExitReason::Signal);
                }
                // Entry signals while in position are ignored: no pyramiding.
            }
            None => {
                if let Some(direction) = eval.entry {
                    self.open_position(direction, bar, candle, bundle);
                }
            }
        }

        Ok(())
    }

    fn open_position(
        &mut self,
        direction: Direction,
        bar: usize,
        candle: &Candle,
        bundle: &IndicatorBundle,
    ) {
        let entry_price = candle.close;
        let position_size = self.capital * self.profile.risk_percent / dec!(100);

        let atr = bundle.atr[bar];
        let stop_distance = match (self.profile.stop_loss_atr, atr) {
            (Some(multiplier), Some(atr)) => atr * multiplier,
            _ => entry_price * FALLBACK_STOP_PCT,
        };

        let stop_loss = match (self.profile.stop_loss_atr, atr) {
            (Some(multiplier), Some(atr)) => Some(match direction {
                Direction::Long => entry_price - atr * multiplier,
                Direction::Short => entry_price + atr * multiplier,
            }),
            _ => None,
        };
        let take_profit = match (self.profile.take_profit_atr, atr) {
            (Some(multiplier), Some(atr)) => Some(match direction {
                Direction::Long => entry_price + atr * multiplier,
                Direction::Short => entry_price - atr * multiplier,
            }),
            _ => None,
        };

        debug!(
            strategy = %self.profile.name,
            %direction,
            price = %entry_price,
            size = %position_size,
            "opening position"
        );

        self.position = Some(Position {
            direction,
            entry_time: candle.open_time,
            entry_index: bar,
            entry_price,
            position_size,
            stop_distance,
            stop_loss,
            take_profit,
        });
    }

    fn close_position(&mut self, exit_price: Decimal, exit_time: DateTime<Utc>, reason: ExitReason) {
        let position = match self.position.take() {
            Some(p) => p,
            None => return,
        };

        let signed_return = position.signed_return(exit_price);
        let pnl = position.position_size * signed_return;
        self.capital += pnl;

        // Signed price move over the configured stop distance keeps
        // R-multiples comparable across trades with different outcomes.
        let r_multiple = if position.stop_distance.is_zero() {
            Decimal::ZERO
        } else {
            signed_return * position.entry_price / position.stop_distance
        };

        let holding_hours =
            Decimal::from((exit_time - position.entry_time).num_minutes()) / dec!(60);

        debug!(
            strategy = %self.profile.name,
            direction = %position.direction,
            %pnl,
            %reason,
            "closing position"
        );

        self.trades.push(TradeRecord {
            entry_time: position.entry_time,
            exit_time,
            entry_price: position.entry_price,
            exit_price,
            direction: position.direction,
            pnl,
            pnl_pct: signed_return * dec!(100),
            r_multiple,
            holding_hours,
            exit_reason: reason,
        });

        if self.capital > self.peak_capital {
            self.peak_capital = self.capital;
        }
        let drawdown_pct = if self.peak_capital > Decimal::ZERO {
            (self.peak_capital - self.capital) / self.peak_capital * dec!(100)
        } else {
            Decimal::ZERO
        };

        self.equity_curve.push(EquityPoint {
            time: exit_time,
            equity: self.capital,
        });
        self.drawdown_curve.push(DrawdownPoint {
            time: exit_time,
            drawdown_pct,
        });
    }
}

/// Check the bar's high/low against the position's protective levels.
/// The stop is checked before the target.
fn protective_exit(position: &Position, candle: &Candle) -> Option<(Decimal, ExitReason)> {
    match position.direction {
        Direction::Long => {
            if let Some(stop) = position.stop_loss {
                if candle.low <= stop {
                    return Some((stop, ExitReason::StopLoss));
                }
            }
            if let Some(target) = position.take_profit {
                if candle.high >= target {
                    return Some((target, ExitReason::TakeProfit));
                }
            }
        }
        Direction::Short => {
            if let Some(stop) = position.stop_loss {
                if candle.high >= stop {
                    return Some((stop, ExitReason::StopLoss));
                }
            }
            if let Some(target) = position.take_profit {
                if candle.low <= target {
                    return Some((target, ExitReason::TakeProfit));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StrategyParams;
    use chrono::TimeZone;

    fn hourly_candles(closes: &[Decimal]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, close)| Candle {
                open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
                open: *close,
                high: *close + dec!(1),
                low: *close - dec!(1),
                close: *close,
                volume: dec!(10),
            })
            .collect()
    }

    /// 300 hourly candles with a single clean golden cross around bar 250
    /// and no subsequent cross.
    fn golden_cross_series() -> Vec<Candle> {
        let mut closes: Vec<Decimal> = (0..250).map(|i| Decimal::from(1000 - i * 2)).collect();
        for i in 0..50 {
            closes.push(Decimal::from(505 + i * 20));
        }
        hourly_candles(&closes)
    }

    fn ema_profile() -> StrategyProfile {
        StrategyProfile::new("ema_cross", StrategyParams::ema_cross(9, 21))
    }

    #[test]
    fn insufficient_history_yields_empty_result() {
        let candles = hourly_candles(&vec![dec!(100); 150]);
        let result = run_backtest(&ema_profile(), &candles, dec!(10000)).unwrap();
        assert_eq!(result.total_trades, 0);
        assert_eq!(result.final_capital, dec!(10000));
        assert!(result.equity_curve.is_empty());
    }

    #[test]
    fn flat_series_produces_no_trades() {
        let candles = hourly_candles(&vec![dec!(100); 400]);
        let result = run_backtest(&ema_profile(), &candles, dec!(10000)).unwrap();
        assert_eq!(result.total_trades, 0);
        assert_eq!(result.win_rate_pct, Decimal::ZERO);
        assert_eq!(result.profit_factor, Decimal::ZERO);
        assert!(result.equity_curve.is_empty());
        assert!(result.drawdown_curve.is_empty());
    }

    #[test]
    fn single_golden_cross_leaves_position_open() {
        // The long entered at the cross never sees an opposite cross, so no
        // trade is realized and the trade list stays empty.
        let candles = golden_cross_series();
        let result = run_backtest(&ema_profile(), &candles, dec!(10000)).unwrap();
        assert_eq!(result.total_trades, 0);
        assert_eq!(result.final_capital, dec!(10000));
    }

    #[test]
    fn cross_and_reversal_realizes_one_long_trade() {
        // Golden cross, rally, then a collapse forces the death cross exit.
        let mut closes: Vec<Decimal> = (0..250).map(|i| Decimal::from(1000 - i * 2)).collect();
        for i in 0..50 {
            closes.push(Decimal::from(505 + i * 20));
        }
        for i in 0..60 {
            closes.push(Decimal::from(1485 - i * 24));
        }
        let candles = hourly_candles(&closes);

        let result = run_backtest(&ema_profile(), &candles, dec!(10000)).unwrap();
        assert_eq!(result.total_trades, 1);
        let trade = &result.trades[0];
        assert_eq!(trade.direction, Direction::Long);
        assert!(trade.exit_time > trade.entry_time);
        assert!(trade.pnl > Decimal::ZERO);
        // Winning long: positive R-multiple.
        assert!(trade.r_multiple > Decimal::ZERO);
        assert_eq!(result.equity_curve.len(), 1);
        assert_eq!(result.final_capital, dec!(10000) + trade.pnl);
    }

    #[test]
    fn death_cross_while_long_does_not_reverse_same_bar() {
        // Golden cross, death cross, then a second golden cross. The death
        // cross closes the long; had it also opened a short on the same bar,
        // that short would close at the second golden cross and show up as a
        // second (very profitable) trade.
        let mut closes: Vec<Decimal> = (0..250).map(|i| Decimal::from(1000 - i * 2)).collect();
        for i in 0..50 {
            closes.push(Decimal::from(505 + i * 20));
        }
        for i in 0..60 {
            closes.push(Decimal::from(1485 - i * 24));
        }
        for i in 0..40 {
            closes.push(Decimal::from(69 + i * 18));
        }
        let candles = hourly_candles(&closes);

        let result = run_backtest(&ema_profile(), &candles, dec!(10000)).unwrap();
        assert_eq!(result.total_trades, 1);
        assert_eq!(result.trades[0].direction, Direction::Long);
        assert!(result
            .trades
            .iter()
            .all(|t| t.direction != Direction::Short));
    }

    #[test]
    fn backtest_is_deterministic() {
        let candles = golden_cross_series();
        let profile = ema_profile();
        let a = run_backtest(&profile, &candles, dec!(10000)).unwrap();
        let b = run_backtest(&profile, &candles, dec!(10000)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn trades_are_chronologically_non_overlapping() {
        // RSI oscillation: alternating extremes over 500 bars.
        let mut closes = Vec::new();
        let mut price = 500i64;
        for cycle in 0..12 {
            for _ in 0..20 {
                price += if cycle % 2 == 0 { 15 } else { -15 };
                closes.push(Decimal::from(price));
            }
        }
        // Pad to clear the warm-up floor.
        while closes.len() < 500 {
            price += if (closes.len() / 20) % 2 == 0 { 15 } else { -15 };
            closes.push(Decimal::from(price));
        }
        let candles = hourly_candles(&closes);

        let profile = StrategyProfile::new(
            "rsi",
            StrategyParams::rsi_extremes(14, dec!(30), dec!(70)),
        );
        let result = run_backtest(&profile, &candles, dec!(10000)).unwrap();

        assert!(result.total_trades >= 2);
        for pair in result.trades.windows(2) {
            assert!(pair[0].exit_time > pair[0].entry_time);
            assert!(pair[1].entry_time >= pair[0].exit_time);
        }
        // Both directions appear across the oscillation.
        assert!(result.trades.iter().any(|t| t.direction == Direction::Long));
        assert!(result.trades.iter().any(|t| t.direction == Direction::Short));
        // Non-zero losses keep the profit factor off the sentinel; an
        // all-winner run is exactly the sentinel, never infinity.
        if result.losing_trades > 0 {
            assert!(result.profit_factor < crate::engine::results::PROFIT_FACTOR_CAP);
        } else {
            assert_eq!(
                result.profit_factor,
                crate::engine::results::PROFIT_FACTOR_CAP
            );
        }
    }

    #[test]
    fn atr_stop_loss_exits_intrabar() {
        // Quiet series, entry via breakout, then a violent drop through the stop.
        let mut closes: Vec<Decimal> = (0..260).map(|_| dec!(1000)).collect();
        for i in 0..10 {
            closes.push(dec!(1000) + Decimal::from((i + 1) * 30));
        }
        for _ in 0..30 {
            closes.push(dec!(700));
        }
        let candles = hourly_candles(&closes);

        let profile = StrategyProfile::new("breakout", StrategyParams::atr_breakout(14, dec!(1.5)))
            .with_stops(dec!(1.5), dec!(3));
        let result = run_backtest(&profile, &candles, dec!(10000)).unwrap();

        assert!(result.total_trades >= 1);
        let stopped = result
            .trades
            .iter()
            .any(|t| t.exit_reason != ExitReason::Signal);
        assert!(stopped);
    }

    #[test]
    fn losing_short_has_negative_r_multiple() {
        // Shallow dip triggers a death cross; the rally that follows crosses
        // back above the short's entry before the exit signal fires.
        let mut closes: Vec<Decimal> = (0..250).map(|i| Decimal::from(500 + i * 2)).collect();
        for i in 1..=25 {
            closes.push(Decimal::from(998 - i * 3));
        }
        for i in 1..=60 {
            closes.push(Decimal::from(923 + i * 20));
        }
        let candles = hourly_candles(&closes);

        let result = run_backtest(&ema_profile(), &candles, dec!(10000)).unwrap();
        let short = result
            .trades
            .iter()
            .find(|t| t.direction == Direction::Short)
            .expect("short trade");
        assert!(short.pnl < Decimal::ZERO);
        assert!(short.r_multiple < Decimal::ZERO);
    }
}
