use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Direction;

/// Sentinel for an undefined/infinite profit factor: keeps the value finite
/// and serializable instead of propagating infinity.
pub const PROFIT_FACTOR_CAP: Decimal = dec!(999);

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Record of a completed trade, created atomically when the loop closes a
/// position and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub direction: Direction,
    /// Realized profit/loss in account currency.
    pub pnl: Decimal,
    /// Signed price return of the trade, in percent.
    pub pnl_pct: Decimal,
    /// Profit/loss as a multiple of the amount risked at the configured stop
    /// distance, not the realized loss.
    pub r_multiple: Decimal,
    pub holding_hours: Decimal,
    pub exit_reason: ExitReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "Signal"),
            ExitReason::StopLoss => write!(f, "Stop Loss"),
            ExitReason::TakeProfit => write!(f, "Take Profit"),
        }
    }
}

/// Point on the equity curve; one is appended per realized trade close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: DateTime<Utc>,
    pub equity: Decimal,
}

/// Percentage decline from the running equity peak at a trade close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub time: DateTime<Utc>,
    pub drawdown_pct: Decimal,
}

/// Full output of one backtest run. Produced fresh per run, never mutated
/// after return; every numeric field is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub initial_capital: Decimal,
    pub final_capital: Decimal,
    pub total_return_pct: Decimal,
    pub cagr_pct: Decimal,

    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub win_rate_pct: Decimal,
    pub profit_factor: Decimal,
    pub expectancy: Decimal,
    pub avg_r_multiple: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,

    pub sharpe_ratio: Decimal,
    pub sortino_ratio: Decimal,
    pub max_drawdown_pct: Decimal,

    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub drawdown_curve: Vec<DrawdownPoint>,
}

impl BacktestResult {
    /// Zeroed result for runs with no usable history: the deliberate
    /// "no signal available" outcome, not an error.
    pub fn empty(initial_capital: Decimal) -> Self {
        MetricsCalculator::calculate(initial_capital, &[], &[], &[])
    }
}

/// Pure reduction of a trade list and equity curve into the metric set.
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn calculate(
        initial_capital: Decimal,
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
        drawdown_curve: &[DrawdownPoint],
    ) -> BacktestResult {
        let total_trades = trades.len() as u64;
        let winners: Vec<&TradeRecord> = trades.iter().filter(|t| t.pnl > Decimal::ZERO).collect();
        let losers: Vec<&TradeRecord> = trades.iter().filter(|t| t.pnl < Decimal::ZERO).collect();
        let wins = winners.len() as u64;
        let losses = losers.len() as u64;

        let gross_profit: Decimal = winners.iter().map(|t| t.pnl).sum();
        let gross_loss: Decimal = losers.iter().map(|t| t.pnl.abs()).sum();

        let final_capital = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return_pct = if initial_capital.is_zero() {
            Decimal::ZERO
        } else {
            (final_capital - initial_capital) / initial_capital * dec!(100)
        };

        let win_rate_pct = if total_trades > 0 {
            Decimal::from(wins) / Decimal::from(total_trades) * dec!(100)
        } else {
            Decimal::ZERO
        };

        let profit_factor = if !gross_loss.is_zero() {
            gross_profit / gross_loss
        } else if gross_profit > Decimal::ZERO {
            PROFIT_FACTOR_CAP
        } else {
            Decimal::ZERO
        };

        let average_win = if wins > 0 {
            gross_profit / Decimal::from(wins)
        } else {
            Decimal::ZERO
        };
        let average_loss = if losses > 0 {
            gross_loss / Decimal::from(losses)
        } else {
            Decimal::ZERO
        };

        // Expectancy per trade in currency: win_rate x avg_win - loss_rate x avg_loss.
        let expectancy = if total_trades > 0 {
            let total = Decimal::from(total_trades);
            (Decimal::from(wins) / total) * average_win
                - (Decimal::from(losses) / total) * average_loss
        } else {
            Decimal::ZERO
        };

        let avg_r_multiple = if total_trades > 0 {
            trades.iter().map(|t| t.r_multiple).sum::<Decimal>() / Decimal::from(total_trades)
        } else {
            Decimal::ZERO
        };

        let (sharpe_ratio, sortino_ratio) = Self::risk_adjusted_ratios(trades);

        // Recomputed peak-to-trough from the equity curve rather than trusting
        // the loop's running figure, so accumulated drift cannot leak in.
        let max_drawdown_pct = Self::max_drawdown(equity_curve);

        let cagr_pct = Self::cagr(initial_capital, final_capital, equity_curve);

        BacktestResult {
            initial_capital,
            final_capital,
            total_return_pct,
            cagr_pct,
            total_trades,
            winning_trades: wins,
            losing_trades: losses,
            win_rate_pct,
            profit_factor,
            expectancy,
            avg_r_multiple,
            average_win,
            average_loss,
            gross_profit,
            gross_loss,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown_pct,
            trades: trades.to_vec(),
            equity_curve: equity_curve.to_vec(),
            drawdown_curve: drawdown_curve.to_vec(),
        }
    }

    /// Sharpe and Sortino from per-trade returns, annualized by sqrt(252).
    /// Zero denominators yield zero, never NaN or infinity.
    fn risk_adjusted_ratios(trades: &[TradeRecord]) -> (Decimal, Decimal) {
        if trades.is_empty() {
            return (Decimal::ZERO, Decimal::ZERO);
        }

        let returns: Vec<f64> = trades
            .iter()
            .map(|t| {
                let pct: f64 = t.pnl_pct.try_into().unwrap_or(0.0);
                pct / 100.0
            })
            .collect();

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let sharpe = if std_dev > 0.0 {
            mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        let downside: Vec<f64> = returns.iter().filter(|r| **r < 0.0).copied().collect();
        let downside_dev = if downside.is_empty() {
            0.0
        } else {
            (downside.iter().map(|r| r.powi(2)).sum::<f64>() / downside.len() as f64).sqrt()
        };
        let sortino = if downside_dev > 0.0 {
            mean / downside_dev * TRADING_DAYS_PER_YEAR.sqrt()
        } else {
            0.0
        };

        (
            Decimal::try_from(sharpe).unwrap_or(Decimal::ZERO),
            Decimal::try_from(sortino).unwrap_or(Decimal::ZERO),
        )
    }

    fn max_drawdown(equity_curve: &[EquityPoint]) -> Decimal {
        let mut peak = Decimal::MIN;
        let mut max_dd = Decimal::ZERO;
        for point in equity_curve {
            if point.equity > peak {
                peak = point.equity;
            }
            if peak > Decimal::ZERO {
                let dd = (peak - point.equity) / peak * dec!(100);
                if dd > max_dd {
                    max_dd = dd;
                }
            }
        }
        max_dd
    }

    /// Compound annual growth rate from wall-clock time between the first and
    /// last equity points. Zero elapsed years, or non-positive capital on
    /// either end, yields zero.
    fn cagr(
        initial_capital: Decimal,
        final_capital: Decimal,
        equity_curve: &[EquityPoint],
    ) -> Decimal {
        let (first, last) = match (equity_curve.first(), equity_curve.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Decimal::ZERO,
        };

        let seconds = (last.time - first.time).num_seconds();
        if seconds <= 0 {
            return Decimal::ZERO;
        }
        let years = seconds as f64 / (365.0 * 24.0 * 3600.0);

        if initial_capital <= Decimal::ZERO || final_capital <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let initial: f64 = initial_capital.try_into().unwrap_or(0.0);
        let fin: f64 = final_capital.try_into().unwrap_or(0.0);
        if initial <= 0.0 || fin <= 0.0 {
            return Decimal::ZERO;
        }

        let growth = (fin / initial).powf(1.0 / years) - 1.0;
        Decimal::try_from(growth * 100.0).unwrap_or(Decimal::ZERO)
    }
}
