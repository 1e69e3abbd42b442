use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::StrategyProfile;

use super::results::{BacktestResult, DrawdownPoint, EquityPoint, MetricsCalculator, TradeRecord};

pub const DEFAULT_SIMULATIONS: usize = 1000;

/// Total return below which a simulation counts as ruin.
const RUIN_RETURN_PCT: Decimal = dec!(-50);

/// Empirical outcome distributions from bootstrap-resampling the realized
/// trade sequence.
///
/// The bootstrap draws trades independently with replacement, which discards
/// any serial correlation between consecutive outcomes (regime persistence);
/// that is a deliberate simplifying assumption of this resampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub simulations: usize,
    pub return_distribution: Vec<Decimal>,
    pub sharpe_distribution: Vec<Decimal>,
    pub max_drawdown_distribution: Vec<Decimal>,
    pub win_rate_distribution: Vec<Decimal>,
    pub return_percentiles: ReturnPercentiles,
    /// Percentage of simulations whose total return fell below -50%.
    pub risk_of_ruin_pct: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnPercentiles {
    pub p5: Decimal,
    pub p25: Decimal,
    pub p50: Decimal,
    pub p75: Decimal,
    pub p95: Decimal,
}

impl MonteCarloResult {
    fn empty(simulations: usize) -> Self {
        Self {
            simulations,
            return_distribution: Vec::new(),
            sharpe_distribution: Vec::new(),
            max_drawdown_distribution: Vec::new(),
            win_rate_distribution: Vec::new(),
            return_percentiles: ReturnPercentiles {
                p5: Decimal::ZERO,
                p25: Decimal::ZERO,
                p50: Decimal::ZERO,
                p75: Decimal::ZERO,
                p95: Decimal::ZERO,
            },
            risk_of_ruin_pct: Decimal::ZERO,
        }
    }
}

/// Bootstrap the base result's trades across `simulations` resampled runs.
///
/// Only this operation is randomized; it draws from `thread_rng`. Use
/// [`run_monte_carlo_with_rng`] with a seeded generator when reproducible
/// distributions are needed.
pub fn run_monte_carlo(
    profile: &StrategyProfile,
    base: &BacktestResult,
    simulations: usize,
) -> MonteCarloResult {
    run_monte_carlo_with_rng(profile, base, simulations, &mut rand::thread_rng())
}

pub fn run_monte_carlo_with_rng<R: Rng>(
    profile: &StrategyProfile,
    base: &BacktestResult,
    simulations: usize,
    rng: &mut R,
) -> MonteCarloResult {
    if base.trades.is_empty() || simulations == 0 {
        return MonteCarloResult::empty(simulations);
    }

    let n_trades = base.trades.len();
    // Chronological exit times reused positionally, so every re-derived
    // curve stays monotonic in time.
    let exit_times: Vec<_> = base.trades.iter().map(|t| t.exit_time).collect();

    let mut returns = Vec::with_capacity(simulations);
    let mut sharpes = Vec::with_capacity(simulations);
    let mut drawdowns = Vec::with_capacity(simulations);
    let mut win_rates = Vec::with_capacity(simulations);
    let mut ruin_count = 0usize;

    for _ in 0..simulations {
        let mut capital = base.initial_capital;
        let mut peak = capital;
        let mut trades = Vec::with_capacity(n_trades);
        let mut equity_curve = Vec::with_capacity(n_trades);
        let mut drawdown_curve = Vec::with_capacity(n_trades);

        for slot in 0..n_trades {
            let drawn = &base.trades[rng.gen_range(0..n_trades)];

            // Re-apply the drawn trade's price return at the profile's
            // risk sizing, compounding from the original initial capital.
            let position_size = capital * profile.risk_percent / dec!(100);
            let pnl = position_size * drawn.pnl_pct / dec!(100);
            capital += pnl;

            trades.push(TradeRecord {
                pnl,
                ..drawn.clone()
            });

            if capital > peak {
                peak = capital;
            }
            let drawdown_pct = if peak > Decimal::ZERO {
                (peak - capital) / peak * dec!(100)
            } else {
                Decimal::ZERO
            };
            equity_curve.push(EquityPoint {
                time: exit_times[slot],
                equity: capital,
            });
            drawdown_curve.push(DrawdownPoint {
                time: exit_times[slot],
                drawdown_pct,
            });
        }

        let metrics = MetricsCalculator::calculate(
            base.initial_capital,
            &trades,
            &equity_curve,
            &drawdown_curve,
        );

        if metrics.total_return_pct < RUIN_RETURN_PCT {
            ruin_count += 1;
        }
        returns.push(metrics.total_return_pct);
        sharpes.push(metrics.sharpe_ratio);
        drawdowns.push(metrics.max_drawdown_pct);
        win_rates.push(metrics.win_rate_pct);
    }

    returns.sort();

    let percentiles = ReturnPercentiles {
        p5: percentile(&returns, 0.05),
        p25: percentile(&returns, 0.25),
        p50: percentile(&returns, 0.50),
        p75: percentile(&returns, 0.75),
        p95: percentile(&returns, 0.95),
    };
    let risk_of_ruin_pct =
        Decimal::from(ruin_count as u64) / Decimal::from(simulations as u64) * dec!(100);

    info!(
        strategy = %profile.name,
        simulations,
        median_return = %percentiles.p50,
        risk_of_ruin = %risk_of_ruin_pct,
        "monte carlo complete"
    );

    MonteCarloResult {
        simulations,
        return_distribution: returns,
        sharpe_distribution: sharpes,
        max_drawdown_distribution: drawdowns,
        win_rate_distribution: win_rates,
        return_percentiles: percentiles,
        risk_of_ruin_pct,
    }
}

/// Nearest-rank percentile over a sorted distribution.
fn percentile(sorted: &[Decimal], p: f64) -> Decimal {
    if sorted.is_empty() {
        return Decimal::ZERO;
    }
    let idx = ((sorted.len() as f64) * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
