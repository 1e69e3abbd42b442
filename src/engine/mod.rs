pub mod backtest;
pub mod monte_carlo;
pub mod results;
pub mod walk_forward;

pub use backtest::{run_backtest, MIN_HISTORY_BARS};
pub use monte_carlo::{run_monte_carlo, run_monte_carlo_with_rng, MonteCarloResult, DEFAULT_SIMULATIONS};
pub use results::{BacktestResult, DrawdownPoint, EquityPoint, ExitReason, MetricsCalculator, TradeRecord};
pub use walk_forward::{run_walk_forward, WalkForwardResult, WalkForwardWindow};
