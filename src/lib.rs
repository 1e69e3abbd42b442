//! Deterministic backtesting and technical-indicator engine.
//!
//! The engine is a pure function of (strategy profile, candle series,
//! initial capital): it walks historical bars, evaluates entry/exit rules
//! through a pre-computed indicator pipeline, realizes trades through a
//! single-position state machine, and reduces the outcome into performance
//! metrics. Robustness is estimated two ways: bootstrap resampling of the
//! realized trades ([`engine::run_monte_carlo`]) and rolling out-of-sample
//! walk-forward partitioning ([`engine::run_walk_forward`]).
//!
//! The crate performs no I/O; candles arrive through the
//! [`supplier::CandleSupplier`] contract and results are plain serializable
//! values for whatever layer renders them.

pub mod engine;
pub mod error;
pub mod indicators;
pub mod strategy;
pub mod supplier;
pub mod types;

pub use engine::{
    run_backtest, run_monte_carlo, run_walk_forward, BacktestResult, MonteCarloResult,
    WalkForwardResult,
};
pub use error::EngineError;
pub use supplier::CandleSupplier;
pub use types::{Candle, Direction, Interval, StrategyParams, StrategyProfile};
