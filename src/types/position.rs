use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::Direction;

/// Transient open-position state, owned exclusively by the simulation loop.
/// At most one position exists at any bar index.
#[derive(Debug, Clone)]
pub struct Position {
    pub direction: Direction,
    pub entry_time: DateTime<Utc>,
    pub entry_index: usize,
    pub entry_price: Decimal,
    /// Notional committed at entry: capital at entry x risk_percent / 100.
    pub position_size: Decimal,
    /// Stop distance used for R-multiples (ATR x stop_loss_atr, else 2% of entry).
    pub stop_distance: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

impl Position {
    /// Signed fractional return of closing at `exit_price`.
    pub fn signed_return(&self, exit_price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        let raw = (exit_price - self.entry_price) / self.entry_price;
        match self.direction {
            Direction::Long => raw,
            Direction::Short => -raw,
        }
    }
}
