use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Immutable description of a strategy under test.
///
/// `risk_percent` is the fraction of capital (in percent) risked per trade;
/// the optional ATR multipliers derive protective stop/target levels from the
/// entry bar's ATR. When `stop_loss_atr` is absent, R-multiples fall back to
/// a 2% stop distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub name: String,
    pub params: StrategyParams,
    pub risk_percent: Decimal,
    pub stop_loss_atr: Option<Decimal>,
    pub take_profit_atr: Option<Decimal>,
}

impl StrategyProfile {
    pub fn new(name: &str, params: StrategyParams) -> Self {
        Self {
            name: name.to_string(),
            params,
            risk_percent: dec!(2),
            stop_loss_atr: None,
            take_profit_atr: None,
        }
    }

    pub fn with_risk_percent(mut self, risk_percent: Decimal) -> Self {
        self.risk_percent = risk_percent;
        self
    }

    pub fn with_stops(mut self, stop_loss_atr: Decimal, take_profit_atr: Decimal) -> Self {
        self.stop_loss_atr = Some(stop_loss_atr);
        self.take_profit_atr = Some(take_profit_atr);
        self
    }
}

/// Closed set of strategy types, each variant carrying only the knobs its
/// rule reads. Serialized with a `type` tag so profiles stored by callers
/// stay self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyParams {
    EmaCross {
        fast_period: usize,
        slow_period: usize,
    },
    RsiExtremes {
        period: usize,
        oversold: Decimal,
        overbought: Decimal,
    },
    AtrBreakout {
        period: usize,
        atr_multiplier: Decimal,
    },
    /// Reserved extension point; evaluating it is a caller error.
    FundingDivergence,
    /// Reserved extension point; evaluating it is a caller error.
    Custom,
}

impl StrategyParams {
    pub fn ema_cross(fast_period: usize, slow_period: usize) -> Self {
        StrategyParams::EmaCross {
            fast_period,
            slow_period,
        }
    }

    pub fn rsi_extremes(period: usize, oversold: Decimal, overbought: Decimal) -> Self {
        StrategyParams::RsiExtremes {
            period,
            oversold,
            overbought,
        }
    }

    pub fn atr_breakout(period: usize, atr_multiplier: Decimal) -> Self {
        StrategyParams::AtrBreakout {
            period,
            atr_multiplier,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StrategyParams::EmaCross { .. } => "EMA_CROSS",
            StrategyParams::RsiExtremes { .. } => "RSI_EXTREMES",
            StrategyParams::AtrBreakout { .. } => "ATR_BREAKOUT",
            StrategyParams::FundingDivergence => "FUNDING_DIVERGENCE",
            StrategyParams::Custom => "CUSTOM",
        }
    }
}
