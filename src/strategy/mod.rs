pub mod bundle;

pub use bundle::IndicatorBundle;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::EngineError;
use crate::types::{Direction, StrategyParams, StrategyProfile};

/// Momentum look-back for the breakout rule's direction.
const MOMENTUM_BARS: usize = 10;
/// ATR contraction factor that closes breakout positions.
const ATR_EXIT_FACTOR: Decimal = dec!(0.8);

/// Per-bar decision of a strategy rule.
///
/// Exit flags are direction-tagged so the stateless evaluator never needs to
/// know what position the loop holds: the loop closes a long when
/// `exit_long` fires, a short when `exit_short` fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Evaluation {
    pub entry: Option<Direction>,
    pub exit_long: bool,
    pub exit_short: bool,
}

impl Evaluation {
    pub fn hold() -> Self {
        Self::default()
    }
}

/// Evaluate a profile's rule at `bar`.
///
/// Reads only `bar` and `bar - 1` from the bundle, never a later index.
/// Bars whose indicators are still seeding evaluate to hold. Reserved
/// strategy types fail fast.
pub fn evaluate(
    profile: &StrategyProfile,
    bar: usize,
    bundle: &IndicatorBundle,
) -> Result<Evaluation, EngineError> {
    if bar == 0 || bar >= bundle.len() {
        return Ok(Evaluation::hold());
    }

    match &profile.params {
        StrategyParams::EmaCross { .. } => Ok(evaluate_ema_cross(bar, bundle)),
        StrategyParams::RsiExtremes {
            oversold,
            overbought,
            ..
        } => Ok(evaluate_rsi_extremes(bar, bundle, *oversold, *overbought)),
        StrategyParams::AtrBreakout { atr_multiplier, .. } => {
            Ok(evaluate_atr_breakout(bar, bundle, *atr_multiplier))
        }
        StrategyParams::FundingDivergence | StrategyParams::Custom => {
            Err(EngineError::UnsupportedStrategy(profile.params.kind()))
        }
    }
}

/// Any cross fires both an entry (in the cross direction) and an exit for a
/// position held the other way.
fn evaluate_ema_cross(bar: usize, bundle: &IndicatorBundle) -> Evaluation {
    let (f_prev, f_cur, s_prev, s_cur) = match (
        bundle.fast_ema[bar - 1],
        bundle.fast_ema[bar],
        bundle.slow_ema[bar - 1],
        bundle.slow_ema[bar],
    ) {
        (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
        _ => return Evaluation::hold(),
    };

    if f_prev <= s_prev && f_cur > s_cur {
        Evaluation {
            entry: Some(Direction::Long),
            exit_long: false,
            exit_short: true,
        }
    } else if f_prev >= s_prev && f_cur < s_cur {
        Evaluation {
            entry: Some(Direction::Short),
            exit_long: true,
            exit_short: false,
        }
    } else {
        Evaluation::hold()
    }
}

/// Entries on threshold crosses into the extremes; exits when the RSI
/// recrosses 50 from the side the position was entered on.
fn evaluate_rsi_extremes(
    bar: usize,
    bundle: &IndicatorBundle,
    oversold: Decimal,
    overbought: Decimal,
) -> Evaluation {
    let (prev, cur) = match (bundle.rsi[bar - 1], bundle.rsi[bar]) {
        (Some(p), Some(c)) => (p, c),
        _ => return Evaluation::hold(),
    };

    let midline = dec!(50);
    let mut eval = Evaluation::hold();

    if prev >= oversold && cur < oversold {
        eval.entry = Some(Direction::Long);
    } else if prev <= overbought && cur > overbought {
        eval.entry = Some(Direction::Short);
    }

    if prev < midline && cur >= midline {
        eval.exit_long = true;
    } else if prev > midline && cur <= midline {
        eval.exit_short = true;
    }

    eval
}

/// Entry when the ATR expands past `multiplier` times its trailing 20-bar
/// average, direction taken from the sign of 10-bar price momentum; exit
/// when the ATR contracts below 0.8x that average.
fn evaluate_atr_breakout(
    bar: usize,
    bundle: &IndicatorBundle,
    atr_multiplier: Decimal,
) -> Evaluation {
    let (atr, average) = match (bundle.atr[bar], bundle.atr_average[bar]) {
        (Some(a), Some(avg)) => (a, avg),
        _ => return Evaluation::hold(),
    };

    let mut eval = Evaluation::hold();

    if atr > atr_multiplier * average && bar >= MOMENTUM_BARS {
        let momentum = bundle.closes[bar] - bundle.closes[bar - MOMENTUM_BARS];
        if momentum > Decimal::ZERO {
            eval.entry = Some(Direction::Long);
        } else if momentum < Decimal::ZERO {
            eval.entry = Some(Direction::Short);
        }
    }

    if atr < ATR_EXIT_FACTOR * average {
        eval.exit_long = true;
        eval.exit_short = true;
    }

    eval
}
