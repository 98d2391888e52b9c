//! Candlestick pattern classifiers.
//!
//! Every classifier looks at the last one or two candles only and holds no
//! state. A zero-range candle (`high == low`) has no meaningful body ratio,
//! so any classifier that needs one returns `false` for it.

use crate::types::{Candle, Direction};

/// Thresholds for the loose engulfing classifiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngulfOptions {
    /// Minimum body / range of the current candle (doji filter).
    pub min_body_pct: f64,
    /// Fraction of the previous body the current body must overlap.
    pub partial_engulf_pct: f64,
    /// Skipped when the previous candle reports no volume.
    pub require_volume: bool,
    /// Current volume must exceed previous volume times this.
    pub volume_multiplier: f64,
    /// When set, the close must sit within `max_ema_distance` of this EMA.
    pub ema_near: Option<f64>,
    pub max_ema_distance: f64,
}

impl Default for EngulfOptions {
    fn default() -> Self {
        Self {
            min_body_pct: 0.4,
            partial_engulf_pct: 0.8,
            require_volume: true,
            volume_multiplier: 1.2,
            ema_near: None,
            max_ema_distance: 0.005,
        }
    }
}

/// Thresholds for pin-bar detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinBarOptions {
    /// Maximum body / range. `1.0` accepts any body.
    pub max_body_ratio: f64,
    /// Minimum wick / range on the rejection side.
    pub min_tail_ratio: f64,
}

impl Default for PinBarOptions {
    fn default() -> Self {
        Self {
            max_body_ratio: 0.3,
            min_tail_ratio: 0.6,
        }
    }
}

/// Default body threshold for strong bars.
pub const DEFAULT_STRONG_BODY_PCT: f64 = 0.35;

/// Strict bullish engulfing: red then green, green body wraps the red body.
pub fn is_bullish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    prev.is_bearish() && curr.is_bullish() && curr.close > prev.open && curr.open < prev.close
}

/// Strict bearish engulfing: green then red, red body wraps the green body.
pub fn is_bearish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    prev.is_bullish() && curr.is_bearish() && curr.close < prev.open && curr.open > prev.close
}

/// Bullish engulfing that also accepts a large partial engulf.
///
/// Accepts a full engulf that closes at or above the previous high, or an
/// overlap of at least `partial_engulf_pct` of the previous body with a close
/// above both the previous close and the previous high.
pub fn is_bullish_engulfing_loose(prev: &Candle, curr: &Candle, opts: &EngulfOptions) -> bool {
    if !passes_filters(prev, curr, opts) {
        return false;
    }

    let full_engulf = prev.is_bearish()
        && curr.is_bullish()
        && curr.close >= prev.high
        && curr.open <= prev.close;
    if full_engulf {
        return true;
    }

    let prev_body = prev.body();
    let overlap = curr.close.min(prev.open) - curr.open.max(prev.close);
    if prev_body > 0.0 && overlap / prev_body >= opts.partial_engulf_pct {
        return curr.close > prev.close && curr.close > prev.high;
    }

    false
}

/// Mirror of [`is_bullish_engulfing_loose`].
pub fn is_bearish_engulfing_loose(prev: &Candle, curr: &Candle, opts: &EngulfOptions) -> bool {
    if !passes_filters(prev, curr, opts) {
        return false;
    }

    let full_engulf = prev.is_bullish()
        && curr.is_bearish()
        && curr.close <= prev.low
        && curr.open >= prev.close;
    if full_engulf {
        return true;
    }

    let prev_body = prev.body();
    let overlap = prev.open.min(curr.open) - prev.close.max(curr.close);
    if prev_body > 0.0 && overlap / prev_body >= opts.partial_engulf_pct {
        return curr.close < prev.close && curr.close < prev.low;
    }

    false
}

/// Doji, volume and EMA-proximity filters shared by both engulfing sides.
fn passes_filters(prev: &Candle, curr: &Candle, opts: &EngulfOptions) -> bool {
    let Some(body_pct) = curr.body_ratio() else {
        return false;
    };
    if body_pct < opts.min_body_pct {
        return false;
    }

    // zero previous volume means the feed carries none; skip the filter
    if opts.require_volume
        && prev.volume > 0.0
        && curr.volume <= prev.volume * opts.volume_multiplier
    {
        return false;
    }

    if let Some(ema) = opts.ema_near {
        if ema <= 0.0 || (curr.close - ema).abs() / ema > opts.max_ema_distance {
            return false;
        }
    }

    true
}

/// Pin bar with the long wick on the side that `direction` rejects.
///
/// `Direction::Long` looks for a long lower wick (bullish rejection),
/// `Direction::Short` for a long upper wick.
pub fn is_pin_bar(candle: &Candle, direction: Direction, opts: &PinBarOptions) -> bool {
    let Some(body_ratio) = candle.body_ratio() else {
        return false;
    };
    if body_ratio > opts.max_body_ratio {
        return false;
    }

    let range = candle.range();
    let tail = match direction {
        Direction::Long => candle.lower_wick(),
        Direction::Short => candle.upper_wick(),
    };
    tail / range >= opts.min_tail_ratio
}

pub fn is_strong_bullish(prev: &Candle, curr: &Candle, min_body_pct: f64) -> bool {
    curr.is_bullish()
        && curr.close > prev.close
        && curr.body_ratio().is_some_and(|r| r >= min_body_pct)
}

pub fn is_strong_bearish(prev: &Candle, curr: &Candle, min_body_pct: f64) -> bool {
    curr.is_bearish()
        && curr.close < prev.close
        && curr.body_ratio().is_some_and(|r| r >= min_body_pct)
}

/// Options for the "any reversal candle" check used by the pullback and
/// swing-reversal rules.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConfirmationOptions {
    pub pin_bar: PinBarOptions,
    pub engulf: EngulfOptions,
    pub strong_body_pct: Option<f64>,
}

impl ConfirmationOptions {
    fn strong_body(&self) -> f64 {
        self.strong_body_pct.unwrap_or(DEFAULT_STRONG_BODY_PCT)
    }
}

/// Pin bar, loose engulfing or strong bar in `direction`.
pub fn is_confirmation(
    prev: &Candle,
    curr: &Candle,
    direction: Direction,
    opts: &ConfirmationOptions,
) -> bool {
    match direction {
        Direction::Long => {
            is_pin_bar(curr, Direction::Long, &opts.pin_bar)
                || is_bullish_engulfing_loose(prev, curr, &opts.engulf)
                || is_strong_bullish(prev, curr, opts.strong_body())
        }
        Direction::Short => {
            is_pin_bar(curr, Direction::Short, &opts.pin_bar)
                || is_bearish_engulfing_loose(prev, curr, &opts.engulf)
                || is_strong_bearish(prev, curr, opts.strong_body())
        }
    }
}

pub fn bullish_confirmation(prev: &Candle, curr: &Candle, opts: &ConfirmationOptions) -> bool {
    is_confirmation(prev, curr, Direction::Long, opts)
}

pub fn bearish_confirmation(prev: &Candle, curr: &Candle, opts: &ConfirmationOptions) -> bool {
    is_confirmation(prev, curr, Direction::Short, opts)
}

/// Loose engulfing in `direction`.
pub fn is_engulfing_loose(
    prev: &Candle,
    curr: &Candle,
    direction: Direction,
    opts: &EngulfOptions,
) -> bool {
    match direction {
        Direction::Long => is_bullish_engulfing_loose(prev, curr, opts),
        Direction::Short => is_bearish_engulfing_loose(prev, curr, opts),
    }
}
