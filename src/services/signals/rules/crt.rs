//! Candle range theory: a reference range candle followed by a liquidity
//! sweep that pierces one side, closes back inside and leaves a wick.
//!
//! The setup only fires in the discount half of the swing range for buys
//! (premium for sells) and produces a pending setup; entry waits for the
//! third candle.

use super::Rule;
use crate::services::signals::context::MarketContext;
use crate::services::signals::patterns::{is_pin_bar, PinBarOptions};
use crate::services::signals::structure::{premium_discount, swing_range};
use crate::types::{
    Candle, Direction, PendingSetup, PriceZone, Rationale, Setup, Signal, SignalKind,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrtConfig {
    /// Largest share of the range candle the sweep candle may overlap.
    pub max_overlap: f64,
    /// Minimum pierced-side wick as a share of the sweep candle's range.
    pub min_tail: f64,
    pub swing_lookback: usize,
    /// Only evaluate while the minutes left in the current candle fall in
    /// `[min, max]`.
    pub close_window: Option<(i64, i64)>,
}

impl Default for CrtConfig {
    fn default() -> Self {
        Self {
            max_overlap: 0.35,
            min_tail: 0.2,
            swing_lookback: 40,
            close_window: None,
        }
    }
}

pub struct CrtRule {
    direction: Direction,
    config: CrtConfig,
}

impl CrtRule {
    pub fn new(direction: Direction, config: CrtConfig) -> Self {
        Self { direction, config }
    }

    fn in_close_window(&self, ctx: &MarketContext) -> bool {
        match self.config.close_window {
            Some((min, max)) => {
                let minutes = ctx.timeframe.time_to_close_ms(ctx.now_ms) / 60_000;
                (min..=max).contains(&minutes)
            }
            None => true,
        }
    }

    fn swept(&self, range: &Candle, sweep: &Candle) -> bool {
        match self.direction {
            Direction::Long => sweep.low < range.low && sweep.close > range.low,
            Direction::Short => sweep.high > range.high && sweep.close < range.high,
        }
    }
}

/// Share of the range candle's `[low, high]` covered by the sweep candle.
/// `None` for a zero-range reference candle.
pub fn overlap_ratio(range: &Candle, sweep: &Candle) -> Option<f64> {
    let span = range.range();
    if span <= 0.0 {
        return None;
    }
    let overlap = (sweep.high.min(range.high) - sweep.low.max(range.low)).max(0.0);
    Some(overlap / span)
}

impl Rule for CrtRule {
    fn kind(&self) -> SignalKind {
        match self.direction {
            Direction::Long => SignalKind::CrtBuy,
            Direction::Short => SignalKind::CrtSell,
        }
    }

    fn name(&self) -> &str {
        match self.direction {
            Direction::Long => "CRT Buy",
            Direction::Short => "CRT Sell",
        }
    }

    fn min_candles(&self) -> usize {
        2
    }

    fn evaluate(&self, ctx: &MarketContext) -> Option<Signal> {
        if !self.in_close_window(ctx) {
            return None;
        }

        let (range, sweep) = ctx.last_pair()?;
        if overlap_ratio(range, sweep)? > self.config.max_overlap {
            return None;
        }

        if !self.swept(range, sweep) {
            return None;
        }

        let wick = PinBarOptions {
            max_body_ratio: 1.0,
            min_tail_ratio: self.config.min_tail,
        };
        if !is_pin_bar(sweep, self.direction, &wick) {
            return None;
        }

        let swing = swing_range(&ctx.candles, self.config.swing_lookback)?;
        let zone = premium_discount(sweep.close, &swing);
        let required = match self.direction {
            Direction::Long => PriceZone::Discount,
            Direction::Short => PriceZone::Premium,
        };
        if zone != required {
            return None;
        }

        let sweep_extreme = match self.direction {
            Direction::Long => sweep.low,
            Direction::Short => sweep.high,
        };
        let setup = PendingSetup {
            direction: self.direction,
            range_high: range.high,
            range_low: range.low,
            sweep_extreme,
            close: sweep.close,
            zone,
            swing,
        };
        let rationale = Rationale {
            swing_extreme: Some(sweep_extreme),
            price_zone: Some(zone),
            ..Rationale::default()
        };
        let summary = format!(
            "Sweep {} in {} zone, wait for candle 3 entry",
            match self.direction {
                Direction::Long => "below range low",
                Direction::Short => "above range high",
            },
            zone.label()
        );

        Some(Signal::new(
            &ctx.symbol,
            ctx.timeframe,
            self.kind(),
            Setup::Pending(setup),
            rationale,
            summary,
        ))
    }
}
