//! Trend continuation on a pullback into the 0.5–0.618 retracement band,
//! at a support/resistance zone, with EMA50 confluence and a confirming
//! candle.

use super::{candle_stop, ema_order_label, emas_aligned, within, Rule};
use crate::services::signals::context::MarketContext;
use crate::services::signals::patterns::{is_confirmation, ConfirmationOptions};
use crate::services::signals::structure::{
    fib_zone, nearest_zone, DEFAULT_EMA_CONFLUENCE_TOLERANCE, DEFAULT_ZONE_PROXIMITY,
};
use crate::types::{Direction, Rationale, Setup, Signal, SignalKind, TradePlan};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiboPullbackConfig {
    pub long_rsi: (f64, f64),
    pub short_rsi: (f64, f64),
    /// Relative distance from the candle extreme to a zone edge.
    pub zone_proximity: f64,
    /// Relative distance EMA50 may sit outside the retracement band.
    pub ema_confluence_tolerance: f64,
    pub confirmation: ConfirmationOptions,
    pub stop_buffer: f64,
}

impl Default for FiboPullbackConfig {
    fn default() -> Self {
        Self {
            long_rsi: (30.0, 50.0),
            short_rsi: (50.0, 100.0),
            zone_proximity: DEFAULT_ZONE_PROXIMITY,
            ema_confluence_tolerance: DEFAULT_EMA_CONFLUENCE_TOLERANCE,
            confirmation: ConfirmationOptions::default(),
            stop_buffer: 0.005,
        }
    }
}

pub struct FiboPullbackRule {
    direction: Direction,
    config: FiboPullbackConfig,
    targets: [f64; 3],
}

impl FiboPullbackRule {
    pub fn new(direction: Direction, config: FiboPullbackConfig, targets: [f64; 3]) -> Self {
        Self {
            direction,
            config,
            targets,
        }
    }
}

impl Rule for FiboPullbackRule {
    fn kind(&self) -> SignalKind {
        match self.direction {
            Direction::Long => SignalKind::FiboLong,
            Direction::Short => SignalKind::FiboShort,
        }
    }

    fn name(&self) -> &str {
        match self.direction {
            Direction::Long => "Fibo Pullback Long",
            Direction::Short => "Fibo Pullback Short",
        }
    }

    fn min_candles(&self) -> usize {
        200
    }

    fn evaluate(&self, ctx: &MarketContext) -> Option<Signal> {
        let direction = self.direction;

        let stack = ctx.ema_stack()?;
        if !emas_aligned(direction, stack) {
            return None;
        }

        let rsi = ctx.last_rsi()?;
        let band = match direction {
            Direction::Long => self.config.long_rsi,
            Direction::Short => self.config.short_rsi,
        };
        if !within(rsi, band) || !ctx.trend.trend.supports(direction) {
            return None;
        }

        let (prev, curr) = ctx.last_pair()?;
        let zone = match direction {
            Direction::Long => {
                nearest_zone(curr.low, &ctx.zones.supports, self.config.zone_proximity)
            }
            Direction::Short => {
                nearest_zone(curr.high, &ctx.zones.resistances, self.config.zone_proximity)
            }
        }?;

        let swing = ctx.swing?;
        let fib = fib_zone(&swing, direction);
        let (ema20, ema50, ema200) = stack;
        if !fib.intersects(curr) || !fib.has_confluence(ema50, self.config.ema_confluence_tolerance)
        {
            return None;
        }

        if !is_confirmation(prev, curr, direction, &self.config.confirmation) {
            return None;
        }

        let stop = candle_stop(curr, direction, self.config.stop_buffer);
        let plan = TradePlan::from_risk(direction, curr.close, stop, self.targets)?;

        let rationale = Rationale {
            rsi: Some(rsi),
            ema20: Some(ema20),
            ema50: Some(ema50),
            ema200: Some(ema200),
            trend_slope: Some(ctx.trend.slope),
            zone: Some(zone),
            fib_zone: Some(fib),
            ..Rationale::default()
        };
        let summary = format!(
            "{}, RSI={:.2}, pullback into Fibo [{:.2} - {:.2}] with EMA50 {:.2}",
            ema_order_label(direction),
            rsi,
            fib.lower,
            fib.upper,
            ema50
        );

        Some(Signal::new(
            &ctx.symbol,
            ctx.timeframe,
            self.kind(),
            Setup::Trade(plan),
            rationale,
            summary,
        ))
    }
}
