//! Counter-trend reversal at the edge of the recent swing range.
//!
//! A top needs the candle to reach the swing high, a bearish reversal candle,
//! overbought RSI, bearish divergence and a close that has not run far from
//! EMA50/EMA200. Bottoms mirror it.

use super::Rule;
use crate::services::signals::indicators::MacdParams;
use crate::services::signals::context::MarketContext;
use crate::services::signals::patterns::{is_confirmation, ConfirmationOptions};
use crate::services::signals::structure::{
    has_divergence, near_ema, DEFAULT_DIVERGENCE_LOOKBACK, DEFAULT_EMA_PROXIMITY,
};
use crate::types::{Direction, Rationale, Setup, Signal, SignalKind, TradePlan};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingReversalConfig {
    /// How close (relative) the candle must reach to the swing extreme.
    pub extreme_tolerance: f64,
    pub overbought: f64,
    pub oversold: f64,
    pub divergence_lookback: usize,
    pub ema_proximity: f64,
    pub confirmation: ConfirmationOptions,
    /// Stop beyond the swing extreme; `None` uses the timeframe default.
    pub stop_buffer: Option<f64>,
}

impl Default for SwingReversalConfig {
    fn default() -> Self {
        Self {
            extreme_tolerance: 0.002,
            overbought: 70.0,
            oversold: 30.0,
            divergence_lookback: DEFAULT_DIVERGENCE_LOOKBACK,
            ema_proximity: DEFAULT_EMA_PROXIMITY,
            confirmation: ConfirmationOptions::default(),
            stop_buffer: None,
        }
    }
}

pub struct SwingReversalRule {
    direction: Direction,
    config: SwingReversalConfig,
    targets: [f64; 3],
}

impl SwingReversalRule {
    pub fn new(direction: Direction, config: SwingReversalConfig, targets: [f64; 3]) -> Self {
        Self {
            direction,
            config,
            targets,
        }
    }

    fn rsi_extreme(&self, rsi: f64) -> bool {
        match self.direction {
            Direction::Long => rsi < self.config.oversold,
            Direction::Short => rsi > self.config.overbought,
        }
    }
}

impl Rule for SwingReversalRule {
    fn kind(&self) -> SignalKind {
        match self.direction {
            Direction::Long => SignalKind::BottomLong,
            Direction::Short => SignalKind::TopShort,
        }
    }

    fn name(&self) -> &str {
        match self.direction {
            Direction::Long => "Swing Bottom Long",
            Direction::Short => "Swing Top Short",
        }
    }

    fn min_candles(&self) -> usize {
        // MACD line needs `lookback` points after its warmup
        self.config.divergence_lookback + MacdParams::default().slow_period - 1
    }

    fn evaluate(&self, ctx: &MarketContext) -> Option<Signal> {
        let direction = self.direction;
        let tolerance = self.config.extreme_tolerance;

        let swing = ctx.swing?;
        let (prev, curr) = ctx.last_pair()?;
        let extreme = match direction {
            Direction::Long => swing.low.price,
            Direction::Short => swing.high.price,
        };
        let at_extreme = match direction {
            Direction::Long => curr.low <= extreme * (1.0 + tolerance),
            Direction::Short => curr.high >= extreme * (1.0 - tolerance),
        };
        if !at_extreme {
            return None;
        }

        let rsi = ctx.last_rsi()?;
        if !self.rsi_extreme(rsi) {
            return None;
        }

        if !is_confirmation(prev, curr, direction, &self.config.confirmation) {
            return None;
        }

        let proximity = self.config.ema_proximity;
        let near50 = ctx.ema50.is_some_and(|e| near_ema(curr.close, e, proximity));
        let near200 = ctx.ema200.is_some_and(|e| near_ema(curr.close, e, proximity));
        if !near50 && !near200 {
            return None;
        }

        if !has_divergence(
            direction,
            &ctx.closes,
            &ctx.rsi,
            &ctx.macd_line,
            self.config.divergence_lookback,
        ) {
            return None;
        }

        let buffer = self
            .config
            .stop_buffer
            .unwrap_or_else(|| ctx.timeframe.reversal_stop_buffer());
        let stop = match direction {
            Direction::Long => extreme * (1.0 - buffer),
            Direction::Short => extreme * (1.0 + buffer),
        };
        let plan = TradePlan::from_risk(direction, curr.close, stop, self.targets)?;

        let near_label = if near50 { "EMA50" } else { "EMA200" };
        let rationale = Rationale {
            rsi: Some(rsi),
            ema50: ctx.ema50,
            ema200: ctx.ema200,
            divergence: Some(true),
            swing_extreme: Some(extreme),
            near_ema: Some(near_label.to_string()),
            ..Rationale::default()
        };
        let summary = format!(
            "RSI={:.2} at swing {} {:.5}, {} divergence, near {}",
            rsi,
            match direction {
                Direction::Long => "low",
                Direction::Short => "high",
            },
            extreme,
            match direction {
                Direction::Long => "bullish",
                Direction::Short => "bearish",
            },
            near_label
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
