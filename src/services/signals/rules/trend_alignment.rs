//! Trend-alignment entry: stacked EMAs, mid-band RSI, loose engulfing in
//! the trend direction.

use super::{candle_stop, ema_order_label, emas_aligned, within, Rule};
use crate::services::signals::context::MarketContext;
use crate::services::signals::patterns::{is_engulfing_loose, EngulfOptions};
use crate::services::signals::trend::estimate_trend;
use crate::types::{Direction, Rationale, Setup, Signal, SignalKind, TradePlan};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendAlignmentConfig {
    pub engulf: EngulfOptions,
    /// Open RSI band for longs.
    pub long_rsi: (f64, f64),
    /// Open RSI band for shorts.
    pub short_rsi: (f64, f64),
    /// Stop distance beyond the signal candle, as a fraction of price.
    pub stop_buffer: f64,
    /// Closes used for the trendline slope.
    pub trend_window: usize,
}

impl Default for TrendAlignmentConfig {
    fn default() -> Self {
        Self {
            engulf: EngulfOptions {
                min_body_pct: 0.22,
                partial_engulf_pct: 0.55,
                require_volume: false,
                ..EngulfOptions::default()
            },
            long_rsi: (40.0, 50.0),
            short_rsi: (50.0, 60.0),
            stop_buffer: 0.005,
            trend_window: 20,
        }
    }
}

pub struct TrendAlignmentRule {
    direction: Direction,
    config: TrendAlignmentConfig,
    targets: [f64; 3],
}

impl TrendAlignmentRule {
    pub fn new(direction: Direction, config: TrendAlignmentConfig, targets: [f64; 3]) -> Self {
        Self {
            direction,
            config,
            targets,
        }
    }

    fn rsi_band(&self) -> (f64, f64) {
        match self.direction {
            Direction::Long => self.config.long_rsi,
            Direction::Short => self.config.short_rsi,
        }
    }
}

impl Rule for TrendAlignmentRule {
    fn kind(&self) -> SignalKind {
        match self.direction {
            Direction::Long => SignalKind::TrendLong,
            Direction::Short => SignalKind::TrendShort,
        }
    }

    fn name(&self) -> &str {
        match self.direction {
            Direction::Long => "Trend Alignment Long",
            Direction::Short => "Trend Alignment Short",
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
        if !within(rsi, self.rsi_band()) {
            return None;
        }

        let (prev, curr) = ctx.last_pair()?;
        if !is_engulfing_loose(prev, curr, direction, &self.config.engulf) {
            return None;
        }

        let trend = estimate_trend(&ctx.closes, self.config.trend_window);
        if !trend.trend.supports(direction) {
            return None;
        }

        let stop = candle_stop(curr, direction, self.config.stop_buffer);
        let plan = TradePlan::from_risk(direction, curr.close, stop, self.targets)?;

        let (ema20, ema50, ema200) = stack;
        let rationale = Rationale {
            rsi: Some(rsi),
            ema20: Some(ema20),
            ema50: Some(ema50),
            ema200: Some(ema200),
            trend_slope: Some(trend.slope),
            ..Rationale::default()
        };
        let summary = format!(
            "{}, RSI={:.2}, {} engulfing, {}",
            ema_order_label(direction),
            rsi,
            match direction {
                Direction::Long => "bullish",
                Direction::Short => "bearish",
            },
            trend.trend.label()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signals::rules::fixtures::*;
    use crate::services::signals::rules::{RuleConfig, RuleEngine, RuleFamily, Verdict};
    use crate::types::DEFAULT_TARGET_MULTIPLES;

    fn rule(direction: Direction) -> TrendAlignmentRule {
        TrendAlignmentRule::new(direction, TrendAlignmentConfig::default(), DEFAULT_TARGET_MULTIPLES)
    }

    /// Rising troughs, stacked EMAs, RSI 45 and a bullish engulf.
    fn long_setup() -> MarketContext {
        let mut ctx = context(
            &zigzag(218, 100.0, 0.01),
            candle(103.0, 103.2, 101.9, 102.0),
            candle(101.8, 103.6, 101.6, 103.5),
        );
        ctx.ema20 = Some(103.0);
        ctx.ema50 = Some(102.0);
        ctx.ema200 = Some(100.0);
        ctx.rsi = vec![45.0];
        ctx
    }

    fn short_setup() -> MarketContext {
        let mut ctx = context(
            &zigzag(218, 100.0, -0.01),
            candle(98.0, 99.2, 97.9, 99.0),
            candle(99.2, 99.4, 97.4, 97.5),
        );
        ctx.ema20 = Some(98.0);
        ctx.ema50 = Some(99.0);
        ctx.ema200 = Some(101.0);
        ctx.rsi = vec![55.0];
        ctx
    }

    #[test]
    fn test_long_fires_with_candle_stop() {
        let signal = rule(Direction::Long).evaluate(&long_setup()).expect("long signal");
        assert_eq!(signal.kind, SignalKind::TrendLong);
        assert_eq!(signal.key.as_str(), "BTCUSDT_1h_TREND_LONG");
        assert!(signal.summary.contains("EMA20>EMA50>EMA200"));

        let plan = trade_plan(&signal);
        assert_eq!(plan.direction, Direction::Long);
        assert_plan(&plan, 103.5, 101.6 * 0.995);
        assert!(signal.rationale.trend_slope.is_some_and(|s| s > 0.0));
    }

    #[test]
    fn test_short_fires_with_candle_stop() {
        let signal = rule(Direction::Short).evaluate(&short_setup()).expect("short signal");
        assert_eq!(signal.kind, SignalKind::TrendShort);

        let plan = trade_plan(&signal);
        assert_eq!(plan.direction, Direction::Short);
        assert_plan(&plan, 97.5, 99.4 * 1.005);
    }

    #[test]
    fn test_each_side_ignores_the_other() {
        assert!(rule(Direction::Short).evaluate(&long_setup()).is_none());
        assert!(rule(Direction::Long).evaluate(&short_setup()).is_none());
    }

    #[test]
    fn test_rsi_outside_band() {
        let mut ctx = long_setup();
        ctx.rsi = vec![52.0];
        assert!(rule(Direction::Long).evaluate(&ctx).is_none());

        let mut ctx = short_setup();
        ctx.rsi = vec![48.0];
        assert!(rule(Direction::Short).evaluate(&ctx).is_none());
    }

    #[test]
    fn test_ema_order_broken() {
        let mut ctx = long_setup();
        ctx.ema20 = Some(101.0);
        assert!(rule(Direction::Long).evaluate(&ctx).is_none());

        let mut ctx = short_setup();
        ctx.ema200 = Some(98.5);
        assert!(rule(Direction::Short).evaluate(&ctx).is_none());
    }

    #[test]
    fn test_trend_disagrees() {
        // bullish engulf on top of falling troughs
        let mut ctx = context(
            &zigzag(218, 100.0, -0.01),
            candle(103.0, 103.2, 101.9, 102.0),
            candle(101.8, 103.6, 101.6, 103.5),
        );
        ctx.ema20 = Some(103.0);
        ctx.ema50 = Some(102.0);
        ctx.ema200 = Some(100.0);
        ctx.rsi = vec![45.0];
        assert!(rule(Direction::Long).evaluate(&ctx).is_none());
    }

    #[test]
    fn test_no_engulf() {
        let mut ctx = long_setup();
        let last = ctx.candles.len() - 1;
        // small bullish candle inside the previous body
        ctx.candles[last] = candle(102.2, 102.9, 102.1, 102.8);
        assert!(rule(Direction::Long).evaluate(&ctx).is_none());
    }

    #[test]
    fn test_engine_reports_fired_verdict() {
        let engine = RuleEngine::from_config(&RuleConfig::default(), &[RuleFamily::Trend]);
        let evaluation = engine.evaluate(&long_setup());

        assert!(matches!(
            &evaluation.results[0].verdict,
            Verdict::Fired(signal) if signal.kind == SignalKind::TrendLong
        ));
        assert_eq!(evaluation.results[1].verdict, Verdict::NoSignal);
    }
}
