//! Composite signal rules.
//!
//! Each rule family is instantiated once per direction. A rule reads the
//! shared [`MarketContext`] and either fires a [`Signal`] or stays quiet; the
//! [`RuleEngine`] runs every enabled rule over a context and reports one
//! result per rule.

pub mod crt;
pub mod fibo_pullback;
pub mod swing_reversal;
pub mod trend_alignment;

pub use crt::{CrtConfig, CrtRule};
pub use fibo_pullback::{FiboPullbackConfig, FiboPullbackRule};
pub use swing_reversal::{SwingReversalConfig, SwingReversalRule};
pub use trend_alignment::{TrendAlignmentConfig, TrendAlignmentRule};

use super::context::MarketContext;
use crate::types::{Candle, Direction, Signal, SignalKind, DEFAULT_TARGET_MULTIPLES};
use tracing::debug;

/// Trait for implementing signal rules.
pub trait Rule: Send + Sync {
    /// Signal kind this rule emits.
    fn kind(&self) -> SignalKind;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Minimum number of candles required before the rule can fire.
    fn min_candles(&self) -> usize;

    /// Evaluate the rule against a prepared context.
    /// Returns None when any guard fails.
    fn evaluate(&self, ctx: &MarketContext) -> Option<Signal>;
}

/// Rule families that can be enabled from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFamily {
    Trend,
    Fibo,
    Reversal,
    Crt,
}

impl RuleFamily {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trend" | "trend_alignment" => Some(Self::Trend),
            "fibo" | "fibonacci" | "pullback" => Some(Self::Fibo),
            "reversal" | "swing" | "top_bottom" => Some(Self::Reversal),
            "crt" => Some(Self::Crt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::Fibo => "fibo",
            Self::Reversal => "reversal",
            Self::Crt => "crt",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::Trend, Self::Fibo, Self::Reversal, Self::Crt]
    }
}

/// Thresholds for every rule family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleConfig {
    pub trend: TrendAlignmentConfig,
    pub fibo: FiboPullbackConfig,
    pub reversal: SwingReversalConfig,
    pub crt: CrtConfig,
    /// Risk multiples for TP1..TP3.
    pub target_multiples: [f64; 3],
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            trend: TrendAlignmentConfig::default(),
            fibo: FiboPullbackConfig::default(),
            reversal: SwingReversalConfig::default(),
            crt: CrtConfig::default(),
            target_multiples: DEFAULT_TARGET_MULTIPLES,
        }
    }
}

/// Outcome of one rule over one context.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Fired(Signal),
    NoSignal,
    InsufficientHistory { needed: usize, got: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub rule: String,
    pub kind: SignalKind,
    pub verdict: Verdict,
}

/// Every rule's result for one (symbol, timeframe) pair, in rule order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub results: Vec<RuleResult>,
}

impl Evaluation {
    pub fn fired(&self) -> impl Iterator<Item = &Signal> {
        self.results.iter().filter_map(|r| match &r.verdict {
            Verdict::Fired(signal) => Some(signal),
            _ => None,
        })
    }

    pub fn into_signals(self) -> Vec<Signal> {
        self.results
            .into_iter()
            .filter_map(|r| match r.verdict {
                Verdict::Fired(signal) => Some(signal),
                _ => None,
            })
            .collect()
    }

    /// True when no rule fired.
    pub fn is_quiet(&self) -> bool {
        self.fired().next().is_none()
    }
}

/// Ordered collection of rules run over each context.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Self {
        Self { rules }
    }

    /// Long and short instances of each enabled family, in family order.
    pub fn from_config(config: &RuleConfig, families: &[RuleFamily]) -> Self {
        let targets = config.target_multiples;
        let mut rules: Vec<Box<dyn Rule>> = Vec::new();

        for family in families {
            for direction in [Direction::Long, Direction::Short] {
                let rule: Box<dyn Rule> = match family {
                    RuleFamily::Trend => {
                        Box::new(TrendAlignmentRule::new(direction, config.trend, targets))
                    }
                    RuleFamily::Fibo => {
                        Box::new(FiboPullbackRule::new(direction, config.fibo, targets))
                    }
                    RuleFamily::Reversal => {
                        Box::new(SwingReversalRule::new(direction, config.reversal, targets))
                    }
                    RuleFamily::Crt => Box::new(CrtRule::new(direction, config.crt)),
                };
                rules.push(rule);
            }
        }

        Self { rules }
    }

    pub fn with_defaults() -> Self {
        Self::from_config(&RuleConfig::default(), &RuleFamily::all())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names of the loaded rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Largest history any loaded rule needs.
    pub fn max_min_candles(&self) -> usize {
        self.rules.iter().map(|r| r.min_candles()).max().unwrap_or(0)
    }

    pub fn evaluate(&self, ctx: &MarketContext) -> Evaluation {
        let results = self
            .rules
            .iter()
            .map(|rule| {
                let needed = rule.min_candles();
                let verdict = if ctx.len() < needed {
                    Verdict::InsufficientHistory {
                        needed,
                        got: ctx.len(),
                    }
                } else {
                    match rule.evaluate(ctx) {
                        Some(signal) => {
                            debug!(
                                "{} fired for {} {}: {}",
                                rule.name(),
                                ctx.symbol,
                                ctx.timeframe,
                                signal.summary
                            );
                            Verdict::Fired(signal)
                        }
                        None => Verdict::NoSignal,
                    }
                };
                RuleResult {
                    rule: rule.name().to_string(),
                    kind: rule.kind(),
                    verdict,
                }
            })
            .collect();

        Evaluation { results }
    }
}

// ============================================================================
// Shared guards
// ============================================================================

/// EMA20 > EMA50 > EMA200 for longs, reversed for shorts.
pub(crate) fn emas_aligned(direction: Direction, stack: (f64, f64, f64)) -> bool {
    let (ema20, ema50, ema200) = stack;
    match direction {
        Direction::Long => ema20 > ema50 && ema50 > ema200,
        Direction::Short => ema20 < ema50 && ema50 < ema200,
    }
}

/// Open interval check.
pub(crate) fn within(value: f64, band: (f64, f64)) -> bool {
    value > band.0 && value < band.1
}

/// Stop just beyond the signal candle's extreme.
pub(crate) fn candle_stop(candle: &Candle, direction: Direction, buffer: f64) -> f64 {
    match direction {
        Direction::Long => candle.low * (1.0 - buffer),
        Direction::Short => candle.high * (1.0 + buffer),
    }
}

pub(crate) fn ema_order_label(direction: Direction) -> &'static str {
    match direction {
        Direction::Long => "EMA20>EMA50>EMA200",
        Direction::Short => "EMA20<EMA50<EMA200",
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timeframe;

    fn flat_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle {
                timestamp: i as i64 * 3_600_000,
                open: 100.0,
                high: 100.5,
                low: 99.5,
                close: 100.0,
                volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn test_family_parsing() {
        assert_eq!(RuleFamily::from_str("Trend"), Some(RuleFamily::Trend));
        assert_eq!(RuleFamily::from_str(" crt "), Some(RuleFamily::Crt));
        assert_eq!(RuleFamily::from_str("fibonacci"), Some(RuleFamily::Fibo));
        assert_eq!(RuleFamily::from_str("martingale"), None);
    }

    #[test]
    fn test_engine_builds_both_directions() {
        let engine = RuleEngine::with_defaults();
        assert_eq!(engine.len(), 8);
        assert_eq!(engine.max_min_candles(), 200);

        let only_crt = RuleEngine::from_config(&RuleConfig::default(), &[RuleFamily::Crt]);
        assert_eq!(only_crt.len(), 2);
        assert_eq!(only_crt.rule_names(), vec!["CRT Buy", "CRT Sell"]);
    }

    #[test]
    fn test_quiet_market_yields_no_signal() {
        let engine = RuleEngine::with_defaults();
        let ctx = MarketContext::new("BTCUSDT", Timeframe::OneHour, flat_candles(220), 0);
        let evaluation = engine.evaluate(&ctx);

        assert_eq!(evaluation.results.len(), engine.len());
        assert!(evaluation.is_quiet());
        assert!(evaluation
            .results
            .iter()
            .all(|r| r.verdict == Verdict::NoSignal));
    }

    #[test]
    fn test_short_history_is_reported() {
        let engine = RuleEngine::from_config(&RuleConfig::default(), &[RuleFamily::Trend]);
        let ctx = MarketContext::new("BTCUSDT", Timeframe::OneHour, flat_candles(50), 0);
        let evaluation = engine.evaluate(&ctx);
        assert_eq!(
            evaluation.results[0].verdict,
            Verdict::InsufficientHistory { needed: 200, got: 50 }
        );
        assert!(evaluation.into_signals().is_empty());
    }

    #[test]
    fn test_shared_guards() {
        assert!(emas_aligned(Direction::Long, (3.0, 2.0, 1.0)));
        assert!(!emas_aligned(Direction::Long, (3.0, 3.0, 1.0)));
        assert!(emas_aligned(Direction::Short, (1.0, 2.0, 3.0)));
        assert!(within(45.0, (40.0, 50.0)));
        assert!(!within(50.0, (40.0, 50.0)));
    }
}
