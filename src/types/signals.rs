use super::{Direction, FibZone, PriceZone, SwingRange, Timeframe, Zone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every signal the rule engine can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    TrendLong,
    TrendShort,
    FiboLong,
    FiboShort,
    BottomLong,
    TopShort,
    CrtBuy,
    CrtSell,
}

impl SignalKind {
    /// Fragment used in the cooldown key.
    pub fn key_fragment(&self) -> &'static str {
        match self {
            SignalKind::TrendLong => "TREND_LONG",
            SignalKind::TrendShort => "TREND_SHORT",
            SignalKind::FiboLong => "LONG",
            SignalKind::FiboShort => "SHORT",
            SignalKind::BottomLong => "LONG_BOTTOM",
            SignalKind::TopShort => "SHORT_TOP",
            SignalKind::CrtBuy => "CRT_BUY",
            SignalKind::CrtSell => "CRT_SELL",
        }
    }

    /// Notification headline.
    pub fn title(&self) -> &'static str {
        match self {
            SignalKind::TrendLong => "LONG Signal Detected",
            SignalKind::TrendShort => "SHORT Signal Detected",
            SignalKind::FiboLong => "LONG EMA + Fibo Signal",
            SignalKind::FiboShort => "SHORT EMA + Fibo Signal",
            SignalKind::BottomLong => "LONG BOTTOM",
            SignalKind::TopShort => "SHORT TOP",
            SignalKind::CrtBuy => "CRT BUY SETUP",
            SignalKind::CrtSell => "CRT SELL SETUP",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            SignalKind::TrendLong
            | SignalKind::FiboLong
            | SignalKind::BottomLong
            | SignalKind::CrtBuy => Direction::Long,
            SignalKind::TrendShort
            | SignalKind::FiboShort
            | SignalKind::TopShort
            | SignalKind::CrtSell => Direction::Short,
        }
    }
}

/// Cooldown key: a strict composite of symbol, timeframe and signal kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalKey(String);

impl SignalKey {
    pub fn new(symbol: &str, timeframe: Timeframe, kind: SignalKind) -> Self {
        Self(format!("{}_{}_{}", symbol, timeframe.as_str(), kind.key_fragment()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Risk multiples for the three take-profit levels.
pub const DEFAULT_TARGET_MULTIPLES: [f64; 3] = [1.0, 1.5, 2.0];

/// Entry, stop and three risk-multiple targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePlan {
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit_1: f64,
    pub take_profit_2: f64,
    pub take_profit_3: f64,
}

impl TradePlan {
    /// Build a plan from entry and stop. Returns `None` when the stop is on
    /// the wrong side of the entry (zero or negative risk).
    pub fn from_risk(
        direction: Direction,
        entry: f64,
        stop_loss: f64,
        multiples: [f64; 3],
    ) -> Option<Self> {
        let risk = match direction {
            Direction::Long => entry - stop_loss,
            Direction::Short => stop_loss - entry,
        };
        if !risk.is_finite() || risk <= 0.0 {
            return None;
        }
        let target = |m: f64| match direction {
            Direction::Long => entry + risk * m,
            Direction::Short => entry - risk * m,
        };
        Some(Self {
            direction,
            entry,
            stop_loss,
            take_profit_1: target(multiples[0]),
            take_profit_2: target(multiples[1]),
            take_profit_3: target(multiples[2]),
        })
    }

    pub fn risk(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }
}

/// A CRT liquidity-sweep setup that still waits for a confirming candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSetup {
    pub direction: Direction,
    pub range_high: f64,
    pub range_low: f64,
    /// Low of the sweep candle for a buy setup, high for a sell setup.
    pub sweep_extreme: f64,
    pub close: f64,
    pub zone: PriceZone,
    pub swing: SwingRange,
}

/// What a fired rule recommends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Setup {
    Trade(TradePlan),
    Pending(PendingSetup),
}

/// Indicator and structure values that justified a signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rationale {
    pub rsi: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub trend_slope: Option<f64>,
    pub zone: Option<Zone>,
    pub fib_zone: Option<FibZone>,
    pub divergence: Option<bool>,
    pub swing_extreme: Option<f64>,
    pub near_ema: Option<String>,
    pub price_zone: Option<PriceZone>,
}

/// A fired rule, ready for the cooldown gate and notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub key: SignalKey,
    pub kind: SignalKind,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub setup: Setup,
    pub rationale: Rationale,
    /// Human-readable rationale line.
    pub summary: String,
}

impl Signal {
    pub fn new(
        symbol: &str,
        timeframe: Timeframe,
        kind: SignalKind,
        setup: Setup,
        rationale: Rationale,
        summary: String,
    ) -> Self {
        Self {
            key: SignalKey::new(symbol, timeframe, kind),
            kind,
            symbol: symbol.to_string(),
            timeframe,
            setup,
            rationale,
            summary,
        }
    }

    pub fn direction(&self) -> Direction {
        self.kind.direction()
    }

    pub fn trade_plan(&self) -> Option<&TradePlan> {
        match &self.setup {
            Setup::Trade(plan) => Some(plan),
            Setup::Pending(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_key_is_strict_composite() {
        let a = SignalKey::new("BTCUSDT", Timeframe::OneHour, SignalKind::FiboLong);
        let b = SignalKey::new("BTCUSDT", Timeframe::FourHours, SignalKind::FiboLong);
        let c = SignalKey::new("BTCUSDT", Timeframe::OneHour, SignalKind::BottomLong);
        assert_eq!(a.as_str(), "BTCUSDT_1h_LONG");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_trade_plan_long_targets() {
        let plan = TradePlan::from_risk(Direction::Long, 100.0, 98.0, DEFAULT_TARGET_MULTIPLES)
            .unwrap();
        assert_eq!(plan.risk(), 2.0);
        assert_eq!(plan.take_profit_1, 102.0);
        assert_eq!(plan.take_profit_2, 103.0);
        assert_eq!(plan.take_profit_3, 104.0);
    }

    #[test]
    fn test_trade_plan_short_targets() {
        let plan = TradePlan::from_risk(Direction::Short, 50.0, 51.0, DEFAULT_TARGET_MULTIPLES)
            .unwrap();
        assert_eq!(plan.take_profit_1, 49.0);
        assert_eq!(plan.take_profit_2, 48.5);
        assert_eq!(plan.take_profit_3, 48.0);
    }

    #[test]
    fn test_trade_plan_rejects_inverted_stop() {
        assert!(TradePlan::from_risk(Direction::Long, 100.0, 101.0, DEFAULT_TARGET_MULTIPLES).is_none());
        assert!(TradePlan::from_risk(Direction::Short, 100.0, 100.0, DEFAULT_TARGET_MULTIPLES).is_none());
    }

    #[test]
    fn test_kind_direction() {
        assert_eq!(SignalKind::TopShort.direction(), Direction::Short);
        assert_eq!(SignalKind::CrtBuy.direction(), Direction::Long);
    }
}
