//! Per-pair analysis shared by every rule.

use super::indicators::{last_ema, macd, macd_line, rsi, MacdPoint, DEFAULT_RSI_PERIOD};
use super::structure::{support_resistance_zones, swing_range};
use super::trend::estimate_trend;
use crate::types::{Candle, SwingRange, Timeframe, TrendEstimate, Zones};

/// Number of zones kept on each side.
pub const ZONE_COUNT: usize = 3;

/// Indicators and structure computed once per (symbol, timeframe) and read
/// by every rule.
#[derive(Debug, Clone)]
pub struct MarketContext {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
    pub closes: Vec<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub rsi: Vec<f64>,
    pub macd: Vec<MacdPoint>,
    pub macd_line: Vec<f64>,
    pub trend: TrendEstimate,
    pub zones: Zones,
    pub swing: Option<SwingRange>,
    /// Evaluation time, epoch millis.
    pub now_ms: i64,
}

impl MarketContext {
    pub fn new(symbol: &str, timeframe: Timeframe, candles: Vec<Candle>, now_ms: i64) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let swing_lookback = timeframe.swing_lookback();
        let macd = macd(&closes);

        Self {
            symbol: symbol.to_string(),
            timeframe,
            ema20: last_ema(&closes, 20),
            ema50: last_ema(&closes, 50),
            ema200: last_ema(&closes, 200),
            rsi: rsi(&closes, DEFAULT_RSI_PERIOD),
            macd_line: macd_line(&macd),
            macd,
            trend: estimate_trend(&closes, timeframe.trend_window()),
            zones: support_resistance_zones(&candles, swing_lookback * 2, ZONE_COUNT),
            swing: swing_range(&candles, swing_lookback),
            closes,
            candles,
            now_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The most recent candle.
    pub fn current(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// The candle before the most recent one.
    pub fn previous(&self) -> Option<&Candle> {
        self.candles.len().checked_sub(2).map(|i| &self.candles[i])
    }

    /// `(previous, current)` when at least two candles are loaded.
    pub fn last_pair(&self) -> Option<(&Candle, &Candle)> {
        Some((self.previous()?, self.current()?))
    }

    pub fn last_rsi(&self) -> Option<f64> {
        self.rsi.last().copied()
    }

    /// EMA20, EMA50 and EMA200, when all three are available.
    pub fn ema_stack(&self) -> Option<(f64, f64, f64)> {
        Some((self.ema20?, self.ema50?, self.ema200?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.2).sin() * 4.0 + i as f64 * 0.05;
                Candle {
                    timestamp: i as i64 * 60_000,
                    open: close - 0.3,
                    high: close + 0.8,
                    low: close - 0.9,
                    close,
                    volume: 10.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_full_history_has_all_indicators() {
        let ctx = MarketContext::new("BTCUSDT", Timeframe::OneHour, candles(220), 0);
        assert!(ctx.ema_stack().is_some());
        assert_eq!(ctx.rsi.len(), 220 - DEFAULT_RSI_PERIOD);
        assert_eq!(ctx.macd.len(), 220 - 25);
        assert_eq!(ctx.macd_line.len(), ctx.macd.len());
        assert!(ctx.swing.is_some());
        assert!(ctx.last_pair().is_some());
    }

    #[test]
    fn test_short_history_degrades_to_none() {
        let ctx = MarketContext::new("BTCUSDT", Timeframe::OneHour, candles(60), 0);
        assert!(ctx.ema20.is_some());
        assert!(ctx.ema50.is_some());
        assert!(ctx.ema200.is_none());
        assert!(ctx.ema_stack().is_none());

        let empty = MarketContext::new("BTCUSDT", Timeframe::OneHour, Vec::new(), 0);
        assert!(empty.is_empty());
        assert!(empty.last_pair().is_none());
        assert!(empty.swing.is_none());
        assert!(empty.last_rsi().is_none());
    }
}
