use serde::{Deserialize, Serialize};
use std::fmt;

/// One OHLCV candle as delivered by the exchange.
///
/// `timestamp` is the candle open time in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Absolute body size.
    #[inline]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Total high-low range.
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Body as a fraction of the range, or `None` for a zero-range candle.
    #[inline]
    pub fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        if range <= 0.0 {
            return None;
        }
        Some(self.body() / range)
    }

    #[inline]
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    #[inline]
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    #[inline]
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    #[inline]
    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// Exchange candle interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "2h")]
    TwoHours,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Timeframe {
    /// Parse from the exchange interval string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "1m" => Some(Self::OneMinute),
            "3m" => Some(Self::ThreeMinutes),
            "5m" => Some(Self::FiveMinutes),
            "15m" => Some(Self::FifteenMinutes),
            "30m" => Some(Self::ThirtyMinutes),
            "1h" => Some(Self::OneHour),
            "2h" => Some(Self::TwoHours),
            "4h" => Some(Self::FourHours),
            "6h" => Some(Self::SixHours),
            "12h" => Some(Self::TwelveHours),
            "1d" => Some(Self::OneDay),
            _ => None,
        }
    }

    /// Exchange interval string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneMinute => "1m",
            Self::ThreeMinutes => "3m",
            Self::FiveMinutes => "5m",
            Self::FifteenMinutes => "15m",
            Self::ThirtyMinutes => "30m",
            Self::OneHour => "1h",
            Self::TwoHours => "2h",
            Self::FourHours => "4h",
            Self::SixHours => "6h",
            Self::TwelveHours => "12h",
            Self::OneDay => "1d",
        }
    }

    /// Candle duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        const MINUTE: i64 = 60_000;
        match self {
            Self::OneMinute => MINUTE,
            Self::ThreeMinutes => 3 * MINUTE,
            Self::FiveMinutes => 5 * MINUTE,
            Self::FifteenMinutes => 15 * MINUTE,
            Self::ThirtyMinutes => 30 * MINUTE,
            Self::OneHour => 60 * MINUTE,
            Self::TwoHours => 120 * MINUTE,
            Self::FourHours => 240 * MINUTE,
            Self::SixHours => 360 * MINUTE,
            Self::TwelveHours => 720 * MINUTE,
            Self::OneDay => 1440 * MINUTE,
        }
    }

    /// Milliseconds left until the candle open at `now_ms` closes.
    pub fn time_to_close_ms(&self, now_ms: i64) -> i64 {
        let duration = self.duration_ms();
        duration - now_ms.rem_euclid(duration)
    }

    /// Number of closes the trend estimator looks back over.
    ///
    /// Short timeframes need a longer window to find enough turning points.
    pub fn trend_window(&self) -> usize {
        match self {
            Self::OneMinute
            | Self::ThreeMinutes
            | Self::FiveMinutes
            | Self::FifteenMinutes
            | Self::ThirtyMinutes => 100,
            Self::OneHour => 80,
            Self::FourHours => 60,
            _ => 30,
        }
    }

    /// Lookback for the simple swing range used by Fibonacci anchoring.
    pub fn swing_lookback(&self) -> usize {
        match self {
            Self::ThreeMinutes | Self::FiveMinutes | Self::FifteenMinutes => 50,
            Self::OneHour => 30,
            _ => 20,
        }
    }

    /// Relative buffer placed beyond the swing extreme for reversal stops.
    pub fn reversal_stop_buffer(&self) -> f64 {
        match self {
            Self::FourHours => 0.003,
            Self::OneHour => 0.0025,
            _ => 0.0015,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: 0,
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn test_candle_geometry() {
        let c = candle(10.0, 12.0, 8.0, 11.0);
        assert_eq!(c.body(), 1.0);
        assert_eq!(c.range(), 4.0);
        assert_eq!(c.upper_wick(), 1.0);
        assert_eq!(c.lower_wick(), 2.0);
        assert_eq!(c.body_ratio(), Some(0.25));
        assert!(c.is_bullish());
        assert!(!c.is_bearish());
    }

    #[test]
    fn test_zero_range_has_no_body_ratio() {
        let c = candle(5.0, 5.0, 5.0, 5.0);
        assert_eq!(c.body_ratio(), None);
        assert!(!c.is_bullish() && !c.is_bearish());
    }

    #[test]
    fn test_timeframe_round_trip_strings() {
        for tf in ["1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "12h", "1d"] {
            let parsed = Timeframe::from_str(tf).unwrap();
            assert_eq!(parsed.as_str(), tf);
            assert_eq!(parsed.to_string(), tf);
        }
        assert_eq!(Timeframe::from_str("7m"), None);
    }

    #[test]
    fn test_time_to_close() {
        let tf = Timeframe::FifteenMinutes;
        // 3 minutes into a 15 minute candle
        let now = 1_700_000_100_000 - 1_700_000_100_000 % tf.duration_ms() + 180_000;
        assert_eq!(tf.time_to_close_ms(now), 12 * 60_000);
    }

    #[test]
    fn test_per_timeframe_defaults() {
        assert_eq!(Timeframe::FifteenMinutes.trend_window(), 100);
        assert_eq!(Timeframe::OneHour.trend_window(), 80);
        assert_eq!(Timeframe::FourHours.trend_window(), 60);
        assert_eq!(Timeframe::OneDay.trend_window(), 30);
        assert_eq!(Timeframe::FiveMinutes.swing_lookback(), 50);
        assert_eq!(Timeframe::OneHour.swing_lookback(), 30);
        assert_eq!(Timeframe::FourHours.swing_lookback(), 20);
        assert!(Timeframe::ThirtyMinutes.reversal_stop_buffer() < Timeframe::FourHours.reversal_stop_buffer());
    }
}
