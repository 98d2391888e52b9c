//! Market-structure analysis over a candle window.
//!
//! Swing extrema, support/resistance bands, Fibonacci retracement bands,
//! premium/discount classification and price/oscillator divergence. All
//! functions are pure: the same window always yields the same result.

use crate::types::{Candle, Direction, FibZone, PriceZone, SwingPoint, SwingRange, Zone, Zones};

/// Candles compared on each side of a swing-extremum candidate.
const NEIGHBORHOOD: usize = 2;

pub const FIB_SHALLOW: f64 = 0.5;
pub const FIB_DEEP: f64 = 0.618;

/// Close position at or above this fraction of the swing range is Premium.
pub const PREMIUM_THRESHOLD: f64 = 0.7;
/// Close position at or below this fraction of the swing range is Discount.
pub const DISCOUNT_THRESHOLD: f64 = 0.3;

pub const DEFAULT_ZONE_PROXIMITY: f64 = 0.002;
pub const DEFAULT_EMA_PROXIMITY: f64 = 0.1;
pub const DEFAULT_EMA_CONFLUENCE_TOLERANCE: f64 = 0.003;
pub const DEFAULT_DIVERGENCE_LOOKBACK: usize = 20;

/// Support and resistance bands from neighbour-dominating swing points.
///
/// A candle in the trailing `lookback` window is a swing high when its high
/// is strictly greater than the highs of the two candles on each side, and a
/// swing low when its low is strictly below theirs. Candles without a full
/// neighbourhood are skipped. The `count` most recent of each are kept.
pub fn support_resistance_zones(candles: &[Candle], lookback: usize, count: usize) -> Zones {
    let n = candles.len();
    if n < 2 * NEIGHBORHOOD + 1 || count == 0 {
        return Zones::default();
    }

    let start = n.saturating_sub(lookback).max(NEIGHBORHOOD);
    let end = n - NEIGHBORHOOD;

    let mut resistances = Vec::new();
    let mut supports = Vec::new();

    for i in start..end {
        let neighbors = (i - NEIGHBORHOOD..=i + NEIGHBORHOOD).filter(|&j| j != i);
        let mut is_high = true;
        let mut is_low = true;
        for j in neighbors {
            if candles[i].high <= candles[j].high {
                is_high = false;
            }
            if candles[i].low >= candles[j].low {
                is_low = false;
            }
        }
        if is_high {
            resistances.push(Zone::new(candles[i].body_top(), candles[i].high));
        }
        if is_low {
            supports.push(Zone::new(candles[i].low, candles[i].body_bottom()));
        }
    }

    Zones {
        supports: keep_last(supports, count),
        resistances: keep_last(resistances, count),
    }
}

fn keep_last(mut zones: Vec<Zone>, count: usize) -> Vec<Zone> {
    if zones.len() > count {
        zones.drain(..zones.len() - count);
    }
    zones
}

/// Highest high and lowest low over the trailing `lookback` candles.
///
/// The window is clamped to the available history; `None` on empty input.
pub fn swing_range(candles: &[Candle], lookback: usize) -> Option<SwingRange> {
    if candles.is_empty() || lookback == 0 {
        return None;
    }

    let start = candles.len().saturating_sub(lookback);
    let mut high = SwingPoint {
        price: candles[start].high,
        index: start,
    };
    let mut low = SwingPoint {
        price: candles[start].low,
        index: start,
    };

    for (i, c) in candles.iter().enumerate().skip(start + 1) {
        if c.high > high.price {
            high = SwingPoint { price: c.high, index: i };
        }
        if c.low < low.price {
            low = SwingPoint { price: c.low, index: i };
        }
    }

    Some(SwingRange { high, low })
}

/// The 0.5–0.618 retracement band of a swing.
///
/// For a long bias the band is measured down from the high, for a short bias
/// up from the low.
pub fn fib_zone(swing: &SwingRange, direction: Direction) -> FibZone {
    let high = swing.high.price;
    let low = swing.low.price;
    let range = high - low;
    match direction {
        Direction::Long => FibZone {
            lower: high - range * FIB_DEEP,
            upper: high - range * FIB_SHALLOW,
        },
        Direction::Short => FibZone {
            lower: low + range * FIB_SHALLOW,
            upper: low + range * FIB_DEEP,
        },
    }
}

/// Where `price` sits inside the swing range.
pub fn premium_discount(price: f64, swing: &SwingRange) -> PriceZone {
    let range = swing.span();
    if range <= 0.0 {
        return PriceZone::Equilibrium;
    }

    let position = (price - swing.low.price) / range;
    if position >= PREMIUM_THRESHOLD {
        PriceZone::Premium
    } else if position <= DISCOUNT_THRESHOLD {
        PriceZone::Discount
    } else {
        PriceZone::Equilibrium
    }
}

/// Splits the trailing `lookback` samples into an older and a newer half.
fn halves(values: &[f64], lookback: usize) -> Option<(&[f64], &[f64])> {
    if lookback < 2 || values.len() < lookback {
        return None;
    }
    let window = &values[values.len() - lookback..];
    Some(window.split_at(lookback / 2))
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Price prints a lower low while the oscillator prints a higher low.
pub fn bullish_divergence(prices: &[f64], oscillator: &[f64], lookback: usize) -> bool {
    let (Some((p1, p2)), Some((o1, o2))) = (halves(prices, lookback), halves(oscillator, lookback))
    else {
        return false;
    };
    min_of(p2) < min_of(p1) && min_of(o2) > min_of(o1)
}

/// Price prints a higher high while the oscillator prints a lower high.
pub fn bearish_divergence(prices: &[f64], oscillator: &[f64], lookback: usize) -> bool {
    let (Some((p1, p2)), Some((o1, o2))) = (halves(prices, lookback), halves(oscillator, lookback))
    else {
        return false;
    };
    max_of(p2) > max_of(p1) && max_of(o2) < max_of(o1)
}

/// Bullish divergence against RSI or the MACD line.
///
/// Needs `lookback` samples of closes, RSI and MACD; otherwise reports none.
pub fn has_bullish_divergence(closes: &[f64], rsi: &[f64], macd: &[f64], lookback: usize) -> bool {
    if closes.len() < lookback || rsi.len() < lookback || macd.len() < lookback {
        return false;
    }
    bullish_divergence(closes, rsi, lookback) || bullish_divergence(closes, macd, lookback)
}

/// Bearish divergence against RSI or the MACD line.
pub fn has_bearish_divergence(closes: &[f64], rsi: &[f64], macd: &[f64], lookback: usize) -> bool {
    if closes.len() < lookback || rsi.len() < lookback || macd.len() < lookback {
        return false;
    }
    bearish_divergence(closes, rsi, lookback) || bearish_divergence(closes, macd, lookback)
}

/// Divergence that supports a reversal in `direction`.
pub fn has_divergence(
    direction: Direction,
    closes: &[f64],
    rsi: &[f64],
    macd: &[f64],
    lookback: usize,
) -> bool {
    match direction {
        Direction::Long => has_bullish_divergence(closes, rsi, macd, lookback),
        Direction::Short => has_bearish_divergence(closes, rsi, macd, lookback),
    }
}

/// The first zone with a boundary within `threshold` (relative) of `price`.
///
/// Only the edges count: a price deep inside a wide band is not near it.
pub fn nearest_zone(price: f64, zones: &[Zone], threshold: f64) -> Option<Zone> {
    zones.iter().copied().find(|zone| {
        let edge = zone.nearest_edge(price);
        edge != 0.0 && (price - edge).abs() / edge.abs() < threshold
    })
}

pub fn near_zone(price: f64, zones: &[Zone], threshold: f64) -> bool {
    nearest_zone(price, zones, threshold).is_some()
}

/// Close within `threshold` (relative) of the moving average.
pub fn near_ema(close: f64, ema: f64, threshold: f64) -> bool {
    ema != 0.0 && (close - ema).abs() / ema.abs() < threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64) -> Candle {
        let mid = (high + low) / 2.0;
        Candle {
            timestamp: 0,
            open: mid,
            high,
            low,
            close: mid,
            volume: 1.0,
        }
    }

    #[test]
    fn test_zones_require_strict_dominance() {
        let candles = vec![
            candle(10.0, 9.0),
            candle(11.0, 8.0),
            candle(12.0, 7.0),
            candle(11.0, 8.0),
            candle(10.0, 9.0),
            candle(12.0, 7.0),
            candle(11.0, 8.0),
        ];
        let zones = support_resistance_zones(&candles, 7, 3);
        assert_eq!(zones.resistances.len(), 1);
        assert_eq!(zones.resistances[0].upper, 12.0);
        assert_eq!(zones.supports.len(), 1);
        assert_eq!(zones.supports[0].lower, 7.0);
    }

    #[test]
    fn test_zones_tie_is_not_a_swing() {
        let candles = vec![
            candle(10.0, 9.0),
            candle(11.0, 8.0),
            candle(12.0, 7.0),
            candle(12.0, 7.0),
            candle(10.0, 9.0),
            candle(9.5, 9.0),
        ];
        let zones = support_resistance_zones(&candles, 6, 3);
        assert!(zones.resistances.is_empty());
        assert!(zones.supports.is_empty());
    }

    #[test]
    fn test_zones_keep_most_recent() {
        // sawtooth: peaks every 4 candles
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let h = if i % 4 == 0 { 20.0 + i as f64 } else { 10.0 };
                candle(h, 5.0 - (i % 4 == 2) as i32 as f64)
            })
            .collect();
        let zones = support_resistance_zones(&candles, 40, 3);
        assert_eq!(zones.resistances.len(), 3);
        let uppers: Vec<f64> = zones.resistances.iter().map(|z| z.upper).collect();
        assert_eq!(uppers, vec![48.0, 52.0, 56.0]);
    }

    #[test]
    fn test_swing_range_window() {
        let candles = vec![candle(50.0, 1.0), candle(12.0, 9.0), candle(15.0, 8.0), candle(13.0, 10.0)];
        let swing = swing_range(&candles, 3).unwrap();
        assert_eq!(swing.high.price, 15.0);
        assert_eq!(swing.high.index, 2);
        assert_eq!(swing.low.price, 8.0);
        assert!(swing_range(&[], 10).is_none());
        // lookback beyond history is clamped
        assert_eq!(swing_range(&candles, 100).unwrap().high.price, 50.0);
    }

    #[test]
    fn test_fib_zone_bands() {
        let swing = SwingRange {
            high: SwingPoint { price: 200.0, index: 10 },
            low: SwingPoint { price: 100.0, index: 2 },
        };
        let long = fib_zone(&swing, Direction::Long);
        assert!((long.lower - 138.2).abs() < 1e-9);
        assert!((long.upper - 150.0).abs() < 1e-9);

        let short = fib_zone(&swing, Direction::Short);
        assert!((short.lower - 150.0).abs() < 1e-9);
        assert!((short.upper - 161.8).abs() < 1e-9);

        assert!(long.intersects(&candle(140.0, 130.0)));
        assert!(!long.intersects(&candle(137.0, 130.0)));
    }

    #[test]
    fn test_premium_discount() {
        let swing = SwingRange {
            high: SwingPoint { price: 110.0, index: 0 },
            low: SwingPoint { price: 100.0, index: 1 },
        };
        assert_eq!(premium_discount(108.0, &swing), PriceZone::Premium);
        assert_eq!(premium_discount(107.0, &swing), PriceZone::Premium);
        assert_eq!(premium_discount(105.0, &swing), PriceZone::Equilibrium);
        assert_eq!(premium_discount(102.0, &swing), PriceZone::Discount);

        let flat = SwingRange {
            high: SwingPoint { price: 100.0, index: 0 },
            low: SwingPoint { price: 100.0, index: 0 },
        };
        assert_eq!(premium_discount(100.0, &flat), PriceZone::Equilibrium);
    }

    #[test]
    fn test_divergence_halves() {
        let mut prices = vec![10.0; 10];
        prices.extend(vec![9.0; 10]);
        let mut osc = vec![30.0; 10];
        osc.extend(vec![35.0; 10]);
        assert!(bullish_divergence(&prices, &osc, 20));

        let mut weaker = vec![30.0; 10];
        weaker.extend(vec![25.0; 10]);
        assert!(!bullish_divergence(&prices, &weaker, 20));
        assert!(!bullish_divergence(&prices[..19], &osc[..19], 20));
    }

    #[test]
    fn test_near_zone_and_ema() {
        let zones = vec![Zone::new(100.0, 101.0)];
        assert!(near_zone(99.9, &zones, 0.002));
        assert!(near_zone(100.1, &zones, 0.002));
        assert!(!near_zone(99.0, &zones, 0.002));
        assert!(near_zone(101.1, &zones, 0.002));

        assert!(near_ema(105.0, 100.0, 0.1));
        assert!(!near_ema(115.0, 100.0, 0.1));
        assert!(!near_ema(1.0, 0.0, 0.1));
    }

    #[test]
    fn test_near_zone_measures_to_boundary() {
        let wide = vec![Zone::new(100.0, 110.0)];
        assert!(!near_zone(105.0, &wide, 0.002));
        assert!(near_zone(100.1, &wide, 0.002));
        assert!(near_zone(109.9, &wide, 0.002));
        assert_eq!(nearest_zone(109.9, &wide, 0.002), Some(wide[0]));
    }
}
