//! Market-structure records shared by the analyzers and the rule engine.

use super::Candle;
use serde::{Deserialize, Serialize};

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

/// Half-open price band `[lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub lower: f64,
    pub upper: f64,
}

impl Zone {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            lower: a.min(b),
            upper: a.max(b),
        }
    }

    /// The boundary closest to `price`.
    pub fn nearest_edge(&self, price: f64) -> f64 {
        if (price - self.lower).abs() <= (price - self.upper).abs() {
            self.lower
        } else {
            self.upper
        }
    }
}

/// Support and resistance bands derived from swing extrema, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zones {
    pub supports: Vec<Zone>,
    pub resistances: Vec<Zone>,
}

/// A local extremum and the candle index it was found at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    pub price: f64,
    pub index: usize,
}

/// Highest high and lowest low over a lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingRange {
    pub high: SwingPoint,
    pub low: SwingPoint,
}

impl SwingRange {
    pub fn span(&self) -> f64 {
        self.high.price - self.low.price
    }
}

/// Fibonacci 0.5 / 0.618 retracement band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FibZone {
    pub lower: f64,
    pub upper: f64,
}

impl FibZone {
    /// Whether the candle's `[low, high]` interval touches the band.
    pub fn intersects(&self, candle: &Candle) -> bool {
        candle.low <= self.upper && candle.high >= self.lower
    }

    /// Whether `value` sits inside the band or within `tolerance` (relative)
    /// of its nearest edge.
    pub fn has_confluence(&self, value: f64, tolerance: f64) -> bool {
        if value >= self.lower && value <= self.upper {
            return true;
        }
        if value < self.lower {
            return self.lower != 0.0 && (self.lower - value).abs() / self.lower < tolerance;
        }
        self.upper != 0.0 && (value - self.upper).abs() / self.upper < tolerance
    }
}

/// Position of price within the recent swing range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceZone {
    Premium,
    Equilibrium,
    Discount,
}

impl PriceZone {
    pub fn label(&self) -> &'static str {
        match self {
            PriceZone::Premium => "PREMIUM",
            PriceZone::Equilibrium => "EQUILIBRIUM",
            PriceZone::Discount => "DISCOUNT",
        }
    }
}

/// Direction classified from the trendline slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
}

impl Trend {
    pub fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            Trend::Uptrend
        } else if slope < 0.0 {
            Trend::Downtrend
        } else {
            Trend::Sideways
        }
    }

    /// Whether the trend agrees with a trade in `direction`.
    pub fn supports(&self, direction: Direction) -> bool {
        matches!(
            (self, direction),
            (Trend::Uptrend, Direction::Long) | (Trend::Downtrend, Direction::Short)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::Uptrend => "Uptrend",
            Trend::Downtrend => "Downtrend",
            Trend::Sideways => "Sideways",
        }
    }
}

/// Slope through the two most recent turning points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendEstimate {
    pub slope: f64,
    pub trend: Trend,
}

impl TrendEstimate {
    pub fn flat() -> Self {
        Self {
            slope: 0.0,
            trend: Trend::Sideways,
        }
    }

    pub fn from_slope(slope: f64) -> Self {
        Self {
            slope,
            trend: Trend::from_slope(slope),
        }
    }
}
