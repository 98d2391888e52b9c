//! MACD (Moving Average Convergence Divergence).

use super::ema;
use serde::{Deserialize, Serialize};

/// EMA periods for the MACD lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

/// One MACD sample.
///
/// `signal` and `histogram` stay `None` until the signal EMA has warmed up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// MACD with the standard 12/26/9 periods.
pub fn macd(values: &[f64]) -> Vec<MacdPoint> {
    macd_with(values, &MacdParams::default())
}

/// MACD series:
/// - MACD Line = EMA(fast) - EMA(slow)
/// - Signal Line = EMA(signal) of MACD Line
/// - Histogram = MACD Line - Signal Line
///
/// Output is aligned to `values[slow_period - 1..]`. Empty when fewer than
/// `slow_period` samples are available.
pub fn macd_with(values: &[f64], params: &MacdParams) -> Vec<MacdPoint> {
    if params.fast_period == 0
        || params.fast_period > params.slow_period
        || values.len() < params.slow_period
    {
        return Vec::new();
    }

    let fast_ema = ema(values, params.fast_period);
    let slow_ema = ema(values, params.slow_period);

    // Align the EMAs (fast starts earlier)
    let offset = params.slow_period - params.fast_period;
    let macd_line: Vec<f64> = fast_ema
        .iter()
        .skip(offset)
        .zip(slow_ema.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema(&macd_line, params.signal_period);

    macd_line
        .iter()
        .enumerate()
        .map(|(i, &m)| {
            let signal = (i + 1)
                .checked_sub(params.signal_period)
                .and_then(|j| signal_line.get(j).copied());
            MacdPoint {
                macd: m,
                signal,
                histogram: signal.map(|s| m - s),
            }
        })
        .collect()
}

/// The MACD line values of a series.
pub fn macd_line(points: &[MacdPoint]) -> Vec<f64> {
    points.iter().map(|p| p.macd).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1)
            .collect()
    }

    #[test]
    fn test_macd_insufficient_data() {
        assert!(macd(&wave(25)).is_empty());
        assert_eq!(macd(&wave(26)).len(), 1);
    }

    #[test]
    fn test_macd_length_and_warmup() {
        let out = macd(&wave(60));
        assert_eq!(out.len(), 35);
        assert!(out[7].signal.is_none());
        assert!(out[8].signal.is_some());
        let last = out.last().unwrap();
        assert_eq!(last.histogram, Some(last.macd - last.signal.unwrap()));
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let out = macd(&[10.0; 40]);
        assert!(out.iter().all(|p| p.macd.abs() < 1e-12));
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let out = macd(&values);
        assert!(out.last().unwrap().macd > 0.0);
    }
}
