//! Trendline slope estimation from recent turning points.

use crate::types::{SwingPoint, TrendEstimate};

/// Estimate the trend over the trailing `window` closes.
///
/// Peaks and troughs are closes strictly above (below) both immediate
/// neighbours, skipping the first and last two samples of the window. The
/// slope runs through the two most recent troughs, falling back to the two
/// most recent peaks; with neither the estimate is flat.
pub fn estimate_trend(closes: &[f64], window: usize) -> TrendEstimate {
    if window < 5 || closes.len() < window {
        return TrendEstimate::flat();
    }

    let slice = &closes[closes.len() - window..];
    let mut peaks = Vec::new();
    let mut troughs = Vec::new();

    for i in 2..slice.len() - 2 {
        let (before, here, after) = (slice[i - 1], slice[i], slice[i + 1]);
        if here > before && here > after {
            peaks.push(SwingPoint { price: here, index: i });
        }
        if here < before && here < after {
            troughs.push(SwingPoint { price: here, index: i });
        }
    }

    match slope_of_last_two(&troughs).or_else(|| slope_of_last_two(&peaks)) {
        Some(slope) => TrendEstimate::from_slope(slope),
        None => TrendEstimate::flat(),
    }
}

fn slope_of_last_two(points: &[SwingPoint]) -> Option<f64> {
    let [.., prev, last] = points else {
        return None;
    };
    Some((last.price - prev.price) / (last.index - prev.index) as f64)
}
