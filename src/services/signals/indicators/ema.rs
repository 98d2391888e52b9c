//! Exponential Moving Average (EMA).

/// EMA over `values`, seeded with the simple average of the first `period`
/// samples.
///
/// The result is aligned to the tail of the input: element `i` corresponds to
/// `values[i + period - 1]`, so its length is `values.len() - period + 1`.
/// Returns an empty series when there is not enough history.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len() - period + 1);

    // First EMA is SMA
    let sma: f64 = values.iter().take(period).sum::<f64>() / period as f64;
    out.push(sma);

    let mut prev = sma;
    for value in &values[period..] {
        prev = (value - prev) * multiplier + prev;
        out.push(prev);
    }

    out
}

/// Most recent EMA value, if there is enough history.
pub fn last_ema(values: &[f64], period: usize) -> Option<f64> {
    ema(values, period).last().copied()
}
