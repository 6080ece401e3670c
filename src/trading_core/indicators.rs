//! Indicator primitives
//!
//! Pure functions over candle series. No I/O and no hidden state: the same
//! input always yields the same output.
//!
//! - On-Balance-Volume and its slope / energy
//! - Average True Range (simple rolling mean of true ranges)
//! - Volume spike against a trailing median
//! - Bollinger bandwidth and its percentile-based squeeze profile
//! - Persistence filter used to debounce boolean signals

use crate::types::Candle;

/// Bollinger period and width multiplier
const BB_PERIOD: usize = 20;
const BB_MULT: f64 = 2.0;

/// Bandwidth percentile at or below which a bar counts as squeezed
const SQUEEZE_PERCENTILE: f64 = 15.0;

/// Minimum bandwidth history before a squeeze can be flagged at all
const MIN_SQUEEZE_HISTORY: usize = 30;

/// Round to `dp` decimal places (display stability of derived values)
pub fn round_to(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

/// Percent of `hist` strictly below `x`. Empty history ranks at 50.
pub fn percentile_rank(hist: &[f64], x: f64) -> f64 {
    if hist.is_empty() {
        return 50.0;
    }
    let below = hist.iter().filter(|&&h| h < x).count();
    below as f64 / hist.len() as f64 * 100.0
}

/// A position is `true` only if it and the preceding `required - 1`
/// positions are all `true`.
pub fn apply_persistence(flags: &[bool], required: usize) -> Vec<bool> {
    let mut run = 0usize;
    flags
        .iter()
        .map(|&flag| {
            run = if flag { run + 1 } else { 0 };
            run >= required
        })
        .collect()
}

/// Cumulative volume signed by close-to-close direction. The first bar
/// contributes zero.
pub fn obv(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut running = 0.0;

    for (i, candle) in candles.iter().enumerate() {
        if i > 0 {
            let change = candle.close - candles[i - 1].close;
            if change > 0.0 {
                running += candle.volume;
            } else if change < 0.0 {
                running -= candle.volume;
            }
        }
        out.push(running);
    }

    out
}

/// Change across the last `window` values divided by `window`.
/// Zero when the series is not longer than the window.
pub fn fast_slope(series: &[f64], window: usize) -> f64 {
    if window == 0 || series.len() < window + 1 {
        return 0.0;
    }
    let tail = &series[series.len() - window..];
    (tail[window - 1] - tail[0]) / window as f64
}

/// Rolling sum of absolute first differences ("energy" of a flow series).
/// `None` until a full window of differences exists.
pub fn rolling_abs_change(series: &[f64], window: usize) -> Vec<Option<f64>> {
    let n = series.len();
    let mut out = vec![None; n];
    if window == 0 {
        return out;
    }

    let diffs: Vec<f64> = (0..n)
        .map(|i| if i == 0 { 0.0 } else { (series[i] - series[i - 1]).abs() })
        .collect();

    // The first difference does not exist, so a full window ends at index `window`
    for i in window..n {
        let sum: f64 = diffs[i + 1 - window..=i].iter().sum();
        out[i] = Some(sum);
    }

    out
}

/// True range per bar. The first bar has no previous close and uses its range.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let range = bar.high - bar.low;
            if i == 0 {
                return range;
            }
            let prev_close = candles[i - 1].close;
            range
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        })
        .collect()
}

/// Latest ATR as the simple mean of the last `period` true ranges
pub fn atr(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let tr = true_ranges(candles);
    let window = &tr[tr.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Latest ATR expressed as a percentage of the last close
pub fn atr_pct(candles: &[Candle], period: usize) -> f64 {
    let price = match candles.last() {
        Some(c) => c.close,
        None => return 0.0,
    };
    match atr(candles, period) {
        Some(value) if price != 0.0 && value.is_finite() => value / price * 100.0,
        _ => 0.0,
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Latest volume divided by the median of the trailing `window` volumes
/// (latest included), clamped to [0, 5]. A zero baseline reads as 1.0.
pub fn volume_spike(candles: &[Candle], window: usize) -> f64 {
    let now = match candles.last() {
        Some(c) => c.volume,
        None => return 1.0,
    };
    let start = candles.len().saturating_sub(window);
    let volumes: Vec<f64> = candles[start..].iter().map(|c| c.volume).collect();
    let baseline = median(&volumes).unwrap_or(0.0);

    let spike = if baseline > 0.0 { now / baseline } else { 1.0 };
    spike.clamp(0.0, 5.0)
}

/// Mean of the last `period` values
pub fn sma_last(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Bollinger bandwidth `(upper - lower) / middle` per bar, using the
/// population standard deviation. `None` before a full period or when the
/// middle band is zero.
pub fn bollinger_bandwidths(closes: &[f64], period: usize, mult: f64) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut out = vec![None; n];
    if period == 0 {
        return out;
    }

    for i in (period - 1)..n {
        let window = &closes[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let variance = window.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / period as f64;
        let width = 2.0 * mult * variance.sqrt() / mean;
        if width.is_finite() {
            out[i] = Some(width);
        }
    }

    out
}

/// Bollinger compression profile of a close series
#[derive(Debug, Clone, PartialEq)]
pub struct SqueezeProfile {
    /// Latest bandwidth
    pub bb_width: Option<f64>,
    /// Percentile of the latest bandwidth within the trailing history
    pub percentile: Option<f64>,
    /// Raw (un-debounced) squeeze flag per bar
    pub raw: Vec<bool>,
}

impl SqueezeProfile {
    fn inactive(len: usize) -> Self {
        Self {
            bb_width: None,
            percentile: None,
            raw: vec![false; len],
        }
    }

    /// Squeeze state of the latest bar after the persistence filter
    pub fn persisted(&self, required: usize) -> bool {
        apply_persistence(&self.raw, required)
            .last()
            .copied()
            .unwrap_or(false)
    }
}

/// Rank every bar's bandwidth against the `lookback` bandwidths that
/// precede the latest bar; a bar at or below the 15th percentile is a raw
/// squeeze. With fewer than 30 bars of history nothing is flagged.
pub fn bollinger_squeeze(closes: &[f64], lookback: usize) -> SqueezeProfile {
    let n = closes.len();
    if n < 2 {
        return SqueezeProfile::inactive(n);
    }

    let widths = bollinger_bandwidths(closes, BB_PERIOD, BB_MULT);

    let hist_start = (n - 1).saturating_sub(lookback);
    let history: Vec<f64> = widths[hist_start..n - 1].iter().flatten().copied().collect();

    if history.len() < MIN_SQUEEZE_HISTORY {
        return SqueezeProfile::inactive(n);
    }

    let percentiles: Vec<f64> = widths
        .iter()
        .map(|w| match w {
            Some(width) => percentile_rank(&history, *width),
            None => 100.0,
        })
        .collect();

    let raw = percentiles.iter().map(|&p| p <= SQUEEZE_PERCENTILE).collect();

    SqueezeProfile {
        bb_width: widths[n - 1].map(|w| round_to(w, 6)),
        percentile: percentiles.last().map(|&p| round_to(p, 2)),
        raw,
    }
}
