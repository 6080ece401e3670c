//! Synthetic candle series shared by the unit tests

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::types::Candle;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// Single bar: open equals close
pub fn candle(idx: usize, close: f64, high: f64, low: f64, volume: f64) -> Candle {
    Candle {
        timestamp: start() + Duration::hours(idx as i64),
        open: close,
        high,
        low,
        close,
        volume,
    }
}

/// Constant-price series
pub fn flat_series(len: usize, price: f64, volume: f64) -> Vec<Candle> {
    (0..len).map(|i| candle(i, price, price, price, volume)).collect()
}

/// Bars whose high/low sit `spread` (fraction of price) around each close
pub fn from_closes(closes: &[f64], spread: f64, volume: f64) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| candle(i, c, c * (1.0 + spread), c * (1.0 - spread), volume))
        .collect()
}

/// Straight-line legs between the given turning points, `leg` bars per leg
pub fn zigzag_closes(points: &[f64], leg: usize) -> Vec<f64> {
    let mut closes = Vec::new();
    for pair in points.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        for step in 0..leg {
            closes.push(from + (to - from) * step as f64 / leg as f64);
        }
    }
    if let Some(&last) = points.last() {
        closes.push(last);
    }
    closes
}

/// Zigzag series with a tight bar range so pivots land on the turning points
pub fn zigzag(points: &[f64], leg: usize) -> Vec<Candle> {
    from_closes(&zigzag_closes(points, leg), 0.0005, 100.0)
}

/// Rising or falling series with a steady percentage step per bar
pub fn trending(len: usize, start_price: f64, step_pct: f64, volume: f64) -> Vec<Candle> {
    let closes: Vec<f64> = (0..len)
        .map(|i| start_price * (1.0 + step_pct).powi(i as i32))
        .collect();
    from_closes(&closes, 0.002, volume)
}
