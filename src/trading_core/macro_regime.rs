//! Macro regime (DXY) detector
//!
//! Least-squares slope of recent closes, normalised by price, bucketed into
//! a trend and a strength. Also holds `TimedCache`, the caller-owned
//! freshness wrapper used for slow-moving macro data.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::indicators::round_to;

/// Closes fed to the regression
const REGRESSION_WINDOW: usize = 36;
const MIN_REGRESSION_POINTS: usize = 10;

/// Normalised slope thresholds
const NEUTRAL_BELOW: f64 = 0.00003;
const LOW_BELOW: f64 = 0.00005;
const MEDIUM_BELOW: f64 = 0.00012;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MacroTrend {
    Up,
    Down,
    Neutral,
}

impl std::fmt::Display for MacroTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MacroTrend::Up => write!(f, "UP"),
            MacroTrend::Down => write!(f, "DOWN"),
            MacroTrend::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MacroStrength {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for MacroStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MacroStrength::Low => write!(f, "LOW"),
            MacroStrength::Medium => write!(f, "MEDIUM"),
            MacroStrength::High => write!(f, "HIGH"),
        }
    }
}

/// Macro regime snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroRegime {
    pub trend: MacroTrend,
    pub strength: MacroStrength,
    /// Raw regression slope (price units per bar)
    pub slope: f64,
    pub last: f64,
    /// Context only, never causal
    pub note: String,
}

/// Ordinary least-squares slope against the bar index. Zero below ten points.
pub fn linear_slope(series: &[f64]) -> f64 {
    let n = series.len();
    if n < MIN_REGRESSION_POINTS {
        return 0.0;
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = series.iter().sum::<f64>() / n_f;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (i, y) in series.iter().enumerate() {
        let dx = i as f64 - mean_x;
        cov += dx * (y - mean_y);
        var += dx * dx;
    }

    if var == 0.0 {
        0.0
    } else {
        cov / var
    }
}

fn regime_note(trend: MacroTrend, strength: MacroStrength) -> &'static str {
    match (trend, strength) {
        (MacroTrend::Up, MacroStrength::Medium | MacroStrength::High) => {
            "USD trend strengthening, historically associated with tighter financial conditions"
        }
        (MacroTrend::Down, MacroStrength::Medium | MacroStrength::High) => {
            "USD trend weakening, historically associated with looser financial conditions"
        }
        _ => "USD trend neutral, no dominant macro regime observed",
    }
}

/// Classify the macro regime from a close series. `None` when empty.
pub fn detect_macro_regime(closes: &[f64]) -> Option<MacroRegime> {
    let last = *closes.last()?;

    let recent = &closes[closes.len().saturating_sub(REGRESSION_WINDOW)..];
    let slope = linear_slope(recent);
    let norm = slope.abs() / last.max(1e-9);

    let trend = if norm < NEUTRAL_BELOW {
        MacroTrend::Neutral
    } else if slope > 0.0 {
        MacroTrend::Up
    } else {
        MacroTrend::Down
    };

    let strength = if norm < LOW_BELOW {
        MacroStrength::Low
    } else if norm < MEDIUM_BELOW {
        MacroStrength::Medium
    } else {
        MacroStrength::High
    };

    Some(MacroRegime {
        trend,
        strength,
        slope: round_to(slope, 6),
        last: round_to(last, 4),
        note: regime_note(trend, strength).to_string(),
    })
}

/// A payload stamped with its fetch time. Owned by whoever refreshes it.
#[derive(Debug, Clone)]
pub struct TimedCache<T> {
    pub fetched_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> TimedCache<T> {
    pub fn new(payload: T, fetched_at: DateTime<Utc>) -> Self {
        Self { fetched_at, payload }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at < ttl
    }

    /// Payload if still within `ttl` of the fetch
    pub fn get_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> Option<&T> {
        if self.is_fresh(now, ttl) {
            Some(&self.payload)
        } else {
            None
        }
    }
}
