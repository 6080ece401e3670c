//! Support / Resistance Zone Engine
//!
//! Zones are seeded from the most extreme highs and lows of a trailing
//! window, merged when they overlap, then ranked by how often price
//! revisited them, how much volume traded there and how long ago they
//! first formed.

use serde::Serialize;
use tracing::debug;

use super::indicators::round_to;
use crate::errors::SentinelError;
use crate::types::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Support,
    Resistance,
}

impl std::fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZoneKind::Support => write!(f, "support"),
            ZoneKind::Resistance => write!(f, "resistance"),
        }
    }
}

/// A price band `[bottom, top]` with strength metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    top: f64,
    bottom: f64,
    /// Bars whose range intersected the band
    pub touches: usize,
    /// Mean touch volume relative to the window mean
    pub volume_score: f64,
    /// Bars since the first touch
    pub age: usize,
    /// 0 to 100
    pub strength: f64,
}

impl Zone {
    /// New unscored zone. Rejects `bottom > top`.
    pub fn new(kind: ZoneKind, bottom: f64, top: f64) -> Result<Self, SentinelError> {
        if bottom.is_nan() || top.is_nan() || bottom > top {
            return Err(SentinelError::InvalidZone { bottom, top });
        }
        Ok(Self {
            kind,
            top,
            bottom,
            touches: 0,
            volume_score: 0.0,
            age: 0,
            strength: 0.0,
        })
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn contains(&self, price: f64) -> bool {
        self.bottom <= price && price <= self.top
    }

    fn intersects(&self, candle: &Candle) -> bool {
        candle.low <= self.top && candle.high >= self.bottom
    }
}

/// Zone engine tunables
#[derive(Debug, Clone)]
pub struct ZoneConfig {
    /// Trailing bars considered
    pub lookback: usize,
    /// Extremes seeded on each side
    pub seeds: usize,
    /// Seed band width as a fraction of price
    pub seed_width: f64,
    /// Merge when a zone starts within this fraction above the running top
    pub merge_tolerance: f64,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            lookback: 200,
            seeds: 6,
            seed_width: 0.002,       // 0.2%
            merge_tolerance: 0.0015, // 0.15%
        }
    }
}

/// Ranked zones over the trailing `lookback` bars, strongest first
pub fn sr_zones(candles: &[Candle], lookback: usize) -> Vec<Zone> {
    let config = ZoneConfig {
        lookback,
        ..ZoneConfig::default()
    };
    build_zones(candles, &config)
}

pub fn build_zones(candles: &[Candle], config: &ZoneConfig) -> Vec<Zone> {
    let start = candles.len().saturating_sub(config.lookback);
    let recent = &candles[start..];
    if recent.is_empty() {
        return Vec::new();
    }

    let mut highs: Vec<f64> = recent.iter().map(|c| c.high).collect();
    highs.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let mut lows: Vec<f64> = recent.iter().map(|c| c.low).collect();
    lows.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let resistance_seeds = highs.iter().take(config.seeds).filter_map(|&h| {
        Zone::new(ZoneKind::Resistance, h * (1.0 - config.seed_width), h).ok()
    });
    let support_seeds = lows.iter().take(config.seeds).filter_map(|&l| {
        Zone::new(ZoneKind::Support, l, l * (1.0 + config.seed_width)).ok()
    });
    let seeds: Vec<Zone> = resistance_seeds.chain(support_seeds).collect();

    let mut zones = merge_zones(seeds, config.merge_tolerance);

    let avg_volume = recent.iter().map(|c| c.volume).sum::<f64>() / recent.len() as f64;
    for zone in &mut zones {
        score_zone(zone, recent, avg_volume, config.lookback);
    }

    zones.sort_by(|a, b| {
        b.strength
            .partial_cmp(&a.strength)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!("Built {} zones from {} bars", zones.len(), recent.len());
    zones
}

/// Single sweep over zones sorted by bottom: a zone starting at or below
/// the running top (plus tolerance) widens the running zone to the union.
/// The running zone keeps its kind.
pub fn merge_zones(mut zones: Vec<Zone>, tolerance: f64) -> Vec<Zone> {
    zones.sort_by(|a, b| {
        a.bottom
            .partial_cmp(&b.bottom)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut merged: Vec<Zone> = Vec::with_capacity(zones.len());
    for zone in zones {
        match merged.last_mut() {
            Some(last) if zone.bottom <= last.top * (1.0 + tolerance) => {
                last.top = last.top.max(zone.top);
                last.bottom = last.bottom.min(zone.bottom);
            }
            _ => merged.push(zone),
        }
    }
    merged
}

fn score_zone(zone: &mut Zone, recent: &[Candle], avg_volume: f64, lookback: usize) {
    let touched: Vec<(usize, &Candle)> = recent
        .iter()
        .enumerate()
        .filter(|(_, c)| zone.intersects(c))
        .collect();

    let touches = touched.len();
    let age = touched
        .first()
        .map(|(idx, _)| recent.len() - idx)
        .unwrap_or(0);

    let volume_score = if touches > 0 && avg_volume > 0.0 {
        let touch_mean = touched.iter().map(|(_, c)| c.volume).sum::<f64>() / touches as f64;
        touch_mean / avg_volume
    } else {
        0.0
    };

    let age_ratio = if lookback > 0 {
        (age as f64 / lookback as f64).min(1.0)
    } else {
        0.0
    };

    let strength =
        touches.min(10) as f64 * 5.0 + volume_score.min(3.0) * 15.0 + age_ratio * 5.0;

    zone.touches = touches;
    zone.volume_score = round_to(volume_score, 2);
    zone.age = age;
    zone.strength = round_to(strength.min(100.0), 1);
}
