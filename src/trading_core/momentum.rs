//! Dual-Timeframe Momentum Engine
//!
//! Two independent scorers:
//! - Slow (4h): regime, trend health and compression. OBV energy ranked
//!   against its own history, ATR%, Bollinger squeeze, breakout watch and
//!   an aggregate momentum score in [-10, 10].
//! - Fast (1h): pressure and ignition. ATR%, volume spike, OBV flow,
//!   squeeze and a chop ("sideways") flag.
//!
//! Squeeze flags are debounced: a bar only counts as squeezed after three
//! consecutive qualifying bars.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::indicators::{
    atr_pct, bollinger_squeeze, fast_slope, obv, percentile_rank, rolling_abs_change, round_to,
    sma_last, volume_spike,
};
use crate::types::{closes, Candle};

/// Minimum bars for each scorer
pub const SLOW_MIN_BARS: usize = 120;
pub const FAST_MIN_BARS: usize = 60;

/// Consecutive squeezed bars before compression is reported
pub const SQUEEZE_PERSISTENCE: usize = 3;

const ATR_PERIOD: usize = 14;

// Slow scorer windows
const SLOW_OBV_WINDOW: usize = 40;
const SLOW_ENERGY_HISTORY: usize = 180;
const SLOW_SQUEEZE_LOOKBACK: usize = 140;
const TREND_MA_PERIOD: usize = 20;

// Fast scorer windows
const FAST_OBV_WINDOW: usize = 20;
const FAST_SPIKE_WINDOW: usize = 30;
const FAST_SQUEEZE_LOOKBACK: usize = 80;

/// Direction of flow / breakout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlowDirection {
    Up,
    Down,
    Neutral,
}

impl FlowDirection {
    fn from_slope(slope: f64) -> Self {
        if slope > 0.0 {
            FlowDirection::Up
        } else if slope < 0.0 {
            FlowDirection::Down
        } else {
            FlowDirection::Neutral
        }
    }
}

impl std::fmt::Display for FlowDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowDirection::Up => write!(f, "UP"),
            FlowDirection::Down => write!(f, "DOWN"),
            FlowDirection::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Slow (regime) momentum snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowMomentum {
    /// Percentile of current OBV energy within its trailing history
    pub trend_energy_pctile: f64,
    /// OBV slope over the flow window
    pub trend_slope: f64,
    pub bb_squeeze: bool,
    pub bb_squeeze_percentile: Option<f64>,
    pub sideways_regime: bool,
    pub breakout_watch: bool,
    pub breakout_direction: FlowDirection,
    /// Aggregate health score in [-10, 10]
    pub momentum_score: f64,
}

impl Default for SlowMomentum {
    /// Low-confidence result returned when history is too short
    fn default() -> Self {
        Self {
            trend_energy_pctile: 50.0,
            trend_slope: 0.0,
            bb_squeeze: false,
            bb_squeeze_percentile: None,
            sideways_regime: true,
            breakout_watch: false,
            breakout_direction: FlowDirection::Neutral,
            momentum_score: -5.0,
        }
    }
}

/// Fast (pressure / ignition) momentum snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastMomentum {
    pub atr_pct: f64,
    /// Latest volume over the trailing median, clamped to [0, 5]
    pub vol_spike: f64,
    pub obv_slope: f64,
    pub flow_state: FlowDirection,
    pub bb_squeeze: bool,
    pub bb_squeeze_percentile: Option<f64>,
    pub sideways: bool,
}

impl Default for FastMomentum {
    /// Neutral result returned when history is too short
    fn default() -> Self {
        Self {
            atr_pct: 0.0,
            vol_spike: 1.0,
            obv_slope: 0.0,
            flow_state: FlowDirection::Neutral,
            bb_squeeze: false,
            bb_squeeze_percentile: None,
            sideways: true,
        }
    }
}

/// Both scorers for one asset. Fast fields describe current pressure; the
/// slow snapshot grants or withholds permission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Momentum {
    pub slow: SlowMomentum,
    pub fast: FastMomentum,
}

impl Momentum {
    pub fn new(slow: SlowMomentum, fast: FastMomentum) -> Self {
        Self { slow, fast }
    }

    /// Compression as seen by the fast timeframe
    pub fn compression(&self) -> bool {
        self.fast.bb_squeeze
    }
}

/// Slow regime is sideways when volatility and participation are both low
/// and no squeeze is building
pub fn is_slow_sideways(atr_pct: f64, energy_pctile: f64, squeeze: bool) -> bool {
    atr_pct < 0.25 && energy_pctile < 35.0 && !squeeze
}

/// Fast timeframe is chop when volatility and volume are both low and no
/// squeeze is building
pub fn is_fast_sideways(atr_pct: f64, vol_spike: f64, squeeze: bool) -> bool {
    atr_pct < 0.25 && vol_spike < 0.85 && !squeeze
}

/// Slow regime scorer. Needs at least 120 bars.
pub fn momentum_score(candles: &[Candle]) -> SlowMomentum {
    if candles.len() < SLOW_MIN_BARS {
        debug!(
            "Slow momentum: {} bars < {}, returning default",
            candles.len(),
            SLOW_MIN_BARS
        );
        return SlowMomentum::default();
    }

    let close_series = closes(candles);
    let price = close_series[close_series.len() - 1];

    // OBV energy
    let obv_series = obv(candles);
    let obv_slope = fast_slope(&obv_series, SLOW_OBV_WINDOW);

    let energy = rolling_abs_change(&obv_series, SLOW_OBV_WINDOW);
    let energy_now = energy.last().copied().flatten().unwrap_or(0.0);

    let n = energy.len();
    let hist_start = (n - 1).saturating_sub(SLOW_ENERGY_HISTORY);
    let energy_hist: Vec<f64> = energy[hist_start..n - 1].iter().flatten().copied().collect();
    let energy_pctile = percentile_rank(&energy_hist, energy_now);

    // Volatility regime
    let atr_percent = atr_pct(candles, ATR_PERIOD);

    // Compression
    let squeeze_profile = bollinger_squeeze(&close_series, SLOW_SQUEEZE_LOOKBACK);
    let squeeze = squeeze_profile.persisted(SQUEEZE_PERSISTENCE);

    let sideways_regime = is_slow_sideways(atr_percent, energy_pctile, squeeze);

    // Trend context vs flow
    let ma20 = sma_last(&close_series, TREND_MA_PERIOD).unwrap_or(price);
    let trend_context = if price > ma20 {
        FlowDirection::Up
    } else {
        FlowDirection::Down
    };
    let flow_dir = FlowDirection::from_slope(obv_slope);

    let breakout_watch = squeeze && energy_pctile > 55.0;

    let breakout_direction = if !squeeze {
        FlowDirection::Neutral
    } else if flow_dir == FlowDirection::Neutral {
        trend_context
    } else {
        flow_dir
    };

    // Health score
    let mut score = (energy_pctile - 50.0) / 50.0 * 4.0;
    match flow_dir {
        FlowDirection::Up => score += 1.5,
        FlowDirection::Down => score -= 1.5,
        FlowDirection::Neutral => {}
    }
    if sideways_regime {
        score -= 4.5;
    }
    if squeeze {
        score += 1.5;
    }
    if breakout_watch {
        score += 4.0;
    }
    let score = score.clamp(-10.0, 10.0);

    SlowMomentum {
        trend_energy_pctile: round_to(energy_pctile, 2),
        trend_slope: round_to(obv_slope, 3),
        bb_squeeze: squeeze,
        bb_squeeze_percentile: squeeze_profile.percentile,
        sideways_regime,
        breakout_watch,
        breakout_direction,
        momentum_score: round_to(score, 2),
    }
}

/// Fast pressure scorer. Needs at least 60 bars.
pub fn momentum_score_1h(candles: &[Candle]) -> FastMomentum {
    if candles.len() < FAST_MIN_BARS {
        debug!(
            "Fast momentum: {} bars < {}, returning default",
            candles.len(),
            FAST_MIN_BARS
        );
        return FastMomentum::default();
    }

    let atr_percent = atr_pct(candles, ATR_PERIOD);
    let spike = volume_spike(candles, FAST_SPIKE_WINDOW);

    let obv_series = obv(candles);
    let slope = fast_slope(&obv_series, FAST_OBV_WINDOW);

    let squeeze_profile = bollinger_squeeze(&closes(candles), FAST_SQUEEZE_LOOKBACK);
    let squeeze = squeeze_profile.persisted(SQUEEZE_PERSISTENCE);

    FastMomentum {
        atr_pct: round_to(atr_percent, 4),
        vol_spike: round_to(spike, 3),
        obv_slope: round_to(slope, 3),
        flow_state: FlowDirection::from_slope(slope),
        bb_squeeze: squeeze,
        bb_squeeze_percentile: squeeze_profile.percentile,
        sideways: is_fast_sideways(atr_percent, spike, squeeze),
    }
}
