//! Pivot & Market Structure Engine
//!
//! Classifies swing pivots with a centered symmetric window and derives,
//! from the most recent pivots of one timeframe:
//! - Trend (Uptrend / Downtrend / Neutral) and a state label
//! - Liquidity sweep (latest pivot exceeding the prior one)
//! - Break of structure (close beyond the prior pivot)
//! - Confidence (BOS confirmed by a sweep in the same direction)
//!
//! Insufficient pivots never fail: a neutral, low-confidence state is returned.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Candle;

/// Per-bar pivot classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pivot {
    None,
    High,
    Low,
}

/// Structural trend of one timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Neutral,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Uptrend => write!(f, "Uptrend"),
            Trend::Downtrend => write!(f, "Downtrend"),
            Trend::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Human-readable structure state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureLabel {
    #[serde(rename = "Higher Highs")]
    HigherHighs,
    #[serde(rename = "Lower Lows")]
    LowerLows,
    #[serde(rename = "Ranging")]
    Ranging,
    #[serde(rename = "Structure Break Up")]
    StructureBreakUp,
    #[serde(rename = "Structure Break Down")]
    StructureBreakDown,
}

impl std::fmt::Display for StructureLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureLabel::HigherHighs => write!(f, "Higher Highs"),
            StructureLabel::LowerLows => write!(f, "Lower Lows"),
            StructureLabel::Ranging => write!(f, "Ranging"),
            StructureLabel::StructureBreakUp => write!(f, "Structure Break Up"),
            StructureLabel::StructureBreakDown => write!(f, "Structure Break Down"),
        }
    }
}

/// Direction of a sweep or break of structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingDirection {
    Up,
    Down,
}

impl std::fmt::Display for SwingDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwingDirection::Up => write!(f, "up"),
            SwingDirection::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn score(&self) -> u8 {
        match self {
            Confidence::Low => 1,
            Confidence::Medium => 2,
            Confidence::High => 3,
        }
    }
}

/// Configuration for structure detection
#[derive(Debug, Clone)]
pub struct StructureConfig {
    /// Number of most recent bars inspected for pivots (default: 80)
    pub lookback: usize,
    /// Bars on each side of a pivot candidate (default: 5, window = 11)
    pub pivot_window: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            lookback: 80,
            pivot_window: 5,
        }
    }
}

/// Structure classification of one timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureState {
    pub trend: Trend,
    pub state: StructureLabel,
    /// Pivot counts inside the lookback window
    pub recent_highs: usize,
    pub recent_lows: usize,
    pub last_high: Option<f64>,
    pub last_low: Option<f64>,
    pub liquidity_sweep: Option<SwingDirection>,
    pub sweep_price: Option<f64>,
    pub break_of_structure: Option<SwingDirection>,
    pub bos_price: Option<f64>,
    pub confidence: Confidence,
    /// 1 (LOW), 2 (MEDIUM) or 3 (HIGH)
    pub confidence_score: u8,
}

impl Default for StructureState {
    fn default() -> Self {
        Self {
            trend: Trend::Neutral,
            state: StructureLabel::Ranging,
            recent_highs: 0,
            recent_lows: 0,
            last_high: None,
            last_low: None,
            liquidity_sweep: None,
            sweep_price: None,
            break_of_structure: None,
            bos_price: None,
            confidence: Confidence::Low,
            confidence_score: Confidence::Low.score(),
        }
    }
}

/// Classify pivots with a centered window of `2 * window + 1` bars.
///
/// Bars closer than `window` to either end are never classified. When a bar
/// is both the window high and the window low, the high wins.
pub fn detect_pivots(candles: &[Candle], window: usize) -> Vec<Pivot> {
    let n = candles.len();
    let mut pivots = vec![Pivot::None; n];

    if n < 2 * window + 1 {
        return pivots;
    }

    for i in window..(n - window) {
        let span = &candles[i - window..=i + window];
        let roll_max = span.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let roll_min = span.iter().map(|c| c.low).fold(f64::MAX, f64::min);

        if candles[i].high >= roll_max {
            pivots[i] = Pivot::High;
        } else if candles[i].low <= roll_min {
            pivots[i] = Pivot::Low;
        }
    }

    pivots
}

/// Structure of the last `lookback` bars with the default pivot window
pub fn detect_structure_state(candles: &[Candle], lookback: usize) -> StructureState {
    detect_structure(
        candles,
        &StructureConfig {
            lookback,
            ..Default::default()
        },
    )
}

/// Structure of the most recent `config.lookback` bars.
///
/// Pivots are classified over the whole series (so the window has full
/// context), then only those inside the lookback are used.
pub fn detect_structure(candles: &[Candle], config: &StructureConfig) -> StructureState {
    let pivots = detect_pivots(candles, config.pivot_window);
    let start = candles.len().saturating_sub(config.lookback);

    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for i in start..candles.len() {
        match pivots[i] {
            Pivot::High => highs.push(candles[i].high),
            Pivot::Low => lows.push(candles[i].low),
            Pivot::None => {}
        }
    }

    let close_now = match candles.last() {
        Some(c) => c.close,
        None => return StructureState::default(),
    };

    classify_structure(&highs, &lows, close_now)
}

/// Derive structure from pivot prices (oldest first) and the current close
pub fn classify_structure(pivot_highs: &[f64], pivot_lows: &[f64], close_now: f64) -> StructureState {
    let mut structure = StructureState {
        recent_highs: pivot_highs.len(),
        recent_lows: pivot_lows.len(),
        last_high: pivot_highs.last().copied(),
        last_low: pivot_lows.last().copied(),
        ..Default::default()
    };

    if pivot_highs.len() < 2 || pivot_lows.len() < 2 {
        return structure;
    }

    let last_high = pivot_highs[pivot_highs.len() - 1];
    let prev_high = pivot_highs[pivot_highs.len() - 2];
    let last_low = pivot_lows[pivot_lows.len() - 1];
    let prev_low = pivot_lows[pivot_lows.len() - 2];

    // Liquidity sweep: a low-side sweep masks a simultaneous high-side one
    let sweep = if last_low < prev_low {
        Some((SwingDirection::Down, last_low))
    } else if last_high > prev_high {
        Some((SwingDirection::Up, last_high))
    } else {
        None
    };
    structure.liquidity_sweep = sweep.map(|(dir, _)| dir);
    structure.sweep_price = sweep.map(|(_, price)| price);

    // Break of structure, independent of the sweep
    let bos = if close_now > prev_high {
        Some((SwingDirection::Up, prev_high))
    } else if close_now < prev_low {
        Some((SwingDirection::Down, prev_low))
    } else {
        None
    };
    structure.break_of_structure = bos.map(|(dir, _)| dir);
    structure.bos_price = bos.map(|(_, price)| price);

    let (trend, state) = match structure.break_of_structure {
        Some(SwingDirection::Up) => (Trend::Uptrend, StructureLabel::StructureBreakUp),
        Some(SwingDirection::Down) => (Trend::Downtrend, StructureLabel::StructureBreakDown),
        None if last_high > prev_high && last_low > prev_low => {
            (Trend::Uptrend, StructureLabel::HigherHighs)
        }
        None if last_high < prev_high && last_low < prev_low => {
            (Trend::Downtrend, StructureLabel::LowerLows)
        }
        None => (Trend::Neutral, StructureLabel::Ranging),
    };
    structure.trend = trend;
    structure.state = state;

    // Sweep and BOS may point in opposite directions; only equality upgrades
    let confidence = match structure.break_of_structure {
        Some(bos_dir) if structure.liquidity_sweep == Some(bos_dir) => Confidence::High,
        Some(_) => Confidence::Medium,
        None => Confidence::Low,
    };
    structure.confidence = confidence;
    structure.confidence_score = confidence.score();

    debug!(
        "Structure: {} / {} (sweep={:?}, bos={:?}, confidence={:?})",
        structure.trend, structure.state, structure.liquidity_sweep, structure.break_of_structure, confidence
    );

    structure
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading_core::test_support::{candle, flat_series, zigzag};

    #[test]
    fn test_bos_up_forces_uptrend() {
        let s = classify_structure(&[100.0, 105.0], &[90.0, 95.0], 108.0);
        assert_eq!(s.break_of_structure, Some(SwingDirection::Up));
        assert_eq!(s.bos_price, Some(100.0));
        assert_eq!(s.trend, Trend::Uptrend);
        assert_eq!(s.state, StructureLabel::StructureBreakUp);
        // latest high exceeded the prior one: sweep up confirms the break
        assert_eq!(s.liquidity_sweep, Some(SwingDirection::Up));
        assert_eq!(s.confidence, Confidence::High);
        assert_eq!(s.confidence_score, 3);
    }

    #[test]
    fn test_low_sweep_masks_high_sweep() {
        // Both sweeps true; only the low side is reported
        let s = classify_structure(&[100.0, 105.0], &[95.0, 90.0], 98.0);
        assert_eq!(s.liquidity_sweep, Some(SwingDirection::Down));
        assert_eq!(s.sweep_price, Some(90.0));
        assert!(s.break_of_structure.is_none());
        assert_eq!(s.state, StructureLabel::Ranging);
        assert_eq!(s.confidence, Confidence::Low);
    }

    #[test]
    fn test_opposite_sweep_and_bos_is_medium() {
        // Sweep down but close breaks above the prior high
        let s = classify_structure(&[100.0, 99.0], &[95.0, 90.0], 101.0);
        assert_eq!(s.liquidity_sweep, Some(SwingDirection::Down));
        assert_eq!(s.break_of_structure, Some(SwingDirection::Up));
        assert_eq!(s.confidence, Confidence::Medium);
        assert_eq!(s.confidence_score, 2);
    }

    #[test]
    fn test_higher_highs_without_bos() {
        let s = classify_structure(&[100.0, 104.0], &[90.0, 92.0], 99.0);
        assert!(s.break_of_structure.is_none());
        assert_eq!(s.trend, Trend::Uptrend);
        assert_eq!(s.state, StructureLabel::HigherHighs);
        assert_eq!(s.confidence, Confidence::Low);
    }

    #[test]
    fn test_lower_lows_without_bos() {
        let s = classify_structure(&[104.0, 100.0], &[92.0, 91.0], 95.0);
        assert_eq!(s.trend, Trend::Downtrend);
        assert_eq!(s.state, StructureLabel::LowerLows);
    }

    #[test]
    fn test_insufficient_pivots_default() {
        let s = classify_structure(&[100.0], &[90.0, 95.0], 120.0);
        assert_eq!(s.trend, Trend::Neutral);
        assert_eq!(s.last_high, Some(100.0));
        assert_eq!(s.last_low, Some(95.0));
        assert!(s.break_of_structure.is_none());
        assert_eq!(s.confidence_score, 1);
    }

    #[test]
    fn test_edges_never_pivot() {
        let mut bars = flat_series(11, 100.0, 1.0);
        bars[0] = candle(0, 110.0, 110.0, 110.0, 1.0);
        bars[10] = candle(10, 90.0, 90.0, 90.0, 1.0);
        let pivots = detect_pivots(&bars, 5);
        assert_eq!(pivots[0], Pivot::None);
        assert_eq!(pivots[10], Pivot::None);
    }

    #[test]
    fn test_high_wins_tie() {
        // Flat window: every interior bar is both max and min
        let bars = flat_series(11, 100.0, 1.0);
        assert_eq!(detect_pivots(&bars, 5)[5], Pivot::High);
    }

    #[test]
    fn test_detect_structure_on_rising_zigzag() {
        let bars = zigzag(&[100.0, 110.0, 104.0, 114.0, 108.0, 118.0, 112.0, 113.0], 8);
        let s = detect_structure_state(&bars, 80);
        assert!(s.recent_highs >= 2);
        assert!(s.recent_lows >= 2);
        assert_eq!(s.trend, Trend::Uptrend);
        assert_eq!(s.state, StructureLabel::HigherHighs);
    }

    #[test]
    fn test_empty_series_default() {
        assert_eq!(detect_structure_state(&[], 80), StructureState::default());
    }

    #[test]
    fn test_high_confidence_implies_matching_bos() {
        let cases = [
            (vec![100.0, 105.0], vec![90.0, 95.0], 108.0),
            (vec![105.0, 100.0], vec![95.0, 90.0], 85.0),
            (vec![100.0, 99.0], vec![95.0, 90.0], 101.0),
            (vec![100.0, 101.0], vec![95.0, 96.0], 98.0),
        ];
        for (highs, lows, close) in cases {
            let s = classify_structure(&highs, &lows, close);
            assert!((1..=3).contains(&s.confidence_score));
            if s.confidence == Confidence::High {
                assert!(s.break_of_structure.is_some());
                assert_eq!(s.liquidity_sweep, s.break_of_structure);
            }
        }
    }
}
