//! Swing-based timeframe bias
//!
//! A faster, simpler notion of trend than the structure engine: strict
//! swing highs/lows over a ±3 bar window, compared pairwise. The trade
//! planner uses this bias; the structure engine feeds everything else.

use serde::{Deserialize, Serialize};

use crate::types::Candle;

/// Bars required on each side of a swing
const SWING_LEFT: usize = 3;
const SWING_RIGHT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for Bias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bias::Bullish => write!(f, "Bullish"),
            Bias::Bearish => write!(f, "Bearish"),
            Bias::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Swing highs and lows (oldest first)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Swings {
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
}

/// A bar is a swing high when its high is strictly above every high in the
/// `left` bars before and the `right` bars after it (mirror for lows).
pub fn detect_swings(candles: &[Candle], left: usize, right: usize) -> Swings {
    let mut swings = Swings::default();
    let n = candles.len();
    if n < left + right + 1 {
        return swings;
    }

    for i in left..(n - right) {
        let before = &candles[i - left..i];
        let after = &candles[i + 1..=i + right];
        let bar = &candles[i];

        let max_around = before
            .iter()
            .chain(after)
            .map(|c| c.high)
            .fold(f64::MIN, f64::max);
        let min_around = before
            .iter()
            .chain(after)
            .map(|c| c.low)
            .fold(f64::MAX, f64::min);

        if bar.high > max_around {
            swings.highs.push(bar.high);
        }
        if bar.low < min_around {
            swings.lows.push(bar.low);
        }
    }

    swings
}

/// Rising swing highs and lows ⇒ Bullish, both falling ⇒ Bearish
pub fn trend_bias(candles: &[Candle]) -> Bias {
    let swings = detect_swings(candles, SWING_LEFT, SWING_RIGHT);
    if swings.highs.len() < 2 || swings.lows.len() < 2 {
        return Bias::Neutral;
    }

    let last_sh = swings.highs[swings.highs.len() - 1];
    let prev_sh = swings.highs[swings.highs.len() - 2];
    let last_sl = swings.lows[swings.lows.len() - 1];
    let prev_sl = swings.lows[swings.lows.len() - 2];

    if last_sh > prev_sh && last_sl > prev_sl {
        Bias::Bullish
    } else if last_sh < prev_sh && last_sl < prev_sl {
        Bias::Bearish
    } else {
        Bias::Neutral
    }
}

/// Most recent swing high and swing low, if any
pub fn last_swing_levels(candles: &[Candle]) -> (Option<f64>, Option<f64>) {
    let swings = detect_swings(candles, SWING_LEFT, SWING_RIGHT);
    (swings.highs.last().copied(), swings.lows.last().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading_core::test_support::{flat_series, zigzag};

    #[test]
    fn test_rising_swings_bullish() {
        let bars = zigzag(&[100.0, 110.0, 104.0, 114.0, 108.0, 118.0, 112.0, 113.0], 6);
        assert_eq!(trend_bias(&bars), Bias::Bullish);
    }

    #[test]
    fn test_falling_swings_bearish() {
        let bars = zigzag(&[120.0, 110.0, 116.0, 106.0, 112.0, 102.0, 108.0, 107.0], 6);
        assert_eq!(trend_bias(&bars), Bias::Bearish);
    }

    #[test]
    fn test_flat_has_no_strict_swings() {
        let bars = flat_series(50, 100.0, 1.0);
        assert_eq!(detect_swings(&bars, 3, 3), Swings::default());
        assert_eq!(trend_bias(&bars), Bias::Neutral);
        assert_eq!(last_swing_levels(&bars), (None, None));
    }

    #[test]
    fn test_last_swing_levels() {
        let bars = zigzag(&[100.0, 110.0, 104.0, 114.0, 108.0, 109.0], 6);
        let (high, low) = last_swing_levels(&bars);
        assert!((high.unwrap() - 114.0 * 1.0005).abs() < 1e-9);
        assert!((low.unwrap() - 108.0 * 0.9995).abs() < 1e-9);
    }
}
