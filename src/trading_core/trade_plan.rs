//! Trade Plan Synthesis
//!
//! Combines swing bias on two timeframes, 1h support/resistance zones and the
//! last swing extremes into a directional plan or WAIT.
//!
//! Hard invariants:
//! - A WAIT plan carries no entry, stop, targets or risk/reward.
//! - A LONG/SHORT entry always lies inside a zone of the required kind.
//! - Swing invalidation only ever widens the stop beyond the zone edge.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::decision::Decision;
use super::indicators::round_to;
use super::momentum::Momentum;
use super::structure::StructureState;
use super::swings::{last_swing_levels, trend_bias, Bias};
use super::zones::{sr_zones, Zone, ZoneKind};
use crate::types::{Candle, DerivativesSnapshot};

/// Zone window on the 1h series
pub const PLAN_ZONE_LOOKBACK: usize = 250;

/// Zones kept on the plan for display
pub const PLAN_ZONES_SHOWN: usize = 8;

/// Fallback targets when no opposing zone exists
const FALLBACK_TARGET_1: f64 = 0.01;
const FALLBACK_TARGET_2: f64 = 0.02;

/// Stop buffer beyond the last swing extreme
const SWING_STOP_BUFFER: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanDirection {
    Long,
    Short,
    Wait,
}

impl PlanDirection {
    /// Zone kind that may license an entry in this direction
    pub fn required_zone(&self) -> Option<ZoneKind> {
        match self {
            PlanDirection::Long => Some(ZoneKind::Support),
            PlanDirection::Short => Some(ZoneKind::Resistance),
            PlanDirection::Wait => None,
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, PlanDirection::Wait)
    }
}

impl std::fmt::Display for PlanDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanDirection::Long => write!(f, "LONG"),
            PlanDirection::Short => write!(f, "SHORT"),
            PlanDirection::Wait => write!(f, "WAIT"),
        }
    }
}

/// Per-asset plan. Momentum, structure and decision are attached by the
/// asset analyzer after the plan is built.
///
/// Entry, stop and targets are unrounded prices; only `rr` is rounded (2 dp).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradePlan {
    pub symbol: String,
    /// Last 15m close
    pub price: f64,
    pub bias_4h: Bias,
    pub bias_1h: Bias,
    pub direction: PlanDirection,
    pub entry: Option<f64>,
    pub stop: Option<f64>,
    pub target1: Option<f64>,
    pub target2: Option<f64>,
    pub rr: Option<f64>,
    /// Zone that licensed the entry
    pub entry_zone: Option<Zone>,
    pub last_swing_high: Option<f64>,
    pub last_swing_low: Option<f64>,
    /// Open time of the latest 1h bar the plan was built from
    pub bar_time_1h: Option<DateTime<Utc>>,
    /// Strongest zones first
    pub zones: Vec<Zone>,
    #[serde(flatten)]
    pub derivatives: DerivativesSnapshot,
    pub momentum: Option<Momentum>,
    pub structure_state: Option<StructureState>,
    pub decision: Option<Decision>,
}

impl TradePlan {
    /// Attach a derivatives snapshot. Missing fields stay null and never
    /// change the plan itself.
    pub fn with_derivatives(mut self, derivatives: DerivativesSnapshot) -> Self {
        self.derivatives = derivatives;
        self
    }

    pub fn is_wait(&self) -> bool {
        self.direction == PlanDirection::Wait
    }
}

/// Entry, stop and targets proposed from zones
#[derive(Debug, Clone)]
struct Levels {
    entry: f64,
    stop: f64,
    target1: f64,
    target2: f64,
}

/// Supports fully below price and resistances fully above it, nearest
/// first, two of each
pub fn nearest_levels(zones: &[Zone], price: f64) -> (Vec<&Zone>, Vec<&Zone>) {
    let mut supports: Vec<&Zone> = zones
        .iter()
        .filter(|z| z.kind == ZoneKind::Support && z.top() <= price)
        .collect();
    let mut resistances: Vec<&Zone> = zones
        .iter()
        .filter(|z| z.kind == ZoneKind::Resistance && z.bottom() >= price)
        .collect();

    supports.sort_by(|a, b| {
        (price - a.top())
            .abs()
            .partial_cmp(&(price - b.top()).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    resistances.sort_by(|a, b| {
        (a.bottom() - price)
            .abs()
            .partial_cmp(&(b.bottom() - price).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    supports.truncate(2);
    resistances.truncate(2);
    (supports, resistances)
}

/// First zone of the kind `direction` requires that contains `entry`
pub fn licensing_zone<'a>(entry: f64, zones: &'a [Zone], direction: PlanDirection) -> Option<&'a Zone> {
    let kind = direction.required_zone()?;
    zones.iter().find(|z| z.kind == kind && z.contains(entry))
}

pub fn is_entry_in_zone(entry: f64, zones: &[Zone], direction: PlanDirection) -> bool {
    licensing_zone(entry, zones, direction).is_some()
}

/// LONG needs 4h Bullish with 1h not Bearish; SHORT mirrors
fn direction_gate(bias_4h: Bias, bias_1h: Bias) -> PlanDirection {
    match (bias_4h, bias_1h) {
        (Bias::Bullish, Bias::Bullish | Bias::Neutral) => PlanDirection::Long,
        (Bias::Bearish, Bias::Bearish | Bias::Neutral) => PlanDirection::Short,
        _ => PlanDirection::Wait,
    }
}

fn long_levels(supports: &[&Zone], resistances: &[&Zone]) -> Option<Levels> {
    let support = supports.first()?;
    let entry = support.top();
    let (target1, target2) = match resistances.first() {
        Some(r) => (r.bottom(), r.top()),
        None => (entry * (1.0 + FALLBACK_TARGET_1), entry * (1.0 + FALLBACK_TARGET_2)),
    };
    Some(Levels {
        entry,
        stop: support.bottom(),
        target1,
        target2,
    })
}

fn short_levels(supports: &[&Zone], resistances: &[&Zone]) -> Option<Levels> {
    let resistance = resistances.first()?;
    let entry = resistance.bottom();
    let (target1, target2) = match supports.first() {
        Some(s) => (s.top(), s.bottom()),
        None => (entry * (1.0 - FALLBACK_TARGET_1), entry * (1.0 - FALLBACK_TARGET_2)),
    };
    Some(Levels {
        entry,
        stop: resistance.top(),
        target1,
        target2,
    })
}

/// Push the stop just beyond the last swing extreme when that lies past
/// the zone edge. The stop never moves back inside the zone edge.
fn tighten_stop(direction: PlanDirection, stop: f64, last_low: Option<f64>, last_high: Option<f64>) -> f64 {
    match (direction, last_low, last_high) {
        (PlanDirection::Long, Some(low), _) => stop.min(low * (1.0 - SWING_STOP_BUFFER)),
        (PlanDirection::Short, _, Some(high)) => stop.max(high * (1.0 + SWING_STOP_BUFFER)),
        _ => stop,
    }
}

fn risk_reward(levels: &Levels) -> Option<f64> {
    let risk = (levels.entry - levels.stop).abs();
    if risk == 0.0 || !risk.is_finite() {
        return None;
    }
    let reward = (levels.target1 - levels.entry).abs();
    Some(round_to(reward / risk, 2))
}

/// Build a plan from 15m (price), 1h (zones, swings, fast bias) and 4h
/// (slow bias) candles. Derivatives are attached separately.
pub fn build_trade_plan(
    symbol: &str,
    candles_15m: &[Candle],
    candles_1h: &[Candle],
    candles_4h: &[Candle],
) -> TradePlan {
    let price = candles_15m.last().map(|c| c.close).unwrap_or(0.0);

    let bias_4h = trend_bias(candles_4h);
    let bias_1h = trend_bias(candles_1h);

    let zones = sr_zones(candles_1h, PLAN_ZONE_LOOKBACK);
    let (supports, resistances) = nearest_levels(&zones, price);
    let (last_high, last_low) = last_swing_levels(candles_1h);

    let gate = direction_gate(bias_4h, bias_1h);
    let proposed = match gate {
        PlanDirection::Long => long_levels(&supports, &resistances),
        PlanDirection::Short => short_levels(&supports, &resistances),
        PlanDirection::Wait => None,
    };

    // Entry must sit inside a zone of the required kind
    let licensed = proposed.and_then(|levels| {
        licensing_zone(levels.entry, &zones, gate).map(|zone| (levels, zone.clone()))
    });

    let (direction, levels, entry_zone) = match licensed {
        Some((mut levels, zone)) => {
            levels.stop = tighten_stop(gate, levels.stop, last_low, last_high);
            (gate, Some(levels), Some(zone))
        }
        None => {
            if gate.is_directional() {
                debug!("{}: {} collapsed to WAIT, no licensing zone", symbol, gate);
            }
            (PlanDirection::Wait, None, None)
        }
    };

    let rr = levels.as_ref().and_then(risk_reward);

    TradePlan {
        symbol: symbol.to_string(),
        price,
        bias_4h,
        bias_1h,
        direction,
        entry: levels.as_ref().map(|l| l.entry),
        stop: levels.as_ref().map(|l| l.stop),
        target1: levels.as_ref().map(|l| l.target1),
        target2: levels.as_ref().map(|l| l.target2),
        rr,
        entry_zone,
        last_swing_high: last_high,
        last_swing_low: last_low,
        bar_time_1h: candles_1h.last().map(|c| c.timestamp),
        zones: zones.into_iter().take(PLAN_ZONES_SHOWN).collect(),
        derivatives: DerivativesSnapshot::default(),
        momentum: None,
        structure_state: None,
        decision: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading_core::test_support::{flat_series, zigzag};

    const BULL: [f64; 8] = [100.0, 110.0, 104.0, 114.0, 108.0, 118.0, 112.0, 113.0];
    const BEAR: [f64; 8] = [120.0, 110.0, 116.0, 106.0, 112.0, 102.0, 108.0, 107.0];

    fn assert_wait_is_empty(plan: &TradePlan) {
        assert_eq!(plan.direction, PlanDirection::Wait);
        assert!(plan.entry.is_none());
        assert!(plan.stop.is_none());
        assert!(plan.target1.is_none());
        assert!(plan.target2.is_none());
        assert!(plan.rr.is_none());
        assert!(plan.entry_zone.is_none());
    }

    #[test]
    fn test_long_plan_entry_inside_support() {
        let bars = zigzag(&BULL, 6);
        let plan = build_trade_plan("BTCUSDT", &flat_series(5, 113.0, 1.0), &bars, &bars);

        assert_eq!(plan.bias_4h, Bias::Bullish);
        assert_eq!(plan.direction, PlanDirection::Long);
        assert_eq!(plan.bar_time_1h, bars.last().map(|c| c.timestamp));

        let entry = plan.entry.unwrap();
        let zone = plan.entry_zone.as_ref().unwrap();
        assert_eq!(zone.kind, ZoneKind::Support);
        assert!(zone.contains(entry));
        let swing_stop = plan.last_swing_low.unwrap() * (1.0 - SWING_STOP_BUFFER);
        assert_eq!(plan.stop, Some(zone.bottom().min(swing_stop)));
        assert!(plan.target1.unwrap() > entry);
        assert!(plan.rr.unwrap() > 0.0);
    }

    #[test]
    fn test_short_plan_entry_inside_resistance() {
        let bars = zigzag(&BEAR, 6);
        let plan = build_trade_plan("BTCUSDT", &flat_series(5, 107.0, 1.0), &bars, &bars);

        assert_eq!(plan.direction, PlanDirection::Short);
        let entry = plan.entry.unwrap();
        let zone = plan.entry_zone.as_ref().unwrap();
        assert_eq!(zone.kind, ZoneKind::Resistance);
        assert!(zone.contains(entry));
        let swing_stop = plan.last_swing_high.unwrap() * (1.0 + SWING_STOP_BUFFER);
        assert_eq!(plan.stop, Some(zone.top().max(swing_stop)));
        assert!(plan.target1.unwrap() < entry);
    }

    #[test]
    fn test_swing_stop_beyond_zone_wins() {
        // Long: zone bottom 100, swing low 98 -> 98 * 0.999
        let long = tighten_stop(PlanDirection::Long, 100.0, Some(98.0), Some(120.0));
        assert_eq!(long, 98.0 * (1.0 - SWING_STOP_BUFFER));
        assert!(long < 98.0);

        // Short: zone top 120, swing high 123 -> 123 * 1.001
        let short = tighten_stop(PlanDirection::Short, 120.0, Some(98.0), Some(123.0));
        assert_eq!(short, 123.0 * (1.0 + SWING_STOP_BUFFER));
        assert!(short > 123.0);
    }

    #[test]
    fn test_swing_stop_keeps_zone_edge() {
        // Swing low above the zone: zone stop kept
        assert_eq!(tighten_stop(PlanDirection::Long, 100.0, Some(105.0), None), 100.0);
        assert_eq!(tighten_stop(PlanDirection::Short, 120.0, None, Some(115.0)), 120.0);
        // No swing on the relevant side
        assert_eq!(tighten_stop(PlanDirection::Long, 100.0, None, Some(130.0)), 100.0);
        assert_eq!(tighten_stop(PlanDirection::Wait, 100.0, Some(90.0), Some(130.0)), 100.0);
    }

    #[test]
    fn test_conflicting_bias_waits_with_null_levels() {
        let plan = build_trade_plan(
            "BTCUSDT",
            &flat_series(5, 110.0, 1.0),
            &zigzag(&BULL, 6),
            &zigzag(&BEAR, 6),
        );
        assert_wait_is_empty(&plan);
        assert!(!plan.zones.is_empty());
    }

    #[test]
    fn test_no_price_collapses_to_wait() {
        let bars = zigzag(&BULL, 6);
        let plan = build_trade_plan("BTCUSDT", &[], &bars, &bars);
        assert_eq!(plan.price, 0.0);
        assert_wait_is_empty(&plan);
    }

    #[test]
    fn test_entry_zone_check_is_kind_aware() {
        let zones = vec![
            Zone::new(ZoneKind::Support, 99.0, 100.0).unwrap(),
            Zone::new(ZoneKind::Resistance, 110.0, 111.0).unwrap(),
        ];
        assert!(is_entry_in_zone(99.5, &zones, PlanDirection::Long));
        assert!(!is_entry_in_zone(99.5, &zones, PlanDirection::Short));
        assert!(is_entry_in_zone(110.0, &zones, PlanDirection::Short));
        assert!(!is_entry_in_zone(105.0, &zones, PlanDirection::Long));
        assert!(!is_entry_in_zone(99.5, &zones, PlanDirection::Wait));
    }

    #[test]
    fn test_nearest_levels_order() {
        let zones = vec![
            Zone::new(ZoneKind::Support, 90.0, 91.0).unwrap(),
            Zone::new(ZoneKind::Support, 97.0, 98.0).unwrap(),
            Zone::new(ZoneKind::Support, 94.0, 95.0).unwrap(),
            Zone::new(ZoneKind::Resistance, 104.0, 105.0).unwrap(),
            // straddles price: neither side
            Zone::new(ZoneKind::Resistance, 99.0, 101.0).unwrap(),
        ];
        let (supports, resistances) = nearest_levels(&zones, 100.0);
        let tops: Vec<f64> = supports.iter().map(|z| z.top()).collect();
        assert_eq!(tops, vec![98.0, 95.0]);
        assert_eq!(resistances.len(), 1);
        assert_eq!(resistances[0].bottom(), 104.0);
    }

    #[test]
    fn test_derivatives_do_not_change_plan() {
        let bars = zigzag(&BULL, 6);
        let plan = build_trade_plan("BTCUSDT", &flat_series(5, 113.0, 1.0), &bars, &bars);
        let with = plan
            .clone()
            .with_derivatives(DerivativesSnapshot::unavailable("timeout"));
        assert_eq!(with.direction, plan.direction);
        assert_eq!(with.entry, plan.entry);
        assert!(with.derivatives.funding_bps.is_none());
    }
}
