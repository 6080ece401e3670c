//! Hard constraints derived from the risk asset's state
//!
//! These are gates, not scores: downstream consumers must not take a short
//! when `allow_shorts` is false, and must treat `squeeze_risk` as a
//! standing warning.

use serde::{Deserialize, Serialize};

use super::market_state::{lsr_state, volume_state, AssetState, LsrState, MarketState, VolumeState};
use super::momentum::FlowDirection;
use super::structure::{SwingDirection, Trend};

/// Macro risk is treated as event-driven, never as a regime forecast
pub const MACRO_RISK_TYPE: &str = "event-driven";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub allow_shorts: bool,
    pub squeeze_risk: bool,
    pub macro_risk_type: String,
    pub structure_bias: Option<Trend>,
    pub bos_state: Option<SwingDirection>,
    pub volume_state: VolumeState,
    pub lsr_state: LsrState,
}

/// Constraints from one asset's structure, fast momentum and positioning
pub fn constraints_for(asset: &AssetState) -> Constraints {
    let structure_bias = asset.structure.as_ref().map(|s| s.trend);
    let bos_state = asset
        .structure
        .as_ref()
        .and_then(|s| s.break_of_structure);

    let fast = asset.momentum.as_ref().map(|m| &m.fast);
    let volume = volume_state(fast.map(|f| f.vol_spike));
    let downside_flow = fast.map_or(false, |f| f.flow_state == FlowDirection::Down);
    let compression = fast.map_or(false, |f| f.bb_squeeze);

    let lsr = lsr_state(asset.derivatives.long_short_ratio);

    let allow_shorts = structure_bias != Some(Trend::Uptrend)
        && bos_state == Some(SwingDirection::Down)
        && !volume.is_quiet()
        && downside_flow;

    let squeeze_risk = lsr.is_long_crowded() && volume.is_quiet() && compression;

    Constraints {
        allow_shorts,
        squeeze_risk,
        macro_risk_type: MACRO_RISK_TYPE.to_string(),
        structure_bias,
        bos_state,
        volume_state: volume,
        lsr_state: lsr,
    }
}

/// Constraints are read from the risk asset (the `btc` slot)
pub fn build_constraints(state: &MarketState) -> Constraints {
    constraints_for(&state.btc)
}
