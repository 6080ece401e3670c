//! Market State Assembly
//!
//! Builds the per-cycle state tree consumed by dashboards and narration:
//! one `AssetState` per traded asset, a `DxyState` for the dollar, the
//! derived constraints and the diff against the previous snapshot.
//!
//! Labels are coarse buckets of raw values so consumers can reason about
//! regimes without touching prices.

use serde::{Deserialize, Serialize};

use super::bias::{
    compute_derivatives_bias, compute_dxy_bias, macro_effect, AssetRole, DerivativesBias, DxyBias,
    MacroEffect,
};
use super::constraints::Constraints;
use super::exhaustion::{detect_exhaustion, ExhaustionState, MomentumHistory};
use super::macro_regime::{MacroRegime, MacroStrength, MacroTrend};
use super::momentum::Momentum;
use super::rules::{first_match, Rule};
use super::state_diff::StateDiff;
use super::structure::StructureState;
use super::swings::Bias;
use super::trade_plan::TradePlan;
use crate::types::DerivativesSnapshot;

/// Volatility regime from ATR%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtrRegime {
    Expanding,
    Normal,
    Contracting,
    Unknown,
}

/// Participation from the fast volume spike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeState {
    Ignition,
    Building,
    Thin,
    Dead,
    Unknown,
}

impl VolumeState {
    /// Too little volume to trust a move
    pub fn is_quiet(&self) -> bool {
        matches!(self, VolumeState::Dead | VolumeState::Thin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingState {
    CrowdedLongs,
    CrowdedShorts,
    Positive,
    Negative,
    Neutral,
    Unknown,
}

/// Long/short ratio positioning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LsrState {
    ExtremeLongs,
    LongHeavy,
    ExtremeShorts,
    ShortHeavy,
    Balanced,
    Unknown,
}

impl LsrState {
    pub fn is_long_crowded(&self) -> bool {
        matches!(self, LsrState::ExtremeLongs | LsrState::LongHeavy)
    }
}

fn atr_rules() -> [Rule<f64, AtrRegime>; 2] {
    [
        Rule::new("expanding", |v: &f64| *v >= 0.30, AtrRegime::Expanding),
        Rule::new("contracting", |v: &f64| *v < 0.18, AtrRegime::Contracting),
    ]
}

fn volume_rules() -> [Rule<f64, VolumeState>; 3] {
    [
        Rule::new("ignition", |v: &f64| *v >= 1.6, VolumeState::Ignition),
        Rule::new("building", |v: &f64| *v >= 1.2, VolumeState::Building),
        Rule::new("thin", |v: &f64| *v >= 0.7, VolumeState::Thin),
    ]
}

fn funding_rules() -> [Rule<f64, FundingState>; 4] {
    [
        Rule::new("crowded_longs", |v: &f64| *v > 8.0, FundingState::CrowdedLongs),
        Rule::new("crowded_shorts", |v: &f64| *v < -8.0, FundingState::CrowdedShorts),
        Rule::new("positive", |v: &f64| *v > 0.0, FundingState::Positive),
        Rule::new("negative", |v: &f64| *v < 0.0, FundingState::Negative),
    ]
}

fn lsr_rules() -> [Rule<f64, LsrState>; 4] {
    [
        Rule::new("extreme_longs", |v: &f64| *v >= 2.0, LsrState::ExtremeLongs),
        Rule::new("long_heavy", |v: &f64| *v >= 1.5, LsrState::LongHeavy),
        Rule::new("extreme_shorts", |v: &f64| *v <= 0.6, LsrState::ExtremeShorts),
        Rule::new("short_heavy", |v: &f64| *v <= 0.8, LsrState::ShortHeavy),
    ]
}

pub fn atr_regime(atr_pct: Option<f64>) -> AtrRegime {
    atr_pct.map_or(AtrRegime::Unknown, |v| {
        first_match(&atr_rules(), &v, AtrRegime::Normal).0
    })
}

pub fn volume_state(vol_spike: Option<f64>) -> VolumeState {
    vol_spike.map_or(VolumeState::Unknown, |v| {
        first_match(&volume_rules(), &v, VolumeState::Dead).0
    })
}

pub fn funding_state(funding_bps: Option<f64>) -> FundingState {
    funding_bps.map_or(FundingState::Unknown, |v| {
        first_match(&funding_rules(), &v, FundingState::Neutral).0
    })
}

pub fn lsr_state(ratio: Option<f64>) -> LsrState {
    ratio.map_or(LsrState::Unknown, |v| {
        first_match(&lsr_rules(), &v, LsrState::Balanced).0
    })
}

/// Coarse regime labels for one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateLabels {
    pub atr_regime: AtrRegime,
    pub volume_state: VolumeState,
    pub volatility_compression: bool,
    pub volatility_percentile: Option<f64>,
    pub funding_state: FundingState,
    pub open_interest_present: bool,
    pub lsr_state: LsrState,
}

impl StateLabels {
    pub fn from_parts(momentum: Option<&Momentum>, derivatives: &DerivativesSnapshot) -> Self {
        let fast = momentum.map(|m| &m.fast);
        Self {
            atr_regime: atr_regime(fast.map(|f| f.atr_pct)),
            volume_state: volume_state(fast.map(|f| f.vol_spike)),
            volatility_compression: fast.map_or(false, |f| f.bb_squeeze),
            volatility_percentile: fast.and_then(|f| f.bb_squeeze_percentile),
            funding_state: funding_state(derivatives.funding_bps),
            open_interest_present: derivatives.open_interest.is_some(),
            lsr_state: lsr_state(derivatives.long_short_ratio),
        }
    }
}

/// Swing bias on the higher (4h) and lower (1h) timeframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBias {
    pub htf: Bias,
    pub ltf: Bias,
}

/// Everything known about one asset this cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetState {
    pub symbol: String,
    pub role: AssetRole,
    pub structure: Option<StructureState>,
    pub momentum: Option<Momentum>,
    pub derivatives: DerivativesSnapshot,
    pub exhaustion: ExhaustionState,
    pub derivatives_bias: DerivativesBias,
    pub macro_effect: MacroEffect,
    pub bias: AssetBias,
    pub labels: StateLabels,
}

/// Dollar regime and structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DxyState {
    pub trend: MacroTrend,
    pub strength: MacroStrength,
    pub last: f64,
    pub structure: Option<StructureState>,
    pub bias: DxyBias,
}

/// Full per-cycle tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub dxy: Option<DxyState>,
    pub btc: AssetState,
    pub paxg: AssetState,
    #[serde(default)]
    pub constraints: Option<Constraints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_diff: Option<StateDiff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_snapshot_time: Option<String>,
}

impl MarketState {
    pub fn new(dxy: Option<DxyState>, btc: AssetState, paxg: AssetState) -> Self {
        Self {
            dxy,
            btc,
            paxg,
            constraints: None,
            state_diff: None,
            last_snapshot_time: None,
        }
    }
}

/// Assemble an asset's state from its analysed plan.
///
/// `history` feeds the exhaustion detector; without one the plan's own fast
/// momentum is used as a single sample.
pub fn build_asset_state(
    plan: &TradePlan,
    history: Option<&MomentumHistory>,
    dxy: Option<&DxyState>,
) -> AssetState {
    let structure = plan.structure_state.as_ref();
    let momentum = plan.momentum.as_ref();
    let derivatives = &plan.derivatives;

    let fallback_history = momentum.map(|m| MomentumHistory::single(m.fast.clone()));
    let exhaustion = match history.or(fallback_history.as_ref()) {
        Some(history) => detect_exhaustion(history, structure, Some(derivatives)),
        None => ExhaustionState::Unknown,
    };

    let role = AssetRole::for_symbol(&plan.symbol);

    AssetState {
        symbol: plan.symbol.clone(),
        role,
        structure: structure.cloned(),
        momentum: momentum.cloned(),
        derivatives: derivatives.clone(),
        exhaustion,
        derivatives_bias: compute_derivatives_bias(
            structure,
            momentum.map(|m| &m.fast),
            derivatives,
        ),
        macro_effect: macro_effect(role, dxy.map(|d| d.trend), dxy.map(|d| d.strength)),
        bias: AssetBias {
            htf: plan.bias_4h,
            ltf: plan.bias_1h,
        },
        labels: StateLabels::from_parts(momentum, derivatives),
    }
}

/// Dollar state; `None` when no regime could be computed
pub fn build_dxy_state(
    regime: Option<&MacroRegime>,
    structure: Option<StructureState>,
) -> Option<DxyState> {
    let regime = regime?;
    let bias = compute_dxy_bias(structure.as_ref(), Some(regime.strength));
    Some(DxyState {
        trend: regime.trend,
        strength: regime.strength,
        last: regime.last,
        structure,
        bias,
    })
}
