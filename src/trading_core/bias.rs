//! Directional pressure labels
//!
//! - Derivatives bias: funding and long/short positioning scored against
//!   structure trend and fast flow
//! - DXY bias: break of structure first, then trend + strength, then ranging
//! - Macro effect: how the dollar regime leans on a risk asset or a hedge

use serde::{Deserialize, Serialize};

use super::macro_regime::{MacroStrength, MacroTrend};
use super::momentum::{FastMomentum, FlowDirection};
use super::rules::{first_match, Rule};
use super::structure::{StructureLabel, StructureState, SwingDirection, Trend};
use crate::types::DerivativesSnapshot;

/// Funding (bps) beyond which positioning counts double
const EXTREME_FUNDING_BPS: f64 = 8.0;
const CROWDED_LONG_RATIO: f64 = 2.0;
const CROWDED_SHORT_RATIO: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivativesBias {
    #[serde(rename = "BULLISH")]
    Bullish,
    #[serde(rename = "BEARISH")]
    Bearish,
    #[serde(rename = "NEUTRAL - Thin Derivatives")]
    ThinDerivatives,
    #[serde(rename = "MIXED - Positioning vs Trend")]
    Mixed,
}

impl std::fmt::Display for DerivativesBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DerivativesBias::Bullish => write!(f, "BULLISH"),
            DerivativesBias::Bearish => write!(f, "BEARISH"),
            DerivativesBias::ThinDerivatives => write!(f, "NEUTRAL - Thin Derivatives"),
            DerivativesBias::Mixed => write!(f, "MIXED - Positioning vs Trend"),
        }
    }
}

/// Bullish / bearish point tally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressureTally {
    pub bullish: u32,
    pub bearish: u32,
}

impl PressureTally {
    pub fn verdict(&self) -> DerivativesBias {
        let (bull, bear) = (self.bullish, self.bearish);
        if bull >= 3 && bull >= bear + 2 {
            DerivativesBias::Bullish
        } else if bear >= 3 && bear >= bull + 2 {
            DerivativesBias::Bearish
        } else if bull == 0 && bear == 0 {
            DerivativesBias::ThinDerivatives
        } else {
            DerivativesBias::Mixed
        }
    }
}

/// Tally funding and long/short positioning against trend and flow.
/// Open interest is context only.
pub fn tally_derivatives(
    structure: Option<&StructureState>,
    momentum: Option<&FastMomentum>,
    derivatives: &DerivativesSnapshot,
) -> PressureTally {
    let trend = structure.map(|s| s.trend).unwrap_or(Trend::Neutral);
    let flow = momentum
        .map(|m| m.flow_state)
        .unwrap_or(FlowDirection::Neutral);

    let leaning_up = trend == Trend::Uptrend || flow == FlowDirection::Up;
    let leaning_down = trend == Trend::Downtrend || flow == FlowDirection::Down;

    let mut tally = PressureTally::default();

    if let Some(bps) = derivatives.funding_bps {
        if bps < 0.0 {
            let weight = if bps <= -EXTREME_FUNDING_BPS { 2 } else { 1 };
            if leaning_up {
                tally.bullish += weight;
            } else if leaning_down {
                tally.bearish += weight;
            } else {
                tally.bullish += 1;
            }
        } else if bps > 0.0 {
            if leaning_down {
                tally.bearish += if bps >= EXTREME_FUNDING_BPS { 2 } else { 1 };
            } else {
                tally.bearish += 1;
            }
        }
    }

    if let Some(ratio) = derivatives.long_short_ratio {
        if ratio >= CROWDED_LONG_RATIO {
            tally.bearish += if trend == Trend::Downtrend { 2 } else { 1 };
        } else if ratio <= CROWDED_SHORT_RATIO {
            if leaning_up {
                tally.bullish += 2;
            } else if trend == Trend::Neutral {
                tally.bullish += 1;
            }
        }
    }

    tally
}

pub fn compute_derivatives_bias(
    structure: Option<&StructureState>,
    momentum: Option<&FastMomentum>,
    derivatives: &DerivativesSnapshot,
) -> DerivativesBias {
    tally_derivatives(structure, momentum, derivatives).verdict()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DxyBias {
    #[serde(rename = "BULLISH")]
    Bullish,
    #[serde(rename = "BEARISH")]
    Bearish,
    /// No structure available
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "MIXED - Trend Continuation")]
    MixedContinuation,
    #[serde(rename = "NEUTRAL - Dead Market")]
    DeadMarket,
}

impl std::fmt::Display for DxyBias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DxyBias::Bullish => write!(f, "BULLISH"),
            DxyBias::Bearish => write!(f, "BEARISH"),
            DxyBias::Neutral => write!(f, "NEUTRAL"),
            DxyBias::MixedContinuation => write!(f, "MIXED - Trend Continuation"),
            DxyBias::DeadMarket => write!(f, "NEUTRAL - Dead Market"),
        }
    }
}

/// Fields the DXY cascade reads
#[derive(Debug, Clone, Copy)]
pub struct DxyInputs {
    pub trend: Trend,
    pub state: StructureLabel,
    pub bos: Option<SwingDirection>,
    pub strength: Option<MacroStrength>,
}

pub fn dxy_rules() -> [Rule<DxyInputs, DxyBias>; 5] {
    [
        Rule::new("bos_up", |d: &DxyInputs| d.bos == Some(SwingDirection::Up), DxyBias::Bullish),
        Rule::new("bos_down", |d: &DxyInputs| d.bos == Some(SwingDirection::Down), DxyBias::Bearish),
        Rule::new(
            "strong_uptrend",
            |d: &DxyInputs| d.trend == Trend::Uptrend && d.strength == Some(MacroStrength::High),
            DxyBias::Bullish,
        ),
        Rule::new(
            "strong_downtrend",
            |d: &DxyInputs| d.trend == Trend::Downtrend && d.strength == Some(MacroStrength::High),
            DxyBias::Bearish,
        ),
        Rule::new(
            "ranging",
            |d: &DxyInputs| d.state == StructureLabel::Ranging,
            DxyBias::MixedContinuation,
        ),
    ]
}

/// Dollar bias from its own structure and regime strength
pub fn compute_dxy_bias(
    structure: Option<&StructureState>,
    strength: Option<MacroStrength>,
) -> DxyBias {
    let Some(structure) = structure else {
        return DxyBias::Neutral;
    };

    let inputs = DxyInputs {
        trend: structure.trend,
        state: structure.state,
        bos: structure.break_of_structure,
        strength,
    };
    first_match(&dxy_rules(), &inputs, DxyBias::DeadMarket).0
}

/// How an asset relates to the dollar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    /// Moves against USD strength (gold, PAXG)
    Hedge,
    /// Suffers from tightening USD liquidity (BTC)
    RiskAsset,
    Unclassified,
}

impl AssetRole {
    pub fn for_symbol(symbol: &str) -> Self {
        let symbol = symbol.to_ascii_uppercase();
        if symbol.starts_with("PAXG") || symbol.starts_with("XAU") {
            AssetRole::Hedge
        } else if symbol.starts_with("BTC") {
            AssetRole::RiskAsset
        } else {
            AssetRole::Unclassified
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacroEffect {
    BullishTailwind,
    BearishHeadwind,
    BearishPressure,
    PotentialTailwind,
    Neutral,
}

impl std::fmt::Display for MacroEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MacroEffect::BullishTailwind => write!(f, "BULLISH_TAILWIND"),
            MacroEffect::BearishHeadwind => write!(f, "BEARISH_HEADWIND"),
            MacroEffect::BearishPressure => write!(f, "BEARISH_PRESSURE"),
            MacroEffect::PotentialTailwind => write!(f, "POTENTIAL_TAILWIND"),
            MacroEffect::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

pub fn macro_effect(
    role: AssetRole,
    trend: Option<MacroTrend>,
    strength: Option<MacroStrength>,
) -> MacroEffect {
    let Some(trend) = trend else {
        return MacroEffect::Neutral;
    };

    match role {
        AssetRole::Hedge => match trend {
            MacroTrend::Down => MacroEffect::BullishTailwind,
            MacroTrend::Up => MacroEffect::BearishHeadwind,
            MacroTrend::Neutral => MacroEffect::Neutral,
        },
        AssetRole::RiskAsset => match (trend, strength) {
            (MacroTrend::Up, Some(MacroStrength::Medium | MacroStrength::High)) => {
                MacroEffect::BearishPressure
            }
            (MacroTrend::Down, _) => MacroEffect::PotentialTailwind,
            _ => MacroEffect::Neutral,
        },
        AssetRole::Unclassified => MacroEffect::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(trend: Trend, state: StructureLabel, bos: Option<SwingDirection>) -> StructureState {
        StructureState {
            trend,
            state,
            break_of_structure: bos,
            ..StructureState::default()
        }
    }

    fn derivs(funding: Option<f64>, ratio: Option<f64>) -> DerivativesSnapshot {
        DerivativesSnapshot {
            funding_bps: funding,
            long_short_ratio: ratio,
            ..DerivativesSnapshot::default()
        }
    }

    #[test]
    fn test_thin_derivatives() {
        let bias = compute_derivatives_bias(None, None, &DerivativesSnapshot::default());
        assert_eq!(bias, DerivativesBias::ThinDerivatives);
    }

    #[test]
    fn test_shorts_paying_into_uptrend_is_bullish() {
        let s = structure(Trend::Uptrend, StructureLabel::HigherHighs, None);
        let tally = tally_derivatives(Some(&s), None, &derivs(Some(-9.0), Some(0.5)));
        assert_eq!(tally, PressureTally { bullish: 4, bearish: 0 });
        assert_eq!(tally.verdict(), DerivativesBias::Bullish);
    }

    #[test]
    fn test_crowded_longs_in_downtrend_is_bearish() {
        let s = structure(Trend::Downtrend, StructureLabel::LowerLows, None);
        let bias = compute_derivatives_bias(Some(&s), None, &derivs(Some(10.0), Some(2.5)));
        assert_eq!(bias, DerivativesBias::Bearish);
    }

    #[test]
    fn test_flow_counts_as_lean() {
        let fast = FastMomentum {
            flow_state: FlowDirection::Down,
            ..FastMomentum::default()
        };
        let tally = tally_derivatives(None, Some(&fast), &derivs(Some(-3.0), None));
        assert_eq!(tally, PressureTally { bullish: 0, bearish: 1 });
        assert_eq!(tally.verdict(), DerivativesBias::Mixed);
    }

    #[test]
    fn test_dxy_bos_overrides_trend() {
        let s = structure(
            Trend::Downtrend,
            StructureLabel::StructureBreakUp,
            Some(SwingDirection::Up),
        );
        assert_eq!(compute_dxy_bias(Some(&s), Some(MacroStrength::High)), DxyBias::Bullish);
    }

    #[test]
    fn test_dxy_fallbacks() {
        assert_eq!(compute_dxy_bias(None, Some(MacroStrength::High)), DxyBias::Neutral);

        let strong = structure(Trend::Downtrend, StructureLabel::LowerLows, None);
        assert_eq!(compute_dxy_bias(Some(&strong), Some(MacroStrength::High)), DxyBias::Bearish);
        assert_eq!(compute_dxy_bias(Some(&strong), Some(MacroStrength::Low)), DxyBias::DeadMarket);

        let ranging = structure(Trend::Neutral, StructureLabel::Ranging, None);
        assert_eq!(
            compute_dxy_bias(Some(&ranging), None),
            DxyBias::MixedContinuation
        );
    }

    #[test]
    fn test_macro_effect_by_role() {
        assert_eq!(AssetRole::for_symbol("PAXGUSDT"), AssetRole::Hedge);
        assert_eq!(AssetRole::for_symbol("btcusdt"), AssetRole::RiskAsset);

        let up = Some(MacroTrend::Up);
        assert_eq!(
            macro_effect(AssetRole::Hedge, up, Some(MacroStrength::Low)),
            MacroEffect::BearishHeadwind
        );
        assert_eq!(
            macro_effect(AssetRole::RiskAsset, up, Some(MacroStrength::Low)),
            MacroEffect::Neutral
        );
        assert_eq!(
            macro_effect(AssetRole::RiskAsset, up, Some(MacroStrength::High)),
            MacroEffect::BearishPressure
        );
        assert_eq!(
            macro_effect(AssetRole::RiskAsset, Some(MacroTrend::Down), None),
            MacroEffect::PotentialTailwind
        );
        assert_eq!(macro_effect(AssetRole::Hedge, None, None), MacroEffect::Neutral);
    }

    #[test]
    fn test_labels_serialize_verbatim() {
        let json = serde_json::to_string(&DerivativesBias::Mixed).unwrap();
        assert_eq!(json, "\"MIXED - Positioning vs Trend\"");
        let json = serde_json::to_string(&MacroEffect::BullishTailwind).unwrap();
        assert_eq!(json, "\"BULLISH_TAILWIND\"");
    }
}
