//! Decision & Cross-Asset Scoring
//!
//! Fast (1h) momentum triggers, slow (4h) momentum grants permission:
//! - `decision_label`: TRADE / WATCH / AVOID from an ordered rule cascade
//! - `score_plan`: comparable score in [-15, 15] for ranking two assets
//! - `compare_plans`: strict `>` comparison, ties go to the second asset

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::indicators::round_to;
use super::rules::{first_match, Rule};
use super::swings::Bias;
use super::trade_plan::{PlanDirection, TradePlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Trade,
    Watch,
    Avoid,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Trade => write!(f, "TRADE"),
            Decision::Watch => write!(f, "WATCH"),
            Decision::Avoid => write!(f, "AVOID"),
        }
    }
}

/// Inputs read by the decision cascade. Missing momentum reads as a quiet,
/// non-sideways market.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionInputs {
    pub direction: PlanDirection,
    pub sideways: bool,
    pub bb_squeeze: bool,
    pub atr_pct: f64,
    pub vol_spike: f64,
    pub breakout_watch: bool,
}

impl DecisionInputs {
    pub fn from_plan(plan: &TradePlan) -> Self {
        match &plan.momentum {
            Some(m) => Self {
                direction: plan.direction,
                sideways: m.fast.sideways,
                bb_squeeze: m.fast.bb_squeeze,
                atr_pct: m.fast.atr_pct,
                vol_spike: m.fast.vol_spike,
                breakout_watch: m.slow.breakout_watch,
            },
            None => Self {
                direction: plan.direction,
                sideways: false,
                bb_squeeze: false,
                atr_pct: 0.0,
                vol_spike: 1.0,
                breakout_watch: false,
            },
        }
    }
}

fn is_dead_zone(d: &DecisionInputs) -> bool {
    d.sideways && d.vol_spike < 0.9 && !d.bb_squeeze
}

fn is_compressing(d: &DecisionInputs) -> bool {
    d.bb_squeeze && !d.breakout_watch
}

fn is_igniting(d: &DecisionInputs) -> bool {
    d.breakout_watch
}

fn is_trend_continuation(d: &DecisionInputs) -> bool {
    d.direction.is_directional() && d.atr_pct >= 0.12 && d.vol_spike >= 1.1
}

/// Evaluated in order, first match wins; nothing matching means WATCH
pub fn decision_rules() -> [Rule<DecisionInputs, Decision>; 4] {
    [
        Rule::new("dead_zone", is_dead_zone, Decision::Avoid),
        Rule::new("compression", is_compressing, Decision::Watch),
        Rule::new("ignition", is_igniting, Decision::Trade),
        Rule::new("trend_continuation", is_trend_continuation, Decision::Trade),
    ]
}

pub fn decide(inputs: &DecisionInputs) -> Decision {
    let (decision, rule) = first_match(&decision_rules(), inputs, Decision::Watch);
    debug!("Decision {} via {}", decision, rule);
    decision
}

pub fn decision_label(plan: &TradePlan) -> Decision {
    decide(&DecisionInputs::from_plan(plan))
}

/// Ranking score in [-15, 15], rounded to 2 dp
pub fn score_plan(plan: &TradePlan) -> f64 {
    let mut score = 0.0;

    // Risk/reward
    if let Some(rr) = plan.rr {
        score += rr.clamp(0.0, 4.0) * 1.5;
    }

    // Timeframe alignment
    if plan.bias_4h == plan.bias_1h && plan.bias_4h != Bias::Neutral {
        score += 3.0;
    } else if plan.bias_4h != Bias::Neutral {
        score += 1.0;
    }

    // Funding sweet spot / crowding penalty
    if let Some(bps) = plan.derivatives.funding_bps {
        if (-5.0..=5.0).contains(&bps) {
            score += 1.5;
        } else if bps.abs() > 15.0 {
            score -= 2.0;
        } else if bps.abs() > 10.0 {
            score -= 1.0;
        }
    }

    // Long/short balance
    if let Some(ratio) = plan.derivatives.long_short_ratio {
        if (0.95..=1.05).contains(&ratio) {
            score += 1.5;
        } else if !(0.8..=1.2).contains(&ratio) {
            score -= 1.0;
        }
    }

    // HTF momentum power
    let slow_score = plan
        .momentum
        .as_ref()
        .map(|m| m.slow.momentum_score)
        .unwrap_or(0.0);
    score += slow_score.clamp(-6.0, 8.0);

    match plan.decision {
        Some(Decision::Trade) => score += 4.0,
        Some(Decision::Watch) => score += 0.5,
        Some(Decision::Avoid) => score -= 6.0,
        None => {}
    }

    if plan.direction == PlanDirection::Wait {
        score -= 2.0;
    }

    round_to(score.clamp(-15.0, 15.0), 2)
}

/// Two analysed assets ranked against each other
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub asset_a: String,
    pub asset_b: String,
    pub plan_a: TradePlan,
    pub plan_b: TradePlan,
    pub score_a: f64,
    pub score_b: f64,
    pub winner: String,
}

pub fn compare_plans(plan_a: TradePlan, plan_b: TradePlan) -> Comparison {
    let score_a = score_plan(&plan_a);
    let score_b = score_plan(&plan_b);

    let winner = if score_a > score_b {
        plan_a.symbol.clone()
    } else {
        plan_b.symbol.clone()
    };

    Comparison {
        asset_a: plan_a.symbol.clone(),
        asset_b: plan_b.symbol.clone(),
        plan_a,
        plan_b,
        score_a,
        score_b,
        winner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading_core::momentum::{FastMomentum, Momentum, SlowMomentum};
    use crate::trading_core::trade_plan::build_trade_plan;
    use crate::types::DerivativesSnapshot;

    fn inputs() -> DecisionInputs {
        DecisionInputs {
            direction: PlanDirection::Long,
            sideways: false,
            bb_squeeze: false,
            atr_pct: 0.2,
            vol_spike: 1.0,
            breakout_watch: false,
        }
    }

    fn wait_plan(symbol: &str) -> TradePlan {
        build_trade_plan(symbol, &[], &[], &[])
    }

    #[test]
    fn test_dead_zone_avoids_regardless_of_rest() {
        let d = DecisionInputs {
            sideways: true,
            vol_spike: 0.5,
            breakout_watch: true,
            atr_pct: 3.0,
            ..inputs()
        };
        assert_eq!(decide(&d), Decision::Avoid);
    }

    #[test]
    fn test_cascade_order() {
        let squeeze = DecisionInputs {
            bb_squeeze: true,
            ..inputs()
        };
        assert_eq!(decide(&squeeze), Decision::Watch);

        let ignition = DecisionInputs {
            bb_squeeze: true,
            breakout_watch: true,
            ..inputs()
        };
        assert_eq!(decide(&ignition), Decision::Trade);

        let continuation = DecisionInputs {
            vol_spike: 1.2,
            ..inputs()
        };
        assert_eq!(decide(&continuation), Decision::Trade);

        let waiting = DecisionInputs {
            direction: PlanDirection::Wait,
            vol_spike: 1.2,
            ..inputs()
        };
        assert_eq!(decide(&waiting), Decision::Watch);
    }

    #[test]
    fn test_missing_momentum_is_watch() {
        let plan = wait_plan("BTCUSDT");
        assert_eq!(decision_label(&plan), Decision::Watch);
    }

    #[test]
    fn test_score_wait_plan() {
        let mut plan = wait_plan("BTCUSDT");
        plan.decision = Some(Decision::Watch);
        // neutral biases, no derivatives: +0.5 watch, -2 wait
        assert_eq!(score_plan(&plan), -1.5);
    }

    #[test]
    fn test_score_components() {
        let mut plan = wait_plan("BTCUSDT");
        plan.direction = PlanDirection::Long;
        plan.bias_4h = Bias::Bullish;
        plan.bias_1h = Bias::Bullish;
        plan.rr = Some(6.0);
        plan.derivatives = DerivativesSnapshot {
            funding_bps: Some(2.0),
            long_short_ratio: Some(1.3),
            ..DerivativesSnapshot::default()
        };
        plan.momentum = Some(Momentum::new(
            SlowMomentum {
                momentum_score: 9.5,
                ..SlowMomentum::default()
            },
            FastMomentum::default(),
        ));
        plan.decision = Some(Decision::Trade);
        // 6 (rr capped) + 3 + 1.5 - 1 + 8 (capped) + 4 = 21.5 -> 15
        assert_eq!(score_plan(&plan), 15.0);
    }

    #[test]
    fn test_tie_goes_to_second_asset() {
        let cmp = compare_plans(wait_plan("BTCUSDT"), wait_plan("PAXGUSDT"));
        assert_eq!(cmp.score_a, cmp.score_b);
        assert_eq!(cmp.winner, "PAXGUSDT");
    }

    #[test]
    fn test_higher_score_wins() {
        let mut a = wait_plan("BTCUSDT");
        a.decision = Some(Decision::Trade);
        let mut b = wait_plan("PAXGUSDT");
        b.decision = Some(Decision::Avoid);
        let cmp = compare_plans(a, b);
        assert_eq!(cmp.winner, "BTCUSDT");
        assert!(cmp.score_a > cmp.score_b);
    }
}
