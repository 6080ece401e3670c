//! Trading Core - market analysis shared by the CLI and library users
//!
//! This module contains the analysis pipeline:
//! - Indicators, swings, structure and supply/demand zones
//! - Slow and fast momentum scoring
//! - Trade plans, decision labels and asset comparison
//! - Dollar regime, derivatives and macro bias layers
//! - Exhaustion over a rolling momentum history
//! - Aggregate market state, constraints, snapshot persistence and diffs
//! - The refresh cycle tying it together

pub mod analyzer;
pub mod bias;
pub mod cache;
pub mod constraints;
pub mod cycle;
pub mod decision;
pub mod exhaustion;
pub mod indicators;
pub mod macro_regime;
pub mod market_state;
pub mod momentum;
pub mod rules;
pub mod state_diff;
pub mod structure;
pub mod swings;
pub mod trade_plan;
pub mod zones;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use analyzer::{analyze_asset, compare_assets};
pub use bias::{AssetRole, DerivativesBias, DxyBias, MacroEffect};
pub use cache::{format_snapshot_time, Snapshot, SnapshotStore};
pub use constraints::{build_constraints, Constraints};
pub use cycle::{run_cycle, CycleContext, CycleReport};
pub use decision::{compare_plans, decision_label, Comparison, Decision};
pub use exhaustion::{detect_exhaustion, ExhaustionState, MomentumHistory};
pub use macro_regime::{detect_macro_regime, MacroRegime, MacroStrength, MacroTrend, TimedCache};
pub use market_state::{AssetState, DxyState, MarketState};
pub use momentum::{momentum_score, momentum_score_1h, FastMomentum, FlowDirection, Momentum, SlowMomentum};
pub use state_diff::{diff_market_state, StateDiff};
pub use structure::{detect_structure, StructureConfig, StructureLabel, StructureState, Trend};
pub use swings::Bias;
pub use trade_plan::{build_trade_plan, PlanDirection, TradePlan};
pub use zones::{Zone, ZoneKind};
