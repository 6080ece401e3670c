//! Per-asset analysis
//!
//! Fetches 15m / 1h / 4h candles, builds the trade plan, scores fast (1h)
//! and slow (4h) momentum, reads 4h structure, attaches derivatives and
//! labels the result.

use tracing::{info, warn};

use super::decision::{compare_plans, decision_label, Comparison};
use super::momentum::{momentum_score, momentum_score_1h, Momentum};
use super::structure::{detect_structure, StructureConfig};
use super::trade_plan::{build_trade_plan, TradePlan};
use crate::data::MarketDataSource;
use crate::errors::SentinelError;
use crate::types::{DerivativesSnapshot, Timeframe};

/// Derivatives are best-effort: any failure becomes an all-null snapshot
pub fn fetch_derivatives(source: &dyn MarketDataSource, symbol: &str) -> DerivativesSnapshot {
    match source.derivatives(symbol) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!("{}: derivatives unavailable: {}", symbol, e);
            DerivativesSnapshot::unavailable(e.to_string())
        }
    }
}

/// Full per-asset pipeline. Only missing candles are an error.
pub fn analyze_asset(
    source: &dyn MarketDataSource,
    symbol: &str,
    limit: usize,
) -> Result<TradePlan, SentinelError> {
    let candles_15m = source.candles(symbol, Timeframe::M15, limit)?;
    let candles_1h = source.candles(symbol, Timeframe::H1, limit)?;
    let candles_4h = source.candles(symbol, Timeframe::H4, limit)?;

    let mut plan = build_trade_plan(symbol, &candles_15m, &candles_1h, &candles_4h);

    let fast = momentum_score_1h(&candles_1h);
    let slow = momentum_score(&candles_4h);
    plan.momentum = Some(Momentum::new(slow, fast));

    plan.structure_state = Some(detect_structure(&candles_4h, &StructureConfig::default()));

    let mut plan = plan.with_derivatives(fetch_derivatives(source, symbol));
    let decision = decision_label(&plan);
    plan.decision = Some(decision);

    info!(
        "{}: {} | 4h {} / 1h {} | {}",
        symbol, plan.direction, plan.bias_4h, plan.bias_1h, decision
    );
    Ok(plan)
}

/// Analyse both symbols independently and rank them
pub fn compare_assets(
    source: &dyn MarketDataSource,
    symbol_a: &str,
    symbol_b: &str,
    limit: usize,
) -> Result<Comparison, SentinelError> {
    let plan_a = analyze_asset(source, symbol_a, limit)?;
    let plan_b = analyze_asset(source, symbol_b, limit)?;

    let comparison = compare_plans(plan_a, plan_b);
    info!(
        "{} {:.2} vs {} {:.2} -> {}",
        comparison.asset_a, comparison.score_a, comparison.asset_b, comparison.score_b, comparison.winner
    );
    Ok(comparison)
}
