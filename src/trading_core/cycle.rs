//! Refresh cycle
//!
//! One cycle, strictly in dependency order:
//! 1. analyse and rank both assets
//! 2. dollar regime (cached) and structure
//! 3. asset states, constraints
//! 4. load previous snapshot, persist the new one, diff
//!
//! All state carried between cycles lives in a caller-owned `CycleContext`.
//! Momentum history grows by one sample per closed 1h bar, not per cycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::analyzer::compare_assets;
use super::cache::SnapshotStore;
use super::constraints::build_constraints;
use super::decision::Comparison;
use super::exhaustion::MomentumHistory;
use super::macro_regime::{detect_macro_regime, MacroRegime, TimedCache};
use super::market_state::{build_asset_state, build_dxy_state, DxyState, MarketState};
use super::momentum::FastMomentum;
use super::state_diff::diff_market_state;
use super::structure::{detect_structure, StructureConfig};
use super::trade_plan::TradePlan;
use crate::config::SentinelConfig;
use crate::data::MarketDataSource;
use crate::errors::SentinelError;
use crate::types::{closes, Timeframe};

/// State carried from one cycle to the next
#[derive(Debug, Default)]
pub struct CycleContext {
    macro_cache: Option<TimedCache<MacroRegime>>,
    histories: HashMap<String, MomentumHistory>,
    /// 1h bar each history last sampled
    sampled_bars: HashMap<String, DateTime<Utc>>,
}

impl CycleContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fast momentum sample for `symbol`, keeping at most `capacity`
    pub fn record_momentum(
        &mut self,
        symbol: &str,
        sample: FastMomentum,
        capacity: usize,
    ) -> &MomentumHistory {
        self.histories
            .entry(symbol.to_string())
            .and_modify(|h| h.push(sample.clone(), capacity))
            .or_insert_with(|| MomentumHistory::single(sample))
    }

    /// Record a sample taken on the 1h bar opened at `bar_time`. Returns
    /// false when that bar was already sampled.
    pub fn record_bar_sample(
        &mut self,
        symbol: &str,
        sample: FastMomentum,
        bar_time: DateTime<Utc>,
        capacity: usize,
    ) -> bool {
        if let Some(last) = self.sampled_bars.get(symbol) {
            if bar_time <= *last {
                debug!("{}: 1h bar {} already sampled", symbol, bar_time);
                return false;
            }
        }
        self.sampled_bars.insert(symbol.to_string(), bar_time);
        self.record_momentum(symbol, sample, capacity);
        true
    }

    pub fn history(&self, symbol: &str) -> Option<&MomentumHistory> {
        self.histories.get(symbol)
    }

    /// Dollar regime, served from cache while fresh
    pub fn macro_regime(
        &mut self,
        source: &dyn MarketDataSource,
        config: &SentinelConfig,
        now: DateTime<Utc>,
    ) -> Option<MacroRegime> {
        if let Some(cached) = self
            .macro_cache
            .as_ref()
            .and_then(|c| c.get_fresh(now, config.macro_cache_ttl))
        {
            return Some(cached.clone());
        }

        let candles = match source.candles(&config.macro_symbol, config.macro_timeframe, config.candle_limit) {
            Ok(candles) => candles,
            Err(e) => {
                warn!("{}: macro regime unavailable: {}", config.macro_symbol, e);
                return None;
            }
        };

        let regime = detect_macro_regime(&closes(&candles))?;
        self.macro_cache = Some(TimedCache::new(regime.clone(), now));
        Some(regime)
    }
}

/// Result of one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub comparison: Comparison,
    pub state: MarketState,
}

fn record_plan(ctx: &mut CycleContext, plan: &TradePlan, capacity: usize) {
    let Some(momentum) = &plan.momentum else {
        return;
    };
    match plan.bar_time_1h {
        Some(bar_time) => {
            ctx.record_bar_sample(&plan.symbol, momentum.fast.clone(), bar_time, capacity);
        }
        None => {
            ctx.record_momentum(&plan.symbol, momentum.fast.clone(), capacity);
        }
    }
}

fn dxy_state(
    source: &dyn MarketDataSource,
    config: &SentinelConfig,
    ctx: &mut CycleContext,
    now: DateTime<Utc>,
) -> Option<DxyState> {
    let regime = ctx.macro_regime(source, config, now);

    let structure = match source.candles(&config.macro_symbol, Timeframe::H4, config.candle_limit) {
        Ok(candles) => Some(detect_structure(&candles, &StructureConfig::default())),
        Err(e) => {
            warn!("{}: structure unavailable: {}", config.macro_symbol, e);
            None
        }
    };

    build_dxy_state(regime.as_ref(), structure)
}

/// Run one refresh cycle. Fails only when an asset's candles are missing;
/// macro data and snapshot persistence degrade silently.
pub fn run_cycle(
    source: &dyn MarketDataSource,
    config: &SentinelConfig,
    ctx: &mut CycleContext,
    store: &SnapshotStore,
    now: DateTime<Utc>,
) -> Result<CycleReport, SentinelError> {
    let comparison = compare_assets(
        source,
        &config.risk_symbol,
        &config.hedge_symbol,
        config.candle_limit,
    )?;

    record_plan(ctx, &comparison.plan_a, config.momentum_history);
    record_plan(ctx, &comparison.plan_b, config.momentum_history);

    let dxy = dxy_state(source, config, ctx, now);

    let btc = build_asset_state(
        &comparison.plan_a,
        ctx.history(&config.risk_symbol),
        dxy.as_ref(),
    );
    let paxg = build_asset_state(
        &comparison.plan_b,
        ctx.history(&config.hedge_symbol),
        dxy.as_ref(),
    );

    let mut state = MarketState::new(dxy, btc, paxg);
    state.constraints = Some(build_constraints(&state));

    let previous = store.load();
    if let Err(e) = store.save(&state, now) {
        warn!("Snapshot not saved: {:#}", e);
    }

    state.state_diff = Some(diff_market_state(
        previous.as_ref().map(|p| &p.state),
        &state,
    ));
    state.last_snapshot_time = previous.map(|p| p.timestamp);

    info!(
        "Cycle done: {} {} / {} {}",
        state.btc.symbol, state.btc.exhaustion, state.paxg.symbol, state.paxg.exhaustion
    );

    Ok(CycleReport { comparison, state })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryDataSource;
    use crate::trading_core::state_diff::StateDiff;
    use crate::trading_core::test_support::{flat_series, trending, zigzag};
    use chrono::{Duration, TimeZone};

    const BULL: [f64; 8] = [100.0, 110.0, 104.0, 114.0, 108.0, 118.0, 112.0, 113.0];

    fn source() -> InMemoryDataSource {
        let bars = zigzag(&BULL, 6);
        let gold = trending(150, 2000.0, 0.001, 40.0);
        InMemoryDataSource::new()
            .with_candles("BTCUSDT", Timeframe::M15, flat_series(10, 113.0, 5.0))
            .with_candles("BTCUSDT", Timeframe::H1, bars.clone())
            .with_candles("BTCUSDT", Timeframe::H4, bars)
            .with_candles("PAXGUSDT", Timeframe::M15, gold.clone())
            .with_candles("PAXGUSDT", Timeframe::H1, gold.clone())
            .with_candles("PAXGUSDT", Timeframe::H4, gold)
            .with_candles("DXY", Timeframe::H1, trending(60, 100.0, 0.001, 0.0))
            .with_candles("DXY", Timeframe::H4, trending(60, 100.0, 0.001, 0.0))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 34, 0).unwrap()
    }

    #[test]
    fn test_first_cycle_has_no_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snap.json"), chrono_tz::Asia::Kolkata);
        let mut ctx = CycleContext::new();
        let config = SentinelConfig::default();

        let report = run_cycle(&source(), &config, &mut ctx, &store, now()).unwrap();
        assert_eq!(report.state.state_diff, Some(StateDiff::no_previous()));
        assert!(report.state.last_snapshot_time.is_none());
        assert!(report.state.constraints.is_some());
        assert!(report.state.dxy.is_some());
        assert!(store.load().is_some());
    }

    #[test]
    fn test_second_cycle_diffs_against_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snap.json"), chrono_tz::Asia::Kolkata);
        let mut ctx = CycleContext::new();
        let config = SentinelConfig::default();
        let src = source();

        run_cycle(&src, &config, &mut ctx, &store, now()).unwrap();
        let second = run_cycle(&src, &config, &mut ctx, &store, now() + Duration::minutes(5)).unwrap();

        // Same inputs: nothing tracked changed
        let changes = second.state.state_diff.as_ref().unwrap().changes().unwrap();
        assert!(changes.is_empty());
        assert_eq!(
            second.state.last_snapshot_time.as_deref(),
            Some("2026-10-16T15:04:00+05:30")
        );
        // Same 1h bar both times: sampled once
        assert_eq!(ctx.history("BTCUSDT").unwrap().len(), 1);
    }

    #[test]
    fn test_history_advances_per_closed_bar() {
        let mut ctx = CycleContext::new();
        let bar = now();
        let sample = FastMomentum::default();

        assert!(ctx.record_bar_sample("BTCUSDT", sample.clone(), bar, 12));
        assert!(!ctx.record_bar_sample("BTCUSDT", sample.clone(), bar, 12));
        assert!(!ctx.record_bar_sample("BTCUSDT", sample.clone(), bar - Duration::hours(1), 12));
        assert_eq!(ctx.history("BTCUSDT").unwrap().len(), 1);

        assert!(ctx.record_bar_sample("BTCUSDT", sample.clone(), bar + Duration::hours(1), 12));
        assert_eq!(ctx.history("BTCUSDT").unwrap().len(), 2);

        // Symbols are tracked separately
        assert!(ctx.record_bar_sample("PAXGUSDT", sample, bar, 12));
        assert_eq!(ctx.history("PAXGUSDT").unwrap().len(), 1);
    }

    #[test]
    fn test_macro_regime_cached_within_ttl() {
        let config = SentinelConfig::default();
        let mut ctx = CycleContext::new();
        let first = ctx.macro_regime(&source(), &config, now()).unwrap();

        // Source without DXY: cached value still served inside the TTL
        let empty = InMemoryDataSource::new();
        let cached = ctx.macro_regime(&empty, &config, now() + Duration::minutes(9));
        assert_eq!(cached, Some(first));

        let expired = ctx.macro_regime(&empty, &config, now() + Duration::minutes(11));
        assert!(expired.is_none());
    }

    #[test]
    fn test_missing_macro_data_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snap.json"), chrono_tz::Asia::Kolkata);
        let mut ctx = CycleContext::new();
        let config = SentinelConfig {
            macro_symbol: "NOPE".to_string(),
            ..SentinelConfig::default()
        };
        let report = run_cycle(&source(), &config, &mut ctx, &store, now()).unwrap();
        assert!(report.state.dxy.is_none());
    }
}
