//! Runtime configuration

use std::path::PathBuf;

use chrono_tz::Tz;

use crate::types::Timeframe;

/// Settings for one sentinel process
#[derive(Debug, Clone)]
pub struct SentinelConfig {
    /// Risk asset, reported in the `btc` slot
    pub risk_symbol: String,
    /// Macro hedge, reported in the `paxg` slot
    pub hedge_symbol: String,
    /// Dollar index proxy
    pub macro_symbol: String,
    /// Timeframe the dollar regime is read from
    pub macro_timeframe: Timeframe,
    /// Directory holding candle and derivatives files
    pub data_dir: PathBuf,
    pub snapshot_path: PathBuf,
    /// Timezone for snapshot stamps and display
    pub timezone: Tz,
    /// Delay between cycles in watch mode
    pub refresh_interval: std::time::Duration,
    /// Fast momentum samples kept per asset for exhaustion
    pub momentum_history: usize,
    /// How long a macro regime stays valid
    pub macro_cache_ttl: chrono::Duration,
    /// Bars requested per timeframe
    pub candle_limit: usize,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            risk_symbol: "BTCUSDT".to_string(),
            hedge_symbol: "PAXGUSDT".to_string(),
            macro_symbol: "DXY".to_string(),
            macro_timeframe: Timeframe::H1,
            data_dir: PathBuf::from("data"),
            snapshot_path: PathBuf::from("snapshot_memory.json"),
            timezone: chrono_tz::Asia::Kolkata,
            refresh_interval: std::time::Duration::from_secs(300), // 5 minutes
            momentum_history: 12,
            macro_cache_ttl: chrono::Duration::minutes(10),
            candle_limit: 400,
        }
    }
}
