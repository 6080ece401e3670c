//! Snapshot persistence for the market state
//!
//! A single current-value JSON record `{timestamp, state}` overwritten every
//! cycle. Loading is forgiving: a missing or unreadable file simply means
//! there is no previous snapshot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::market_state::MarketState;

/// Display format for snapshot times
const DISPLAY_FORMAT: &str = "%d %b %Y, %I:%M %p %Z";

/// Persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// ISO-8601 in the display timezone
    pub timestamp: String,
    pub state: MarketState,
}

/// File-backed store, single writer
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    timezone: Tz,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            path: path.into(),
            timezone,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Previous snapshot, or `None` when missing or unparseable
    pub fn load(&self) -> Option<Snapshot> {
        if !self.path.exists() {
            debug!("No snapshot at {}", self.path.display());
            return None;
        }

        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Could not read snapshot {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Ignoring unreadable snapshot {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Overwrite the snapshot with `state`, stamped at `now`
    pub fn save(&self, state: &MarketState, now: DateTime<Utc>) -> Result<()> {
        let snapshot = Snapshot {
            timestamp: now.with_timezone(&self.timezone).to_rfc3339(),
            state: state.clone(),
        };

        let json = serde_json::to_string_pretty(&snapshot).context("serializing snapshot")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing snapshot to {}", self.path.display()))?;

        debug!("Saved snapshot to {}", self.path.display());
        Ok(())
    }
}

/// Human-readable snapshot time in `tz`, e.g. `16 Oct 2026, 03:04 PM IST`.
/// Naive timestamps are taken as already in `tz`; anything unparseable is
/// returned as given.
pub fn format_snapshot_time(iso: &str, tz: Tz) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(iso) {
        return dt.with_timezone(&tz).format(DISPLAY_FORMAT).to_string();
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f") {
        if let Some(local) = tz.from_local_datetime(&naive).earliest() {
            return local.format(DISPLAY_FORMAT).to_string();
        }
    }

    iso.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading_core::market_state::build_asset_state;
    use crate::trading_core::trade_plan::build_trade_plan;

    fn state() -> MarketState {
        MarketState::new(
            None,
            build_asset_state(&build_trade_plan("BTCUSDT", &[], &[], &[]), None, None),
            build_asset_state(&build_trade_plan("PAXGUSDT", &[], &[], &[]), None, None),
        )
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"), chrono_tz::Asia::Kolkata);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"), chrono_tz::Asia::Kolkata);
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 34, 0).unwrap();

        store.save(&state(), now).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.state, state());
        assert_eq!(loaded.timestamp, "2026-10-16T15:04:00+05:30");
    }

    #[test]
    fn test_corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SnapshotStore::new(path, chrono_tz::Asia::Kolkata);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_into_missing_dir_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(
            dir.path().join("nope").join("snapshot.json"),
            chrono_tz::Asia::Kolkata,
        );
        assert!(store.save(&state(), Utc::now()).is_err());
    }

    #[test]
    fn test_format_snapshot_time() {
        let tz = chrono_tz::Asia::Kolkata;
        assert_eq!(
            format_snapshot_time("2026-10-16T15:04:00+05:30", tz),
            "16 Oct 2026, 03:04 PM IST"
        );
        assert_eq!(
            format_snapshot_time("2026-10-16T09:34:00Z", tz),
            "16 Oct 2026, 03:04 PM IST"
        );
        assert_eq!(
            format_snapshot_time("2026-10-16T15:04:00", tz),
            "16 Oct 2026, 03:04 PM IST"
        );
        assert_eq!(format_snapshot_time("yesterday", tz), "yesterday");
    }
}
