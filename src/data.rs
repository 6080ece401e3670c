//! Market data sources
//!
//! The analysis core never fetches anything itself. It reads candles and
//! derivatives through `MarketDataSource`:
//! - `CsvDataSource`: `<dir>/<SYMBOL>_<tf>.csv` candle files and
//!   `<dir>/<SYMBOL>_derivatives.json` snapshots
//! - `InMemoryDataSource`: preloaded series, for tests and embedding

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::SentinelError;
use crate::types::{Candle, DerivativesSnapshot, Timeframe};

pub trait MarketDataSource {
    /// Most recent `limit` candles, time-ascending
    fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, SentinelError>;

    /// Current derivatives positioning
    fn derivatives(&self, symbol: &str) -> Result<DerivativesSnapshot, SentinelError>;
}

/// Reject series that are not strictly time-ascending
pub fn ensure_ascending(symbol: &str, candles: &[Candle]) -> Result<(), SentinelError> {
    for (row, pair) in candles.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(SentinelError::UnorderedCandles {
                symbol: symbol.to_string(),
                row: row + 1,
            });
        }
    }
    Ok(())
}

fn tail(mut candles: Vec<Candle>, limit: usize) -> Vec<Candle> {
    let excess = candles.len().saturating_sub(limit);
    candles.drain(..excess);
    candles
}

/// Candle CSVs (`timestamp,open,high,low,close,volume`, RFC 3339
/// timestamps) and derivatives JSON files in one directory
#[derive(Debug, Clone)]
pub struct CsvDataSource {
    dir: PathBuf,
}

impl CsvDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn candle_path(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", symbol, timeframe))
    }

    pub fn derivatives_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}_derivatives.json", symbol))
    }
}

impl MarketDataSource for CsvDataSource {
    fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, SentinelError> {
        let path = self.candle_path(symbol, timeframe);
        if !path.exists() {
            return Err(SentinelError::DataUnavailable {
                name: path.display().to_string(),
            });
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let candles = reader
            .deserialize::<Candle>()
            .collect::<Result<Vec<_>, _>>()?;

        ensure_ascending(symbol, &candles)?;
        debug!("Loaded {} {} bars from {}", candles.len(), timeframe, path.display());

        Ok(tail(candles, limit))
    }

    fn derivatives(&self, symbol: &str) -> Result<DerivativesSnapshot, SentinelError> {
        let path = self.derivatives_path(symbol);
        if !path.exists() {
            return Err(SentinelError::DataUnavailable {
                name: path.display().to_string(),
            });
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Preloaded series keyed by symbol and timeframe
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    candles: HashMap<(String, Timeframe), Vec<Candle>>,
    derivatives: HashMap<String, DerivativesSnapshot>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(mut self, symbol: &str, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        self.candles.insert((symbol.to_string(), timeframe), candles);
        self
    }

    pub fn with_derivatives(mut self, symbol: &str, snapshot: DerivativesSnapshot) -> Self {
        self.derivatives.insert(symbol.to_string(), snapshot);
        self
    }
}

impl MarketDataSource for InMemoryDataSource {
    fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>, SentinelError> {
        let candles = self
            .candles
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| SentinelError::DataUnavailable {
                name: format!("{} {}", symbol, timeframe),
            })?;
        ensure_ascending(symbol, candles)?;
        Ok(tail(candles.clone(), limit))
    }

    fn derivatives(&self, symbol: &str) -> Result<DerivativesSnapshot, SentinelError> {
        self.derivatives
            .get(symbol)
            .cloned()
            .ok_or_else(|| SentinelError::DataUnavailable {
                name: format!("{} derivatives", symbol),
            })
    }
}
