use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SentinelError;

/// One OHLCV bar. Series are supplied time-ascending by the data layer and
/// never mutated by the analysis code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candle timeframes consumed by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
}

impl Timeframe {
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for Timeframe {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            other => Err(SentinelError::UnknownTimeframe(other.to_string())),
        }
    }
}

/// Perpetual-futures positioning for one symbol.
///
/// Every field is nullable: a failed fetch leaves the field `None` and
/// records the reason in `error`. Consumers treat `None` as "no data",
/// never as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivativesSnapshot {
    #[serde(rename = "fundingBps", default)]
    pub funding_bps: Option<f64>,
    #[serde(rename = "openInterest", default)]
    pub open_interest: Option<f64>,
    #[serde(rename = "longShortRatio", default)]
    pub long_short_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DerivativesSnapshot {
    /// All-null snapshot carrying the reason the fetch failed
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.funding_bps.is_none() && self.open_interest.is_none() && self.long_short_ratio.is_none()
    }
}

/// Closing prices of a series, in order
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_parse() {
        assert_eq!("4H".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert_eq!("15m".parse::<Timeframe>().unwrap(), Timeframe::M15);
        assert!("2h".parse::<Timeframe>().is_err());
        assert!("1d".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_derivatives_wire_names() {
        let json = r#"{"fundingBps": 4.5, "openInterest": null, "longShortRatio": 1.3}"#;
        let snap: DerivativesSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.funding_bps, Some(4.5));
        assert_eq!(snap.open_interest, None);
        assert_eq!(snap.long_short_ratio, Some(1.3));
        assert!(snap.error.is_none());
    }

    #[test]
    fn test_unavailable_snapshot_is_all_null() {
        let snap = DerivativesSnapshot::unavailable("timeout");
        assert!(snap.is_empty());
        assert_eq!(snap.error.as_deref(), Some("timeout"));
    }
}
