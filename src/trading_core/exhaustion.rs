//! Exhaustion / Trend-Health Detector
//!
//! Scores weakness per fast-momentum sample, debounces the exhausted and
//! compression flags over three consecutive samples, then picks a state:
//!
//! 1. persisted compression -> COMPRESSION
//! 2. persisted exhaustion or latest score >= 3 -> EXHAUSTED
//! 3. latest score >= 2 -> WEAKENING
//! 4. otherwise HEALTHY
//!
//! Without a structure the state is UNKNOWN.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::indicators::apply_persistence;
use super::momentum::{FastMomentum, SQUEEZE_PERSISTENCE};
use super::rules::{first_match, Rule};
use super::structure::{StructureLabel, StructureState, Trend};
use crate::errors::SentinelError;
use crate::types::DerivativesSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExhaustionState {
    Healthy,
    Weakening,
    Compression,
    Exhausted,
    Unknown,
}

impl std::fmt::Display for ExhaustionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExhaustionState::Healthy => write!(f, "HEALTHY"),
            ExhaustionState::Weakening => write!(f, "WEAKENING"),
            ExhaustionState::Compression => write!(f, "COMPRESSION"),
            ExhaustionState::Exhausted => write!(f, "EXHAUSTED"),
            ExhaustionState::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Non-empty, oldest-first sequence of fast momentum samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<FastMomentum>", into = "Vec<FastMomentum>")]
pub struct MomentumHistory {
    samples: Vec<FastMomentum>,
}

impl MomentumHistory {
    pub fn single(sample: FastMomentum) -> Self {
        Self {
            samples: vec![sample],
        }
    }

    pub fn new(samples: Vec<FastMomentum>) -> Result<Self, SentinelError> {
        if samples.is_empty() {
            return Err(SentinelError::EmptyMomentumHistory);
        }
        Ok(Self { samples })
    }

    /// Append a sample, dropping the oldest beyond `capacity`
    pub fn push(&mut self, sample: FastMomentum, capacity: usize) {
        self.samples.push(sample);
        let excess = self.samples.len().saturating_sub(capacity.max(1));
        self.samples.drain(..excess);
    }

    pub fn samples(&self) -> &[FastMomentum] {
        &self.samples
    }

    pub fn latest(&self) -> &FastMomentum {
        // Non-empty by construction
        &self.samples[self.samples.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl TryFrom<Vec<FastMomentum>> for MomentumHistory {
    type Error = SentinelError;

    fn try_from(samples: Vec<FastMomentum>) -> Result<Self, Self::Error> {
        Self::new(samples)
    }
}

impl From<MomentumHistory> for Vec<FastMomentum> {
    fn from(history: MomentumHistory) -> Self {
        history.samples
    }
}

/// Weakness score of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleWeakness {
    pub score: u32,
    pub compression: bool,
    /// Any momentum or drive weakness. Crowding alone does not count.
    pub exhausted: bool,
}

/// Points against trend health for one sample
pub fn score_sample(
    sample: &FastMomentum,
    structure: &StructureState,
    derivatives: Option<&DerivativesSnapshot>,
) -> SampleWeakness {
    let mut score = 0;

    // Compression / chop
    let compression = sample.bb_squeeze || sample.sideways;
    if compression {
        score += 1;
    }

    // Weak energy
    if sample.atr_pct < 0.35 {
        score += 1;
    }
    if sample.vol_spike < 0.8 {
        score += 1;
    }

    // Trend losing drive
    let trending = matches!(structure.trend, Trend::Uptrend | Trend::Downtrend);
    let extending = matches!(
        structure.state,
        StructureLabel::HigherHighs | StructureLabel::LowerLows
    );
    if trending && extending && (sample.atr_pct < 0.4 || sample.vol_spike < 1.0) {
        score += 1;
    }
    let exhausted = score > 0;

    // Crowding in the direction of the trend
    if let Some(d) = derivatives {
        match structure.trend {
            Trend::Uptrend => {
                if d.funding_bps.map_or(false, |f| f > 8.0) {
                    score += 1;
                }
                if d.long_short_ratio.map_or(false, |r| r >= 2.0) {
                    score += 1;
                }
            }
            Trend::Downtrend => {
                if d.funding_bps.map_or(false, |f| f < -8.0) {
                    score += 1;
                }
                if d.long_short_ratio.map_or(false, |r| r <= 0.6) {
                    score += 1;
                }
            }
            Trend::Neutral => {}
        }
    }

    SampleWeakness {
        score,
        compression,
        exhausted,
    }
}

/// Debounced signals the priority cascade reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExhaustionSignals {
    pub compression: bool,
    pub exhausted: bool,
    pub latest_score: u32,
}

pub fn exhaustion_rules() -> [Rule<ExhaustionSignals, ExhaustionState>; 3] {
    [
        Rule::new(
            "compression",
            |s: &ExhaustionSignals| s.compression,
            ExhaustionState::Compression,
        ),
        Rule::new(
            "exhausted",
            |s: &ExhaustionSignals| s.exhausted || s.latest_score >= 3,
            ExhaustionState::Exhausted,
        ),
        Rule::new(
            "weakening",
            |s: &ExhaustionSignals| s.latest_score >= 2,
            ExhaustionState::Weakening,
        ),
    ]
}

pub fn exhaustion_signals(
    history: &MomentumHistory,
    structure: &StructureState,
    derivatives: Option<&DerivativesSnapshot>,
) -> ExhaustionSignals {
    let scored: Vec<SampleWeakness> = history
        .samples()
        .iter()
        .map(|sample| score_sample(sample, structure, derivatives))
        .collect();

    let exhausted_flags: Vec<bool> = scored.iter().map(|w| w.exhausted).collect();
    let compression_flags: Vec<bool> = scored.iter().map(|w| w.compression).collect();

    let persisted = |flags: &[bool]| {
        apply_persistence(flags, SQUEEZE_PERSISTENCE)
            .last()
            .copied()
            .unwrap_or(false)
    };

    ExhaustionSignals {
        compression: persisted(&compression_flags),
        exhausted: persisted(&exhausted_flags),
        latest_score: scored.last().map(|w| w.score).unwrap_or(0),
    }
}

pub fn detect_exhaustion(
    history: &MomentumHistory,
    structure: Option<&StructureState>,
    derivatives: Option<&DerivativesSnapshot>,
) -> ExhaustionState {
    let Some(structure) = structure else {
        return ExhaustionState::Unknown;
    };

    let signals = exhaustion_signals(history, structure, derivatives);
    let (state, rule) = first_match(&exhaustion_rules(), &signals, ExhaustionState::Healthy);
    debug!(
        "Exhaustion {} via {} (score {}, {} samples)",
        state,
        rule,
        signals.latest_score,
        history.len()
    );
    state
}
