//! Field-level diff between two market states
//!
//! Only a fixed list of tracked fields is compared. A field whose parent is
//! missing on either side (e.g. no DXY state) is skipped; a field that is
//! null on one side and set on the other is reported.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::market_state::MarketState;

pub const NO_PREVIOUS_NOTE: &str = "No previous snapshot";

/// One changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub before: Value,
    pub now: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateDiff {
    /// Nothing to compare against
    NoPrevious { note: String },
    /// Changed tracked fields by label (empty when nothing changed)
    Changes(BTreeMap<String, FieldChange>),
}

impl StateDiff {
    pub fn no_previous() -> Self {
        StateDiff::NoPrevious {
            note: NO_PREVIOUS_NOTE.to_string(),
        }
    }

    pub fn changes(&self) -> Option<&BTreeMap<String, FieldChange>> {
        match self {
            StateDiff::Changes(changes) => Some(changes),
            StateDiff::NoPrevious { .. } => None,
        }
    }
}

/// (path, label) pairs compared each cycle
fn tracked_fields() -> Vec<(Vec<&'static str>, String)> {
    let mut fields = Vec::new();

    for (slot, name) in [("btc", "BTC"), ("paxg", "Gold")] {
        fields.extend([
            (vec![slot, "structure", "trend"], format!("{} structure trend", name)),
            (vec![slot, "structure", "state"], format!("{} structure state", name)),
            (vec![slot, "structure", "liquidity_sweep"], format!("{} sweep", name)),
            (vec![slot, "structure", "break_of_structure"], format!("{} BOS", name)),
            (vec![slot, "bias", "htf"], format!("{} HTF bias", name)),
            (vec![slot, "bias", "ltf"], format!("{} LTF bias", name)),
            (vec![slot, "momentum", "fast", "bb_squeeze"], format!("{} compression", name)),
            (vec![slot, "momentum", "fast", "vol_spike"], format!("{} volume spike", name)),
        ]);
    }

    fields.extend([
        (vec!["dxy", "structure", "trend"], "DXY structure trend".to_string()),
        (vec!["dxy", "structure", "state"], "DXY structure state".to_string()),
        (vec!["dxy", "structure", "liquidity_sweep"], "DXY sweep".to_string()),
        (vec!["dxy", "structure", "break_of_structure"], "DXY BOS".to_string()),
        (vec!["dxy", "trend"], "DXY trend".to_string()),
        (vec!["dxy", "strength"], "DXY strength".to_string()),
    ]);

    fields
}

/// Walk `path` on both trees in lockstep. `None` when either side stops
/// being an object before the leaf.
fn resolve_pair(prev: &Value, curr: &Value, path: &[&str]) -> Option<(Value, Value)> {
    let (mut p, mut c) = (prev, curr);
    for key in path {
        match (p, c) {
            (Value::Object(pm), Value::Object(cm)) => {
                p = pm.get(*key).unwrap_or(&Value::Null);
                c = cm.get(*key).unwrap_or(&Value::Null);
            }
            _ => return None,
        }
    }
    Some((p.clone(), c.clone()))
}

/// Compare two serialized trees on the tracked fields
pub fn diff_values(prev: &Value, curr: &Value) -> BTreeMap<String, FieldChange> {
    let mut changes = BTreeMap::new();
    for (path, label) in tracked_fields() {
        if let Some((before, now)) = resolve_pair(prev, curr, &path) {
            if before != now {
                changes.insert(label, FieldChange { before, now });
            }
        }
    }
    changes
}

pub fn diff_market_state(prev: Option<&MarketState>, curr: &MarketState) -> StateDiff {
    let Some(prev) = prev else {
        return StateDiff::no_previous();
    };

    match (serde_json::to_value(prev), serde_json::to_value(curr)) {
        (Ok(p), Ok(c)) => StateDiff::Changes(diff_values(&p, &c)),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Could not serialize state for diff: {}", e);
            StateDiff::Changes(BTreeMap::new())
        }
    }
}
