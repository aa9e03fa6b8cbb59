//! Run fingerprinting.
//!
//! A run is identified by what determines its intents (strategy name and
//! parameter values) together with the intents it produced. Replaying the
//! same candles through the same configuration must reproduce the hash.

use crate::domain::{ParamSetHash, RunHash};
use crate::engine::translator::IntentRecord;
use crate::params::{ParamSet, ParamValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub strategy: String,
    /// Sorted by name for a canonical encoding.
    pub params: BTreeMap<String, ParamValue>,
    pub param_hash: ParamSetHash,
    pub intent_count: usize,
    pub run_hash: RunHash,
}

/// Borrowed view hashed into `run_hash`.
#[derive(Serialize)]
struct Canonical<'a> {
    strategy: &'a str,
    params: &'a BTreeMap<String, ParamValue>,
    intents: &'a [IntentRecord],
}

impl RunFingerprint {
    pub fn new(strategy: &str, params: &ParamSet, journal: &[IntentRecord]) -> Self {
        let values = params.values();
        let canonical = Canonical {
            strategy,
            params: &values,
            intents: journal,
        };
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        Self {
            strategy: strategy.to_string(),
            param_hash: params.hash(),
            params: values,
            intent_count: journal.len(),
            run_hash: RunHash::from_bytes(&bytes),
        }
    }

    pub fn short(&self) -> &str {
        self.run_hash.short()
    }
}
