//! Payload content submitted to the round

use prep_consensus::ERROR_PAYLOAD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// `{proposals, tx_hash, votable_proposal_ids}` as agreed on by the round
///
/// Fields are declared in lexicographic key order; serialization relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadContent {
    pub proposals: Vec<String>,
    pub tx_hash: String,
    pub votable_proposal_ids: BTreeSet<String>,
}

impl PayloadContent {
    pub fn new(tx_hash: String, proposals: Vec<String>, votable_proposal_ids: BTreeSet<String>) -> Self {
        Self {
            proposals,
            tx_hash,
            votable_proposal_ids,
        }
    }

    /// Content carrying the error sentinel
    pub fn error(proposals: Vec<String>, votable_proposal_ids: BTreeSet<String>) -> Self {
        Self::new(ERROR_PAYLOAD.to_string(), proposals, votable_proposal_ids)
    }

    pub fn is_error(&self) -> bool {
        self.tx_hash == ERROR_PAYLOAD
    }

    /// Compact JSON with sorted keys
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(self).expect("PayloadContent serialization should not fail")
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}
