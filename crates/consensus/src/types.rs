//! Core types shared between the preparation step and its round

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reserved `tx_hash` value signalling that preparation failed.
///
/// The round branches on this exact string, so it is part of the payload
/// wire contract.
pub const ERROR_PAYLOAD: &str = "ERROR_PAYLOAD";

/// Snapshot of the state all participants agreed on before this round
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynchronizedData {
    /// Address of the shared multisig (Safe) account
    pub safe_contract_address: String,
    /// Result of an earlier round, structure owned by that round
    #[serde(default)]
    pub finished_task_data: Option<serde_json::Value>,
    /// Proposals under consideration, in round order
    #[serde(default)]
    pub proposals: Vec<String>,
    /// Proposals that may still be voted on
    #[serde(default)]
    pub votable_proposal_ids: BTreeSet<String>,
}

/// A participant's contribution to the round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPreparationPayload {
    /// Address of the submitting agent
    pub sender: String,
    /// Canonical JSON content, compared byte-for-byte across participants
    pub content: String,
}

impl TransactionPreparationPayload {
    pub fn new(sender: &str, content: String) -> Self {
        Self {
            sender: sender.to_string(),
            content,
        }
    }

    /// Digest of the content only, so equal proposals from different
    /// senders share a digest
    pub fn content_digest(&self) -> [u8; 32] {
        *blake3::hash(self.content.as_bytes()).as_bytes()
    }

    /// Short hex form of the content digest for logs
    pub fn short_digest(&self) -> String {
        hex::encode(&self.content_digest()[..4])
    }
}
