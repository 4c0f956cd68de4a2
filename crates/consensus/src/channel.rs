//! Submission channel interface

use crate::types::TransactionPreparationPayload;
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a submission channel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Agent {sender} already submitted a payload in round {round}")]
    DuplicateSubmission { sender: String, round: u64 },

    #[error("Round {round} has already concluded")]
    RoundConcluded { round: u64 },
}

/// Two-phase submission into the round's agreement protocol.
///
/// `submit_payload` records the payload and returns; `wait_until_round_end`
/// suspends until the round engine concludes this participant's round,
/// whether by quorum or by its own timeout policy.
#[async_trait]
pub trait SubmissionChannel: Send + Sync {
    async fn submit_payload(&self, payload: TransactionPreparationPayload) -> Result<(), ChannelError>;

    async fn wait_until_round_end(&self);
}
