//! In-process round channel
//!
//! Collects one payload per participant, fans submissions out to observers and
//! concludes the round either explicitly or once the expected number of
//! participants have submitted. It does not judge agreement between payloads.

use crate::channel::{ChannelError, SubmissionChannel};
use crate::types::TransactionPreparationPayload;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tokio::sync::{broadcast, watch};

/// Counters for a local round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub payloads_received: u64,
    pub duplicates_rejected: u64,
    pub late_submissions: u64,
}

/// Single-round submission channel shared by co-located participants
pub struct LocalRoundChannel {
    /// Round this channel serves
    round: u64,
    /// Accepted payloads keyed by sender
    payloads: RwLock<BTreeMap<String, TransactionPreparationPayload>>,
    /// Fan-out of accepted payloads
    tx: broadcast::Sender<TransactionPreparationPayload>,
    /// Round concluded flag
    concluded: watch::Sender<bool>,
    /// Conclude automatically after this many submissions
    expected_participants: Option<usize>,
    /// Stats
    stats: RwLock<ChannelStats>,
}

impl LocalRoundChannel {
    /// Create a channel that only concludes via `end_round`
    pub fn new(round: u64) -> Self {
        let (tx, _) = broadcast::channel(256);
        let (concluded, _) = watch::channel(false);
        Self {
            round,
            payloads: RwLock::new(BTreeMap::new()),
            tx,
            concluded,
            expected_participants: None,
            stats: RwLock::new(ChannelStats::default()),
        }
    }

    /// Conclude the round once `count` participants have submitted
    pub fn with_expected_participants(mut self, count: usize) -> Self {
        self.expected_participants = Some(count);
        self
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    /// Conclude the round, waking every waiting participant
    pub fn end_round(&self) {
        let payloads = self.payloads.write();
        self.conclude(payloads.len());
    }

    /// Flip the concluded flag; callers must hold the `payloads` write lock
    fn conclude(&self, submitted: usize) {
        if !self.concluded.send_replace(true) {
            tracing::debug!("Round {} concluded with {} payloads", self.round, submitted);
        }
    }

    pub fn is_concluded(&self) -> bool {
        *self.concluded.borrow()
    }

    /// Subscribe to accepted payloads
    pub fn subscribe(&self) -> broadcast::Receiver<TransactionPreparationPayload> {
        self.tx.subscribe()
    }

    /// Accepted payloads ordered by sender
    pub fn payloads(&self) -> Vec<TransactionPreparationPayload> {
        self.payloads.read().values().cloned().collect()
    }

    /// Payload accepted from `sender`, if any
    pub fn payload_from(&self, sender: &str) -> Option<TransactionPreparationPayload> {
        self.payloads.read().get(sender).cloned()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats.read().clone()
    }
}

#[async_trait]
impl SubmissionChannel for LocalRoundChannel {
    async fn submit_payload(&self, payload: TransactionPreparationPayload) -> Result<(), ChannelError> {
        let mut payloads = self.payloads.write();

        if self.is_concluded() {
            self.stats.write().late_submissions += 1;
            return Err(ChannelError::RoundConcluded { round: self.round });
        }

        if payloads.contains_key(&payload.sender) {
            self.stats.write().duplicates_rejected += 1;
            return Err(ChannelError::DuplicateSubmission {
                sender: payload.sender,
                round: self.round,
            });
        }
        payloads.insert(payload.sender.clone(), payload.clone());
        let submitted = payloads.len();

        self.stats.write().payloads_received += 1;
        tracing::debug!(
            "Round {}: payload {} from {} ({} submitted)",
            self.round,
            payload.short_digest(),
            payload.sender,
            submitted
        );

        // No receivers is fine
        let _ = self.tx.send(payload);

        if let Some(expected) = self.expected_participants {
            if submitted >= expected {
                self.conclude(submitted);
            }
        }

        Ok(())
    }

    async fn wait_until_round_end(&self) {
        let mut rx = self.concluded.subscribe();
        // The sender lives as long as `self`, so this only returns once concluded
        let _ = rx.wait_for(|concluded| *concluded).await;
    }
}
