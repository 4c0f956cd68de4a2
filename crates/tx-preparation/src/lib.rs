//! Transaction Preparation - derives and submits the round's Safe transaction
//!
//! Each participant runs one preparation attempt per round:
//! - Reads the vote data to execute from the delegate contract
//! - Asks the Safe contract for the raw hash of that transaction
//! - Encodes the hash and transaction parameters canonically
//! - Submits `{proposals, tx_hash, votable_proposal_ids}` and waits for the round to end
//!
//! Failed reads never abort the attempt; they yield the `ERROR_PAYLOAD` sentinel.

pub mod behaviour;
pub mod benchmark;
pub mod content;
pub mod params;
pub mod payload_tools;
pub mod state_machine;

#[cfg(test)]
mod tests;

pub use behaviour::{PreparationOutcome, TransactionPreparationBehaviour};
pub use benchmark::{BenchmarkTool, MeasurementPhase, MeasurementRecord};
pub use content::PayloadContent;
pub use params::{ConfigError, PreparationParams, SafeTxParams};
pub use payload_tools::{hash_payload_to_hex, hex_to_payload, PayloadError, SafeOperation, SafeTxPayload};
pub use state_machine::{Action, Event, PreparationFailure, PreparationState, PreparationStateMachine};

pub use prep_consensus::ERROR_PAYLOAD;

/// Behaviour identifier used for benchmark records
pub const BEHAVIOUR_ID: &str = "transaction_preparation";

/// Null address used for unset Safe token/receiver fields
pub const NULL_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
