//! Prep Consensus - Round-side collaborators of the preparation step
//!
//! The agreement engine itself lives elsewhere. This crate holds what the
//! preparation step needs from it:
//! - Read-only synchronized data shared by all participants
//! - The payload envelope and the reserved error sentinel
//! - The two-phase submission channel (submit, then wait for round end)
//! - An in-process channel for local runs and tests

pub mod channel;
pub mod local;
pub mod store;
pub mod types;

pub use channel::{ChannelError, SubmissionChannel};
pub use local::{ChannelStats, LocalRoundChannel};
pub use store::{SharedSynchronizedData, SynchronizedDataSource};
pub use types::*;
