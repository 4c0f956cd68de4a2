//! Contract API - Reads on-chain contract state
//!
//! Provides the request/response boundary used by the preparation step:
//! - `ContractCall` describes one read against a named contract and callable
//! - `ContractQueryResult` is the tagged outcome of that read
//! - `ScriptedContractApi` replays canned responses for tests and local runs
//!
//! Transport and ABI encoding live behind the `ContractApi` trait.

pub mod client;
pub mod scripted;
pub mod types;

pub use client::ContractApi;
pub use scripted::ScriptedContractApi;
pub use types::{ContractCall, ContractQueryResult, StateBody, StateValue};
