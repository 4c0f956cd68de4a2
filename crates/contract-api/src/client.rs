//! Contract read client interface

use crate::types::{ContractCall, ContractQueryResult};
use async_trait::async_trait;

/// Performs single request/response reads of contract state.
///
/// Implementations never return transport errors out of band: anything that
/// prevents a well-formed answer comes back as `ContractQueryResult::Failure`.
/// Timeouts, if any, belong to the implementation.
#[async_trait]
pub trait ContractApi: Send + Sync {
    /// Human-readable client name for logging.
    fn name(&self) -> &'static str;

    /// Read state from a contract callable.
    async fn get_state(&self, call: ContractCall) -> ContractQueryResult;
}
