//! Preparation parameters
//!
//! Everything the step needs beyond synchronized data. The delegate contract
//! coordinates and the destination address have no sensible default and must
//! be configured per deployment.

use crate::payload_tools::SafeOperation;
use crate::NULL_ADDRESS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Contract id of the Safe multisig package
pub const SAFE_CONTRACT_ID: &str = "valory/gnosis_safe:0.1.0";

/// Safe callable returning the raw transaction hash
pub const SAFE_TX_HASH_CALLABLE: &str = "get_raw_safe_transaction_hash";

/// Parameter validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{field} must be a 42 character address, got {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Remaining Safe transaction fields of the call shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeTxParams {
    pub operation: SafeOperation,
    pub base_gas: u128,
    pub safe_gas_price: u128,
    pub gas_token: String,
    pub refund_receiver: String,
    pub use_flashbots: bool,
    pub gas_limit: u128,
    pub raise_on_failed_simulation: bool,
}

impl Default for SafeTxParams {
    fn default() -> Self {
        Self {
            operation: SafeOperation::Call,
            base_gas: 0,
            safe_gas_price: 0,
            gas_token: NULL_ADDRESS.to_string(),
            refund_receiver: NULL_ADDRESS.to_string(),
            use_flashbots: false,
            gas_limit: 0,
            raise_on_failed_simulation: false,
        }
    }
}

/// Preparation step parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationParams {
    /// Address of the contract that builds the vote transaction
    pub delegate_contract_address: String,
    /// Contract id of that contract
    pub delegate_contract_id: String,
    /// Callable returning the raw transaction `data`
    pub vote_data_callable: String,
    /// Contract id used for the Safe hash query
    #[serde(default = "default_safe_contract_id")]
    pub safe_contract_id: String,
    /// Callable used for the Safe hash query
    #[serde(default = "default_safe_tx_hash_callable")]
    pub safe_tx_hash_callable: String,
    /// Target of the Safe transaction
    pub destination_address: String,
    /// Wei sent with the transaction
    #[serde(default)]
    pub ether_value: u128,
    /// Gas reserved for the Safe transaction
    #[serde(default)]
    pub safe_tx_gas: u128,
    #[serde(default)]
    pub safe_tx: SafeTxParams,
}

fn default_safe_contract_id() -> String {
    SAFE_CONTRACT_ID.to_string()
}

fn default_safe_tx_hash_callable() -> String {
    SAFE_TX_HASH_CALLABLE.to_string()
}

impl Default for PreparationParams {
    fn default() -> Self {
        Self {
            delegate_contract_address: String::new(),
            delegate_contract_id: String::new(),
            vote_data_callable: String::new(),
            safe_contract_id: default_safe_contract_id(),
            safe_tx_hash_callable: default_safe_tx_hash_callable(),
            destination_address: String::new(),
            ether_value: 0,
            safe_tx_gas: 0,
            safe_tx: SafeTxParams::default(),
        }
    }
}

impl PreparationParams {
    /// Create parameters with zero value and gas
    pub fn new(
        delegate_contract_address: &str,
        delegate_contract_id: &str,
        vote_data_callable: &str,
        destination_address: &str,
    ) -> Self {
        Self {
            delegate_contract_address: delegate_contract_address.to_string(),
            delegate_contract_id: delegate_contract_id.to_string(),
            vote_data_callable: vote_data_callable.to_string(),
            destination_address: destination_address.to_string(),
            ..Default::default()
        }
    }

    /// Set the wei value
    pub fn with_ether_value(mut self, ether_value: u128) -> Self {
        self.ether_value = ether_value;
        self
    }

    /// Set the Safe transaction gas
    pub fn with_safe_tx_gas(mut self, safe_tx_gas: u128) -> Self {
        self.safe_tx_gas = safe_tx_gas;
        self
    }

    /// Set the remaining Safe transaction fields
    pub fn with_safe_tx(mut self, safe_tx: SafeTxParams) -> Self {
        self.safe_tx = safe_tx;
        self
    }

    /// Check required fields and address shapes
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("delegate_contract_address", &self.delegate_contract_address),
            ("delegate_contract_id", &self.delegate_contract_id),
            ("vote_data_callable", &self.vote_data_callable),
            ("safe_contract_id", &self.safe_contract_id),
            ("safe_tx_hash_callable", &self.safe_tx_hash_callable),
            ("destination_address", &self.destination_address),
        ];
        for (field, value) in required {
            if value.is_empty() {
                return Err(ConfigError::Missing(field));
            }
        }

        let addresses = [
            ("destination_address", &self.destination_address),
            ("safe_tx.gas_token", &self.safe_tx.gas_token),
            ("safe_tx.refund_receiver", &self.safe_tx.refund_receiver),
        ];
        for (field, value) in addresses {
            if value.len() != 42 {
                return Err(ConfigError::InvalidAddress {
                    field,
                    value: value.clone(),
                });
            }
        }

        Ok(())
    }
}
