//! Canonical encoding of a Safe transaction into a single hex string
//!
//! Layout (all integers 32-byte big-endian, hex encoded):
//!
//! ```text
//! safe_tx_hash[64] ether_value[64] safe_tx_gas[64] to_address[42] operation[2]
//! base_gas[64] safe_gas_price[64] gas_token[42] refund_receiver[42]
//! use_flashbots[64] gas_limit[64] raise_on_failed_simulation[64] data[..]
//! ```
//!
//! Any two participants encoding the same fields get the same string.

use crate::NULL_ADDRESS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HASH_LEN: usize = 64;
const UINT_LEN: usize = 64;
const ADDRESS_LEN: usize = 42;
const OPERATION_LEN: usize = 2;

/// Encoding/decoding errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("cannot encode safe_tx_hash of non-32 bytes: {0:?}")]
    InvalidSafeTxHash(String),

    #[error("cannot encode {field} of non-42 length: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("payload too short: {len} < {min}")]
    TooShort { len: usize, min: usize },

    #[error("invalid hex in {field}")]
    InvalidHex { field: &'static str },

    #[error("{field} does not fit in 128 bits")]
    Overflow { field: &'static str },

    #[error("unknown Safe operation {0}")]
    UnknownOperation(u8),

    #[error("{field} is not a boolean")]
    InvalidBool { field: &'static str },
}

/// Safe transaction operation type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafeOperation {
    #[default]
    Call = 0,
    DelegateCall = 1,
    Create = 2,
}

impl TryFrom<u8> for SafeOperation {
    type Error = PayloadError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SafeOperation::Call),
            1 => Ok(SafeOperation::DelegateCall),
            2 => Ok(SafeOperation::Create),
            other => Err(PayloadError::UnknownOperation(other)),
        }
    }
}

/// Every field of a Safe transaction that goes into the canonical encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeTxPayload {
    /// Raw Safe transaction hash, 64 hex chars, no `0x`
    pub safe_tx_hash: String,
    pub ether_value: u128,
    pub safe_tx_gas: u128,
    pub to_address: String,
    pub data: Vec<u8>,
    pub operation: SafeOperation,
    pub base_gas: u128,
    pub safe_gas_price: u128,
    pub gas_token: String,
    pub refund_receiver: String,
    pub use_flashbots: bool,
    pub gas_limit: u128,
    pub raise_on_failed_simulation: bool,
}

impl SafeTxPayload {
    /// Payload with the default call-shape fields
    pub fn new(safe_tx_hash: &str, ether_value: u128, safe_tx_gas: u128, to_address: &str, data: Vec<u8>) -> Self {
        Self {
            safe_tx_hash: safe_tx_hash.to_string(),
            ether_value,
            safe_tx_gas,
            to_address: to_address.to_string(),
            data,
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

    /// Encode to the canonical hex string
    pub fn encode(&self) -> Result<String, PayloadError> {
        if self.safe_tx_hash.len() != HASH_LEN
            || !self.safe_tx_hash.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return Err(PayloadError::InvalidSafeTxHash(self.safe_tx_hash.clone()));
        }
        check_address("to_address", &self.to_address)?;
        check_address("gas_token", &self.gas_token)?;
        check_address("refund_receiver", &self.refund_receiver)?;

        let mut out = String::with_capacity(FIXED_LEN + self.data.len() * 2);
        out.push_str(&self.safe_tx_hash);
        out.push_str(&encode_uint(self.ether_value));
        out.push_str(&encode_uint(self.safe_tx_gas));
        out.push_str(&self.to_address);
        out.push_str(&hex::encode([self.operation as u8]));
        out.push_str(&encode_uint(self.base_gas));
        out.push_str(&encode_uint(self.safe_gas_price));
        out.push_str(&self.gas_token);
        out.push_str(&self.refund_receiver);
        out.push_str(&encode_uint(self.use_flashbots as u128));
        out.push_str(&encode_uint(self.gas_limit));
        out.push_str(&encode_uint(self.raise_on_failed_simulation as u128));
        out.push_str(&hex::encode(&self.data));
        Ok(out)
    }

    /// Decode a canonical hex string
    pub fn decode(payload: &str) -> Result<Self, PayloadError> {
        if payload.len() < FIXED_LEN {
            return Err(PayloadError::TooShort {
                len: payload.len(),
                min: FIXED_LEN,
            });
        }
        if !payload.is_ascii() {
            return Err(PayloadError::InvalidHex { field: "payload" });
        }

        let mut cursor = Cursor { rest: payload };
        let safe_tx_hash = cursor.take(HASH_LEN);
        if !safe_tx_hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(PayloadError::InvalidHex { field: "safe_tx_hash" });
        }
        let ether_value = decode_uint("ether_value", cursor.take(UINT_LEN))?;
        let safe_tx_gas = decode_uint("safe_tx_gas", cursor.take(UINT_LEN))?;
        let to_address = cursor.take(ADDRESS_LEN);
        let operation = {
            let raw = hex::decode(cursor.take(OPERATION_LEN))
                .map_err(|_| PayloadError::InvalidHex { field: "operation" })?;
            SafeOperation::try_from(raw[0])?
        };
        let base_gas = decode_uint("base_gas", cursor.take(UINT_LEN))?;
        let safe_gas_price = decode_uint("safe_gas_price", cursor.take(UINT_LEN))?;
        let gas_token = cursor.take(ADDRESS_LEN);
        let refund_receiver = cursor.take(ADDRESS_LEN);
        let use_flashbots = decode_bool("use_flashbots", cursor.take(UINT_LEN))?;
        let gas_limit = decode_uint("gas_limit", cursor.take(UINT_LEN))?;
        let raise_on_failed_simulation = decode_bool("raise_on_failed_simulation", cursor.take(UINT_LEN))?;
        let data = hex::decode(cursor.rest).map_err(|_| PayloadError::InvalidHex { field: "data" })?;

        Ok(Self {
            safe_tx_hash: safe_tx_hash.to_string(),
            ether_value,
            safe_tx_gas,
            to_address: to_address.to_string(),
            data,
            operation,
            base_gas,
            safe_gas_price,
            gas_token: gas_token.to_string(),
            refund_receiver: refund_receiver.to_string(),
            use_flashbots,
            gas_limit,
            raise_on_failed_simulation,
        })
    }
}

/// Length of everything before `data`
const FIXED_LEN: usize = HASH_LEN + UINT_LEN * 2 + ADDRESS_LEN + OPERATION_LEN + UINT_LEN * 2 + ADDRESS_LEN * 2 + UINT_LEN * 3;

/// Encode the default call-shape Safe transaction
pub fn hash_payload_to_hex(
    safe_tx_hash: &str,
    ether_value: u128,
    safe_tx_gas: u128,
    to_address: &str,
    data: &[u8],
) -> Result<String, PayloadError> {
    SafeTxPayload::new(safe_tx_hash, ether_value, safe_tx_gas, to_address, data.to_vec()).encode()
}

/// Decode a canonical hex string back into its fields
pub fn hex_to_payload(payload: &str) -> Result<SafeTxPayload, PayloadError> {
    SafeTxPayload::decode(payload)
}

fn check_address(field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.len() != ADDRESS_LEN {
        return Err(PayloadError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn encode_uint(value: u128) -> String {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    hex::encode(word)
}

fn decode_uint(field: &'static str, digits: &str) -> Result<u128, PayloadError> {
    let raw = hex::decode(digits).map_err(|_| PayloadError::InvalidHex { field })?;
    if raw[..16].iter().any(|b| *b != 0) {
        return Err(PayloadError::Overflow { field });
    }
    let mut low = [0u8; 16];
    low.copy_from_slice(&raw[16..]);
    Ok(u128::from_be_bytes(low))
}

fn decode_bool(field: &'static str, digits: &str) -> Result<bool, PayloadError> {
    match decode_uint(field, digits)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(PayloadError::InvalidBool { field }),
    }
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    // Callers check the total length up front
    fn take(&mut self, len: usize) -> &'a str {
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        head
    }
}
