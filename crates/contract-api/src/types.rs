//! Request and response types for contract state reads

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named fields of a successful read
pub type StateBody = BTreeMap<String, StateValue>;

/// A single raw value passed to, or returned from, a contract read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StateValue {
    /// Raw bytes, hex encoded with a `0x` prefix on the wire
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    /// Text such as addresses and hashes
    Text(String),
    /// Unsigned integer (wei amounts, gas); a JSON number up to `u64::MAX`,
    /// a decimal string beyond it
    Uint(#[serde(with = "uint")] u128),
    /// Opaque structured data owned by another component
    Json(serde_json::Value),
}

impl StateValue {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            StateValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            StateValue::Uint(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Vec<u8>> for StateValue {
    fn from(bytes: Vec<u8>) -> Self {
        StateValue::Bytes(bytes)
    }
}

impl From<&str> for StateValue {
    fn from(text: &str) -> Self {
        StateValue::Text(text.to_string())
    }
}

impl From<String> for StateValue {
    fn from(text: String) -> Self {
        StateValue::Text(text)
    }
}

impl From<u128> for StateValue {
    fn from(value: u128) -> Self {
        StateValue::Uint(value)
    }
}

/// One read request against a contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCall {
    /// Address of the deployed contract
    pub contract_address: String,
    /// Identifier of the contract package
    pub contract_id: String,
    /// Name of the read-only callable
    pub callable: String,
    /// Keyword parameters for the callable
    #[serde(default)]
    pub params: BTreeMap<String, StateValue>,
}

impl ContractCall {
    /// Create a call with no parameters
    pub fn new(contract_address: &str, contract_id: &str, callable: &str) -> Self {
        Self {
            contract_address: contract_address.to_string(),
            contract_id: contract_id.to_string(),
            callable: callable.to_string(),
            params: BTreeMap::new(),
        }
    }

    /// Add a keyword parameter
    pub fn with_param(mut self, name: &str, value: impl Into<StateValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Look up a parameter by name
    pub fn param(&self, name: &str) -> Option<&StateValue> {
        self.params.get(name)
    }
}

/// Outcome of one contract read
///
/// A failed read is an expected outcome, not an error: callers branch on the
/// variant instead of probing for fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContractQueryResult {
    Success { body: StateBody },
    Failure { reason: String },
}

impl ContractQueryResult {
    /// Build a success result from `(field, value)` pairs
    pub fn success<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, StateValue)>,
        K: Into<String>,
    {
        ContractQueryResult::Success {
            body: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn failure(reason: &str) -> Self {
        ContractQueryResult::Failure {
            reason: reason.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ContractQueryResult::Success { .. })
    }

    /// Field of a successful response, `None` on failure or when absent
    pub fn field(&self, name: &str) -> Option<&StateValue> {
        match self {
            ContractQueryResult::Success { body } => body.get(name),
            ContractQueryResult::Failure { .. } => None,
        }
    }
}

impl fmt::Display for ContractQueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractQueryResult::Success { body } => write!(f, "Success {{ body: {:?} }}", body),
            ContractQueryResult::Failure { reason } => write!(f, "Failure {{ reason: {} }}", reason),
        }
    }
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let digits = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(digits).map_err(D::Error::custom)
    }
}

mod uint {
    use serde::{de, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        match u64::try_from(*value) {
            Ok(small) => serializer.serialize_u64(small),
            Err(_) => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        deserializer.deserialize_any(UintVisitor)
    }

    struct UintVisitor;

    impl<'de> de::Visitor<'de> for UintVisitor {
        type Value = u128;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u128, E> {
            Ok(value as u128)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u128, E> {
            u128::try_from(value).map_err(|_| E::custom(format!("negative uint: {}", value)))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u128, E> {
            value
                .parse()
                .map_err(|_| E::custom(format!("invalid uint: {}", value)))
        }
    }
}
