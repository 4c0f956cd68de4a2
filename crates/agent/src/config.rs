//! Agent Configuration

use prep_consensus::SynchronizedData;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tx_preparation::{PreparationParams, BEHAVIOUR_ID};

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Round the attempt belongs to
    pub round: u64,
    /// Benchmark behaviour id
    pub behaviour_id: String,
    /// One simulated participant per address
    pub agent_addresses: Vec<String>,
    /// Preparation parameters
    pub params: PreparationParams,
    /// Snapshot the round starts from
    pub synchronized_data: SynchronizedData,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            round: 0,
            behaviour_id: BEHAVIOUR_ID.to_string(),
            agent_addresses: vec!["agent_0".to_string()],
            params: PreparationParams::default(),
            synchronized_data: SynchronizedData::default(),
        }
    }
}

impl AgentConfig {
    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&path)?;
        let config: AgentConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.agent_addresses.is_empty() {
            anyhow::bail!("at least one agent address is required");
        }
        if self.synchronized_data.safe_contract_address.is_empty() {
            anyhow::bail!("synchronized_data.safe_contract_address must be set");
        }
        self.params.validate()?;
        Ok(())
    }
}
