//! Scripted contract client - replays canned responses
//!
//! Used by tests and by the local agent binary in place of a network client.

use crate::client::ContractApi;
use crate::types::{ContractCall, ContractQueryResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::time::Duration;

/// Contract client answering from per-callable response queues
pub struct ScriptedContractApi {
    /// Pending responses keyed by callable name
    responses: Mutex<HashMap<String, VecDeque<ContractQueryResult>>>,
    /// Every call received, in order
    calls: Mutex<Vec<ContractCall>>,
    /// Simulated response latency
    delay: Duration,
}

impl ScriptedContractApi {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    /// Queue a response for the next call to `callable`
    pub fn respond(self, callable: &str, result: ContractQueryResult) -> Self {
        self.responses
            .lock()
            .entry(callable.to_string())
            .or_default()
            .push_back(result);
        self
    }

    /// Delay every response by `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Load a script of the form `{ "<callable>": [<result>, ...] }`
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(&path)?;
        let script: HashMap<String, Vec<ContractQueryResult>> = serde_json::from_str(&raw)?;

        let api = Self::new();
        {
            let mut responses = api.responses.lock();
            for (callable, results) in script {
                responses.insert(callable, results.into_iter().collect());
            }
        }

        tracing::debug!("Loaded contract script from {:?}", path.as_ref());
        Ok(api)
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<ContractCall> {
        self.calls.lock().clone()
    }

    /// Number of calls made to `callable`
    pub fn call_count(&self, callable: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.callable == callable)
            .count()
    }
}

impl Default for ScriptedContractApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContractApi for ScriptedContractApi {
    fn name(&self) -> &'static str {
        "scripted-contract-api"
    }

    async fn get_state(&self, call: ContractCall) -> ContractQueryResult {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self
            .responses
            .lock()
            .get_mut(&call.callable)
            .and_then(|queue| queue.pop_front());

        let result = next.unwrap_or_else(|| {
            ContractQueryResult::failure(&format!("no scripted response for {}", call.callable))
        });

        self.calls.lock().push(call);
        result
    }
}
