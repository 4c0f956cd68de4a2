//! Benchmark tool - times the local and consensus phases of a behaviour

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

/// Measured phase of a behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementPhase {
    /// Queries and payload assembly
    Local,
    /// Submission and waiting for the round to end
    Consensus,
}

impl fmt::Display for MeasurementPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasurementPhase::Local => write!(f, "local"),
            MeasurementPhase::Consensus => write!(f, "consensus"),
        }
    }
}

/// A completed measurement
#[derive(Debug, Clone)]
pub struct MeasurementRecord {
    pub agent_address: String,
    pub behaviour_id: String,
    pub phase: MeasurementPhase,
    pub elapsed: Duration,
    pub finished_at: DateTime<Utc>,
}

/// Open scopes are keyed by agent as well as behaviour, so co-located
/// participants can share one tool
type ScopeKey = (String, String, MeasurementPhase);

fn scope_key(agent_address: &str, behaviour_id: &str, phase: MeasurementPhase) -> ScopeKey {
    (agent_address.to_string(), behaviour_id.to_string(), phase)
}

/// Collects phase timings per agent and behaviour
#[derive(Default)]
pub struct BenchmarkTool {
    /// Phases started but not yet finished
    open: Mutex<HashMap<ScopeKey, Instant>>,
    /// Finished measurements
    records: Mutex<Vec<MeasurementRecord>>,
}

impl BenchmarkTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing `phase`; restarting an open phase resets it
    pub fn begin(&self, agent_address: &str, behaviour_id: &str, phase: MeasurementPhase) {
        self.open
            .lock()
            .insert(scope_key(agent_address, behaviour_id, phase), Instant::now());
    }

    /// Stop timing `phase` and record it
    pub fn end(&self, agent_address: &str, behaviour_id: &str, phase: MeasurementPhase) {
        let started = self.open.lock().remove(&scope_key(agent_address, behaviour_id, phase));

        match started {
            Some(started) => {
                let elapsed = started.elapsed();
                tracing::debug!(
                    "{}: {} {} phase took {:.2}ms",
                    agent_address,
                    behaviour_id,
                    phase,
                    elapsed.as_secs_f64() * 1000.0
                );
                self.records.lock().push(MeasurementRecord {
                    agent_address: agent_address.to_string(),
                    behaviour_id: behaviour_id.to_string(),
                    phase,
                    elapsed,
                    finished_at: Utc::now(),
                });
            }
            None => {
                tracing::debug!(
                    "{}: {} {} phase ended without a start",
                    agent_address,
                    behaviour_id,
                    phase
                );
            }
        }
    }

    pub fn records(&self) -> Vec<MeasurementRecord> {
        self.records.lock().clone()
    }

    /// Sum of recorded durations for one agent's `phase`
    pub fn total(&self, agent_address: &str, behaviour_id: &str, phase: MeasurementPhase) -> Duration {
        self.records
            .lock()
            .iter()
            .filter(|r| r.agent_address == agent_address && r.behaviour_id == behaviour_id && r.phase == phase)
            .map(|r| r.elapsed)
            .sum()
    }

    /// Whether `phase` is currently being timed
    pub fn is_open(&self, agent_address: &str, behaviour_id: &str, phase: MeasurementPhase) -> bool {
        self.open
            .lock()
            .contains_key(&scope_key(agent_address, behaviour_id, phase))
    }
}
