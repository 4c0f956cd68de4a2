//! Transaction preparation behaviour - async runner for the state machine
//!
//! Executes the machine's actions against the contract client and submission
//! channel. Each external call is an `.await`, so many participants can share
//! one runtime. Dropping the future abandons the attempt; nothing needs undoing.

use crate::benchmark::BenchmarkTool;
use crate::params::PreparationParams;
use crate::state_machine::{Action, Event, PreparationFailure, PreparationStateMachine};
use crate::BEHAVIOUR_ID;
use contract_api::ContractApi;
use prep_consensus::{SubmissionChannel, SynchronizedDataSource, TransactionPreparationPayload};
use std::collections::VecDeque;
use std::sync::Arc;

/// Result of one preparation attempt
#[derive(Debug, Clone)]
pub struct PreparationOutcome {
    /// Payload handed to the channel
    pub payload: Option<TransactionPreparationPayload>,
    /// Set when the payload carries the error sentinel
    pub failure: Option<PreparationFailure>,
    /// Whether the machine reached `Done`
    pub completed: bool,
}

impl PreparationOutcome {
    /// Whether a real transaction hash was submitted
    pub fn is_success(&self) -> bool {
        self.completed && self.payload.is_some() && self.failure.is_none()
    }
}

/// Runs preparation attempts for one agent
pub struct TransactionPreparationBehaviour {
    /// Address this agent submits as
    agent_address: String,
    /// Identifier used for benchmark records
    behaviour_id: String,
    params: PreparationParams,
    contracts: Arc<dyn ContractApi>,
    channel: Arc<dyn SubmissionChannel>,
    synchronized_data: Arc<dyn SynchronizedDataSource>,
    benchmark: Arc<BenchmarkTool>,
}

impl TransactionPreparationBehaviour {
    pub fn new(
        agent_address: &str,
        params: PreparationParams,
        contracts: Arc<dyn ContractApi>,
        channel: Arc<dyn SubmissionChannel>,
        synchronized_data: Arc<dyn SynchronizedDataSource>,
    ) -> Self {
        Self {
            agent_address: agent_address.to_string(),
            behaviour_id: BEHAVIOUR_ID.to_string(),
            params,
            contracts,
            channel,
            synchronized_data,
            benchmark: Arc::new(BenchmarkTool::new()),
        }
    }

    /// Record timings into a shared benchmark tool
    pub fn with_benchmark(mut self, benchmark: Arc<BenchmarkTool>) -> Self {
        self.benchmark = benchmark;
        self
    }

    /// Override the benchmark behaviour id
    pub fn with_behaviour_id(mut self, behaviour_id: &str) -> Self {
        self.behaviour_id = behaviour_id.to_string();
        self
    }

    pub fn agent_address(&self) -> &str {
        &self.agent_address
    }

    pub fn behaviour_id(&self) -> &str {
        &self.behaviour_id
    }

    pub fn benchmark(&self) -> &BenchmarkTool {
        &self.benchmark
    }

    /// Run one preparation attempt for the current round
    pub async fn run(&self) -> PreparationOutcome {
        let data = self.synchronized_data.synchronized_data();
        let mut machine = PreparationStateMachine::new(&self.agent_address, self.params.clone());
        let mut pending: VecDeque<Action> = machine.handle(Event::Start(data)).into();

        while let Some(action) = pending.pop_front() {
            match action {
                Action::BeginMeasurement(phase) => self.benchmark.begin(&self.agent_address, &self.behaviour_id, phase),
                Action::EndMeasurement(phase) => self.benchmark.end(&self.agent_address, &self.behaviour_id, phase),
                Action::QueryContract(call) => {
                    tracing::debug!(
                        "{}: querying {} via {}",
                        self.agent_address,
                        call.callable,
                        self.contracts.name()
                    );
                    let result = self.contracts.get_state(call).await;
                    pending.extend(machine.handle(Event::QueryCompleted(result)));
                }
                Action::SubmitPayload(payload) => {
                    // Acceptance is the channel's business; still wait for the round
                    if let Err(e) = self.channel.submit_payload(payload).await {
                        tracing::error!("{}: payload submission failed: {}", self.agent_address, e);
                    }
                    pending.extend(machine.handle(Event::PayloadSubmitted));
                }
                Action::AwaitRoundEnd => {
                    self.channel.wait_until_round_end().await;
                    pending.extend(machine.handle(Event::RoundEnded));
                }
                Action::Done => break,
            }
        }

        if machine.is_done() {
            tracing::debug!("{}: preparation done", self.agent_address);
        }

        PreparationOutcome {
            payload: machine.payload().cloned(),
            failure: machine.failure().cloned(),
            completed: machine.is_done(),
        }
    }
}
