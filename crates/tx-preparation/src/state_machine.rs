//! Transaction preparation state machine
//!
//! The machine is synchronous and performs no I/O. The runner feeds it
//! events (the arrival of a read response, submission, round end) and
//! executes the actions it returns, suspending at every external call.
//!
//! ```text
//! Start -> QueryPrimaryContract -> QueryTransactionHash -> AssemblePayload -> Submit -> AwaitQuorum -> Done
//!                 |                        |                     |
//!                 +------------------------+---------> Failed ---+
//! ```

use crate::benchmark::MeasurementPhase;
use crate::content::PayloadContent;
use crate::params::PreparationParams;
use crate::payload_tools::{PayloadError, SafeTxPayload};
use contract_api::{ContractCall, ContractQueryResult, StateValue};
use prep_consensus::{SynchronizedData, TransactionPreparationPayload};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Why an attempt fell back to the error sentinel
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreparationFailure {
    #[error("{callable} unsuccessful!: {response}")]
    QueryFailed { callable: String, response: String },

    #[error("{callable} returned a malformed response, bad field `{field}`: {response}")]
    MalformedResponse {
        callable: String,
        field: &'static str,
        response: String,
    },

    #[error("Could not encode the Safe transaction: {0}")]
    Encoding(#[from] PayloadError),
}

/// Step of a preparation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparationState {
    Start,
    /// Waiting for the vote data
    QueryPrimaryContract,
    /// Waiting for the Safe hash of `data`
    QueryTransactionHash { data: Vec<u8> },
    AssemblePayload,
    Failed,
    /// Waiting for the channel to take the payload
    Submit,
    /// Waiting for the round to end
    AwaitQuorum,
    Done,
}

impl fmt::Display for PreparationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreparationState::Start => "Start",
            PreparationState::QueryPrimaryContract => "QueryPrimaryContract",
            PreparationState::QueryTransactionHash { .. } => "QueryTransactionHash",
            PreparationState::AssemblePayload => "AssemblePayload",
            PreparationState::Failed => "Failed",
            PreparationState::Submit => "Submit",
            PreparationState::AwaitQuorum => "AwaitQuorum",
            PreparationState::Done => "Done",
        };
        f.write_str(name)
    }
}

/// Input to the machine
#[derive(Debug, Clone)]
pub enum Event {
    /// Begin the attempt with the round's synchronized data
    Start(SynchronizedData),
    /// Response to the last `Action::QueryContract`
    QueryCompleted(ContractQueryResult),
    /// The channel took the payload
    PayloadSubmitted,
    /// The round this payload belongs to has ended
    RoundEnded,
}

/// Work for the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    BeginMeasurement(MeasurementPhase),
    EndMeasurement(MeasurementPhase),
    QueryContract(ContractCall),
    SubmitPayload(TransactionPreparationPayload),
    AwaitRoundEnd,
    Done,
}

/// One preparation attempt for one participant
pub struct PreparationStateMachine {
    /// Address of this agent, used as payload sender
    agent_address: String,
    params: PreparationParams,
    state: PreparationState,
    /// Safe account read at start
    safe_contract_address: String,
    proposals: Vec<String>,
    votable_proposal_ids: BTreeSet<String>,
    /// Set when the attempt fell back to the sentinel
    failure: Option<PreparationFailure>,
    /// Payload handed to the channel
    payload: Option<TransactionPreparationPayload>,
}

impl PreparationStateMachine {
    pub fn new(agent_address: &str, params: PreparationParams) -> Self {
        Self {
            agent_address: agent_address.to_string(),
            params,
            state: PreparationState::Start,
            safe_contract_address: String::new(),
            proposals: Vec::new(),
            votable_proposal_ids: BTreeSet::new(),
            failure: None,
            payload: None,
        }
    }

    pub fn state(&self) -> &PreparationState {
        &self.state
    }

    pub fn failure(&self) -> Option<&PreparationFailure> {
        self.failure.as_ref()
    }

    pub fn payload(&self) -> Option<&TransactionPreparationPayload> {
        self.payload.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.state == PreparationState::Done
    }

    /// Process an event, returning the actions to perform in order
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match (&mut self.state, event) {
            (PreparationState::Start, Event::Start(data)) => self.on_start(data),
            (PreparationState::QueryPrimaryContract, Event::QueryCompleted(result)) => {
                self.on_vote_data(result)
            }
            (PreparationState::QueryTransactionHash { data }, Event::QueryCompleted(result)) => {
                let data = std::mem::take(data);
                self.on_safe_tx_hash(data, result)
            }
            (PreparationState::Submit, Event::PayloadSubmitted) => {
                self.transition(PreparationState::AwaitQuorum);
                vec![Action::AwaitRoundEnd]
            }
            (PreparationState::AwaitQuorum, Event::RoundEnded) => {
                self.transition(PreparationState::Done);
                vec![Action::EndMeasurement(MeasurementPhase::Consensus), Action::Done]
            }
            (state, event) => {
                tracing::warn!("Ignoring {:?} in state {}", event, state);
                Vec::new()
            }
        }
    }

    fn on_start(&mut self, data: SynchronizedData) -> Vec<Action> {
        self.safe_contract_address = data.safe_contract_address;
        self.proposals = data.proposals;
        self.votable_proposal_ids = data.votable_proposal_ids;

        let mut call = ContractCall::new(
            &self.params.delegate_contract_address,
            &self.params.delegate_contract_id,
            &self.params.vote_data_callable,
        );
        if let Some(task_data) = data.finished_task_data {
            call = call.with_param("task_data", StateValue::Json(task_data));
        }

        self.transition(PreparationState::QueryPrimaryContract);
        vec![
            Action::BeginMeasurement(MeasurementPhase::Local),
            Action::QueryContract(call),
        ]
    }

    fn on_vote_data(&mut self, result: ContractQueryResult) -> Vec<Action> {
        let callable = self.params.vote_data_callable.clone();

        let data = match &result {
            ContractQueryResult::Failure { .. } => {
                return self.fail(PreparationFailure::QueryFailed {
                    callable,
                    response: result.to_string(),
                });
            }
            ContractQueryResult::Success { body } => {
                match body.get("data").and_then(StateValue::as_bytes) {
                    Some(data) => data.to_vec(),
                    None => {
                        return self.fail(PreparationFailure::MalformedResponse {
                            callable,
                            field: "data",
                            response: result.to_string(),
                        });
                    }
                }
            }
        };

        let call = ContractCall::new(
            &self.safe_contract_address,
            &self.params.safe_contract_id,
            &self.params.safe_tx_hash_callable,
        )
        .with_param("to_address", self.params.destination_address.as_str())
        .with_param("value", self.params.ether_value)
        .with_param("data", data.clone())
        .with_param("safe_tx_gas", self.params.safe_tx_gas);

        self.transition(PreparationState::QueryTransactionHash { data });
        vec![Action::QueryContract(call)]
    }

    fn on_safe_tx_hash(&mut self, data: Vec<u8>, result: ContractQueryResult) -> Vec<Action> {
        let callable = self.params.safe_tx_hash_callable.clone();

        let safe_tx_hash = match &result {
            ContractQueryResult::Failure { .. } => {
                return self.fail(PreparationFailure::QueryFailed {
                    callable,
                    response: result.to_string(),
                });
            }
            ContractQueryResult::Success { body } => {
                let stripped = body
                    .get("tx_hash")
                    .and_then(StateValue::as_text)
                    .and_then(|hash| hash.strip_prefix("0x"));
                match stripped {
                    Some(hash) => hash.to_string(),
                    None => {
                        return self.fail(PreparationFailure::MalformedResponse {
                            callable,
                            field: "tx_hash",
                            response: result.to_string(),
                        });
                    }
                }
            }
        };

        tracing::info!("Hash of the Safe transaction: {}", safe_tx_hash);
        self.transition(PreparationState::AssemblePayload);

        match self.assemble(&safe_tx_hash, data) {
            Ok(tx_hash) => self.submit(tx_hash),
            Err(e) => self.fail(e.into()),
        }
    }

    fn assemble(&self, safe_tx_hash: &str, data: Vec<u8>) -> Result<String, PayloadError> {
        let extra = &self.params.safe_tx;
        let payload = SafeTxPayload {
            operation: extra.operation,
            base_gas: extra.base_gas,
            safe_gas_price: extra.safe_gas_price,
            gas_token: extra.gas_token.clone(),
            refund_receiver: extra.refund_receiver.clone(),
            use_flashbots: extra.use_flashbots,
            gas_limit: extra.gas_limit,
            raise_on_failed_simulation: extra.raise_on_failed_simulation,
            ..SafeTxPayload::new(
                safe_tx_hash,
                self.params.ether_value,
                self.params.safe_tx_gas,
                &self.params.destination_address,
                data,
            )
        };
        payload.encode()
    }

    fn fail(&mut self, failure: PreparationFailure) -> Vec<Action> {
        tracing::warn!("{}", failure);
        self.failure = Some(failure);
        self.transition(PreparationState::Failed);
        self.submit(prep_consensus::ERROR_PAYLOAD.to_string())
    }

    fn submit(&mut self, tx_hash: String) -> Vec<Action> {
        let content = PayloadContent::new(
            tx_hash,
            std::mem::take(&mut self.proposals),
            std::mem::take(&mut self.votable_proposal_ids),
        );
        let payload = TransactionPreparationPayload::new(&self.agent_address, content.to_canonical_json());
        self.payload = Some(payload.clone());

        self.transition(PreparationState::Submit);
        vec![
            Action::EndMeasurement(MeasurementPhase::Local),
            Action::BeginMeasurement(MeasurementPhase::Consensus),
            Action::SubmitPayload(payload),
        ]
    }

    fn transition(&mut self, next: PreparationState) {
        tracing::debug!("{}: {} -> {}", self.agent_address, self.state, next);
        self.state = next;
    }
}
