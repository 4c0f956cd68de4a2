//! Preparation Flow Tests
//!
//! Runs complete attempts through the async behaviour:
//! - Successful vote data and Safe hash reads
//! - Failure of either read, and the warnings they produce
//! - Several participants agreeing on byte-identical payloads
//! - Several participants timing into one benchmark tool
//! - Abandoning an attempt while it waits for the round

use std::{
    io::Write,
    sync::Arc,
    time::Duration,
};

use contract_api::{ContractQueryResult, ScriptedContractApi, StateValue};
use parking_lot::Mutex;
use prep_consensus::{LocalRoundChannel, SharedSynchronizedData, SynchronizedData};
use tracing_subscriber::fmt::MakeWriter;

use crate::{
    benchmark::{BenchmarkTool, MeasurementPhase},
    behaviour::TransactionPreparationBehaviour,
    content::PayloadContent,
    params::PreparationParams,
    payload_tools::{hash_payload_to_hex, hex_to_payload},
    BEHAVIOUR_ID, ERROR_PAYLOAD, NULL_ADDRESS,
};

const DESTINATION: &str = "0x000000000000000000000000000000000000dEaD";
const SAFE: &str = "0x5afe5afe5afe5afe5afe5afe5afe5afe5afe5afe";
const VOTE_CALLABLE: &str = "get_cast_vote_data";
const HASH_CALLABLE: &str = "get_raw_safe_transaction_hash";

/// Log sink for counting emitted lines
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn lines_with(&self, needle: &str) -> usize {
        let bytes = self.0.lock().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture WARN and above on the current thread
fn capture_warnings() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}

fn params() -> PreparationParams {
    PreparationParams::new("0xdelegate", "valory/delegate:0.1.0", VOTE_CALLABLE, DESTINATION)
}

fn synchronized_data() -> SharedSynchronizedData {
    SharedSynchronizedData::new(SynchronizedData {
        safe_contract_address: SAFE.to_string(),
        finished_task_data: None,
        proposals: vec!["101".to_string(), "102".to_string()],
        votable_proposal_ids: ["102".to_string(), "101".to_string()].into_iter().collect(),
    })
}

fn vote_data(bytes: &[u8]) -> ContractQueryResult {
    ContractQueryResult::success([("data", StateValue::Bytes(bytes.to_vec()))])
}

fn safe_hash(hash: &str) -> ContractQueryResult {
    ContractQueryResult::success([("tx_hash", StateValue::Text(hash.to_string()))])
}

fn behaviour(
    agent: &str,
    contracts: Arc<ScriptedContractApi>,
    channel: Arc<LocalRoundChannel>,
) -> TransactionPreparationBehaviour {
    TransactionPreparationBehaviour::new(agent, params(), contracts, channel, Arc::new(synchronized_data()))
}

#[tokio::test]
async fn test_successful_preparation_submits_encoded_hash() {
    let hash = "11".repeat(32);
    let contracts = Arc::new(
        ScriptedContractApi::new()
            .respond(VOTE_CALLABLE, vote_data(&[0xab, 0xcd]))
            .respond(HASH_CALLABLE, safe_hash(&format!("0x{}", hash))),
    );
    let channel = Arc::new(LocalRoundChannel::new(1).with_expected_participants(1));

    let outcome = behaviour("agent_0", contracts.clone(), channel.clone()).run().await;

    assert!(outcome.is_success());
    let payload = channel.payload_from("agent_0").expect("payload submitted");
    assert_eq!(Some(&payload), outcome.payload.as_ref());

    let expected_hash = hash_payload_to_hex(&hash, 0, 0, DESTINATION, &[0xab, 0xcd]).unwrap();
    assert_eq!(
        payload.content,
        format!(
            r#"{{"proposals":["101","102"],"tx_hash":"{}","votable_proposal_ids":["101","102"]}}"#,
            expected_hash
        )
    );

    let content = PayloadContent::from_json(&payload.content).unwrap();
    assert_eq!(content.tx_hash, expected_hash);
    assert!(content.tx_hash.starts_with(&hash));
    assert!(content.tx_hash.ends_with("abcd"));

    // Everything the round needs can be recovered from the hash
    let decoded = hex_to_payload(&content.tx_hash).unwrap();
    assert_eq!(decoded.safe_tx_hash, hash);
    assert_eq!(decoded.ether_value, 0);
    assert_eq!(decoded.safe_tx_gas, 0);
    assert_eq!(decoded.to_address, DESTINATION);
    assert_eq!(decoded.gas_token, NULL_ADDRESS);
    assert_eq!(decoded.data, vec![0xab, 0xcd]);

    assert_eq!(contracts.call_count(VOTE_CALLABLE), 1);
    assert_eq!(contracts.call_count(HASH_CALLABLE), 1);
    assert_eq!(contracts.calls()[1].contract_address, SAFE);
}

#[tokio::test]
async fn test_failed_vote_data_submits_sentinel_with_one_warning() {
    let (logs, _guard) = capture_warnings();

    let contracts = Arc::new(
        ScriptedContractApi::new().respond(VOTE_CALLABLE, ContractQueryResult::failure("execution reverted")),
    );
    let channel = Arc::new(LocalRoundChannel::new(1).with_expected_participants(1));

    let outcome = behaviour("agent_0", contracts.clone(), channel.clone()).run().await;

    assert!(outcome.completed);
    assert!(!outcome.is_success());
    assert_eq!(
        channel.payload_from("agent_0").unwrap().content,
        r#"{"proposals":["101","102"],"tx_hash":"ERROR_PAYLOAD","votable_proposal_ids":["101","102"]}"#
    );

    // The Safe is never asked for a hash
    assert_eq!(contracts.call_count(HASH_CALLABLE), 0);

    assert_eq!(logs.lines_with("WARN"), 1);
    assert_eq!(logs.lines_with("get_cast_vote_data unsuccessful!"), 1);
    assert_eq!(logs.lines_with("execution reverted"), 1);
}

#[tokio::test]
async fn test_failed_safe_hash_submits_sentinel() {
    let (logs, _guard) = capture_warnings();

    let contracts = Arc::new(
        ScriptedContractApi::new()
            .respond(VOTE_CALLABLE, vote_data(&[0x01]))
            .respond(HASH_CALLABLE, ContractQueryResult::failure("rpc timeout")),
    );
    let channel = Arc::new(LocalRoundChannel::new(1).with_expected_participants(1));

    let outcome = behaviour("agent_0", contracts, channel.clone()).run().await;

    let content = PayloadContent::from_json(&channel.payload_from("agent_0").unwrap().content).unwrap();
    assert!(content.is_error());
    assert_eq!(content.tx_hash, ERROR_PAYLOAD);
    assert!(outcome.completed);
    assert!(outcome.failure.is_some());
    assert_eq!(logs.lines_with("WARN"), 1);
    assert_eq!(logs.lines_with("get_raw_safe_transaction_hash unsuccessful!"), 1);
}

#[tokio::test]
async fn test_malformed_hash_response_submits_sentinel() {
    let contracts = Arc::new(
        ScriptedContractApi::new()
            .respond(VOTE_CALLABLE, vote_data(&[0x01]))
            .respond(HASH_CALLABLE, ContractQueryResult::success([("hash", StateValue::Text("0x00".to_string()))])),
    );
    let channel = Arc::new(LocalRoundChannel::new(1).with_expected_participants(1));

    let outcome = behaviour("agent_0", contracts, channel.clone()).run().await;

    assert!(outcome.completed);
    let content = PayloadContent::from_json(&channel.payload_from("agent_0").unwrap().content).unwrap();
    assert!(content.is_error());
}

#[tokio::test]
async fn test_participants_agree_byte_for_byte() {
    let channel = Arc::new(LocalRoundChannel::new(4).with_expected_participants(3));
    let agents = ["agent_0", "agent_1", "agent_2"];

    let runs = agents.iter().enumerate().map(|(i, agent)| {
        // Each agent reads from its own client, at its own pace
        let contracts = Arc::new(
            ScriptedContractApi::new()
                .respond(VOTE_CALLABLE, vote_data(&[0xca, 0xfe]))
                .respond(HASH_CALLABLE, safe_hash(&format!("0x{}", "7e".repeat(32))))
                .with_delay(Duration::from_millis(5 * (agents.len() - i) as u64)),
        );
        behaviour(agent, contracts, channel.clone())
    });
    let behaviours: Vec<_> = runs.collect();

    let outcomes = futures::future::join_all(behaviours.iter().map(|b| b.run())).await;

    assert!(outcomes.iter().all(|o| o.is_success()));
    let payloads = channel.payloads();
    assert_eq!(payloads.len(), 3);
    assert!(payloads.windows(2).all(|pair| pair[0].content == pair[1].content));
    assert!(payloads
        .windows(2)
        .all(|pair| pair[0].content_digest() == pair[1].content_digest()));
}

#[tokio::test]
async fn test_waits_for_round_end_and_records_phases() {
    let contracts = Arc::new(
        ScriptedContractApi::new()
            .respond(VOTE_CALLABLE, vote_data(&[0x01]))
            .respond(HASH_CALLABLE, safe_hash(&format!("0x{}", "22".repeat(32)))),
    );
    // Nobody else submits, so the round only ends when we say so
    let channel = Arc::new(LocalRoundChannel::new(9));
    let benchmark = Arc::new(BenchmarkTool::new());

    let prep = behaviour("agent_0", contracts, channel.clone()).with_benchmark(benchmark.clone());
    let handle = tokio::spawn(async move { prep.run().await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());
    assert!(channel.payload_from("agent_0").is_some());
    assert!(benchmark.is_open("agent_0", BEHAVIOUR_ID, MeasurementPhase::Consensus));

    channel.end_round();
    let outcome = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("attempt should finish once the round ends")
        .unwrap();

    assert!(outcome.is_success());
    let phases: Vec<_> = benchmark.records().iter().map(|r| r.phase).collect();
    assert_eq!(phases, vec![MeasurementPhase::Local, MeasurementPhase::Consensus]);
}

#[tokio::test]
async fn test_participants_share_one_benchmark_tool() {
    let channel = Arc::new(LocalRoundChannel::new(6).with_expected_participants(2));
    let benchmark = Arc::new(BenchmarkTool::new());
    let script = |delay_ms| {
        Arc::new(
            ScriptedContractApi::new()
                .respond(VOTE_CALLABLE, vote_data(&[0x01]))
                .respond(HASH_CALLABLE, safe_hash(&format!("0x{}", "33".repeat(32))))
                .with_delay(Duration::from_millis(delay_ms)),
        )
    };

    let first = behaviour("agent_0", script(5), channel.clone()).with_benchmark(benchmark.clone());
    let second = behaviour("agent_1", script(10), channel.clone()).with_benchmark(benchmark.clone());

    let (a, b) = tokio::join!(first.run(), second.run());
    assert!(a.is_success() && b.is_success());

    let records = benchmark.records();
    assert_eq!(records.len(), 4);
    for agent in ["agent_0", "agent_1"] {
        let phases: Vec<_> = records
            .iter()
            .filter(|r| r.agent_address == agent)
            .map(|r| r.phase)
            .collect();
        assert_eq!(phases, vec![MeasurementPhase::Local, MeasurementPhase::Consensus]);
        assert!(benchmark.total(agent, BEHAVIOUR_ID, MeasurementPhase::Local) >= Duration::from_millis(10));
        assert!(!benchmark.is_open(agent, BEHAVIOUR_ID, MeasurementPhase::Consensus));
    }
}

#[tokio::test]
async fn test_abandoned_attempt_leaves_no_state() {
    let contracts = Arc::new(
        ScriptedContractApi::new()
            .respond(VOTE_CALLABLE, vote_data(&[0x01]))
            .with_delay(Duration::from_secs(60)),
    );
    let channel = Arc::new(LocalRoundChannel::new(2));

    let prep = behaviour("agent_0", contracts, channel.clone());
    let result = tokio::time::timeout(Duration::from_millis(20), prep.run()).await;

    assert!(result.is_err());
    assert!(channel.payloads().is_empty());

    // A fresh attempt on the next round is unaffected
    let retry_contracts = Arc::new(
        ScriptedContractApi::new().respond(VOTE_CALLABLE, ContractQueryResult::failure("still down")),
    );
    let next_round = Arc::new(LocalRoundChannel::new(3).with_expected_participants(1));
    let outcome = behaviour("agent_0", retry_contracts, next_round.clone()).run().await;
    assert!(outcome.completed);
    assert_eq!(next_round.payloads().len(), 1);
}

#[tokio::test]
async fn test_duplicate_submission_does_not_stall_attempt() {
    let channel = Arc::new(LocalRoundChannel::new(5).with_expected_participants(2));
    let script = || {
        Arc::new(ScriptedContractApi::new().respond(VOTE_CALLABLE, ContractQueryResult::failure("down")))
    };

    // Same agent address twice: the second payload is rejected by the channel
    let first = behaviour("agent_0", script(), channel.clone());
    let second = behaviour("agent_0", script(), channel.clone());
    let other = behaviour("agent_1", script(), channel.clone());

    let (a, b, c) = tokio::join!(first.run(), second.run(), other.run());

    assert!(a.completed && b.completed && c.completed);
    assert_eq!(channel.payloads().len(), 2);
    assert_eq!(channel.stats().duplicates_rejected, 1);
}
