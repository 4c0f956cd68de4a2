//! Transaction Preparation Agent
//!
//! Runs one preparation round for a set of co-located participants against
//! scripted contract responses and prints the payloads they submitted.

use anyhow::Result;
use clap::Parser;
use contract_api::ScriptedContractApi;
use prep_consensus::{LocalRoundChannel, SharedSynchronizedData};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tx_preparation::{BenchmarkTool, MeasurementPhase, PayloadContent, TransactionPreparationBehaviour};

mod config;

use config::AgentConfig;

/// Transaction preparation agent
#[derive(Parser, Debug)]
#[command(name = "tx-prep-agent")]
#[command(about = "Derives the round's Safe transaction and submits it for agreement", long_about = None)]
struct Args {
    /// Agent config file (JSON)
    #[arg(long, default_value = "demos/agent.json")]
    config: PathBuf,

    /// Scripted contract responses (JSON), replayed for every participant
    #[arg(long, default_value = "demos/responses.json")]
    responses: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::load(&args.config)?;

    tracing::info!("Starting transaction preparation - round {}", config.round);
    tracing::info!("  Participants: {}", config.agent_addresses.len());
    tracing::info!("  Safe: {}", config.synchronized_data.safe_contract_address);
    tracing::info!("  Destination: {}", config.params.destination_address);

    let synchronized_data = Arc::new(SharedSynchronizedData::new(config.synchronized_data.clone()));
    let channel = Arc::new(
        LocalRoundChannel::new(config.round).with_expected_participants(config.agent_addresses.len()),
    );

    let benchmark = Arc::new(BenchmarkTool::new());

    let mut behaviours = Vec::with_capacity(config.agent_addresses.len());
    for address in &config.agent_addresses {
        let contracts = Arc::new(ScriptedContractApi::from_json_file(&args.responses)?);
        let behaviour = TransactionPreparationBehaviour::new(
            address,
            config.params.clone(),
            contracts,
            channel.clone(),
            synchronized_data.clone(),
        )
        .with_behaviour_id(&config.behaviour_id)
        .with_benchmark(benchmark.clone());
        behaviours.push(behaviour);
    }

    // Participants share the runtime, the round and the timings
    let handles: Vec<_> = behaviours
        .into_iter()
        .map(|behaviour| {
            tokio::spawn(async move {
                let outcome = behaviour.run().await;
                let benchmark = behaviour.benchmark();
                let local = benchmark.total(
                    behaviour.agent_address(),
                    behaviour.behaviour_id(),
                    MeasurementPhase::Local,
                );
                let consensus = benchmark.total(
                    behaviour.agent_address(),
                    behaviour.behaviour_id(),
                    MeasurementPhase::Consensus,
                );
                tracing::info!(
                    "{}: done (local {:.2}ms, consensus {:.2}ms)",
                    behaviour.agent_address(),
                    local.as_secs_f64() * 1000.0,
                    consensus.as_secs_f64() * 1000.0
                );
                outcome
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;

    let mut failed = 0;
    for result in results {
        let outcome = result?;
        if let Some(failure) = &outcome.failure {
            tracing::warn!("Preparation fell back to the error payload: {}", failure);
            failed += 1;
        }
    }

    let payloads = channel.payloads();
    let distinct = {
        let mut digests: Vec<_> = payloads.iter().map(|p| p.content_digest()).collect();
        digests.sort();
        digests.dedup();
        digests.len()
    };

    tracing::info!(
        "Round {} concluded: {} payloads, {} distinct, {} failed attempts",
        channel.round(),
        payloads.len(),
        distinct,
        failed
    );

    for payload in &payloads {
        let content = PayloadContent::from_json(&payload.content)?;
        println!("{} {} {}", payload.sender, payload.short_digest(), payload.content);
        if content.is_error() {
            tracing::warn!("{} submitted the error payload", payload.sender);
        }
    }

    Ok(())
}
