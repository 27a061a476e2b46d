use clap::Parser;
use miette::{IntoDiagnostic, Result};
use oracle_relay::application::orchestrator::FulfillmentOrchestrator;
use oracle_relay::config::EngineConfig;
use oracle_relay::domain::request::Request;
use oracle_relay::domain::threshold::raw_from_reading;
use oracle_relay::infrastructure::in_memory::InMemoryLedger;
use oracle_relay::infrastructure::simulated::SimulatedOracle;
use oracle_relay::interfaces::csv::event_reader::{Event, EventReader};
use oracle_relay::interfaces::csv::outcome_writer::OutcomeWriter;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Relay script CSV file (type, requester, request, value, kind)
    input: PathBuf,

    /// JSON engine configuration. Defaults to the development network settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// How long to wait for each outstanding request before marking it expired.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Seed for the simulated oracle's random words.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_path(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_await_timeout(Duration::from_millis(timeout_ms));
    }
    let timeout = config.await_timeout;

    // Development wiring: the simulated oracle stands in for the remote one.
    let (deliveries_tx, deliveries_rx) = unbounded_channel();
    let oracle = Arc::new(SimulatedOracle::new(cli.seed, deliveries_tx));
    let engine = Arc::new(FulfillmentOrchestrator::new(
        config,
        Box::new(InMemoryLedger::new()),
        oracle.clone(),
    ));

    let delivery_loop = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run_deliveries(deliveries_rx).await })
    };

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = apply_event(&engine, &oracle, event).await {
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    // Wait for every outstanding request concurrently.
    let mut waits = JoinSet::new();
    for request in engine.requests().await.into_diagnostic()? {
        let engine = Arc::clone(&engine);
        waits.spawn(async move {
            let result = engine.await_outcome(&request.id, timeout).await;
            (request.id, result)
        });
    }
    while let Some(joined) = waits.join_next().await {
        let (id, result) = joined.into_diagnostic()?;
        if let Err(e) = result {
            eprintln!("Error awaiting request {}: {}", id, e);
        }
    }
    delivery_loop.abort();

    let mut requests = engine.requests().await.into_diagnostic()?;
    requests.sort_by(submission_order);

    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());
    writer.write_requests(requests.iter()).into_diagnostic()?;

    Ok(())
}

async fn apply_event(
    engine: &FulfillmentOrchestrator,
    oracle: &SimulatedOracle,
    event: Event,
) -> oracle_relay::error::Result<()> {
    match event {
        Event::Request {
            requester,
            fee,
            kind,
        } => {
            engine.request(requester, fee, kind).await?;
        }
        Event::Fulfill {
            request_id,
            raw_value: Some(raw_value),
        } => oracle.fulfill_with(&request_id, raw_value)?,
        Event::Fulfill {
            request_id,
            raw_value: None,
        } => {
            oracle.fulfill(&request_id)?;
        }
        Event::Price { reading } => {
            let answer = raw_from_reading(reading, engine.config().feed_decimals)?;
            oracle.set_price(answer);
        }
        Event::Withdraw { caller } => {
            let amount = engine.withdraw(&caller).await?;
            eprintln!("Withdrew {} to {}", amount, caller);
        }
    }
    Ok(())
}

/// Oracle ids are sequential numbers, so shorter ids sort first.
fn submission_order(a: &Request, b: &Request) -> std::cmp::Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.as_str().len().cmp(&b.id.as_str().len()))
        .then_with(|| a.id.cmp(&b.id))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();
}
