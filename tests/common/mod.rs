#![allow(dead_code)]

use oracle_relay::application::orchestrator::FulfillmentOrchestrator;
use oracle_relay::config::EngineConfig;
use oracle_relay::domain::rarity::{RarityTable, Tier};
use oracle_relay::domain::request::Fee;
use oracle_relay::domain::threshold::ThresholdRule;
use oracle_relay::infrastructure::in_memory::InMemoryLedger;
use oracle_relay::infrastructure::simulated::SimulatedOracle;
use rust_decimal_macros::dec;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::mpsc::unbounded_channel;
use tokio::task::JoinHandle;

pub struct Harness {
    pub engine: Arc<FulfillmentOrchestrator>,
    pub oracle: Arc<SimulatedOracle>,
    pub delivery_loop: JoinHandle<()>,
}

/// Bounds [10, 30, 100] over modulus 100, threshold 3000 with unscaled readings,
/// and a minimum fee of 1.
pub fn test_config() -> EngineConfig {
    let rarity = RarityTable::new(
        vec![
            Tier::new("tier0", 10),
            Tier::new("tier1", 30),
            Tier::new("tier2", 100),
        ],
        100,
    )
    .unwrap();
    EngineConfig::default()
        .with_min_fee(Fee::new(dec!(1)).unwrap())
        .with_rarity(rarity)
        .with_threshold(ThresholdRule::new(dec!(3000), "A", "B").unwrap())
        .with_feed_decimals(0)
}

/// Engine wired to a simulated oracle whose deliveries are drained by a
/// background task.
pub fn harness(config: EngineConfig) -> Harness {
    let (tx, rx) = unbounded_channel();
    let oracle = Arc::new(SimulatedOracle::new(42, tx));
    let engine = Arc::new(FulfillmentOrchestrator::new(
        config,
        Box::new(InMemoryLedger::new()),
        oracle.clone(),
    ));
    let delivery_loop = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run_deliveries(rx).await })
    };
    Harness {
        engine,
        oracle,
        delivery_loop,
    }
}

pub fn script(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "type, requester, request, value, kind").unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}
