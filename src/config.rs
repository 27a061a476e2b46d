//! Engine configuration, loaded once at startup.

use crate::domain::rarity::{RarityTable, Tier};
use crate::domain::request::{Fee, Requester};
use crate::domain::threshold::{MAX_FEED_DECIMALS, ThresholdRule};
use crate::error::{EngineError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// On-disk shape of the configuration. Every field is optional; missing
/// fields fall back to the development-network defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    owner: Option<String>,
    min_fee: Option<Decimal>,
    rarity: Option<RawRarity>,
    threshold: Option<ThresholdRule>,
    feed_decimals: Option<u32>,
    await_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRarity {
    modulus: u64,
    tiers: Vec<Tier>,
}

/// Validated, immutable configuration handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub owner: Requester,
    pub min_fee: Fee,
    pub rarity: RarityTable,
    pub threshold: ThresholdRule,
    /// Decimals used to scale raw price answers into readings.
    pub feed_decimals: u32,
    pub await_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            owner: Requester::new("deployer"),
            min_fee: Fee::new(dec!(0.001)).unwrap_or_default(),
            rarity: default_rarity(),
            threshold: default_threshold(),
            feed_decimals: 18,
            await_timeout: Duration::from_secs(600),
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::Configuration(format!("malformed configuration: {e}")))?;
        Self::from_raw(raw)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let defaults = Self::default();

        let min_fee = match raw.min_fee {
            Some(value) => Fee::new(value).map_err(|_| {
                EngineError::Configuration(format!("min_fee must not be negative, got {value}"))
            })?,
            None => defaults.min_fee,
        };

        let rarity = match raw.rarity {
            Some(rarity) => RarityTable::new(rarity.tiers, rarity.modulus)?,
            None => defaults.rarity,
        };

        let threshold = match raw.threshold {
            Some(rule) => {
                rule.validate()?;
                rule
            }
            None => defaults.threshold,
        };

        let feed_decimals = raw.feed_decimals.unwrap_or(defaults.feed_decimals);
        if feed_decimals > MAX_FEED_DECIMALS {
            return Err(EngineError::Configuration(format!(
                "feed_decimals must be at most {MAX_FEED_DECIMALS}, got {feed_decimals}"
            )));
        }

        let await_timeout = raw
            .await_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.await_timeout);

        let owner = match raw.owner {
            Some(owner) if owner.trim().is_empty() => {
                return Err(EngineError::Configuration(
                    "owner must not be empty".to_string(),
                ));
            }
            Some(owner) => Requester::new(owner),
            None => defaults.owner,
        };

        Ok(Self {
            owner,
            min_fee,
            rarity,
            threshold,
            feed_decimals,
            await_timeout,
        })
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Requester::new(owner);
        self
    }

    pub fn with_min_fee(mut self, min_fee: Fee) -> Self {
        self.min_fee = min_fee;
        self
    }

    pub fn with_rarity(mut self, rarity: RarityTable) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn with_threshold(mut self, threshold: ThresholdRule) -> Self {
        self.threshold = threshold;
        self
    }

    /// Clamped to the largest scale a decimal reading supports.
    pub fn with_feed_decimals(mut self, decimals: u32) -> Self {
        self.feed_decimals = decimals.min(MAX_FEED_DECIMALS);
        self
    }

    pub fn with_await_timeout(mut self, timeout: Duration) -> Self {
        self.await_timeout = timeout;
        self
    }
}

fn default_rarity() -> RarityTable {
    let tiers = vec![
        Tier::new("pug", 10),
        Tier::new("shiba-inu", 30),
        Tier::new("st-bernard", 100),
    ];
    RarityTable::from_trusted(tiers, 100)
}

fn default_threshold() -> ThresholdRule {
    ThresholdRule {
        boundary: dec!(4000),
        below_label: "frown".to_string(),
        at_or_above_label: "happy".to_string(),
    }
}
