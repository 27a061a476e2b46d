use crate::domain::ports::{OracleCoordinator, OracleDelivery};
use crate::domain::request::{Fee, RequestId, RequestKind};
use crate::error::{EngineError, Result};
use alloy_primitives::U256;
use async_trait::async_trait;
use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

/// Decimals reported by the simulated price feed.
pub const DEFAULT_PRICE_DECIMALS: u32 = 18;
/// Initial answer of the simulated price feed, before scaling.
pub const DEFAULT_INITIAL_PRICE: u64 = 2000;

/// A local stand-in for the randomness coordinator and the price aggregator.
///
/// Ids are handed out sequentially from 1. Each submitted request can be
/// served once through [`SimulatedOracle::fulfill`];
/// [`SimulatedOracle::fulfill_with`] delivers a chosen value and, for an id
/// that was already served, behaves like a retrying transport.
pub struct SimulatedOracle {
    next_id: AtomicU64,
    pending: DashMap<RequestId, RequestKind>,
    rng: Mutex<StdRng>,
    price: Mutex<U256>,
    deliveries: UnboundedSender<OracleDelivery>,
    auto_fulfill: Option<Duration>,
}

impl SimulatedOracle {
    pub fn new(seed: u64, deliveries: UnboundedSender<OracleDelivery>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: DashMap::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            price: Mutex::new(scaled_price(DEFAULT_INITIAL_PRICE, DEFAULT_PRICE_DECIMALS)),
            deliveries,
            auto_fulfill: None,
        }
    }

    /// Serves every request automatically after `delay`.
    pub fn with_auto_fulfill(mut self, delay: Duration) -> Self {
        self.auto_fulfill = Some(delay);
        self
    }

    /// Sets the raw (already scaled) price answer.
    pub fn set_price(&self, answer: U256) {
        if let Ok(mut price) = self.price.lock() {
            *price = answer;
        }
        info!(%answer, "simulated price feed updated");
    }

    pub fn price(&self) -> U256 {
        self.price
            .lock()
            .map(|price| *price)
            .unwrap_or(U256::ZERO)
    }

    /// Ids that were submitted but not yet served.
    pub fn pending(&self) -> Vec<RequestId> {
        self.pending.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Serves `id` with a generated value: a random word for rarity requests,
    /// the current price answer for threshold requests.
    pub fn fulfill(&self, id: &RequestId) -> Result<U256> {
        let (_, kind) = self
            .pending
            .remove(id)
            .ok_or_else(|| EngineError::Oracle(format!("nonexistent request {id}")))?;
        let raw_value = self.generate(kind);
        self.deliver(id.clone(), raw_value)?;
        Ok(raw_value)
    }

    /// Delivers a caller-chosen value for `id`, whether or not it is still
    /// pending.
    pub fn fulfill_with(&self, id: &RequestId, raw_value: U256) -> Result<()> {
        if self.pending.remove(id).is_none() {
            debug!(request_id = %id, "replaying delivery for a served or unknown request");
        }
        self.deliver(id.clone(), raw_value)
    }

    fn generate(&self, kind: RequestKind) -> U256 {
        match kind {
            RequestKind::Rarity => {
                let mut bytes = [0u8; 32];
                if let Ok(mut rng) = self.rng.lock() {
                    rng.fill(&mut bytes);
                }
                U256::from_be_bytes(bytes)
            }
            RequestKind::Threshold => self.price(),
        }
    }

    fn deliver(&self, request_id: RequestId, raw_value: U256) -> Result<()> {
        debug!(%request_id, %raw_value, "simulated oracle delivering");
        self.deliveries
            .send(OracleDelivery {
                request_id,
                raw_value,
            })
            .map_err(|e| EngineError::Oracle(format!("delivery channel closed: {e}")))
    }
}

#[async_trait]
impl OracleCoordinator for SimulatedOracle {
    async fn submit_request(&self, kind: RequestKind, fee: Fee) -> Result<RequestId> {
        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
        debug!(request_id = %id, %kind, %fee, "simulated oracle accepted request");

        match self.auto_fulfill {
            Some(delay) => {
                let delivery = OracleDelivery {
                    request_id: id.clone(),
                    raw_value: self.generate(kind),
                };
                let sender = self.deliveries.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = sender.send(delivery);
                });
            }
            None => {
                self.pending.insert(id.clone(), kind);
            }
        }
        Ok(id)
    }
}

/// `value * 10^decimals` as a feed answer.
pub fn scaled_price(value: u64, decimals: u32) -> U256 {
    U256::from(value) * U256::from(10u64).pow(U256::from(decimals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let (tx, _rx) = unbounded_channel();
        let oracle = SimulatedOracle::new(1, tx);
        let first = oracle
            .submit_request(RequestKind::Rarity, Fee::ZERO)
            .await
            .unwrap();
        let second = oracle
            .submit_request(RequestKind::Threshold, Fee::ZERO)
            .await
            .unwrap();
        assert_eq!(first, RequestId::new("1"));
        assert_eq!(second, RequestId::new("2"));
        assert_eq!(oracle.pending().len(), 2);
    }

    #[tokio::test]
    async fn test_fulfill_serves_once() {
        let (tx, mut rx) = unbounded_channel();
        let oracle = SimulatedOracle::new(1, tx);
        let id = oracle
            .submit_request(RequestKind::Rarity, Fee::ZERO)
            .await
            .unwrap();

        let raw = oracle.fulfill(&id).unwrap();
        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.request_id, id);
        assert_eq!(delivery.raw_value, raw);

        assert!(matches!(oracle.fulfill(&id), Err(EngineError::Oracle(_))));

        oracle.fulfill_with(&id, U256::from(9u64)).unwrap();
        assert_eq!(rx.recv().await.unwrap().raw_value, U256::from(9u64));
    }

    #[tokio::test]
    async fn test_threshold_requests_read_the_price() {
        let (tx, mut rx) = unbounded_channel();
        let oracle = SimulatedOracle::new(1, tx);
        oracle.set_price(scaled_price(4000, DEFAULT_PRICE_DECIMALS));
        let id = oracle
            .submit_request(RequestKind::Threshold, Fee::ZERO)
            .await
            .unwrap();
        oracle.fulfill(&id).unwrap();

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.raw_value, scaled_price(4000, 18));
    }

    #[tokio::test]
    async fn test_same_seed_same_words() {
        let (tx_a, mut rx_a) = unbounded_channel();
        let (tx_b, mut rx_b) = unbounded_channel();
        let a = SimulatedOracle::new(42, tx_a);
        let b = SimulatedOracle::new(42, tx_b);
        for oracle in [&a, &b] {
            let id = oracle
                .submit_request(RequestKind::Rarity, Fee::ZERO)
                .await
                .unwrap();
            oracle.fulfill(&id).unwrap();
        }
        assert_eq!(
            rx_a.recv().await.unwrap().raw_value,
            rx_b.recv().await.unwrap().raw_value
        );
    }

    #[tokio::test]
    async fn test_auto_fulfill_delivers_without_pending() {
        let (tx, mut rx) = unbounded_channel();
        let oracle = SimulatedOracle::new(1, tx).with_auto_fulfill(Duration::from_millis(5));
        let id = oracle
            .submit_request(RequestKind::Rarity, Fee::ZERO)
            .await
            .unwrap();
        assert!(oracle.pending().is_empty());

        let delivery = rx.recv().await.unwrap();
        assert_eq!(delivery.request_id, id);
    }
}
