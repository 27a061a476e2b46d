use super::notifier::CompletionNotifier;
use crate::config::EngineConfig;
use crate::domain::ports::{OracleCoordinator, OracleDelivery, RequestLedgerBox};
use crate::domain::request::{
    Fee, Outcome, Request, RequestId, RequestKind, RequestState, Requester,
};
use crate::domain::threshold::reading_from_raw;
use crate::domain::treasury::Treasury;
use crate::error::{EngineError, Result};
use alloy_primitives::U256;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

/// Drives the request → wait → correlate → apply → notify lifecycle.
///
/// The orchestrator owns the ledger, the notifier and the treasury, and talks
/// to the oracle through the injected [`OracleCoordinator`]. It is meant to be
/// shared behind an `Arc` between callers and the delivery loop.
pub struct FulfillmentOrchestrator {
    config: EngineConfig,
    ledger: RequestLedgerBox,
    oracle: Arc<dyn OracleCoordinator>,
    notifier: CompletionNotifier,
    treasury: Mutex<Treasury>,
}

impl FulfillmentOrchestrator {
    /// Creates a new orchestrator.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated engine configuration.
    /// * `ledger` - The request ledger.
    /// * `oracle` - The oracle collaborator requests are submitted to.
    pub fn new(
        config: EngineConfig,
        ledger: RequestLedgerBox,
        oracle: Arc<dyn OracleCoordinator>,
    ) -> Self {
        let treasury = Mutex::new(Treasury::new(config.owner.clone()));
        Self {
            config,
            ledger,
            oracle,
            notifier: CompletionNotifier::new(),
            treasury,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn min_fee(&self) -> Fee {
        self.config.min_fee
    }

    pub fn notifier(&self) -> &CompletionNotifier {
        &self.notifier
    }

    /// Submits a paid request and registers it under the oracle's id.
    ///
    /// Fails with `InsufficientFee` before the oracle is contacted when
    /// `fee_paid` is below the configured minimum.
    pub async fn request(
        &self,
        requester: Requester,
        fee_paid: Fee,
        kind: RequestKind,
    ) -> Result<RequestId> {
        let min_fee = self.config.min_fee;
        if fee_paid < min_fee {
            return Err(EngineError::InsufficientFee {
                paid: fee_paid.value(),
                minimum: min_fee.value(),
            });
        }

        // Held until the fee is credited, so an overflowing fee is rejected
        // before anything is submitted or registered.
        let mut treasury = self.treasury.lock().await;
        treasury.balance().checked_add(fee_paid)?;

        let id = self.oracle.submit_request(kind, fee_paid).await?;

        if let Err(e) = self
            .ledger
            .register(id.clone(), requester.clone(), fee_paid, kind)
            .await
        {
            if matches!(e, EngineError::DuplicateRequest(_)) {
                error!(request_id = %id, "oracle assigned an id that is already registered");
            }
            return Err(e);
        }

        treasury.credit(fee_paid)?;
        drop(treasury);
        info!(request_id = %id, %requester, %kind, fee = %fee_paid, "request registered");
        Ok(id)
    }

    /// Waits for `id` to be fulfilled, for at most `timeout`.
    ///
    /// On timeout the request is marked expired and `RequestTimeout` is
    /// returned; the request may still be fulfilled later and a subsequent call
    /// will then return the stored outcome. Dropping the returned future only
    /// releases the subscription.
    pub async fn await_outcome(&self, id: &RequestId, timeout: Duration) -> Result<Outcome> {
        let result = self.wait_for_outcome(id, timeout).await;
        if result.is_ok() {
            // The ledger keeps the outcome; the notifier copy is no longer needed.
            self.notifier.acknowledge(id);
        }
        result
    }

    async fn wait_for_outcome(&self, id: &RequestId, timeout: Duration) -> Result<Outcome> {
        let waiter = self.notifier.subscribe(id);

        let request = self
            .ledger
            .get(id)
            .await?
            .ok_or_else(|| EngineError::UnknownRequest(id.to_string()))?;
        if let Some(outcome) = fulfilled_outcome(request) {
            return Ok(outcome);
        }

        match tokio::time::timeout(timeout, waiter).await {
            Ok(Some(outcome)) => Ok(outcome),
            Ok(None) | Err(_) => {
                // The ledger decides the race: expire is a no-op if the
                // callback already landed.
                self.ledger.expire(id).await?;
                match self.ledger.get(id).await?.and_then(fulfilled_outcome) {
                    Some(outcome) => Ok(outcome),
                    None => {
                        debug!(request_id = %id, ?timeout, "request expired while waiting");
                        Err(EngineError::RequestTimeout(id.to_string()))
                    }
                }
            }
        }
    }

    /// [`Self::await_outcome`] with the configured default timeout.
    pub async fn await_default(&self, id: &RequestId) -> Result<Outcome> {
        self.await_outcome(id, self.config.await_timeout).await
    }

    /// Entry point for the oracle transport.
    ///
    /// Never fails: unknown ids and repeated deliveries are expected from a
    /// retrying transport and are logged and dropped.
    pub async fn on_oracle_callback(&self, id: &RequestId, raw_value: U256) {
        if let Err(e) = self.apply_callback(id, raw_value).await {
            match &e {
                EngineError::UnknownRequest(_) | EngineError::AlreadyFulfilled(_) => {
                    warn!(request_id = %id, %raw_value, reason = %e, "oracle callback dropped");
                }
                _ => {
                    error!(request_id = %id, %raw_value, error = %e, "oracle callback failed");
                }
            }
        }
    }

    async fn apply_callback(&self, id: &RequestId, raw_value: U256) -> Result<Outcome> {
        let request = self
            .ledger
            .get(id)
            .await?
            .ok_or_else(|| EngineError::UnknownRequest(id.to_string()))?;
        if request.is_fulfilled() {
            return Err(EngineError::AlreadyFulfilled(id.to_string()));
        }

        let outcome = self.derive_outcome(id, request.kind, raw_value)?;
        self.ledger.fulfill(id, outcome.clone()).await?;

        let woken = self.notifier.publish(id, outcome.clone());
        info!(
            request_id = %id,
            category = %outcome.category,
            waiters = woken,
            "request fulfilled"
        );
        Ok(outcome)
    }

    fn derive_outcome(
        &self,
        id: &RequestId,
        kind: RequestKind,
        raw_value: U256,
    ) -> Result<Outcome> {
        let category = match kind {
            RequestKind::Rarity => self.config.rarity.classify(raw_value)?.label.clone(),
            RequestKind::Threshold => {
                let reading = reading_from_raw(raw_value, self.config.feed_decimals);
                self.config.threshold.select(reading).to_string()
            }
        };
        Ok(Outcome {
            request_id: id.clone(),
            category,
            raw_value,
        })
    }

    /// Feeds every delivery from the oracle transport into
    /// [`Self::on_oracle_callback`] until the channel closes.
    pub async fn run_deliveries(&self, mut deliveries: UnboundedReceiver<OracleDelivery>) {
        while let Some(delivery) = deliveries.recv().await {
            self.on_oracle_callback(&delivery.request_id, delivery.raw_value)
                .await;
        }
        debug!("oracle delivery channel closed");
    }

    /// Releases the retained outcome once the caller has consumed it.
    pub fn acknowledge(&self, id: &RequestId) {
        self.notifier.acknowledge(id);
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<Option<Request>> {
        self.ledger.get(id).await
    }

    pub async fn requests(&self) -> Result<Vec<Request>> {
        self.ledger.all().await
    }

    /// Number of outcomes issued so far.
    pub async fn fulfilled_count(&self) -> Result<usize> {
        self.ledger.count(RequestState::Fulfilled).await
    }

    pub async fn balance(&self) -> Fee {
        self.treasury.lock().await.balance()
    }

    /// Drains the collected fees to the owner.
    pub async fn withdraw(&self, caller: &Requester) -> Result<Fee> {
        let amount = self.treasury.lock().await.withdraw(caller)?;
        info!(%caller, %amount, "treasury withdrawn");
        Ok(amount)
    }
}

fn fulfilled_outcome(request: Request) -> Option<Outcome> {
    match request.state {
        RequestState::Fulfilled => request.outcome,
        _ => None,
    }
}
