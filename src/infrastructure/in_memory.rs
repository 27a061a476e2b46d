use crate::domain::ports::RequestLedger;
use crate::domain::request::{
    Fee, Outcome, Request, RequestId, RequestKind, RequestState, Requester,
};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::debug;

/// A thread-safe in-memory request ledger.
///
/// Backed by a sharded `DashMap`, so a transition holds only the shard lock of
/// the id being changed. Requests for different ids proceed independently.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    requests: Arc<DashMap<RequestId, Request>>,
}

impl InMemoryLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestLedger for InMemoryLedger {
    async fn register(
        &self,
        id: RequestId,
        requester: Requester,
        fee_paid: Fee,
        kind: RequestKind,
    ) -> Result<()> {
        match self.requests.entry(id.clone()) {
            Entry::Occupied(_) => Err(EngineError::DuplicateRequest(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Request::new(id, requester, fee_paid, kind));
                Ok(())
            }
        }
    }

    async fn fulfill(&self, id: &RequestId, outcome: Outcome) -> Result<()> {
        let mut request = self
            .requests
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownRequest(id.to_string()))?;

        match request.state {
            RequestState::Fulfilled => Err(EngineError::AlreadyFulfilled(id.to_string())),
            RequestState::Pending | RequestState::Expired => {
                if request.state == RequestState::Expired {
                    debug!(request_id = %id, "late fulfillment of expired request");
                }
                request.state = RequestState::Fulfilled;
                request.outcome = Some(outcome);
                Ok(())
            }
        }
    }

    async fn expire(&self, id: &RequestId) -> Result<()> {
        let mut request = self
            .requests
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownRequest(id.to_string()))?;

        if request.state == RequestState::Pending {
            request.state = RequestState::Expired;
        }
        Ok(())
    }

    async fn get(&self, id: &RequestId) -> Result<Option<Request>> {
        Ok(self.requests.get(id).map(|request| request.clone()))
    }

    async fn all(&self) -> Result<Vec<Request>> {
        Ok(self
            .requests
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn count(&self, state: RequestState) -> Result<usize> {
        Ok(self
            .requests
            .iter()
            .filter(|entry| entry.value().state == state)
            .count())
    }
}
