use super::request::{Fee, Outcome, Request, RequestId, RequestKind, RequestState, Requester};
use crate::error::Result;
use alloy_primitives::U256;
use async_trait::async_trait;

/// Registry of requests keyed by oracle-assigned id.
///
/// Every mutating call must be atomic for its id: implementations decide the
/// transition and apply it under the same lock.
#[async_trait]
pub trait RequestLedger: Send + Sync {
    async fn register(
        &self,
        id: RequestId,
        requester: Requester,
        fee_paid: Fee,
        kind: RequestKind,
    ) -> Result<()>;
    async fn fulfill(&self, id: &RequestId, outcome: Outcome) -> Result<()>;
    async fn expire(&self, id: &RequestId) -> Result<()>;
    async fn get(&self, id: &RequestId) -> Result<Option<Request>>;
    async fn all(&self) -> Result<Vec<Request>>;
    async fn count(&self, state: RequestState) -> Result<usize>;
}

pub type RequestLedgerBox = Box<dyn RequestLedger>;

/// The outbound half of the oracle collaborator.
#[async_trait]
pub trait OracleCoordinator: Send + Sync {
    /// Asks the oracle for a value and returns the id it will answer under.
    async fn submit_request(&self, kind: RequestKind, fee: Fee) -> Result<RequestId>;
}

/// A value delivered by the oracle transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleDelivery {
    pub request_id: RequestId,
    pub raw_value: U256,
}
