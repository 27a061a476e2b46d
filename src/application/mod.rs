//! Application layer containing the request lifecycle orchestration.
//!
//! `FulfillmentOrchestrator` is the entry point for callers and for the oracle
//! transport. Waiting is built on per-request `tokio` one-shot channels owned by
//! the `CompletionNotifier`, so a pending caller never blocks callbacks for
//! other requests.

pub mod notifier;
pub mod orchestrator;
