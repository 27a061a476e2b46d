//! Port implementations: the in-memory ledger and the simulated oracle used
//! on development networks and in tests.

pub mod in_memory;
pub mod simulated;
