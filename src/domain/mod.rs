//! Domain types: requests, outcome derivation rules and the ports the
//! application layer depends on.

pub mod ports;
pub mod rarity;
pub mod request;
pub mod threshold;
pub mod treasury;
