//! Outer adapters that feed the engine and report its results.

pub mod csv;
