//! Blackhole Test & Validation Infrastructure
//!
//! Cross-crate scenarios for the reduction pipeline and the block store client,
//! an in-memory block store, image fixtures and property-based tests.

pub mod harness;

#[cfg(test)]
mod client_integration;
#[cfg(test)]
mod pipeline_integration;
#[cfg(test)]
mod proptest_reduce;

pub use harness::{fixtures, InMemoryStore, StoreCall, TestEnv};
