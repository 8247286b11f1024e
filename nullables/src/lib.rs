//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the registry core (content store, ledger,
//! embedding extractor, proof engine) is abstracted behind a trait. This
//! crate provides test-friendly implementations that:
//! - Keep all state in memory and never touch the network
//! - Can be controlled programmatically (inject failures, stall calls)
//! - Expose their internal state for assertions
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod extractor;
pub mod ledger;
pub mod prover;
pub mod store;

pub use clock::NullClock;
pub use extractor::NullExtractor;
pub use ledger::NullLedger;
pub use prover::NullProofEngine;
pub use store::NullContentStore;
