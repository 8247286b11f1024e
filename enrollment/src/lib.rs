//! Enrollment and verification protocol for the Haven biometric registry.
//!
//! Orchestrates the external collaborators (embedding extractor, content
//! store, commitment ledger, proof engine) through two state machines:
//!
//! - [`RegistrationFlow`]: dedup by fuzzy digest, seal the profile, store
//!   it, commit to the ledger.
//! - [`VerificationFlow`]: fetch and open the enrolled profile, prove that a
//!   fresh probe reproduces the on-ledger commitment, verify the proof.
//!
//! Around them sit officer suspect marking, a registry listing, and a saga
//! journal with a reconciliation sweep for blobs orphaned by partial
//! failures. Collaborators are injected through [`Services`].

pub mod config;
pub mod error;
pub mod extractor;
pub mod journal;
pub mod reconcile;
pub mod registration;
pub mod registry;
pub mod services;
pub mod spans;
pub mod suspect;
pub mod verification;

pub use config::{ConfigError, HavenConfig, SupersededBlobPolicy, TimeoutConfig};
pub use error::{FailureKind, FlowError};
pub use extractor::{EmbeddingExtractor, ExtractionError};
pub use journal::{JournalEntry, JournalError, SagaJournal};
pub use reconcile::{Reconciler, SweepReport};
pub use registration::{
    CommittedRecord, RegistrationFlow, RegistrationOutcome, RegistrationPhase, RegistrationReport,
    RejectReason,
};
pub use registry::{EntryProfile, RegistryEntry, RegistryView};
pub use services::Services;
pub use spans::FlowId;
pub use suspect::{SuspectMarking, SuspectReceipt};
pub use verification::{
    VerificationFlow, VerificationOutcome, VerificationPhase, VerificationReport,
};
