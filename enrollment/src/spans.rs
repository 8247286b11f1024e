//! Pre-built [`tracing::Span`] constructors for the registry flows.
//!
//! Consistent span names and fields make a single registration or
//! verification easy to follow across collaborators. Fields never carry
//! plaintext biometric data.

use haven_types::RecordId;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info_span, Span};

/// Random identifier for one flow instance, used to correlate log lines and
/// journal entries.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowId(u64);

impl FlowId {
    pub fn random() -> Self {
        Self(rand::rngs::OsRng.next_u64())
    }

    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlowId({self})")
    }
}

pub fn registration_span(flow: FlowId) -> Span {
    info_span!("registration", flow = %flow, record = tracing::field::Empty)
}

pub fn verification_span(flow: FlowId, record: RecordId) -> Span {
    info_span!("verification", flow = %flow, record = %record)
}

pub fn suspect_marking_span(flow: FlowId, record: RecordId) -> Span {
    info_span!("suspect_marking", flow = %flow, record = %record)
}

pub fn listing_span() -> Span {
    info_span!("registry_list")
}

pub fn reconcile_span() -> Span {
    info_span!("reconcile")
}
