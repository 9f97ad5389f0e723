//! Domain events and the append-only audit trail.
//!
//! Workflow transitions and version creations are recorded as events. The
//! audit recorder is a write-only collaborator: recording failures are
//! surfaced to operators via logs but never roll back the primary state
//! change that produced the event.

pub mod event;
pub mod recorder;

pub use event::Event;
pub use recorder::{AuditEntry, AuditError, AuditRecorder, InMemoryAuditRecorder, record_or_warn};
