//! Report lifecycle domain module.
//!
//! The deliverable of a lab order is a report with a guarded workflow status
//! and an append-only chain of content versions. This crate holds:
//!
//! - the event-sourced [`Report`] aggregate and its transition state machine,
//! - the [`ReportVersion`] entity, the [`VersionManager`] and the invariants
//!   of the version chain (gapless numbering, exactly one current version),
//! - the [`PdfGateway`], which refuses to mint PDF retrieval URLs while the
//!   owning order's billing lock is engaged.
//!
//! All transition logic is a pure function of (state, event, capabilities);
//! stores and the audit recorder are reached only through traits.

pub mod pdf;
pub mod report;
pub mod store;
pub mod version;

pub use pdf::{AccessError, PdfGateway};
pub use report::{
    ApproveReport, ChangesRequested, CreateReport, Report, ReportApproved, ReportCommand,
    ReportCreated, ReportEvent, ReportId, ReportRetracted, ReportSigned, ReportStatus,
    ReportSubmitted, RequestChanges, RetractReport, SignReport, SubmitReport,
};
pub use store::{ReportStore, VersionStore};
pub use version::{ContentRefs, ReportVersion, VersionId, VersionManager};
