//! Persistence contracts for reports and their version chains.
//!
//! Implementations must make each method an atomic unit (a transaction or a
//! single lock scope); the invariants of the version chain are stated here
//! and enforced inside the store, not by callers.

use chrono::{DateTime, Utc};

use labflow_core::{DomainResult, ExpectedVersion, UserId};
use labflow_storage::{ArtifactKind, ArtifactRef};

use crate::report::{Report, ReportId};
use crate::version::ReportVersion;

/// Storage for the report aggregate.
pub trait ReportStore: Send + Sync {
    /// Insert a newly created report. Fails with `Conflict` if the id is
    /// taken, or if a report already exists for the same order.
    fn insert(&self, report: Report) -> DomainResult<()>;

    fn get(&self, report_id: ReportId) -> DomainResult<Option<Report>>;

    /// Replace the stored report, checking the expected aggregate version.
    /// A stale `expected` fails with `Conflict` so racing transitions are
    /// serialized: the loser reloads and re-validates against the new state.
    fn update(&self, report: Report, expected: ExpectedVersion) -> DomainResult<()>;
}

/// Storage for the append-only version chain.
///
/// Invariants the implementation must uphold inside each atomic operation:
/// `(report_id, version_no)` is unique; `version_no` values form a gapless
/// ascending sequence from 1; at most one version per report is current.
pub trait VersionStore: Send + Sync {
    /// Highest allocated `version_no` for the report, 0 if none exist.
    fn max_version_no(&self, report_id: ReportId) -> DomainResult<u32>;

    /// Atomically append `version` (which must carry `expected_max + 1`) and
    /// unset the previously current version. Fails with `Conflict` if the
    /// chain's maximum is no longer `expected_max`.
    fn append(
        &self,
        report_id: ReportId,
        expected_max: u32,
        version: ReportVersion,
    ) -> DomainResult<()>;

    /// The unique current version, if any version exists.
    fn current(&self, report_id: ReportId) -> DomainResult<Option<ReportVersion>>;

    fn get(&self, report_id: ReportId, version_no: u32) -> DomainResult<Option<ReportVersion>>;

    /// All versions of the report in ascending `version_no` order.
    fn list(&self, report_id: ReportId) -> DomainResult<Vec<ReportVersion>>;

    /// Set one artifact pointer on an existing version. Fails with
    /// `NotFound` if the version does not exist, and with
    /// `InvariantViolation` if it is signed; the signed check and the write
    /// share the store's atomic unit, so a signature that lands first always
    /// wins.
    fn attach_artifact(
        &self,
        report_id: ReportId,
        version_no: u32,
        kind: ArtifactKind,
        artifact: ArtifactRef,
    ) -> DomainResult<ReportVersion>;

    /// Stamp the signature onto the named version. The caller resolves which
    /// version is current before committing the publish, so a version created
    /// in between cannot move the stamp. Fails with `NotFound` if the version
    /// does not exist; fails with `InvariantViolation` if it is already
    /// signed.
    fn stamp_signature(
        &self,
        report_id: ReportId,
        version_no: u32,
        signed_by: UserId,
        signed_at: DateTime<Utc>,
    ) -> DomainResult<ReportVersion>;
}
