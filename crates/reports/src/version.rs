//! Append-only version chain of a report.
//!
//! Versions are monotonically numbered snapshots of a report's content:
//! `version_no` starts at 1, never gaps, never repeats, and exactly one
//! version per report is current once any exists. Allocation and the
//! current-flip happen in one atomic store operation; two racing creators
//! cannot both take the same number, and the loser retries against a freshly
//! read maximum.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use labflow_auth::{Actor, Capability};
use labflow_core::{AggregateId, DomainError, DomainResult, Entity, TenantId, UserId};
use labflow_events::{AuditEntry, AuditRecorder, record_or_warn};
use labflow_storage::{ArtifactKind, ArtifactRef};

use crate::report::ReportId;
use crate::store::VersionStore;

/// Report version identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub AggregateId);

impl VersionId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for VersionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The three artifact pointer slots of a version, each optional and
/// independently settable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRefs {
    pub body_ref: Option<ArtifactRef>,
    pub pdf_ref: Option<ArtifactRef>,
    pub html_ref: Option<ArtifactRef>,
}

impl ContentRefs {
    pub fn get(&self, kind: ArtifactKind) -> Option<ArtifactRef> {
        match kind {
            ArtifactKind::Body => self.body_ref,
            ArtifactKind::Pdf => self.pdf_ref,
            ArtifactKind::Html => self.html_ref,
        }
    }

    pub fn set(&mut self, kind: ArtifactKind, artifact: ArtifactRef) {
        match kind {
            ArtifactKind::Body => self.body_ref = Some(artifact),
            ArtifactKind::Pdf => self.pdf_ref = Some(artifact),
            ArtifactKind::Html => self.html_ref = Some(artifact),
        }
    }
}

/// One immutable snapshot in a report's version chain.
///
/// `authored_by`/`authored_at` and `changelog` are fixed at creation.
/// `signed_by`/`signed_at` are stamped at most once, when the owning report
/// is signed while this version is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    id: VersionId,
    report_id: ReportId,
    version_no: u32,
    is_current: bool,
    content: ContentRefs,
    authored_by: UserId,
    authored_at: DateTime<Utc>,
    signed_by: Option<UserId>,
    signed_at: Option<DateTime<Utc>>,
    changelog: Option<String>,
}

impl ReportVersion {
    pub fn new(
        report_id: ReportId,
        version_no: u32,
        authored_by: UserId,
        authored_at: DateTime<Utc>,
        content: ContentRefs,
        changelog: Option<String>,
    ) -> Self {
        Self {
            id: VersionId::new(AggregateId::new()),
            report_id,
            version_no,
            is_current: true,
            content,
            authored_by,
            authored_at,
            signed_by: None,
            signed_at: None,
            changelog,
        }
    }

    pub fn id_typed(&self) -> VersionId {
        self.id
    }

    pub fn report_id(&self) -> ReportId {
        self.report_id
    }

    pub fn version_no(&self) -> u32 {
        self.version_no
    }

    pub fn is_current(&self) -> bool {
        self.is_current
    }

    pub fn content(&self) -> &ContentRefs {
        &self.content
    }

    pub fn pdf_ref(&self) -> Option<ArtifactRef> {
        self.content.pdf_ref
    }

    pub fn authored_by(&self) -> UserId {
        self.authored_by
    }

    pub fn authored_at(&self) -> DateTime<Utc> {
        self.authored_at
    }

    pub fn signed_by(&self) -> Option<UserId> {
        self.signed_by
    }

    pub fn signed_at(&self) -> Option<DateTime<Utc>> {
        self.signed_at
    }

    pub fn changelog(&self) -> Option<&str> {
        self.changelog.as_deref()
    }

    pub fn is_signed(&self) -> bool {
        self.signed_by.is_some()
    }

    /// Store-side mutators. Only the version store calls these, inside its
    /// atomic operations; they exist so the entity's fields stay private.
    pub fn mark_not_current(&mut self) {
        self.is_current = false;
    }

    /// Stamp the signature. Refuses to restamp: the signature names who
    /// published this exact content and never changes afterward.
    pub fn stamp_signature(&mut self, signed_by: UserId, signed_at: DateTime<Utc>) -> DomainResult<()> {
        if self.is_signed() {
            return Err(DomainError::invariant(
                "version is already signed; signatures are immutable",
            ));
        }
        self.signed_by = Some(signed_by);
        self.signed_at = Some(signed_at);
        Ok(())
    }

    /// Set one artifact pointer. Refused once the version is signed: the
    /// signature names exactly this content.
    pub fn set_artifact(&mut self, kind: ArtifactKind, artifact: ArtifactRef) -> DomainResult<()> {
        if self.is_signed() {
            return Err(DomainError::invariant(
                "version is signed; content pointers are frozen",
            ));
        }
        self.content.set(kind, artifact);
        Ok(())
    }
}

impl Entity for ReportVersion {
    type Id = VersionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Bounded internal retries when version allocation loses a race.
const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// Creates and retrieves immutable content snapshots for a report.
///
/// Allocation reads the current maximum `version_no`, then asks the store to
/// append `max + 1` atomically; if another creator got there first the store
/// reports `Conflict` and the manager retries with a freshly computed max,
/// up to `MAX_ALLOCATION_ATTEMPTS`, before surfacing the conflict.
pub struct VersionManager {
    store: Arc<dyn VersionStore>,
    recorder: Arc<dyn AuditRecorder>,
}

impl VersionManager {
    pub fn new(store: Arc<dyn VersionStore>, recorder: Arc<dyn AuditRecorder>) -> Self {
        Self { store, recorder }
    }

    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// Append a new version with `version_no = current_max + 1` and make it
    /// current, unsetting the previous current version in the same atomic
    /// unit. Permitted in any report status.
    pub fn create_version(
        &self,
        tenant_id: TenantId,
        report_id: ReportId,
        author: &Actor,
        content: ContentRefs,
        changelog: Option<String>,
    ) -> DomainResult<ReportVersion> {
        author.require(Capability::Edit)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let max = self.store.max_version_no(report_id)?;
            let version = ReportVersion::new(
                report_id,
                max + 1,
                author.user_id(),
                Utc::now(),
                content,
                changelog.clone(),
            );

            match self.store.append(report_id, max, version.clone()) {
                Ok(()) => {
                    self.record_created(tenant_id, &version, author);
                    return Ok(version);
                }
                Err(DomainError::Conflict(reason)) if attempt < MAX_ALLOCATION_ATTEMPTS => {
                    tracing::debug!(
                        %report_id,
                        attempt,
                        %reason,
                        "version allocation lost a race; retrying with fresh max"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// The unique current version of the report.
    pub fn get_current(&self, report_id: ReportId) -> DomainResult<ReportVersion> {
        self.store
            .current(report_id)?
            .ok_or_else(|| DomainError::not_found("report version"))
    }

    pub fn get_version(&self, report_id: ReportId, version_no: u32) -> DomainResult<ReportVersion> {
        self.store
            .get(report_id, version_no)?
            .ok_or_else(|| DomainError::not_found("report version"))
    }

    /// Set one artifact pointer on an existing version.
    ///
    /// The manager itself allows this in any report status; the workflow
    /// layer enforces post-publish immutability by routing all edits of a
    /// published report through [`Self::create_version`] instead.
    pub fn attach_artifact(
        &self,
        report_id: ReportId,
        version_no: u32,
        kind: ArtifactKind,
        artifact: ArtifactRef,
    ) -> DomainResult<ReportVersion> {
        self.store.attach_artifact(report_id, version_no, kind, artifact)
    }

    fn record_created(&self, tenant_id: TenantId, version: &ReportVersion, author: &Actor) {
        record_or_warn(
            self.recorder.as_ref(),
            AuditEntry {
                entry_id: Uuid::now_v7(),
                tenant_id,
                event_type: "reports.version.created".to_string(),
                entity_id: version.report_id().0,
                actor: author.user_id(),
                metadata: serde_json::json!({
                    "version_no": version.version_no(),
                    "version_id": version.id_typed(),
                    "changelog": version.changelog(),
                }),
                recorded_at: Utc::now(),
            },
        );
    }
}
