//! Inbound operation surface of the report lifecycle core.
//!
//! The request layer resolves the caller into an [`Actor`] and calls these
//! operations; everything below is synchronous, request-scoped and safe to
//! retry. Transitions are serialized per report through optimistic
//! concurrency: a loser reloads the fresh state and re-validates, so it
//! observes the now-changed status instead of clobbering the winner.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use labflow_auth::{Actor, Capability};
use labflow_billing::{InvoiceLedger, LockCoordinator, OrderLockStore};
use labflow_core::{
    Aggregate, AggregateId, AggregateRoot, BranchId, DomainError, DomainResult, ExpectedVersion,
    OrderId, TenantId, UserId,
};
use labflow_events::{AuditEntry, AuditRecorder, Event, record_or_warn};
use labflow_reports::{
    AccessError, ApproveReport, ContentRefs, CreateReport, PdfGateway, Report, ReportCommand,
    ReportEvent, ReportId, ReportStore, ReportVersion, RequestChanges, RetractReport, SignReport,
    SubmitReport, VersionManager, VersionStore,
};
use labflow_storage::{ArtifactKind, ArtifactRef, RetrievalUrl, StorageGateway};

/// A transition that loses its optimistic write reloads and re-validates
/// once; the second pass either succeeds or reports the real guard failure.
const MAX_TRANSITION_ATTEMPTS: u32 = 2;

/// Facade wiring stores, the version manager, the lock coordinator, the
/// audit recorder and the PDF gateway into the inbound operations.
pub struct ReportService {
    reports: Arc<dyn ReportStore>,
    versions: VersionManager,
    recorder: Arc<dyn AuditRecorder>,
    lock: LockCoordinator,
    pdf: PdfGateway,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportStore>,
        version_store: Arc<dyn VersionStore>,
        orders: Arc<dyn OrderLockStore>,
        ledger: Arc<dyn InvoiceLedger>,
        storage: Arc<dyn StorageGateway>,
        recorder: Arc<dyn AuditRecorder>,
        url_ttl: Duration,
    ) -> Self {
        Self {
            reports,
            versions: VersionManager::new(Arc::clone(&version_store), Arc::clone(&recorder)),
            pdf: PdfGateway::new(version_store, Arc::clone(&orders), storage, url_ttl),
            lock: LockCoordinator::new(ledger, orders),
            recorder,
        }
    }

    // ── Report lifecycle ────────────────────────────────────────────────

    /// Create a report for an order, starting in DRAFT.
    pub fn create_report(
        &self,
        tenant_id: TenantId,
        branch_id: BranchId,
        order_id: OrderId,
        title: Option<String>,
        diagnosis_text: Option<String>,
        actor: &Actor,
    ) -> DomainResult<Report> {
        let report_id = ReportId::new(AggregateId::new());
        let mut report = Report::empty(report_id);
        let events = report.handle(&ReportCommand::CreateReport(CreateReport {
            tenant_id,
            branch_id,
            report_id,
            order_id,
            title,
            diagnosis_text,
            actor: actor.clone(),
            occurred_at: Utc::now(),
        }))?;
        for event in &events {
            report.apply(event);
        }
        self.reports.insert(report.clone())?;
        for event in &events {
            self.record_event(tenant_id, report_id, event);
        }
        tracing::info!(%report_id, %order_id, "report created");
        Ok(report)
    }

    pub fn submit(
        &self,
        report_id: ReportId,
        actor: &Actor,
        changelog: Option<String>,
    ) -> DomainResult<Report> {
        self.transition(report_id, |tenant_id| {
            ReportCommand::SubmitReport(SubmitReport {
                tenant_id,
                report_id,
                actor: actor.clone(),
                changelog: changelog.clone(),
                occurred_at: Utc::now(),
            })
        })
    }

    pub fn approve(&self, report_id: ReportId, actor: &Actor) -> DomainResult<Report> {
        self.transition(report_id, |tenant_id| {
            ReportCommand::ApproveReport(ApproveReport {
                tenant_id,
                report_id,
                actor: actor.clone(),
                occurred_at: Utc::now(),
            })
        })
    }

    pub fn request_changes(
        &self,
        report_id: ReportId,
        actor: &Actor,
        comment: String,
    ) -> DomainResult<Report> {
        self.transition(report_id, |tenant_id| {
            ReportCommand::RequestChanges(RequestChanges {
                tenant_id,
                report_id,
                actor: actor.clone(),
                comment: comment.clone(),
                occurred_at: Utc::now(),
            })
        })
    }

    /// Sign and publish. Stamps the signature onto the version that is
    /// current at sign time and sets the report's `published_at`.
    pub fn sign(&self, report_id: ReportId, actor: &Actor) -> DomainResult<Report> {
        self.load(report_id)?;
        // A signature needs a version to land on; resolving it before the
        // transition pins the stamp to the version current at sign time.
        let signed_version_no = self.versions.get_current(report_id)?.version_no();

        let signed_at = Utc::now();
        let updated = self.transition(report_id, |tenant_id| {
            ReportCommand::SignReport(SignReport {
                tenant_id,
                report_id,
                actor: actor.clone(),
                occurred_at: signed_at,
            })
        })?;

        let stamped = self
            .versions
            .store()
            .stamp_signature(report_id, signed_version_no, actor.user_id(), signed_at)?;
        tracing::info!(
            %report_id,
            version_no = stamped.version_no(),
            "report signed and published"
        );
        Ok(updated)
    }

    pub fn retract(
        &self,
        report_id: ReportId,
        actor: &Actor,
        reason: String,
    ) -> DomainResult<Report> {
        self.transition(report_id, |tenant_id| {
            ReportCommand::RetractReport(RetractReport {
                tenant_id,
                report_id,
                actor: actor.clone(),
                reason: reason.clone(),
                occurred_at: Utc::now(),
            })
        })
    }

    // ── Versions & artifacts ────────────────────────────────────────────

    /// Create a new version. Not a workflow transition: permitted in any
    /// status, never changes `status`.
    pub fn create_version(
        &self,
        report_id: ReportId,
        actor: &Actor,
        content: ContentRefs,
        changelog: Option<String>,
    ) -> DomainResult<ReportVersion> {
        let report = self.load(report_id)?;
        let tenant_id = self.tenant_of(&report)?;
        self.versions
            .create_version(tenant_id, report_id, actor, content, changelog)
    }

    /// Set one artifact pointer on an existing version.
    ///
    /// Once the report is published its versions' pointers are frozen;
    /// content changes must go through [`Self::create_version`]. The status
    /// check here reads a snapshot; the signed version is additionally
    /// frozen inside the version store's own atomic unit, so a publish that
    /// commits concurrently still rejects the write.
    pub fn attach_artifact(
        &self,
        report_id: ReportId,
        version_no: u32,
        kind: ArtifactKind,
        artifact: ArtifactRef,
        actor: &Actor,
    ) -> DomainResult<ReportVersion> {
        actor.require(Capability::Edit)?;
        let report = self.load(report_id)?;
        if report.artifacts_frozen() {
            return Err(DomainError::invariant(
                "report is published; artifact pointers are frozen, create a new version instead",
            ));
        }
        self.versions
            .attach_artifact(report_id, version_no, kind, artifact)
    }

    pub fn current_version(&self, report_id: ReportId) -> DomainResult<ReportVersion> {
        self.versions.get_current(report_id)
    }

    pub fn get_version(&self, report_id: ReportId, version_no: u32) -> DomainResult<ReportVersion> {
        self.versions.get_version(report_id, version_no)
    }

    // ── PDF access ──────────────────────────────────────────────────────

    /// Resolve a retrieval URL for a version's PDF, gated by the order's
    /// billing lock. `version_no: None` targets the current version.
    pub fn get_pdf_url(
        &self,
        actor: &Actor,
        report_id: ReportId,
        version_no: Option<u32>,
    ) -> Result<RetrievalUrl, AccessError> {
        let report = self.load(report_id)?;
        let order_id = report
            .order_id()
            .ok_or_else(|| DomainError::invariant("report has no order"))?;
        self.pdf.get_pdf_url(actor, report_id, order_id, version_no)
    }

    // ── Billing lock ────────────────────────────────────────────────────

    /// Recompute `billed_lock` for an order from its full invoice state.
    pub fn recompute_lock(&self, order_id: OrderId) -> DomainResult<bool> {
        self.lock.recompute(order_id)
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_report(&self, report_id: ReportId) -> DomainResult<Report> {
        self.load(report_id)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn load(&self, report_id: ReportId) -> DomainResult<Report> {
        self.reports
            .get(report_id)?
            .ok_or_else(|| DomainError::not_found("report"))
    }

    fn tenant_of(&self, report: &Report) -> DomainResult<TenantId> {
        report
            .tenant_id()
            .ok_or_else(|| DomainError::invariant("report has no tenant"))
    }

    /// Guarded read-modify-write of the report aggregate.
    fn transition<F>(&self, report_id: ReportId, build: F) -> DomainResult<Report>
    where
        F: Fn(TenantId) -> ReportCommand,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let report = self.load(report_id)?;
            let tenant_id = self.tenant_of(&report)?;
            let command = build(tenant_id);
            let events = report.handle(&command)?;

            let mut updated = report.clone();
            for event in &events {
                updated.apply(event);
            }

            match self
                .reports
                .update(updated.clone(), ExpectedVersion::Exact(report.version()))
            {
                Ok(()) => {
                    for event in &events {
                        self.record_event(tenant_id, report_id, event);
                    }
                    tracing::info!(
                        %report_id,
                        from = %report.status(),
                        to = %updated.status(),
                        event = command.event_name(),
                        "report transition"
                    );
                    return Ok(updated);
                }
                Err(DomainError::Conflict(reason)) if attempt < MAX_TRANSITION_ATTEMPTS => {
                    tracing::debug!(%report_id, %reason, "transition raced; reloading");
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn record_event(&self, tenant_id: TenantId, report_id: ReportId, event: &ReportEvent) {
        let (actor, metadata): (UserId, serde_json::Value) = match event {
            ReportEvent::ReportCreated(e) => (
                e.created_by,
                serde_json::json!({ "order_id": e.order_id }),
            ),
            ReportEvent::ReportSubmitted(e) => (
                e.submitted_by,
                serde_json::json!({ "changelog": e.changelog }),
            ),
            ReportEvent::ReportApproved(e) => (e.approved_by, serde_json::json!({})),
            ReportEvent::ChangesRequested(e) => (
                e.requested_by,
                serde_json::json!({ "comment": e.comment }),
            ),
            ReportEvent::ReportSigned(e) => (
                e.signed_by,
                serde_json::json!({ "signed_at": e.signed_at }),
            ),
            ReportEvent::ReportRetracted(e) => (
                e.retracted_by,
                serde_json::json!({ "reason": e.reason }),
            ),
        };

        record_or_warn(
            self.recorder.as_ref(),
            AuditEntry {
                entry_id: Uuid::now_v7(),
                tenant_id,
                event_type: event.event_type().to_string(),
                entity_id: report_id.0,
                actor,
                metadata,
                recorded_at: Utc::now(),
            },
        );
    }
}
