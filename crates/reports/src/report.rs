use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use labflow_auth::{Actor, Capability};
use labflow_core::{
    Aggregate, AggregateId, AggregateRoot, BranchId, DomainError, OrderId, TenantId, UserId,
};
use labflow_events::Event;

/// Report identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub AggregateId);

impl ReportId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ReportId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Report workflow status.
///
/// RETRACTED is terminal: no event leaves it. Versions are orthogonal to
/// status; creating one never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Draft,
    InReview,
    Approved,
    Published,
    Retracted,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "DRAFT",
            ReportStatus::InReview => "IN_REVIEW",
            ReportStatus::Approved => "APPROVED",
            ReportStatus::Published => "PUBLISHED",
            ReportStatus::Retracted => "RETRACTED",
        }
    }
}

impl core::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate root: Report, the diagnostic deliverable of one lab order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    id: ReportId,
    tenant_id: Option<TenantId>,
    branch_id: Option<BranchId>,
    order_id: Option<OrderId>,
    status: ReportStatus,
    title: Option<String>,
    diagnosis_text: Option<String>,
    published_at: Option<DateTime<Utc>>,
    created_by: Option<UserId>,
    version: u64,
    created: bool,
}

impl Report {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ReportId) -> Self {
        Self {
            id,
            tenant_id: None,
            branch_id: None,
            order_id: None,
            status: ReportStatus::Draft,
            title: None,
            diagnosis_text: None,
            published_at: None,
            created_by: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> ReportId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn branch_id(&self) -> Option<BranchId> {
        self.branch_id
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn status(&self) -> ReportStatus {
        self.status
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn diagnosis_text(&self) -> Option<&str> {
        self.diagnosis_text.as_deref()
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    /// Once published, artifact pointers of existing versions are frozen;
    /// content changes go through a new version.
    pub fn artifacts_frozen(&self) -> bool {
        matches!(
            self.status,
            ReportStatus::Published | ReportStatus::Retracted
        )
    }
}

impl AggregateRoot for Report {
    type Id = ReportId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateReport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReport {
    pub tenant_id: TenantId,
    pub branch_id: BranchId,
    pub report_id: ReportId,
    pub order_id: OrderId,
    pub title: Option<String>,
    pub diagnosis_text: Option<String>,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SubmitReport (DRAFT → IN_REVIEW).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReport {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub actor: Actor,
    pub changelog: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveReport (IN_REVIEW → APPROVED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveReport {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RequestChanges (IN_REVIEW → DRAFT, comment required).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestChanges {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub actor: Actor,
    pub comment: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SignReport (APPROVED → PUBLISHED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignReport {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub actor: Actor,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RetractReport (PUBLISHED → RETRACTED).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetractReport {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub actor: Actor,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportCommand {
    CreateReport(CreateReport),
    SubmitReport(SubmitReport),
    ApproveReport(ApproveReport),
    RequestChanges(RequestChanges),
    SignReport(SignReport),
    RetractReport(RetractReport),
}

impl ReportCommand {
    /// Workflow event name, as rendered in transition errors.
    pub fn event_name(&self) -> &'static str {
        match self {
            ReportCommand::CreateReport(_) => "create",
            ReportCommand::SubmitReport(_) => "submit",
            ReportCommand::ApproveReport(_) => "approve",
            ReportCommand::RequestChanges(_) => "request_changes",
            ReportCommand::SignReport(_) => "sign",
            ReportCommand::RetractReport(_) => "retract",
        }
    }
}

/// Event: ReportCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCreated {
    pub tenant_id: TenantId,
    pub branch_id: BranchId,
    pub report_id: ReportId,
    pub order_id: OrderId,
    pub title: Option<String>,
    pub diagnosis_text: Option<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReportSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSubmitted {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub submitted_by: UserId,
    pub changelog: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReportApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportApproved {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub approved_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ChangesRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesRequested {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub requested_by: UserId,
    pub comment: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReportSigned. Carries the signature the version chain stamps onto
/// the version that is current at sign time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSigned {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub signed_by: UserId,
    pub signed_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: ReportRetracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRetracted {
    pub tenant_id: TenantId,
    pub report_id: ReportId,
    pub retracted_by: UserId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportEvent {
    ReportCreated(ReportCreated),
    ReportSubmitted(ReportSubmitted),
    ReportApproved(ReportApproved),
    ChangesRequested(ChangesRequested),
    ReportSigned(ReportSigned),
    ReportRetracted(ReportRetracted),
}

impl Event for ReportEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ReportEvent::ReportCreated(_) => "reports.report.created",
            ReportEvent::ReportSubmitted(_) => "reports.report.submitted",
            ReportEvent::ReportApproved(_) => "reports.report.approved",
            ReportEvent::ChangesRequested(_) => "reports.report.changes_requested",
            ReportEvent::ReportSigned(_) => "reports.report.signed",
            ReportEvent::ReportRetracted(_) => "reports.report.retracted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ReportEvent::ReportCreated(e) => e.occurred_at,
            ReportEvent::ReportSubmitted(e) => e.occurred_at,
            ReportEvent::ReportApproved(e) => e.occurred_at,
            ReportEvent::ChangesRequested(e) => e.occurred_at,
            ReportEvent::ReportSigned(e) => e.occurred_at,
            ReportEvent::ReportRetracted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Report {
    type Command = ReportCommand;
    type Event = ReportEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ReportEvent::ReportCreated(e) => {
                self.id = e.report_id;
                self.tenant_id = Some(e.tenant_id);
                self.branch_id = Some(e.branch_id);
                self.order_id = Some(e.order_id);
                self.title = e.title.clone();
                self.diagnosis_text = e.diagnosis_text.clone();
                self.created_by = Some(e.created_by);
                self.status = ReportStatus::Draft;
                self.created = true;
            }
            ReportEvent::ReportSubmitted(_) => {
                self.status = ReportStatus::InReview;
            }
            ReportEvent::ReportApproved(_) => {
                self.status = ReportStatus::Approved;
            }
            ReportEvent::ChangesRequested(_) => {
                self.status = ReportStatus::Draft;
            }
            ReportEvent::ReportSigned(e) => {
                self.status = ReportStatus::Published;
                // Set exactly once, never cleared.
                if self.published_at.is_none() {
                    self.published_at = Some(e.signed_at);
                }
            }
            ReportEvent::ReportRetracted(_) => {
                self.status = ReportStatus::Retracted;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ReportCommand::CreateReport(cmd) => self.handle_create(cmd),
            ReportCommand::SubmitReport(cmd) => self.handle_submit(cmd),
            ReportCommand::ApproveReport(cmd) => self.handle_approve(cmd),
            ReportCommand::RequestChanges(cmd) => self.handle_request_changes(cmd),
            ReportCommand::SignReport(cmd) => self.handle_sign(cmd),
            ReportCommand::RetractReport(cmd) => self.handle_retract(cmd),
        }
    }
}

impl Report {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_report_id(&self, report_id: ReportId) -> Result<(), DomainError> {
        if self.id != report_id {
            return Err(DomainError::invariant("report_id mismatch"));
        }
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), DomainError> {
        if self.created {
            Ok(())
        } else {
            Err(DomainError::not_found("report"))
        }
    }

    /// State guard: wrong state fails before the role check, so the caller
    /// sees `InvalidTransition` whenever the event is illegal where the
    /// report currently stands.
    fn ensure_status(&self, expected: ReportStatus, event: &'static str) -> Result<(), DomainError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(self.status.as_str(), event))
        }
    }

    fn handle_create(&self, cmd: &CreateReport) -> Result<Vec<ReportEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("report already exists"));
        }
        cmd.actor.require(Capability::Edit)?;

        Ok(vec![ReportEvent::ReportCreated(ReportCreated {
            tenant_id: cmd.tenant_id,
            branch_id: cmd.branch_id,
            report_id: cmd.report_id,
            order_id: cmd.order_id,
            title: cmd.title.clone(),
            diagnosis_text: cmd.diagnosis_text.clone(),
            created_by: cmd.actor.user_id(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_submit(&self, cmd: &SubmitReport) -> Result<Vec<ReportEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_report_id(cmd.report_id)?;
        self.ensure_status(ReportStatus::Draft, "submit")?;

        // The creator may submit their own report even without edit rights.
        if self.created_by != Some(cmd.actor.user_id()) {
            cmd.actor.require(Capability::Edit)?;
        }

        Ok(vec![ReportEvent::ReportSubmitted(ReportSubmitted {
            tenant_id: cmd.tenant_id,
            report_id: cmd.report_id,
            submitted_by: cmd.actor.user_id(),
            changelog: cmd.changelog.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveReport) -> Result<Vec<ReportEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_report_id(cmd.report_id)?;
        self.ensure_status(ReportStatus::InReview, "approve")?;
        cmd.actor.require(Capability::Review)?;

        Ok(vec![ReportEvent::ReportApproved(ReportApproved {
            tenant_id: cmd.tenant_id,
            report_id: cmd.report_id,
            approved_by: cmd.actor.user_id(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_request_changes(&self, cmd: &RequestChanges) -> Result<Vec<ReportEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_report_id(cmd.report_id)?;
        self.ensure_status(ReportStatus::InReview, "request_changes")?;
        cmd.actor.require(Capability::Review)?;

        if cmd.comment.trim().is_empty() {
            return Err(DomainError::validation(
                "request_changes requires a comment",
            ));
        }

        Ok(vec![ReportEvent::ChangesRequested(ChangesRequested {
            tenant_id: cmd.tenant_id,
            report_id: cmd.report_id,
            requested_by: cmd.actor.user_id(),
            comment: cmd.comment.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_sign(&self, cmd: &SignReport) -> Result<Vec<ReportEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_report_id(cmd.report_id)?;
        self.ensure_status(ReportStatus::Approved, "sign")?;
        cmd.actor.require(Capability::Review)?;

        Ok(vec![ReportEvent::ReportSigned(ReportSigned {
            tenant_id: cmd.tenant_id,
            report_id: cmd.report_id,
            signed_by: cmd.actor.user_id(),
            signed_at: cmd.occurred_at,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_retract(&self, cmd: &RetractReport) -> Result<Vec<ReportEvent>, DomainError> {
        self.ensure_exists()?;
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_report_id(cmd.report_id)?;
        self.ensure_status(ReportStatus::Published, "retract")?;
        cmd.actor.require(Capability::Review)?;

        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("retract requires a reason"));
        }

        Ok(vec![ReportEvent::ReportRetracted(ReportRetracted {
            tenant_id: cmd.tenant_id,
            report_id: cmd.report_id,
            retracted_by: cmd.actor.user_id(),
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_report_id() -> ReportId {
        ReportId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn author() -> Actor {
        Actor::new(UserId::new(), [Capability::Edit])
    }

    fn reviewer() -> Actor {
        Actor::new(UserId::new(), [Capability::Review])
    }

    fn created_report(tenant_id: TenantId, report_id: ReportId, actor: &Actor) -> Report {
        let mut report = Report::empty(report_id);
        let events = report
            .handle(&ReportCommand::CreateReport(CreateReport {
                tenant_id,
                branch_id: BranchId::new(),
                report_id,
                order_id: OrderId::new(),
                title: Some("Biopsy".to_string()),
                diagnosis_text: None,
                actor: actor.clone(),
                occurred_at: test_time(),
            }))
            .unwrap();
        report.apply(&events[0]);
        report
    }

    fn drive(report: &mut Report, command: ReportCommand) -> Result<(), DomainError> {
        let events = report.handle(&command)?;
        for event in &events {
            report.apply(event);
        }
        Ok(())
    }

    fn submit(tenant_id: TenantId, report_id: ReportId, actor: &Actor) -> ReportCommand {
        ReportCommand::SubmitReport(SubmitReport {
            tenant_id,
            report_id,
            actor: actor.clone(),
            changelog: None,
            occurred_at: test_time(),
        })
    }

    fn approve(tenant_id: TenantId, report_id: ReportId, actor: &Actor) -> ReportCommand {
        ReportCommand::ApproveReport(ApproveReport {
            tenant_id,
            report_id,
            actor: actor.clone(),
            occurred_at: test_time(),
        })
    }

    fn request_changes(tenant_id: TenantId, report_id: ReportId, actor: &Actor) -> ReportCommand {
        ReportCommand::RequestChanges(RequestChanges {
            tenant_id,
            report_id,
            actor: actor.clone(),
            comment: "please re-check slide 3".to_string(),
            occurred_at: test_time(),
        })
    }

    fn sign(tenant_id: TenantId, report_id: ReportId, actor: &Actor) -> ReportCommand {
        ReportCommand::SignReport(SignReport {
            tenant_id,
            report_id,
            actor: actor.clone(),
            occurred_at: test_time(),
        })
    }

    fn retract(tenant_id: TenantId, report_id: ReportId, actor: &Actor) -> ReportCommand {
        ReportCommand::RetractReport(RetractReport {
            tenant_id,
            report_id,
            actor: actor.clone(),
            reason: "specimen mix-up".to_string(),
            occurred_at: test_time(),
        })
    }

    #[test]
    fn create_starts_in_draft() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let report = created_report(tenant_id, report_id, &actor);

        assert_eq!(report.status(), ReportStatus::Draft);
        assert_eq!(report.created_by(), Some(actor.user_id()));
        assert!(report.published_at().is_none());
    }

    #[test]
    fn full_happy_path_reaches_published() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let rev = reviewer();
        let mut report = created_report(tenant_id, report_id, &actor);

        drive(&mut report, submit(tenant_id, report_id, &actor)).unwrap();
        assert_eq!(report.status(), ReportStatus::InReview);

        drive(&mut report, approve(tenant_id, report_id, &rev)).unwrap();
        assert_eq!(report.status(), ReportStatus::Approved);

        drive(&mut report, sign(tenant_id, report_id, &rev)).unwrap();
        assert_eq!(report.status(), ReportStatus::Published);
        assert!(report.published_at().is_some());
    }

    #[test]
    fn request_changes_returns_to_draft() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let rev = reviewer();
        let mut report = created_report(tenant_id, report_id, &actor);

        drive(&mut report, submit(tenant_id, report_id, &actor)).unwrap();
        drive(&mut report, request_changes(tenant_id, report_id, &rev)).unwrap();
        assert_eq!(report.status(), ReportStatus::Draft);

        // The loop may run again.
        drive(&mut report, submit(tenant_id, report_id, &actor)).unwrap();
        assert_eq!(report.status(), ReportStatus::InReview);
    }

    #[test]
    fn request_changes_requires_a_comment() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let rev = reviewer();
        let mut report = created_report(tenant_id, report_id, &actor);
        drive(&mut report, submit(tenant_id, report_id, &actor)).unwrap();

        let err = report
            .handle(&ReportCommand::RequestChanges(RequestChanges {
                tenant_id,
                report_id,
                actor: rev,
                comment: "   ".to_string(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(report.status(), ReportStatus::InReview);
    }

    #[test]
    fn wrong_role_is_forbidden_not_invalid_transition() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let mut report = created_report(tenant_id, report_id, &actor);
        drive(&mut report, submit(tenant_id, report_id, &actor)).unwrap();

        // Right state (IN_REVIEW), wrong role: the author cannot approve.
        let err = report
            .handle(&approve(tenant_id, report_id, &actor))
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::Forbidden {
                capability: "review".to_string()
            }
        );
        assert_eq!(report.status(), ReportStatus::InReview);
    }

    #[test]
    fn creator_without_edit_capability_may_submit_own_report() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let mut report = created_report(tenant_id, report_id, &actor);

        let bare_creator = Actor::new(actor.user_id(), []);
        drive(&mut report, submit(tenant_id, report_id, &bare_creator)).unwrap();
        assert_eq!(report.status(), ReportStatus::InReview);
    }

    #[test]
    fn stranger_without_edit_capability_cannot_submit() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let report = created_report(tenant_id, report_id, &actor);

        let stranger = Actor::new(UserId::new(), []);
        let err = report
            .handle(&submit(tenant_id, report_id, &stranger))
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden { .. }));
    }

    #[test]
    fn retracted_is_terminal() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let rev = reviewer();
        let mut report = created_report(tenant_id, report_id, &actor);

        drive(&mut report, submit(tenant_id, report_id, &actor)).unwrap();
        drive(&mut report, approve(tenant_id, report_id, &rev)).unwrap();
        drive(&mut report, sign(tenant_id, report_id, &rev)).unwrap();
        drive(&mut report, retract(tenant_id, report_id, &rev)).unwrap();
        assert_eq!(report.status(), ReportStatus::Retracted);

        for command in [
            submit(tenant_id, report_id, &actor),
            approve(tenant_id, report_id, &rev),
            request_changes(tenant_id, report_id, &rev),
            sign(tenant_id, report_id, &rev),
            retract(tenant_id, report_id, &rev),
        ] {
            let err = report.handle(&command).unwrap_err();
            assert!(
                matches!(err, DomainError::InvalidTransition { .. }),
                "{command:?} from RETRACTED must be an invalid transition, got {err:?}"
            );
            assert_eq!(report.status(), ReportStatus::Retracted);
        }
    }

    #[test]
    fn transition_matrix_is_complete() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let rev = reviewer();

        // Reach each state, then probe every event not in the table.
        let states: Vec<(ReportStatus, Vec<ReportCommand>)> = vec![
            (ReportStatus::Draft, vec![]),
            (ReportStatus::InReview, vec![submit(tenant_id, report_id, &actor)]),
            (
                ReportStatus::Approved,
                vec![
                    submit(tenant_id, report_id, &actor),
                    approve(tenant_id, report_id, &rev),
                ],
            ),
            (
                ReportStatus::Published,
                vec![
                    submit(tenant_id, report_id, &actor),
                    approve(tenant_id, report_id, &rev),
                    sign(tenant_id, report_id, &rev),
                ],
            ),
        ];

        let allowed = |status: ReportStatus, event: &str| -> bool {
            matches!(
                (status, event),
                (ReportStatus::Draft, "submit")
                    | (ReportStatus::InReview, "approve")
                    | (ReportStatus::InReview, "request_changes")
                    | (ReportStatus::Approved, "sign")
                    | (ReportStatus::Published, "retract")
            )
        };

        for (status, path) in states {
            let mut report = created_report(tenant_id, report_id, &actor);
            for command in path {
                drive(&mut report, command).unwrap();
            }
            assert_eq!(report.status(), status);

            for command in [
                submit(tenant_id, report_id, &actor),
                approve(tenant_id, report_id, &rev),
                request_changes(tenant_id, report_id, &rev),
                sign(tenant_id, report_id, &rev),
                retract(tenant_id, report_id, &rev),
            ] {
                let event = command.event_name();
                if allowed(status, event) {
                    continue;
                }
                let err = report.handle(&command).unwrap_err();
                assert_eq!(
                    err,
                    DomainError::InvalidTransition {
                        current: status.as_str().to_string(),
                        event: event.to_string(),
                    },
                    "{event} from {status} must be rejected"
                );
                assert_eq!(report.status(), status, "status must be unchanged");
            }
        }
    }

    #[test]
    fn published_at_is_set_by_signing_and_never_cleared() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let rev = reviewer();
        let mut report = created_report(tenant_id, report_id, &actor);

        drive(&mut report, submit(tenant_id, report_id, &actor)).unwrap();
        drive(&mut report, approve(tenant_id, report_id, &rev)).unwrap();
        drive(&mut report, sign(tenant_id, report_id, &rev)).unwrap();
        let published_at = report.published_at().unwrap();

        drive(&mut report, retract(tenant_id, report_id, &rev)).unwrap();
        assert_eq!(report.published_at(), Some(published_at));
    }

    #[test]
    fn tenant_mismatch_is_rejected() {
        let tenant_id = test_tenant_id();
        let report_id = test_report_id();
        let actor = author();
        let report = created_report(tenant_id, report_id, &actor);

        let err = report
            .handle(&submit(test_tenant_id(), report_id, &actor))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }
}
