//! Billing-gated PDF retrieval.
//!
//! The lock check runs before the version lookup, so a locked order surfaces
//! as `PaymentRequired` regardless of whether a PDF exists, and no URL
//! material is touched while payment is pending.

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use labflow_auth::{Actor, Capability};
use labflow_billing::OrderLockStore;
use labflow_core::{DomainError, OrderId};
use labflow_storage::{RetrievalUrl, StorageError, StorageGateway};

use crate::report::ReportId;
use crate::store::VersionStore;

/// Failure modes of PDF access.
///
/// Domain outcomes (locked, missing version, missing pointer) stay typed as
/// `DomainError`; an unreachable blob store is an infrastructure failure and
/// is never reported as "not found".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Mediates retrieval of a report version's PDF artifact.
pub struct PdfGateway {
    versions: Arc<dyn VersionStore>,
    orders: Arc<dyn OrderLockStore>,
    storage: Arc<dyn StorageGateway>,
    url_ttl: Duration,
}

impl PdfGateway {
    pub fn new(
        versions: Arc<dyn VersionStore>,
        orders: Arc<dyn OrderLockStore>,
        storage: Arc<dyn StorageGateway>,
        url_ttl: Duration,
    ) -> Self {
        Self {
            versions,
            orders,
            storage,
            url_ttl,
        }
    }

    /// Resolve a time-limited retrieval URL for a report version's PDF.
    ///
    /// - `version_no: None` targets the current version (highest number).
    /// - `PaymentRequired` if the owning order's `billed_lock` is engaged,
    ///   unless the actor carries the billing-admin override.
    /// - `NotFound` if the report has no versions or the resolved version
    ///   carries no PDF pointer.
    pub fn get_pdf_url(
        &self,
        actor: &Actor,
        report_id: ReportId,
        order_id: OrderId,
        version_no: Option<u32>,
    ) -> Result<RetrievalUrl, AccessError> {
        if !actor.can(Capability::AdminBilling) && self.orders.billed_lock(order_id)? {
            tracing::debug!(%report_id, %order_id, "pdf access blocked by billing lock");
            return Err(DomainError::payment_required(order_id).into());
        }

        let version = match version_no {
            Some(no) => self.versions.get(report_id, no)?,
            None => self.versions.current(report_id)?,
        }
        .ok_or_else(|| DomainError::not_found("report version"))?;

        let pdf_ref = version
            .pdf_ref()
            .ok_or_else(|| DomainError::not_found("pdf artifact"))?;

        Ok(self.storage.get_url(pdf_ref, self.url_ttl)?)
    }
}
