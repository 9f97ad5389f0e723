use std::collections::HashMap;
use std::sync::RwLock;

use labflow_core::{AggregateRoot, DomainError, DomainResult, ExpectedVersion, OrderId};
use labflow_reports::{Report, ReportId, ReportStore};

#[derive(Debug, Default)]
struct Inner {
    reports: HashMap<ReportId, Report>,
    by_order: HashMap<OrderId, ReportId>,
}

/// In-memory report store with per-report optimistic concurrency.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    inner: RwLock<Inner>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::conflict("report store lock poisoned")
    }
}

impl ReportStore for InMemoryReportStore {
    fn insert(&self, report: Report) -> DomainResult<()> {
        let report_id = report.id_typed();
        let order_id = report
            .order_id()
            .ok_or_else(|| DomainError::invariant("report has no order"))?;

        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        if inner.reports.contains_key(&report_id) {
            return Err(DomainError::conflict("report already exists"));
        }
        // One report per order, as in the order registry.
        if inner.by_order.contains_key(&order_id) {
            return Err(DomainError::conflict(
                "a report already exists for this order",
            ));
        }
        inner.by_order.insert(order_id, report_id);
        inner.reports.insert(report_id, report);
        Ok(())
    }

    fn get(&self, report_id: ReportId) -> DomainResult<Option<Report>> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner.reports.get(&report_id).cloned())
    }

    fn update(&self, report: Report, expected: ExpectedVersion) -> DomainResult<()> {
        let report_id = report.id_typed();
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        let stored = inner
            .reports
            .get_mut(&report_id)
            .ok_or_else(|| DomainError::not_found("report"))?;
        expected.check(stored.version())?;
        *stored = report;
        Ok(())
    }
}
