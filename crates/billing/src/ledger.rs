use serde::{Deserialize, Serialize};

use labflow_core::{AggregateId, DomainError, DomainResult, OrderId};

/// Invoice identifier (owned by the billing module, referenced here).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub AggregateId);

impl InvoiceId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Read-model slice of one invoice: its total and the payments against it.
///
/// All monetary amounts are integers in the smallest currency unit (e.g.
/// cents). Floating point never appears on any billing path; a lock decision
/// from a rounded float would be wrong in exactly the cases that matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceBalance {
    pub invoice_id: InvoiceId,
    /// Invoiced total in smallest currency unit.
    pub amount_total: u64,
    /// ISO-4217 currency code (e.g. "MXN").
    pub currency: String,
    /// Payment amounts recorded against this invoice, smallest currency unit.
    pub payments: Vec<u64>,
}

impl InvoiceBalance {
    /// Sum of payments against this invoice.
    pub fn total_paid(&self) -> DomainResult<u64> {
        self.payments.iter().try_fold(0u64, |acc, &p| {
            acc.checked_add(p)
                .ok_or_else(|| DomainError::invariant("payment total overflow"))
        })
    }
}

/// Read access to the invoices of an order.
///
/// The ledger is the source of truth; the lock coordinator always re-scans
/// it in full rather than maintaining counters.
pub trait InvoiceLedger: Send + Sync {
    fn invoices_for_order(&self, order_id: OrderId) -> DomainResult<Vec<InvoiceBalance>>;
}
