use std::collections::HashMap;
use std::sync::RwLock;

use labflow_billing::{InvoiceBalance, InvoiceId, InvoiceLedger};
use labflow_core::{AggregateId, DomainError, DomainResult, OrderId};

#[derive(Debug, Default)]
struct Inner {
    by_order: HashMap<OrderId, Vec<InvoiceBalance>>,
    invoice_index: HashMap<InvoiceId, OrderId>,
}

/// In-memory invoice ledger.
///
/// Stands in for the billing module that owns invoices and payments in
/// production; the core only ever reads it. The mutators exist so tests and
/// dev flows can drive billing state changes that trigger lock recomputes.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceLedger {
    inner: RwLock<Inner>,
}

impl InMemoryInvoiceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::conflict("invoice ledger lock poisoned")
    }

    /// Record a new invoice for an order. Amounts are in the smallest
    /// currency unit.
    pub fn add_invoice(
        &self,
        order_id: OrderId,
        amount_total: u64,
        currency: impl Into<String>,
    ) -> DomainResult<InvoiceId> {
        let invoice_id = InvoiceId::new(AggregateId::new());
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        inner.by_order.entry(order_id).or_default().push(InvoiceBalance {
            invoice_id,
            amount_total,
            currency: currency.into(),
            payments: Vec::new(),
        });
        inner.invoice_index.insert(invoice_id, order_id);
        Ok(invoice_id)
    }

    /// Record a payment against an invoice, returning the owning order so
    /// the caller can trigger the lock recompute.
    pub fn add_payment(&self, invoice_id: InvoiceId, amount_paid: u64) -> DomainResult<OrderId> {
        let mut inner = self.inner.write().map_err(|_| Self::poisoned())?;
        let order_id = *inner
            .invoice_index
            .get(&invoice_id)
            .ok_or_else(|| DomainError::not_found("invoice"))?;
        let invoice = inner
            .by_order
            .get_mut(&order_id)
            .and_then(|invoices| invoices.iter_mut().find(|i| i.invoice_id == invoice_id))
            .ok_or_else(|| DomainError::not_found("invoice"))?;
        invoice.payments.push(amount_paid);
        Ok(order_id)
    }
}

impl InvoiceLedger for InMemoryInvoiceLedger {
    fn invoices_for_order(&self, order_id: OrderId) -> DomainResult<Vec<InvoiceBalance>> {
        let inner = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(inner.by_order.get(&order_id).cloned().unwrap_or_default())
    }
}
