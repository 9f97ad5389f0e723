//! The billing lock coordinator.
//!
//! `billed_lock` is a materialized view over the order's invoices, never a
//! counter: every invoice or payment change triggers a full recompute from
//! the ledger, inside the same transactional scope as the triggering write.
//! Recomputes are idempotent, so interleaved recomputes converge on the true
//! aggregate.

use std::sync::Arc;

use labflow_core::{DomainError, DomainResult, OrderId};

use crate::ledger::{InvoiceBalance, InvoiceLedger};

/// Write/read access to the `billed_lock` column on the order aggregate.
///
/// The coordinator is the only writer; the PDF-serving path and the portal
/// are readers.
pub trait OrderLockStore: Send + Sync {
    fn set_billed_lock(&self, order_id: OrderId, locked: bool) -> DomainResult<()>;
    fn billed_lock(&self, order_id: OrderId) -> DomainResult<bool>;
}

/// Derive the lock from an order's invoices: locked iff any balance remains.
///
/// A balance of exactly zero unlocks; any positive remainder, however small,
/// keeps the lock engaged. Overpayment never produces a "negative lock".
/// Sums run in `u128` so no realistic ledger can overflow them.
pub fn derive_lock(invoices: &[InvoiceBalance]) -> DomainResult<bool> {
    let mut total_invoiced: u128 = 0;
    let mut total_paid: u128 = 0;

    let mut currency: Option<&str> = None;
    for invoice in invoices {
        match currency {
            None => currency = Some(&invoice.currency),
            Some(c) if c != invoice.currency => {
                return Err(DomainError::validation(format!(
                    "cannot sum invoices in mixed currencies ({c} vs {})",
                    invoice.currency
                )));
            }
            Some(_) => {}
        }

        total_invoiced += u128::from(invoice.amount_total);
        total_paid += u128::from(invoice.total_paid()?);
    }

    Ok(total_invoiced > total_paid)
}

/// Keeps `order.billed_lock` consistent with the order's aggregate payment
/// position.
pub struct LockCoordinator {
    ledger: Arc<dyn InvoiceLedger>,
    orders: Arc<dyn OrderLockStore>,
}

impl LockCoordinator {
    pub fn new(ledger: Arc<dyn InvoiceLedger>, orders: Arc<dyn OrderLockStore>) -> Self {
        Self { ledger, orders }
    }

    /// Recompute the lock from the ledger and write it onto the order.
    ///
    /// Invoked whenever an invoice is created for the order or a payment is
    /// recorded against any of its invoices. Side-effect-free beyond the
    /// boolean write; returns the freshly derived value.
    pub fn recompute(&self, order_id: OrderId) -> DomainResult<bool> {
        let invoices = self.ledger.invoices_for_order(order_id)?;
        let locked = derive_lock(&invoices)?;
        self.orders.set_billed_lock(order_id, locked)?;
        tracing::debug!(%order_id, locked, invoices = invoices.len(), "recomputed billed_lock");
        Ok(locked)
    }
}
