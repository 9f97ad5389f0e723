//! Billing read model and the derived order lock.
//!
//! Invoices and payments are owned by the surrounding billing module; this
//! crate treats them as read-only inputs and derives a single boolean per
//! order — `billed_lock` — gating report PDF access while any balance
//! remains unpaid.

pub mod ledger;
pub mod lock;

pub use ledger::{InvoiceBalance, InvoiceId, InvoiceLedger};
pub use lock::{LockCoordinator, OrderLockStore, derive_lock};
