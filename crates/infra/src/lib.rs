//! In-memory infrastructure for the report lifecycle core.
//!
//! Each store emulates a transactional database with a single lock per
//! collection: every trait method is one lock scope, so the invariants the
//! domain stores demand (unique `(report_id, version_no)`, one current
//! version, per-report optimistic concurrency) hold under concurrent
//! callers. [`ReportService`] wires the stores, the lock coordinator, the
//! audit recorder and the PDF gateway into the inbound operation surface.

pub mod invoice_ledger;
pub mod order_store;
pub mod report_store;
pub mod service;
pub mod version_store;


pub use invoice_ledger::InMemoryInvoiceLedger;
pub use order_store::InMemoryOrderLockStore;
pub use report_store::InMemoryReportStore;
pub use service::ReportService;
pub use version_store::InMemoryVersionStore;
