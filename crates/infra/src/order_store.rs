use std::collections::HashMap;
use std::sync::RwLock;

use labflow_billing::OrderLockStore;
use labflow_core::{DomainError, DomainResult, OrderId};

/// In-memory `billed_lock` column of the order aggregate.
///
/// The order registry itself is an external collaborator; this store only
/// holds the one boolean this core derives and reads. An order never seen by
/// the coordinator reads as unlocked, matching a freshly created order with
/// no invoices.
#[derive(Debug, Default)]
pub struct InMemoryOrderLockStore {
    locks: RwLock<HashMap<OrderId, bool>>,
}

impl InMemoryOrderLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::conflict("order lock store lock poisoned")
    }
}

impl OrderLockStore for InMemoryOrderLockStore {
    fn set_billed_lock(&self, order_id: OrderId, locked: bool) -> DomainResult<()> {
        let mut locks = self.locks.write().map_err(|_| Self::poisoned())?;
        locks.insert(order_id, locked);
        Ok(())
    }

    fn billed_lock(&self, order_id: OrderId) -> DomainResult<bool> {
        let locks = self.locks.read().map_err(|_| Self::poisoned())?;
        Ok(locks.get(&order_id).copied().unwrap_or(false))
    }
}
