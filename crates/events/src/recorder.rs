//! Write-only audit trail for workflow transitions and version creations.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use labflow_core::{AggregateId, TenantId, UserId};

/// A single recorded audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub entry_id: Uuid,
    pub tenant_id: TenantId,
    pub event_type: String,
    pub entity_id: AggregateId,
    pub actor: UserId,
    pub metadata: JsonValue,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit recorder unavailable: {0}")]
    Unavailable(String),
}

/// Append-only recorder of workflow events.
///
/// Consumed write-only by the workflow and version layers. A failed `record`
/// must never roll back the state change that produced the entry; callers go
/// through [`record_or_warn`] so failures reach operators via logs instead.
pub trait AuditRecorder: Send + Sync {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

/// Record an entry, demoting failure to an operator-visible warning.
pub fn record_or_warn(recorder: &dyn AuditRecorder, entry: AuditEntry) {
    let event_type = entry.event_type.clone();
    let entity_id = entry.entity_id;
    if let Err(err) = recorder.record(entry) {
        tracing::warn!(
            event_type = %event_type,
            entity_id = %entity_id,
            error = %err,
            "failed to record audit entry; primary state change is committed"
        );
    }
}

/// In-memory append-only audit log, keyed by entity.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryAuditRecorder {
    entries: RwLock<HashMap<AggregateId, Vec<AuditEntry>>>,
}

impl InMemoryAuditRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries recorded for an entity, in append order.
    pub fn entries_for(&self, entity_id: AggregateId) -> Vec<AuditEntry> {
        self.entries
            .read()
            .map(|m| m.get(&entity_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn total_entries(&self) -> usize {
        self.entries
            .read()
            .map(|m| m.values().map(Vec::len).sum())
            .unwrap_or(0)
    }
}

impl AuditRecorder for InMemoryAuditRecorder {
    fn record(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AuditError::Unavailable("lock poisoned".to_string()))?;
        entries.entry(entry.entity_id).or_default().push(entry);
        Ok(())
    }
}
