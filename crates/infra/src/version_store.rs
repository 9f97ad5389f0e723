use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use labflow_core::{DomainError, DomainResult, UserId};
use labflow_reports::{ReportId, ReportVersion, VersionStore};
use labflow_storage::{ArtifactKind, ArtifactRef};

/// In-memory version chains, one `Vec` per report under a single lock.
///
/// Each trait method is one write-lock scope, which is what makes `append`
/// an atomic allocate-and-flip: the expected-max check, the uniqueness of
/// `(report_id, version_no)` and the unsetting of the previous current
/// version all happen before any other caller can observe the chain.
#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    chains: RwLock<HashMap<ReportId, Vec<ReportVersion>>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> DomainError {
        DomainError::conflict("version store lock poisoned")
    }

    fn chain_max(chain: &[ReportVersion]) -> u32 {
        chain.last().map(|v| v.version_no()).unwrap_or(0)
    }
}

impl VersionStore for InMemoryVersionStore {
    fn max_version_no(&self, report_id: ReportId) -> DomainResult<u32> {
        let chains = self.chains.read().map_err(|_| Self::poisoned())?;
        Ok(chains
            .get(&report_id)
            .map(|c| Self::chain_max(c))
            .unwrap_or(0))
    }

    fn append(
        &self,
        report_id: ReportId,
        expected_max: u32,
        version: ReportVersion,
    ) -> DomainResult<()> {
        if version.report_id() != report_id {
            return Err(DomainError::invariant("version belongs to another report"));
        }

        let mut chains = self.chains.write().map_err(|_| Self::poisoned())?;
        let chain = chains.entry(report_id).or_default();

        let max = Self::chain_max(chain);
        if max != expected_max {
            return Err(DomainError::conflict(format!(
                "version allocation raced: expected max {expected_max}, found {max}"
            )));
        }
        if version.version_no() != max + 1 {
            return Err(DomainError::invariant(format!(
                "version_no must be {} (gapless), got {}",
                max + 1,
                version.version_no()
            )));
        }
        if !version.is_current() {
            return Err(DomainError::invariant(
                "appended version must be marked current",
            ));
        }

        // Flip the previous current off in the same atomic unit.
        for existing in chain.iter_mut() {
            existing.mark_not_current();
        }
        chain.push(version);
        Ok(())
    }

    fn current(&self, report_id: ReportId) -> DomainResult<Option<ReportVersion>> {
        let chains = self.chains.read().map_err(|_| Self::poisoned())?;
        Ok(chains
            .get(&report_id)
            .and_then(|c| c.iter().find(|v| v.is_current()).cloned()))
    }

    fn get(&self, report_id: ReportId, version_no: u32) -> DomainResult<Option<ReportVersion>> {
        let chains = self.chains.read().map_err(|_| Self::poisoned())?;
        Ok(chains
            .get(&report_id)
            .and_then(|c| c.iter().find(|v| v.version_no() == version_no).cloned()))
    }

    fn list(&self, report_id: ReportId) -> DomainResult<Vec<ReportVersion>> {
        let chains = self.chains.read().map_err(|_| Self::poisoned())?;
        Ok(chains.get(&report_id).cloned().unwrap_or_default())
    }

    fn attach_artifact(
        &self,
        report_id: ReportId,
        version_no: u32,
        kind: ArtifactKind,
        artifact: ArtifactRef,
    ) -> DomainResult<ReportVersion> {
        let mut chains = self.chains.write().map_err(|_| Self::poisoned())?;
        let version = chains
            .get_mut(&report_id)
            .and_then(|c| c.iter_mut().find(|v| v.version_no() == version_no))
            .ok_or_else(|| DomainError::not_found("report version"))?;
        version.set_artifact(kind, artifact)?;
        Ok(version.clone())
    }

    fn stamp_signature(
        &self,
        report_id: ReportId,
        version_no: u32,
        signed_by: UserId,
        signed_at: DateTime<Utc>,
    ) -> DomainResult<ReportVersion> {
        let mut chains = self.chains.write().map_err(|_| Self::poisoned())?;
        let version = chains
            .get_mut(&report_id)
            .and_then(|c| c.iter_mut().find(|v| v.version_no() == version_no))
            .ok_or_else(|| DomainError::not_found("report version"))?;
        version.stamp_signature(signed_by, signed_at)?;
        Ok(version.clone())
    }
}
