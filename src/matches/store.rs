//! Keyed lookup of match records, enforcing one active match per scope
//!
//! The store is the only shared mutable resource in the system. All mutation
//! goes through its keyed accessors under a single lock, and removal is a
//! `take` so that racing termination paths (manual stop vs expiry sweep) act
//! at most once per record.

use crate::error::{MarshalError, Result};
use crate::matches::record::MatchRecord;
use crate::types::{ArtifactRef, ScopeId};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
struct StoreInner {
    records: HashMap<ScopeId, MatchRecord>,
    by_artifact: HashMap<ArtifactRef, ScopeId>,
}

/// In-memory match store; lifetime equals process lifetime
#[derive(Debug, Default)]
pub struct MatchStore {
    inner: RwLock<StoreInner>,
}

impl MatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, StoreInner>> {
        self.inner.read().map_err(|_| {
            MarshalError::Internal {
                message: "Failed to acquire store lock".to_string(),
            }
            .into()
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, StoreInner>> {
        self.inner.write().map_err(|_| {
            MarshalError::Internal {
                message: "Failed to acquire store lock".to_string(),
            }
            .into()
        })
    }

    /// Insert a new record, rejecting a second active match for the scope
    pub fn create(&self, record: MatchRecord) -> Result<()> {
        let mut inner = self.write()?;

        if inner.records.contains_key(&record.scope_id) {
            return Err(MarshalError::AlreadyActive.into());
        }

        inner.by_artifact.insert(record.artifact_ref, record.scope_id);
        inner.records.insert(record.scope_id, record);
        Ok(())
    }

    /// Get a snapshot of the record for a scope
    pub fn get(&self, scope: ScopeId) -> Result<Option<MatchRecord>> {
        Ok(self.read()?.records.get(&scope).cloned())
    }

    /// Resolve the scope watching a given announcement artifact
    pub fn scope_for_artifact(&self, artifact: ArtifactRef) -> Result<Option<ScopeId>> {
        Ok(self.read()?.by_artifact.get(&artifact).copied())
    }

    /// Resolve a stop/status target: an explicit artifact reference when
    /// given, otherwise the scope itself
    pub fn resolve(&self, scope: ScopeId, target: Option<ArtifactRef>) -> Result<Option<ScopeId>> {
        match target {
            Some(artifact) => self.scope_for_artifact(artifact),
            None => {
                let inner = self.read()?;
                Ok(inner.records.contains_key(&scope).then_some(scope))
            }
        }
    }

    /// Apply a mutation to the record for a scope under the write lock.
    /// Returns `None` when the scope has no active match.
    pub fn with_record<R>(
        &self,
        scope: ScopeId,
        f: impl FnOnce(&mut MatchRecord) -> R,
    ) -> Result<Option<R>> {
        let mut inner = self.write()?;
        Ok(inner.records.get_mut(&scope).map(f))
    }

    /// Remove and return the record for a scope. Exactly one caller can win
    /// this for a given record; later callers observe `None`.
    pub fn take(&self, scope: ScopeId) -> Result<Option<MatchRecord>> {
        let mut inner = self.write()?;
        let record = inner.records.remove(&scope);
        if let Some(record) = &record {
            inner.by_artifact.remove(&record.artifact_ref);
        }
        Ok(record)
    }

    /// Stable snapshot of all records for the expiry sweep
    pub fn snapshot(&self) -> Result<Vec<MatchRecord>> {
        Ok(self.read()?.records.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.records.is_empty())
    }
}
