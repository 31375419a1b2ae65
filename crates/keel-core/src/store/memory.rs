use crate::{
    entity::{EntityReference, EntityState, Version},
    store::{ChangeSet, CommitReceipt, EntityStore, StoreError},
};
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

///
/// MemoryEntityStore
///
/// Versioned in-process store. Records are kept in `Loaded` form keyed by
/// reference; every successful write bumps the record's version.
///

#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    records: RwLock<BTreeMap<EntityReference, EntityState>>,
}

impl MemoryEntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<EntityReference, EntityState>>, StoreError> {
        self.records
            .read()
            .map_err(|_| StoreError::backend("memory store lock poisoned"))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, BTreeMap<EntityReference, EntityState>>, StoreError> {
        self.records
            .write()
            .map_err(|_| StoreError::backend("memory store lock poisoned"))
    }

    /// Committed states of one entity type, in reference order.
    pub fn entities_of_type(&self, entity_type: &str) -> Result<Vec<EntityState>, StoreError> {
        Ok(self
            .read()?
            .values()
            .filter(|state| state.reference().entity_type() == entity_type)
            .cloned()
            .collect())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.is_empty())
    }
}

impl EntityStore for MemoryEntityStore {
    fn load(&self, reference: &EntityReference) -> Result<Option<EntityState>, StoreError> {
        Ok(self.read()?.get(reference).cloned())
    }

    fn exists(&self, reference: &EntityReference) -> Result<bool, StoreError> {
        Ok(self.read()?.contains_key(reference))
    }

    fn verify_version(
        &self,
        reference: &EntityReference,
        expected: Version,
    ) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .get(reference)
            .is_some_and(|state| state.version() == Some(expected)))
    }

    fn apply_changes(&self, changes: ChangeSet) -> Result<CommitReceipt, StoreError> {
        let mut records = self.write()?;

        // Validate everything before touching anything.
        if let Some(state) = changes
            .created
            .iter()
            .find(|state| records.contains_key(state.reference()))
        {
            return Err(StoreError::AlreadyExists {
                reference: state.reference().clone(),
            });
        }

        let is_current = |reference: &EntityReference, expected: Option<Version>| {
            records
                .get(reference)
                .is_some_and(|state| state.version() == expected)
        };
        let conflicts: BTreeSet<EntityReference> = changes
            .updated
            .iter()
            .map(|state| (state.reference(), state.version()))
            .chain(
                changes
                    .removed
                    .iter()
                    .map(|(reference, version)| (reference, Some(*version))),
            )
            .filter(|(reference, expected)| !is_current(*reference, *expected))
            .map(|(reference, _)| reference.clone())
            .collect();
        if !conflicts.is_empty() {
            return Err(StoreError::Conflict {
                references: conflicts,
            });
        }

        let mut receipt = CommitReceipt::default();
        for state in changes.created {
            let version = Version::new(1);
            receipt.versions.insert(state.reference().clone(), version);
            records.insert(state.reference().clone(), stored(&state, version, changes.time));
        }
        for state in changes.updated {
            let version = state.version().map_or(Version::new(1), Version::next);
            receipt.versions.insert(state.reference().clone(), version);
            records.insert(state.reference().clone(), stored(&state, version, changes.time));
        }
        for (reference, _) in &changes.removed {
            records.remove(reference);
        }

        Ok(receipt)
    }
}

// Stores keep records in loaded form at their committed version.
fn stored(state: &EntityState, version: Version, time: DateTime<Utc>) -> EntityState {
    let mut record = state.to_loaded();
    record.mark_committed(version, time);
    record
}
