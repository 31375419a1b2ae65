//! Persistence boundary.
//!
//! A unit of work reads entity states from, verifies versions against,
//! and commits change sets to an `EntityStore`. Stores never see the
//! unit of work itself, only detached state copies.

mod memory;


use crate::{
    entity::{EntityReference, EntityState, Version},
    error::ErrorClass,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

// re-exports
pub use memory::MemoryEntityStore;

///
/// StoreError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StoreError {
    #[error("store backend failure: {message}")]
    Backend { message: String },

    #[error("store rejected commit: {} entities changed concurrently", references.len())]
    Conflict { references: BTreeSet<EntityReference> },

    #[error("entity '{reference}' already exists in the store")]
    AlreadyExists { reference: EntityReference },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Backend { .. } => ErrorClass::Backend,
            Self::Conflict { .. } | Self::AlreadyExists { .. } => ErrorClass::Conflict,
        }
    }
}

///
/// ChangeSet
///
/// Everything one `complete()` writes, applied atomically or not at all.
/// Updated states carry the version they were loaded at so the store can
/// re-verify under its own lock.
///

#[derive(Clone, Debug)]
pub struct ChangeSet {
    pub created: Vec<EntityState>,
    pub updated: Vec<EntityState>,
    pub removed: Vec<(EntityReference, Version)>,
    pub time: DateTime<Utc>,
}

impl ChangeSet {
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self {
            created: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            time,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

///
/// CommitReceipt
/// Versions the store assigned to every created or updated entity.
///

#[derive(Clone, Debug, Default)]
pub struct CommitReceipt {
    pub versions: BTreeMap<EntityReference, Version>,
}

///
/// EntityStore
///

pub trait EntityStore: Send + Sync {
    /// Read the committed state of `reference`, if any.
    fn load(&self, reference: &EntityReference) -> Result<Option<EntityState>, StoreError>;

    fn exists(&self, reference: &EntityReference) -> Result<bool, StoreError> {
        Ok(self.load(reference)?.is_some())
    }

    /// True when `reference` is still at `expected`. A missing record is
    /// not current.
    fn verify_version(
        &self,
        reference: &EntityReference,
        expected: Version,
    ) -> Result<bool, StoreError>;

    fn apply_changes(&self, changes: ChangeSet) -> Result<CommitReceipt, StoreError>;
}
