use crate::{
    entity::EntityReference,
    error::ErrorClass,
    value::Value,
};
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// EntityStatus
///
/// Lifecycle status of one state within one unit of work.
/// Transitions are monotonic: `New`/`Loaded` may move to `Updated` or
/// `Removed`, `Updated` may move to `Removed`, and nothing leaves `Removed`.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum EntityStatus {
    New,
    Loaded,
    Updated,
    Removed,
}

impl EntityStatus {
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::New | Self::Loaded, Self::Updated | Self::Removed)
                | (Self::Updated, Self::Removed)
        )
    }
}

///
/// Version
///
/// Opaque store-supplied token compared at completion to detect
/// concurrent modification.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[display("v{_0}")]
pub struct Version(u64);

impl Version {
    #[must_use]
    pub const fn new(token: u64) -> Self {
        Self(token)
    }

    #[must_use]
    pub const fn token(self) -> u64 {
        self.0
    }

    /// The version a store assigns after writing over `self`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

///
/// StateError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StateError {
    #[error("entity '{reference}' has been removed")]
    Removed { reference: EntityReference },

    #[error("entity '{reference}' is detached; its unit of work is closed")]
    Detached { reference: EntityReference },

    #[error("entity '{reference}' cannot move from {from} to {to}")]
    InvalidTransition {
        reference: EntityReference,
        from: EntityStatus,
        to: EntityStatus,
    },

    #[error("field '{field}' of '{reference}' holds a {found} value of the wrong type")]
    TypeMismatch {
        reference: EntityReference,
        field: String,
        found: &'static str,
    },

    #[error("entity type '{entity_type}' has no field '{field}'")]
    UnknownField { entity_type: String, field: String },
}

impl StateError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Removed { .. } => ErrorClass::NotFound,
            Self::Detached { .. } | Self::InvalidTransition { .. } => ErrorClass::InvalidState,
            Self::TypeMismatch { .. } | Self::UnknownField { .. } => ErrorClass::Invalid,
        }
    }
}

///
/// EntityState
///
/// Mutable record of one entity's values plus lifecycle metadata.
/// Owned by exactly one unit of work while loaded; stores hand out and
/// receive detached copies.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct EntityState {
    reference: EntityReference,
    status: EntityStatus,
    version: Option<Version>,
    last_modified: Option<DateTime<Utc>>,
    properties: BTreeMap<String, Value>,
    associations: BTreeMap<String, Option<EntityReference>>,
    many_associations: BTreeMap<String, Vec<EntityReference>>,
}

impl EntityState {
    /// Fresh state for an entity not yet in any store.
    #[must_use]
    pub const fn new(reference: EntityReference) -> Self {
        Self {
            reference,
            status: EntityStatus::New,
            version: None,
            last_modified: None,
            properties: BTreeMap::new(),
            associations: BTreeMap::new(),
            many_associations: BTreeMap::new(),
        }
    }

    /// State as read from a store at `version`.
    #[must_use]
    pub const fn loaded(reference: EntityReference, version: Version) -> Self {
        let mut state = Self::new(reference);
        state.status = EntityStatus::Loaded;
        state.version = Some(version);
        state
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn reference(&self) -> &EntityReference {
        &self.reference
    }

    #[must_use]
    pub const fn status(&self) -> EntityStatus {
        self.status
    }

    #[must_use]
    pub const fn version(&self) -> Option<Version> {
        self.version
    }

    #[must_use]
    pub const fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub(crate) fn set_reference(&mut self, reference: EntityReference) {
        self.reference = reference;
    }

    /// Record the outcome of a successful write.
    pub fn mark_committed(&mut self, version: Version, at: DateTime<Utc>) {
        self.version = Some(version);
        self.last_modified = Some(at);
    }

    /// Move to `next`, rejecting any non-monotonic transition.
    pub fn transition(&mut self, next: EntityStatus) -> Result<(), StateError> {
        if self.status == next {
            return Ok(());
        }
        if !self.status.can_transition_to(next) {
            return Err(StateError::InvalidTransition {
                reference: self.reference.clone(),
                from: self.status,
                to: next,
            });
        }

        self.status = next;
        Ok(())
    }

    /// Copy of this state re-labelled as freshly loaded, as a store keeps it.
    #[must_use]
    pub fn to_loaded(&self) -> Self {
        let mut copy = self.clone();
        copy.status = EntityStatus::Loaded;
        copy
    }

    fn ensure_live(&self) -> Result<(), StateError> {
        if self.status == EntityStatus::Removed {
            return Err(StateError::Removed {
                reference: self.reference.clone(),
            });
        }

        Ok(())
    }

    // Any mutation of loaded state makes it dirty. New states stay new.
    fn touch(&mut self) -> Result<(), StateError> {
        self.ensure_live()?;
        if self.status == EntityStatus::Loaded {
            self.transition(EntityStatus::Updated)?;
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: Value) -> Result<(), StateError> {
        self.touch()?;
        self.properties.insert(name.into(), value);

        Ok(())
    }

    // ------------------------------------------------------------------
    // Associations
    // ------------------------------------------------------------------

    /// `None` when the association was never set; `Some(None)` when it was
    /// explicitly cleared.
    #[must_use]
    pub fn association(&self, name: &str) -> Option<Option<&EntityReference>> {
        self.associations.get(name).map(Option::as_ref)
    }

    pub fn associations(&self) -> impl Iterator<Item = (&str, Option<&EntityReference>)> {
        self.associations
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn set_association(
        &mut self,
        name: impl Into<String>,
        target: Option<EntityReference>,
    ) -> Result<(), StateError> {
        self.touch()?;
        self.associations.insert(name.into(), target);

        Ok(())
    }

    #[must_use]
    pub fn many_association(&self, name: &str) -> &[EntityReference] {
        self.many_associations
            .get(name)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn has_many_association(&self, name: &str) -> bool {
        self.many_associations.contains_key(name)
    }

    pub fn many_associations(&self) -> impl Iterator<Item = (&str, &[EntityReference])> {
        self.many_associations
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Append `target`; returns `false` if it was already present.
    pub fn add_to_many(
        &mut self,
        name: impl Into<String>,
        target: EntityReference,
    ) -> Result<bool, StateError> {
        self.ensure_live()?;
        let list = self.many_associations.entry(name.into()).or_default();
        if list.contains(&target) {
            return Ok(false);
        }
        list.push(target);
        self.touch()?;

        Ok(true)
    }

    /// Remove `target`; returns `false` if it was not present.
    pub fn remove_from_many(
        &mut self,
        name: &str,
        target: &EntityReference,
    ) -> Result<bool, StateError> {
        self.ensure_live()?;
        let Some(list) = self.many_associations.get_mut(name) else {
            return Ok(false);
        };
        let Some(pos) = list.iter().position(|r| r == target) else {
            return Ok(false);
        };
        list.remove(pos);
        self.touch()?;

        Ok(true)
    }

    /// Ensure an (initially empty) many-association exists.
    pub(crate) fn init_many(&mut self, name: &str) {
        self.many_associations.entry(name.to_string()).or_default();
    }
}
