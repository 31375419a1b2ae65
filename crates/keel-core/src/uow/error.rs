use crate::{
    entity::EntityReference,
    error::ErrorClass,
    model::LifecycleError,
    store::StoreError,
};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;
use ulid::Ulid;

///
/// UnitOfWorkError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum UnitOfWorkError {
    #[error("entity '{reference}' not found")]
    EntityNotFound { reference: EntityReference },

    #[error("entity '{reference}' was removed in this unit of work")]
    NoSuchEntity { reference: EntityReference },

    #[error("unit of work {id} is closed")]
    Closed { id: Ulid },

    #[error("unit of work {id} is not active")]
    NotActive { id: Ulid },

    #[error("unit of work {id} is not paused")]
    NotPaused { id: Ulid },

    #[error("removal of '{reference}' rejected: {source}")]
    RemovalRejected {
        reference: EntityReference,
        source: LifecycleError,
    },
}

impl UnitOfWorkError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::EntityNotFound { .. } | Self::NoSuchEntity { .. } => ErrorClass::NotFound,
            Self::Closed { .. } | Self::NotActive { .. } | Self::NotPaused { .. } => {
                ErrorClass::InvalidState
            }
            Self::RemovalRejected { .. } => ErrorClass::Invalid,
        }
    }
}

///
/// CompletionError
///
/// Failure of `complete()`. `ConcurrentModification` and `Store` leave the
/// unit of work open; rejections discard it.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CompletionError {
    #[error("concurrent modification of {} entities", entities.len())]
    ConcurrentModification { entities: BTreeSet<EntityReference> },

    #[error("completion callback rejected commit: {source}")]
    CallbackRejected { source: LifecycleError },

    #[error("entity '{reference}' rejected commit: {source}")]
    EntityRejected {
        reference: EntityReference,
        source: LifecycleError,
    },

    #[error("commit failed: {0}")]
    Store(StoreError),
}

impl CompletionError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::ConcurrentModification { .. } => ErrorClass::Conflict,
            Self::CallbackRejected { .. } | Self::EntityRejected { .. } => ErrorClass::Invalid,
            Self::Store(err) => err.class(),
        }
    }

    /// Conflicting references, when this is a version conflict.
    #[must_use]
    pub const fn conflicts(&self) -> Option<&BTreeSet<EntityReference>> {
        match self {
            Self::ConcurrentModification { entities } => Some(entities),
            _ => None,
        }
    }
}

///
/// ConstructionError
///
/// Raised by `EntityBuilder::new_instance` before anything is registered
/// or written.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConstructionError {
    #[error("cannot construct '{entity_type}': missing required fields {fields:?}")]
    MissingFields {
        entity_type: String,
        fields: Vec<String>,
    },

    #[error("entity '{reference}' already exists")]
    AlreadyExists { reference: EntityReference },

    #[error("creation of '{reference}' rejected: {source}")]
    CreateRejected {
        reference: EntityReference,
        source: LifecycleError,
    },
}

impl ConstructionError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::MissingFields { .. } | Self::CreateRejected { .. } => ErrorClass::Construction,
            Self::AlreadyExists { .. } => ErrorClass::Conflict,
        }
    }
}
