use crate::{
    config::ConfigError,
    entity::StateError,
    query::QueryError,
    store::StoreError,
    uow::{CompletionError, ConstructionError, UnitOfWorkError},
};
use derive_more::Display;
use thiserror::Error as ThisError;

///
/// Error
///
/// Top-level runtime error. Each variant wraps the domain error raised by
/// the layer that failed; `class()` and `origin()` give a stable
/// classification independent of the message text.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    UnitOfWork(#[from] UnitOfWorkError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnitOfWork(err) => err.class(),
            Self::Completion(err) => err.class(),
            Self::Construction(err) => err.class(),
            Self::Query(err) => err.class(),
            Self::State(err) => err.class(),
            Self::Store(err) => err.class(),
            Self::Config(_) => ErrorClass::Invalid,
        }
    }

    #[must_use]
    pub const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::UnitOfWork(_) | Self::Completion(_) => ErrorOrigin::UnitOfWork,
            Self::Construction(_) => ErrorOrigin::Builder,
            Self::Query(err) => err.origin(),
            Self::State(_) => ErrorOrigin::Entity,
            Self::Store(_) => ErrorOrigin::Store,
            Self::Config(_) => ErrorOrigin::Config,
        }
    }

    /// True for both "absent from the store" and "removed in this unit of work".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class(), ErrorClass::NotFound)
    }
}

///
/// ErrorClass
///
/// Stable failure category, independent of which layer raised it.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    /// Entity absent from the store or removed within the unit of work.
    NotFound,
    /// Optimistic-concurrency conflict detected at completion.
    Conflict,
    /// Entity construction rejected before any backend write.
    Construction,
    /// Backend cannot express the requested construct.
    Unsupported,
    /// Operation not valid for the current lifecycle state.
    InvalidState,
    /// Malformed input (bad pattern, unbound variable, bad config).
    Invalid,
    /// Opaque backend failure.
    Backend,
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ErrorOrigin {
    UnitOfWork,
    Builder,
    Entity,
    Query,
    Store,
    Finder,
    Config,
}
