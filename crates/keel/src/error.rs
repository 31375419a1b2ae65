use derive_more::Display;
use keel_core::error::{Error as CoreError, ErrorClass, ErrorOrigin as CoreErrorOrigin};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self.kind, ErrorKind::Conflict)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::NotFound)
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        Self::new(err.class().into(), err.origin().into(), err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    NotFound,

    /// Another unit of work committed first; refresh and retry.
    Conflict,

    Construction,
    Unsupported,
    InvalidState,
    Invalid,

    /// The caller cannot remediate this.
    Backend,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::NotFound => Self::NotFound,
            ErrorClass::Conflict => Self::Conflict,
            ErrorClass::Construction => Self::Construction,
            ErrorClass::Unsupported => Self::Unsupported,
            ErrorClass::InvalidState => Self::InvalidState,
            ErrorClass::Invalid => Self::Invalid,
            ErrorClass::Backend => Self::Backend,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    UnitOfWork,
    Builder,
    Entity,
    Query,
    Store,
    Finder,
    Config,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::UnitOfWork => Self::UnitOfWork,
            CoreErrorOrigin::Builder => Self::Builder,
            CoreErrorOrigin::Entity => Self::Entity,
            CoreErrorOrigin::Query => Self::Query,
            CoreErrorOrigin::Store => Self::Store,
            CoreErrorOrigin::Finder => Self::Finder,
            CoreErrorOrigin::Config => Self::Config,
        }
    }
}
