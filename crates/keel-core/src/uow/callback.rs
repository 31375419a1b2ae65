use crate::model::LifecycleError;
use derive_more::Display;

///
/// UnitOfWorkStatus
/// Final outcome reported to `after_completion`.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum UnitOfWorkStatus {
    Completed,
    Discarded,
}

///
/// UnitOfWorkCallback
///
/// Completion listener registered on one unit of work. Callbacks run in
/// registration order. An error from `before_completion` aborts the
/// commit and discards the unit of work; an error from
/// `after_completion` is logged and otherwise ignored.
///

pub trait UnitOfWorkCallback {
    fn before_completion(&self) -> Result<(), LifecycleError> {
        Ok(())
    }

    fn after_completion(&self, _status: UnitOfWorkStatus) -> Result<(), LifecycleError> {
        Ok(())
    }
}

///
/// CallbackId
/// Handle returned at registration, used to unregister.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CallbackId(pub(crate) u64);
