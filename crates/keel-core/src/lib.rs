//! Core runtime for Keel: units of work, entity state and handles, the
//! typed query layer, the finder and store contracts, and the in-memory
//! backend.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod entity;
pub mod error;
pub mod model;
pub mod obs;
pub mod query;
pub mod store;
pub mod traits;
pub mod uow;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Domain vocabulary for application code: handles, descriptors, query
/// building, and the traits that make them work. Stores, finders, and
/// error internals stay one module down.
///

pub mod prelude {
    pub use crate::{
        entity::{Entity, EntityReference, EntityStatus},
        error::Error,
        model::{EntityModel, FieldModel, LifecycleError, LifecycleHooks, MixinModel},
        query::{
            Association, ManyAssociation, Predicate, Property, Query as _, QueryBuilder, and, not,
            or,
        },
        traits::{EntityType, FieldValue, HasMixin, Mixin},
        uow::{UnitOfWork, UnitOfWorkFactory, Usecase},
        value::Value,
    };
}
