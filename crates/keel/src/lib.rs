//! ## Crate layout
//! - `core`: the runtime. Units of work, entity state and handles, the
//!   query layer, finder and store contracts, and the in-memory backend.
//! - `error`: public error type with a stable kind/origin taxonomy.
//!
//! The `prelude` module is the surface used by application code. Backend
//! implementors reach into `core::store` and `core::query` directly.

pub use keel_core as core;

pub mod error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use error::{Error, ErrorKind, ErrorOrigin};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        config::RuntimeConfig,
        entity::{Entity, EntityReference, EntityStatus},
        model::{EntityModel, FieldModel, LifecycleError, LifecycleHooks, MixinModel},
        query::{
            Association, EntityQuery, IterableQuery, ManyAssociation, OrderBy, Predicate, Property,
            Query as _, QueryBuilder, and, not, or,
        },
        traits::{EntityType, FieldValue as _, HasMixin, Mixin},
        uow::{UnitOfWork, UnitOfWorkCallback, UnitOfWorkFactory, Usecase, with_unit_of_work},
        value::Value,
    };
    pub use crate::error::{Error, ErrorKind};
}
