//! Entity identity, state, and typed handles.
//!
//! - `EntityReference`: immutable `(type, identity)` key.
//! - `EntityState`: the mutable record a unit of work caches per reference.
//! - `Entity<E>`: typed handle resolving through its unit of work's identity map.

mod handle;
mod identity;
mod reference;
mod state;


pub use handle::{Entity, MixinAccess, StateView};
pub use identity::{IdentityGenerator, UlidIdentityGenerator};
pub use reference::EntityReference;
pub use state::{EntityState, EntityStatus, StateError, Version};
