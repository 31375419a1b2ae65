//! Static runtime models for entity types and mixins.
//!
//! Models are declared as `static`/`const` items next to the entity type and
//! are the only schema the runtime consults: builder validation, field
//! lookups, defaults, and lifecycle hooks all read from here.

mod field;
mod hooks;

pub use field::{FieldKind, FieldModel};
pub use hooks::{CreateHook, InspectHook, LifecycleError, LifecycleHooks};

///
/// EntityModel
/// Runtime model for one entity type.
///

pub struct EntityModel {
    /// Stable type name used in entity references.
    pub type_name: &'static str,
    /// Fields declared directly on the entity (mixin fields excluded).
    pub fields: &'static [FieldModel],
    /// Mixins composed into the entity.
    pub mixins: &'static [&'static MixinModel],
    /// Optional lifecycle capabilities.
    pub hooks: LifecycleHooks,
}

impl EntityModel {
    #[must_use]
    pub const fn new(type_name: &'static str, fields: &'static [FieldModel]) -> Self {
        Self {
            type_name,
            fields,
            mixins: &[],
            hooks: LifecycleHooks::NONE,
        }
    }

    #[must_use]
    pub const fn with_mixins(mut self, mixins: &'static [&'static MixinModel]) -> Self {
        self.mixins = mixins;
        self
    }

    #[must_use]
    pub const fn with_hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Entity fields followed by every mixin's fields, in declaration order.
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldModel> + '_ {
        self.fields
            .iter()
            .chain(self.mixins.iter().flat_map(|mixin| mixin.fields.iter()))
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.all_fields().find(|field| field.name == name)
    }

    #[must_use]
    pub fn has_mixin(&self, name: &str) -> bool {
        self.mixins.iter().any(|mixin| mixin.name == name)
    }
}

///
/// MixinModel
///
/// Named group of fields shared by several entity types. A builder can
/// expose just this slice of its in-progress state (`state_for`).
///

pub struct MixinModel {
    pub name: &'static str,
    pub fields: &'static [FieldModel],
}

impl MixinModel {
    #[must_use]
    pub const fn new(name: &'static str, fields: &'static [FieldModel]) -> Self {
        Self { name, fields }
    }
}
