use crate::value::Value;

///
/// FieldKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    /// Plain value stored in `EntityState::properties`.
    Property,
    /// Single, nullable reference to another entity.
    Association,
    /// Ordered list of references to other entities.
    ManyAssociation,
}

///
/// FieldModel
/// Runtime field metadata used by builder validation and field lookups.
///

#[derive(Clone, Copy)]
pub struct FieldModel {
    /// Field name as used in state maps and property paths.
    pub name: &'static str,
    pub kind: FieldKind,
    /// Optional fields may be left unset at construction.
    pub optional: bool,
    /// Initial value applied when a builder is created.
    pub default: Option<fn() -> Value>,
}

impl FieldModel {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            optional: false,
            default: None,
        }
    }

    #[must_use]
    pub const fn property(name: &'static str) -> Self {
        Self::new(name, FieldKind::Property)
    }

    #[must_use]
    pub const fn association(name: &'static str) -> Self {
        Self::new(name, FieldKind::Association)
    }

    /// Many-associations start empty and are never required.
    #[must_use]
    pub const fn many_association(name: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::ManyAssociation);
        field.optional = true;
        field
    }

    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub const fn with_default(mut self, default: fn() -> Value) -> Self {
        self.default = Some(default);
        self
    }
}

impl std::fmt::Debug for FieldModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldModel")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("optional", &self.optional)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}
