use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

///
/// EntityReference
///
/// Immutable `(entity type, identity)` key used for every cache lookup and
/// as the payload of association fields.
///
/// Equality and hashing are structural; ordering follows the string form
/// `"type:identity"`. Two references whose string forms coincide but whose
/// parts differ (`"a:" + "b"` vs `"a" + ":b"`) are ordered by type length so
/// `Ord` stays consistent with `Eq`.
///

#[derive(Clone, Deserialize, Serialize)]
pub struct EntityReference {
    entity_type: Arc<str>,
    identity: Arc<str>,
}

impl EntityReference {
    #[must_use]
    pub fn new(entity_type: impl AsRef<str>, identity: impl AsRef<str>) -> Self {
        Self {
            entity_type: Arc::from(entity_type.as_ref()),
            identity: Arc::from(identity.as_ref()),
        }
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Copy of this reference pointing at another identity of the same type.
    #[must_use]
    pub fn with_identity(&self, identity: impl AsRef<str>) -> Self {
        Self {
            entity_type: Arc::clone(&self.entity_type),
            identity: Arc::from(identity.as_ref()),
        }
    }

    fn string_form(&self) -> impl Iterator<Item = u8> + '_ {
        self.entity_type
            .bytes()
            .chain(std::iter::once(b':'))
            .chain(self.identity.bytes())
    }
}

impl PartialEq for EntityReference {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type == other.entity_type && self.identity == other.identity
    }
}

impl Eq for EntityReference {}

impl Hash for EntityReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type.hash(state);
        self.identity.hash(state);
    }
}

impl Ord for EntityReference {
    fn cmp(&self, other: &Self) -> Ordering {
        self.string_form()
            .cmp(other.string_form())
            .then_with(|| self.entity_type.len().cmp(&other.entity_type.len()))
    }
}

impl PartialOrd for EntityReference {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.identity)
    }
}

impl fmt::Debug for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityReference({self})")
    }
}
