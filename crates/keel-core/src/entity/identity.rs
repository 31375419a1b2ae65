use ulid::Ulid;

///
/// IdentityGenerator
///
/// Mints identities for entities created without an explicit one.
///

pub trait IdentityGenerator: Send + Sync {
    fn generate(&self, entity_type: &str) -> String;
}

///
/// UlidIdentityGenerator
/// Default generator: lexicographically sortable ULID strings.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct UlidIdentityGenerator;

impl IdentityGenerator for UlidIdentityGenerator {
    fn generate(&self, _entity_type: &str) -> String {
        Ulid::new().to_string()
    }
}
