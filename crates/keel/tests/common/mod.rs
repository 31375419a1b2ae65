#![allow(dead_code)]

use keel::prelude::*;
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;

pub use keel::core::store::MemoryEntityStore;

///
/// Person
///

pub struct Person;

impl Person {
    pub const NAME: Property<Self, String> = Property::new("name");
    pub const AGE: Property<Self, i64> = Property::new("age");
    pub const FRIEND: Association<Self, Self> = Association::new("friend");
}

static PERSON_FIELDS: [FieldModel; 3] = [
    FieldModel::property("name"),
    FieldModel::property("age"),
    FieldModel::association("friend").optional(),
];

static PERSON_MODEL: EntityModel = EntityModel::new("Person", &PERSON_FIELDS);

impl EntityType for Person {
    const MODEL: &'static EntityModel = &PERSON_MODEL;
}

pub fn init_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn factory() -> (UnitOfWorkFactory, Arc<MemoryEntityStore>) {
    init_tracing();
    UnitOfWorkFactory::in_memory()
}

/// Create and commit one `Person` per `(identity, name, age)`.
pub fn seed(factory: &UnitOfWorkFactory, people: &[(&str, &str, i64)]) {
    let uow = factory.new_unit_of_work();
    for (identity, name, age) in people {
        let mut builder = uow
            .new_entity_builder_with_identity::<Person>(identity)
            .expect("builder should open");
        builder
            .state_of_composite()
            .set(Person::NAME, *name)
            .expect("name should be writable")
            .set(Person::AGE, *age)
            .expect("age should be writable");
        builder.new_instance().expect("seed entity should construct");
    }
    uow.complete().expect("seed commit should succeed");
}

/// Factory over Alice (30) and Bob (25).
pub fn alice_and_bob() -> UnitOfWorkFactory {
    let (factory, _) = factory();
    seed(&factory, &[("alice", "Alice", 30), ("bob", "Bob", 25)]);

    factory
}

pub fn names(entities: &[Entity<Person>]) -> Vec<String> {
    entities
        .iter()
        .map(|entity| entity.get(Person::NAME).expect("name should be readable"))
        .collect()
}
