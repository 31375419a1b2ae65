//! Shared fixtures for unit tests: a `Person` entity with every field
//! kind, a `Contact` mixin, and a tracing subscriber hooked to the test
//! writer.

use crate::{
    model::{EntityModel, FieldModel, LifecycleHooks, MixinModel},
    query::{Association, ManyAssociation, Property},
    store::MemoryEntityStore,
    traits::{EntityType, HasMixin, Mixin},
    uow::UnitOfWorkFactory,
    value::Value,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a test subscriber once per process. Filter with `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub(crate) fn memory_factory() -> (UnitOfWorkFactory, Arc<MemoryEntityStore>) {
    init_tracing();
    UnitOfWorkFactory::in_memory()
}

///
/// Contact
///

pub(crate) struct Contact;

impl Contact {
    pub(crate) const EMAIL: Property<Self, Option<String>> = Property::new("email");
}

static CONTACT_FIELDS: [FieldModel; 1] = [FieldModel::property("email").optional()];

static CONTACT_MODEL: MixinModel = MixinModel::new("Contact", &CONTACT_FIELDS);

impl Mixin for Contact {
    const MODEL: &'static MixinModel = &CONTACT_MODEL;
}

///
/// Person
///

pub(crate) struct Person;

impl Person {
    pub(crate) const NAME: Property<Self, String> = Property::new("name");
    pub(crate) const AGE: Property<Self, i64> = Property::new("age");
    pub(crate) const TAGS: Property<Self, Vec<String>> = Property::new("tags");
    pub(crate) const FRIEND: Association<Self, Self> = Association::new("friend");
    pub(crate) const CHILDREN: ManyAssociation<Self, Self> = ManyAssociation::new("children");
}

fn no_tags() -> Value {
    Value::List(Vec::new())
}

static PERSON_FIELDS: [FieldModel; 5] = [
    FieldModel::property("name"),
    FieldModel::property("age"),
    FieldModel::property("tags").optional().with_default(no_tags),
    FieldModel::association("friend").optional(),
    FieldModel::many_association("children"),
];

static PERSON_MIXINS: [&MixinModel; 1] = [&CONTACT_MODEL];

static PERSON_MODEL: EntityModel = EntityModel::new("Person", &PERSON_FIELDS)
    .with_mixins(&PERSON_MIXINS)
    .with_hooks(LifecycleHooks::NONE);

impl EntityType for Person {
    const MODEL: &'static EntityModel = &PERSON_MODEL;
}

impl HasMixin<Contact> for Person {}
