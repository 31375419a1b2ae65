use super::*;
use crate::{
    config::{RuntimeConfig, UnitOfWorkConfig},
    entity::Version,
    error::ErrorClass,
    model::{FieldModel, LifecycleError, LifecycleHooks},
    obs::CounterSink,
    query::Property,
    store::{EntityStore, MemoryEntityStore},
    test_support::{Person, init_tracing, memory_factory},
    value::Value,
};

// ----------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------

fn seed(factory: &UnitOfWorkFactory, people: &[(&str, &str, i64)]) {
    let uow = factory.new_unit_of_work();
    for (identity, name, age) in people {
        let mut builder = uow
            .new_entity_builder_with_identity::<Person>(identity)
            .unwrap();
        builder
            .state_of_composite()
            .set(Person::NAME, *name)
            .unwrap()
            .set(Person::AGE, *age)
            .unwrap();
        builder.new_instance().unwrap();
    }
    uow.complete().unwrap();
}

fn seeded() -> (UnitOfWorkFactory, Arc<MemoryEntityStore>) {
    let (factory, store) = memory_factory();
    seed(&factory, &[("alice", "Alice", 30), ("bob", "Bob", 25)]);
    (factory, store)
}

fn committed_name(store: &MemoryEntityStore, identity: &str) -> Option<Value> {
    store
        .load(&EntityReference::new("Person", identity))
        .unwrap()
        .and_then(|state| state.property("name").cloned())
}

///
/// Account
/// Entity type with every lifecycle hook installed.
///

struct Account;

impl Account {
    const OWNER: Property<Self, String> = Property::new("owner");
    const BALANCE: Property<Self, i64> = Property::new("balance");
    const OPENED: Property<Self, Option<bool>> = Property::new("opened");
}

fn zero() -> Value {
    Value::Int(0)
}

fn mark_opened(state: &mut EntityState) -> Result<(), LifecycleError> {
    state
        .set_property("opened", Value::Bool(true))
        .map_err(|err| LifecycleError::new(err.to_string()))
}

fn only_when_empty(state: &EntityState) -> Result<(), LifecycleError> {
    match state.property("balance") {
        Some(Value::Int(0)) | None => Ok(()),
        _ => Err(LifecycleError::new("account still holds funds")),
    }
}

fn never_negative(state: &EntityState) -> Result<(), LifecycleError> {
    match state.property("balance") {
        Some(Value::Int(balance)) if *balance < 0 => Err(LifecycleError::new("overdrawn")),
        _ => Ok(()),
    }
}

static ACCOUNT_FIELDS: [FieldModel; 3] = [
    FieldModel::property("owner"),
    FieldModel::property("balance").with_default(zero),
    FieldModel::property("opened").optional(),
];

static ACCOUNT_MODEL: EntityModel = EntityModel::new("Account", &ACCOUNT_FIELDS).with_hooks(
    LifecycleHooks::NONE
        .on_create(mark_opened)
        .on_remove(only_when_empty)
        .before_completion(never_negative),
);

impl EntityType for Account {
    const MODEL: &'static EntityModel = &ACCOUNT_MODEL;
}

fn open_account(uow: &UnitOfWork, identity: &str, balance: i64) -> Entity<Account> {
    let mut builder = uow
        .new_entity_builder_with_identity::<Account>(identity)
        .unwrap();
    builder
        .state_of_composite()
        .set(Account::OWNER, "alice")
        .unwrap()
        .set(Account::BALANCE, balance)
        .unwrap();
    builder.new_instance().unwrap()
}

///
/// Recorder
///

struct Recorder {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
    reject: bool,
}

impl Recorder {
    fn new(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            reject: false,
        }
    }

    const fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }
}

impl UnitOfWorkCallback for Recorder {
    fn before_completion(&self) -> Result<(), LifecycleError> {
        self.log.borrow_mut().push(format!("{}:before", self.name));
        if self.reject {
            return Err(LifecycleError::new(format!("{} says no", self.name)));
        }

        Ok(())
    }

    fn after_completion(&self, status: UnitOfWorkStatus) -> Result<(), LifecycleError> {
        self.log.borrow_mut().push(format!("{}:{status}", self.name));

        Err(LifecycleError::new("after-completion failures are only logged"))
    }
}

// ----------------------------------------------------------------------
// Identity map and lookup
// ----------------------------------------------------------------------

#[test]
fn repeated_finds_share_one_state_object() {
    let (factory, _) = seeded();
    let uow = factory.new_unit_of_work();
    let reference = EntityReference::new("Person", "alice");

    let first = uow.find::<Person>("alice").unwrap();
    let cached = uow.cached_state(&reference).unwrap();
    let second = uow.find::<Person>("alice").unwrap();

    assert!(Rc::ptr_eq(&cached, &uow.cached_state(&reference).unwrap()));
    assert_eq!(first, second);

    uow.refresh(&first).unwrap();
    assert!(!Rc::ptr_eq(&cached, &uow.cached_state(&reference).unwrap()));
}

#[test]
fn missing_entities_are_not_found() {
    let (factory, _) = seeded();
    let uow = factory.new_unit_of_work();

    let err = uow.find::<Person>("nobody").unwrap_err();
    assert!(matches!(
        err,
        Error::UnitOfWork(UnitOfWorkError::EntityNotFound { .. })
    ));

    // lazy handles fail on first access
    let ghost = uow.get_reference::<Person>("nobody").unwrap();
    assert!(ghost.get(Person::NAME).unwrap_err().is_not_found());
}

#[test]
fn removed_entities_cannot_be_found_until_discarded() {
    let (factory, _) = seeded();
    let uow = factory.new_unit_of_work();
    let alice = uow.find::<Person>("alice").unwrap();
    uow.remove(&alice).unwrap();

    let err = uow.find_by_reference::<Person>(alice.reference()).unwrap_err();
    assert!(matches!(
        err,
        Error::UnitOfWork(UnitOfWorkError::NoSuchEntity { .. })
    ));
    assert_eq!(err.class(), ErrorClass::NotFound);
    assert!(uow.get_reference::<Person>("alice").is_err());
    assert!(uow.remove(&alice).is_err());

    uow.discard();
    let fresh = factory.new_unit_of_work();
    assert_eq!(
        fresh.find::<Person>("alice").unwrap().get(Person::NAME).unwrap(),
        "Alice"
    );
}

// ----------------------------------------------------------------------
// Completion
// ----------------------------------------------------------------------

#[test]
fn completion_writes_every_change() {
    let (factory, store) = seeded();
    let uow = factory.new_unit_of_work();

    uow.find::<Person>("alice")
        .unwrap()
        .set(Person::NAME, "Alicia")
        .unwrap();
    let bob = uow.find::<Person>("bob").unwrap();
    uow.remove(&bob).unwrap();
    let mut builder = uow
        .new_entity_builder_with_identity::<Person>("carol")
        .unwrap();
    builder
        .state_of_composite()
        .set(Person::NAME, "Carol")
        .unwrap()
        .set(Person::AGE, 35)
        .unwrap();
    builder.new_instance().unwrap();

    uow.complete().unwrap();

    assert!(!uow.is_open());
    assert_eq!(committed_name(&store, "alice"), Some(Value::from("Alicia")));
    assert_eq!(committed_name(&store, "bob"), None);
    assert_eq!(committed_name(&store, "carol"), Some(Value::from("Carol")));

    let alice = store
        .load(&EntityReference::new("Person", "alice"))
        .unwrap()
        .unwrap();
    assert_eq!(alice.version(), Some(Version::new(2)));
}

#[test]
fn created_then_removed_entities_are_never_written() {
    let (factory, store) = memory_factory();
    let uow = factory.new_unit_of_work();
    let mut builder = uow
        .new_entity_builder_with_identity::<Person>("temp")
        .unwrap();
    builder
        .state_of_composite()
        .set(Person::NAME, "Temp")
        .unwrap()
        .set(Person::AGE, 1)
        .unwrap();
    let temp = builder.new_instance().unwrap();
    uow.remove(&temp).unwrap();

    uow.complete().unwrap();
    assert!(store.is_empty().unwrap());
}

#[test]
fn conflicts_leave_the_unit_of_work_open_and_write_nothing() {
    let (factory, store) = seeded();

    let slow = factory.new_unit_of_work();
    let slow_alice = slow.find::<Person>("alice").unwrap();

    let fast = factory.new_unit_of_work();
    fast.find::<Person>("alice")
        .unwrap()
        .set(Person::NAME, "Alicia")
        .unwrap();
    fast.complete().unwrap();

    slow_alice.set(Person::AGE, 31).unwrap();
    slow.find::<Person>("bob")
        .unwrap()
        .set(Person::NAME, "Robert")
        .unwrap();
    let mut builder = slow
        .new_entity_builder_with_identity::<Person>("carol")
        .unwrap();
    builder
        .state_of_composite()
        .set(Person::NAME, "Carol")
        .unwrap()
        .set(Person::AGE, 35)
        .unwrap();
    builder.new_instance().unwrap();

    let err = slow.complete().unwrap_err();
    let Error::Completion(completion) = &err else {
        panic!("expected a completion error, got {err:?}");
    };
    let conflicts = completion.conflicts().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert!(conflicts.contains(slow_alice.reference()));
    assert_eq!(err.class(), ErrorClass::Conflict);

    assert!(slow.is_open());
    assert_eq!(committed_name(&store, "alice"), Some(Value::from("Alicia")));
    assert_eq!(committed_name(&store, "bob"), Some(Value::from("Bob")));
    assert_eq!(committed_name(&store, "carol"), None);

    // refresh and retry
    slow.refresh(&slow_alice).unwrap();
    assert_eq!(slow_alice.get(Person::NAME).unwrap(), "Alicia");
    assert_eq!(slow_alice.get(Person::AGE).unwrap(), 30);
    slow.complete().unwrap();
    assert_eq!(committed_name(&store, "bob"), Some(Value::from("Robert")));
    assert_eq!(committed_name(&store, "carol"), Some(Value::from("Carol")));
}

#[test]
fn unmodified_reads_are_checked_unless_disabled() {
    let (factory, store) = seeded();
    let reader = factory.new_unit_of_work();
    reader.find::<Person>("bob").unwrap();

    let writer = factory.new_unit_of_work();
    writer
        .find::<Person>("bob")
        .unwrap()
        .set(Person::AGE, 26)
        .unwrap();
    writer.complete().unwrap();

    assert_eq!(reader.complete().unwrap_err().class(), ErrorClass::Conflict);
    reader.discard();

    let relaxed = Usecase::new("report").with_options(UnitOfWorkConfig {
        verify_loaded_versions: false,
        ..Default::default()
    });
    let reader = factory.new_unit_of_work_for(relaxed);
    reader.find::<Person>("bob").unwrap();

    let writer = factory.new_unit_of_work();
    writer
        .find::<Person>("bob")
        .unwrap()
        .set(Person::AGE, 27)
        .unwrap();
    writer.complete().unwrap();

    reader.complete().unwrap();
    assert_eq!(committed_name(&store, "bob"), Some(Value::from("Bob")));
}

#[test]
fn discard_is_idempotent() {
    let (factory, store) = seeded();
    let uow = factory.new_unit_of_work();
    uow.find::<Person>("alice")
        .unwrap()
        .set(Person::NAME, "Nobody")
        .unwrap();

    uow.discard();
    uow.discard();
    uow.close();
    assert_eq!(committed_name(&store, "alice"), Some(Value::from("Alice")));

    let completed = factory.new_unit_of_work();
    completed.complete().unwrap();
    completed.discard();
}

#[test]
fn closed_units_of_work_reject_work() {
    let (factory, _) = seeded();
    let uow = factory.new_unit_of_work();
    uow.discard();

    for err in [
        uow.find::<Person>("alice").unwrap_err(),
        uow.complete().unwrap_err(),
        uow.new_entity_builder::<Person>().err().unwrap(),
        uow.pause().unwrap_err(),
    ] {
        assert!(matches!(err, Error::UnitOfWork(UnitOfWorkError::Closed { .. })));
    }
}

// ----------------------------------------------------------------------
// Builder
// ----------------------------------------------------------------------

#[test]
fn builder_rejects_missing_required_fields() {
    let (factory, store) = memory_factory();
    let uow = factory.new_unit_of_work();
    let mut builder = uow.new_entity_builder::<Person>().unwrap();
    builder.state_of_composite().set(Person::NAME, "Alice").unwrap();

    let err = builder.new_instance().unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"cannot construct 'Person': missing required fields ["age"]"#
    );
    assert_eq!(err.class(), ErrorClass::Construction);
    assert!(!uow.is_cached(builder.reference()));

    builder.state_of_composite().set(Person::AGE, 30).unwrap();
    let alice = builder.new_instance().unwrap();
    assert_eq!(uow.find_by_reference::<Person>(alice.reference()).unwrap(), alice);
    assert!(store.is_empty().unwrap());
}

#[test]
fn builder_rejects_existing_identities() {
    let (factory, _) = seeded();
    let uow = factory.new_unit_of_work();

    let mut builder = uow
        .new_entity_builder_with_identity::<Person>("alice")
        .unwrap();
    builder
        .state_of_composite()
        .set(Person::NAME, "Alice")
        .unwrap()
        .set(Person::AGE, 30)
        .unwrap();
    let err = builder.new_instance().unwrap_err();
    assert!(matches!(
        err,
        Error::Construction(ConstructionError::AlreadyExists { .. })
    ));

    let mut builder = uow
        .new_entity_builder_with_identity::<Person>("carol")
        .unwrap();
    builder
        .state_of_composite()
        .set(Person::NAME, "Carol")
        .unwrap()
        .set(Person::AGE, 35)
        .unwrap();
    builder.new_instance().unwrap();
    assert!(builder.new_instance().is_err());
}

#[test]
fn unfixed_builders_mint_a_fresh_identity_per_instance() {
    let (factory, _) = memory_factory();
    let uow = factory.new_unit_of_work();
    let mut builder = uow.new_entity_builder::<Person>().unwrap();
    builder
        .state_of_composite()
        .set(Person::NAME, "Clone")
        .unwrap()
        .set(Person::AGE, 1)
        .unwrap();

    let clones: Vec<Entity<Person>> = builder.by_ref().take(3).collect::<Result<_, _>>().unwrap();
    assert_ne!(clones[0].reference(), clones[1].reference());
    assert_ne!(clones[1].reference(), clones[2].reference());
    assert_ne!(builder.reference(), clones[2].reference());
    for clone in &clones {
        assert_eq!(clone.get(Person::NAME).unwrap(), "Clone");
        assert_eq!(clone.status().unwrap(), EntityStatus::New);
    }
}

#[test]
fn new_entity_needs_defaults_for_required_fields() {
    let (factory, _) = memory_factory();
    let uow = factory.new_unit_of_work();

    let err = uow.new_entity::<Person>(Some("x")).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Construction);
}

// ----------------------------------------------------------------------
// Lifecycle hooks and callbacks
// ----------------------------------------------------------------------

#[test]
fn creation_hook_runs_on_the_new_instance() {
    let (factory, _) = memory_factory();
    let uow = factory.new_unit_of_work();
    let account = open_account(&uow, "a1", 10);

    assert_eq!(account.get(Account::OPENED).unwrap(), Some(true));
    assert_eq!(account.get(Account::BALANCE).unwrap(), 10);
}

#[test]
fn removal_hook_can_veto() {
    let (factory, _) = memory_factory();
    let uow = factory.new_unit_of_work();
    let account = open_account(&uow, "a1", 10);

    let err = uow.remove(&account).unwrap_err();
    assert!(matches!(
        err,
        Error::UnitOfWork(UnitOfWorkError::RemovalRejected { .. })
    ));
    assert_eq!(account.status().unwrap(), EntityStatus::New);

    account.set(Account::BALANCE, 0).unwrap();
    uow.remove(&account).unwrap();
}

#[test]
fn pre_completion_hook_rejection_discards() {
    let (factory, store) = memory_factory();
    let uow = factory.new_unit_of_work();
    let account = open_account(&uow, "a1", 10);
    account.set(Account::BALANCE, -5).unwrap();

    let err = uow.complete().unwrap_err();
    assert!(matches!(
        err,
        Error::Completion(CompletionError::EntityRejected { .. })
    ));
    assert!(!uow.is_open());
    assert!(store.is_empty().unwrap());
}

#[test]
fn callbacks_run_in_registration_order() {
    let (factory, _) = seeded();
    let uow = factory.new_unit_of_work();
    let log = Rc::new(RefCell::new(Vec::new()));

    uow.register_callback(Recorder::new("first", &log));
    let dropped = uow.register_callback(Recorder::new("dropped", &log));
    uow.register_callback(Recorder::new("second", &log));
    assert!(uow.remove_callback(dropped));
    assert!(!uow.remove_callback(dropped));

    uow.complete().unwrap();
    assert_eq!(
        *log.borrow(),
        [
            "first:before",
            "second:before",
            "first:Completed",
            "second:Completed"
        ]
    );
}

#[test]
fn rejecting_callback_aborts_the_commit() {
    let (factory, store) = seeded();
    let uow = factory.new_unit_of_work();
    let log = Rc::new(RefCell::new(Vec::new()));
    uow.register_callback(Recorder::new("veto", &log).rejecting());
    uow.register_callback(Recorder::new("never", &log));
    uow.find::<Person>("alice")
        .unwrap()
        .set(Person::NAME, "Nobody")
        .unwrap();

    let err = uow.complete().unwrap_err();
    assert!(matches!(
        err,
        Error::Completion(CompletionError::CallbackRejected { .. })
    ));
    assert!(!uow.is_open());
    assert_eq!(
        *log.borrow(),
        ["veto:before", "veto:Discarded", "never:Discarded"]
    );
    assert_eq!(committed_name(&store, "alice"), Some(Value::from("Alice")));

    // discarding again does not notify twice
    uow.discard();
    assert_eq!(log.borrow().len(), 3);
}

// ----------------------------------------------------------------------
// Refresh
// ----------------------------------------------------------------------

#[test]
fn refresh_replaces_local_changes() {
    let (factory, _) = seeded();
    let uow = factory.new_unit_of_work();
    let alice = uow.find::<Person>("alice").unwrap();
    let bob = uow.find::<Person>("bob").unwrap();
    alice.set(Person::NAME, "Local").unwrap();

    let other = factory.new_unit_of_work();
    other
        .find::<Person>("bob")
        .unwrap()
        .set(Person::AGE, 99)
        .unwrap();
    other.complete().unwrap();

    uow.refresh_all().unwrap();
    assert_eq!(alice.get(Person::NAME).unwrap(), "Alice");
    assert_eq!(alice.status().unwrap(), EntityStatus::Loaded);
    assert_eq!(bob.get(Person::AGE).unwrap(), 99);
    assert_eq!(bob.version().unwrap(), Some(Version::new(2)));
}

#[test]
fn refresh_leaves_new_entities_alone() {
    let (factory, _) = memory_factory();
    let uow = factory.new_unit_of_work();
    let account = open_account(&uow, "a1", 10);

    uow.refresh(&account).unwrap();
    uow.refresh_all().unwrap();
    assert_eq!(account.get(Account::BALANCE).unwrap(), 10);
}

#[test]
fn refresh_does_not_bring_back_removed_entities() {
    let (factory, store) = seeded();
    let uow = factory.new_unit_of_work();
    let alice = uow.find::<Person>("alice").unwrap();
    let bob = uow.find::<Person>("bob").unwrap();
    uow.remove(&alice).unwrap();
    bob.set(Person::NAME, "Robert").unwrap();

    let err = uow.refresh(&alice).unwrap_err();
    assert!(matches!(
        err,
        Error::UnitOfWork(UnitOfWorkError::NoSuchEntity { .. })
    ));
    assert_eq!(alice.status().unwrap(), EntityStatus::Removed);
    assert!(uow.find_by_reference::<Person>(alice.reference()).is_err());

    // removed entities are skipped; everything else is reloaded
    uow.refresh_all().unwrap();
    assert_eq!(alice.status().unwrap(), EntityStatus::Removed);
    assert!(uow.find::<Person>("alice").is_err());
    assert_eq!(bob.get(Person::NAME).unwrap(), "Bob");

    uow.complete().unwrap();
    assert_eq!(committed_name(&store, "alice"), None);
}

#[test]
fn refresh_fails_when_the_record_is_gone() {
    let (factory, _) = seeded();
    let uow = factory.new_unit_of_work();
    let alice = uow.find::<Person>("alice").unwrap();
    let bob = uow.find::<Person>("bob").unwrap();
    bob.set(Person::NAME, "Robert").unwrap();
    let alice_before = uow.cached_state(alice.reference()).unwrap();
    let bob_before = uow.cached_state(bob.reference()).unwrap();

    let other = factory.new_unit_of_work();
    other
        .remove(&other.find::<Person>("alice").unwrap())
        .unwrap();
    other.complete().unwrap();

    let err = uow.refresh(&alice).unwrap_err();
    assert!(matches!(
        err,
        Error::UnitOfWork(UnitOfWorkError::EntityNotFound { .. })
    ));
    let err = uow.refresh_all().unwrap_err();
    assert!(matches!(
        err,
        Error::UnitOfWork(UnitOfWorkError::EntityNotFound { .. })
    ));

    // nothing was swapped, local edits survive
    assert!(Rc::ptr_eq(
        &alice_before,
        &uow.cached_state(alice.reference()).unwrap()
    ));
    assert!(Rc::ptr_eq(&bob_before, &uow.cached_state(bob.reference()).unwrap()));
    assert_eq!(alice.get(Person::NAME).unwrap(), "Alice");
    assert_eq!(bob.get(Person::NAME).unwrap(), "Robert");
}

// ----------------------------------------------------------------------
// Current unit of work
// ----------------------------------------------------------------------

#[test]
fn newest_unit_of_work_is_current() {
    let (factory, _) = memory_factory();
    let outer = factory.new_unit_of_work();
    assert!(UnitOfWork::current().unwrap().same_as(&outer));

    let inner = factory.new_unit_of_work();
    assert!(factory.current_unit_of_work().unwrap().same_as(&inner));

    inner.discard();
    assert!(UnitOfWork::current().unwrap().same_as(&outer));

    outer.complete().unwrap();
    assert!(UnitOfWork::current().is_none());
}

#[test]
fn pause_and_resume_toggle_currency() {
    let (factory, _) = memory_factory();
    let uow = factory.new_unit_of_work();

    uow.pause().unwrap();
    assert!(uow.is_paused());
    assert!(UnitOfWork::current().is_none());
    assert!(matches!(
        uow.pause().unwrap_err(),
        Error::UnitOfWork(UnitOfWorkError::NotActive { .. })
    ));
    assert!(matches!(
        uow.complete().unwrap_err(),
        Error::UnitOfWork(UnitOfWorkError::NotActive { .. })
    ));

    uow.resume().unwrap();
    assert!(UnitOfWork::current().unwrap().same_as(&uow));
    assert!(matches!(
        uow.resume().unwrap_err(),
        Error::UnitOfWork(UnitOfWorkError::NotPaused { .. })
    ));
    uow.complete().unwrap();
}

#[test]
fn scoped_entry_restores_the_previous_current() {
    let (factory, _) = memory_factory();
    let first = factory.new_unit_of_work();
    let second = factory.new_unit_of_work();

    let seen = with_unit_of_work(&first, || UnitOfWork::current().map(|uow| uow.id()));
    assert_eq!(seen, Some(first.id()));
    assert!(UnitOfWork::current().unwrap().same_as(&second));

    {
        let _guard = first.enter();
        assert!(UnitOfWork::current().unwrap().same_as(&first));
    }
    assert!(UnitOfWork::current().unwrap().same_as(&second));

    second.discard();
    first.discard();
}

#[test]
fn dropped_units_of_work_stop_being_current() {
    let (factory, _) = memory_factory();
    drop(factory.new_unit_of_work());

    assert!(UnitOfWork::current().is_none());
}

#[test]
fn prune_on_pause_drops_clean_entities() {
    let (factory, _) = seeded();
    let usecase = Usecase::new("batch").with_options(UnitOfWorkConfig {
        prune_on_pause: true,
        ..Default::default()
    });
    let uow = factory.new_unit_of_work_for(usecase);
    let alice = uow.find::<Person>("alice").unwrap();
    let bob = uow.find::<Person>("bob").unwrap();
    bob.set(Person::AGE, 26).unwrap();

    uow.pause().unwrap();
    assert!(uow.cached_state(alice.reference()).is_none());
    assert!(uow.cached_state(bob.reference()).is_some());

    // pruned entities reload on demand
    uow.resume().unwrap();
    assert_eq!(alice.get(Person::NAME).unwrap(), "Alice");
    assert_eq!(bob.get(Person::AGE).unwrap(), 26);
}

// ----------------------------------------------------------------------
// Metadata and metrics
// ----------------------------------------------------------------------

#[test]
fn usecase_and_time_are_fixed_at_open() {
    let (factory, _) = memory_factory();
    let before = Utc::now();
    let uow = factory.new_unit_of_work_for(Usecase::new("signup"));

    assert_eq!(uow.usecase().name, "signup");
    assert_eq!(uow.options(), factory.config().unit_of_work);
    assert!(uow.current_time() >= before);
    assert_eq!(uow.current_time(), uow.current_time());
    assert_eq!(factory.new_unit_of_work().usecase().name, Usecase::DEFAULT_NAME);
}

#[test]
fn factory_config_reaches_every_unit_of_work() {
    init_tracing();
    let config =
        RuntimeConfig::from_toml_str("[unit_of_work]\nprune_on_pause = true\n").unwrap();
    let factory = UnitOfWorkFactory::builder(Arc::new(MemoryEntityStore::new()))
        .config(config)
        .build();

    assert!(factory.new_unit_of_work().options().prune_on_pause);
}

#[test]
fn metrics_track_the_lifecycle() {
    init_tracing();
    let store = Arc::new(MemoryEntityStore::new());
    let metrics = Arc::new(CounterSink::new());
    let factory = UnitOfWorkFactory::builder(store)
        .metrics(metrics.clone())
        .build();
    seed(&factory, &[("alice", "Alice", 30)]);

    let uow = factory.new_unit_of_work();
    uow.find::<Person>("alice").unwrap();
    uow.discard();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.units_started, 2);
    assert_eq!(snapshot.units_completed, 1);
    assert_eq!(snapshot.units_discarded, 1);
    assert_eq!(snapshot.entities_created, 1);
    assert_eq!(snapshot.entities_loaded, 1);
}
