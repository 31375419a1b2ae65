mod common;

use common::{Person, alice_and_bob, names};
use keel::prelude::*;

#[test]
fn in_memory_round_trip() {
    let factory = alice_and_bob();
    let uow = factory.new_unit_of_work();

    let named = QueryBuilder::<Person>::new().filter(Person::NAME.eq("Alice"));
    let found = uow.new_query(&named).list().expect("query should run");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get(Person::AGE).expect("age should be readable"), 30);

    let older = QueryBuilder::<Person>::new().filter(Person::AGE.gt(26));
    assert_eq!(
        names(&uow.new_query(&older).list().expect("query should run")),
        ["Alice"]
    );

    let all = QueryBuilder::<Person>::new();
    assert_eq!(uow.new_query(&all).count().expect("count should run"), 2);

    let mut by_age = uow.new_query(&all);
    by_age.order_by([Person::AGE.asc()]);
    let ordered = by_age
        .iter()
        .expect("query should run")
        .collect::<Result<Vec<_>, _>>()
        .expect("results should resolve");
    assert_eq!(names(&ordered), ["Bob", "Alice"]);
}

#[test]
fn one_tree_many_bindings() {
    let factory = alice_and_bob();
    let uow = factory.new_unit_of_work();
    let builder = QueryBuilder::<Person>::new().filter(Person::NAME.eq_var("n"));
    let mut query = uow.new_query(&builder);

    query.set_variable("n", "Alice");
    let alice = query.find().expect("query should run").expect("alice should match");
    assert_eq!(alice.get(Person::AGE).expect("age should be readable"), 30);

    query.set_variable("n", "Bob");
    let bob = query.find().expect("query should run").expect("bob should match");
    assert_eq!(bob.get(Person::AGE).expect("age should be readable"), 25);
    assert_eq!(query.predicate(), builder.predicate());
}

#[test]
fn unbound_variables_are_rejected() {
    let factory = alice_and_bob();
    let uow = factory.new_unit_of_work();
    let builder = QueryBuilder::<Person>::new().filter(Person::AGE.gte_var("min"));

    let err = keel::Error::from(
        uow.new_query(&builder)
            .list()
            .expect_err("unbound variable should fail"),
    );
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert_eq!(err.origin, keel::ErrorOrigin::Query);
}

#[test]
fn query_results_share_the_identity_map() {
    let factory = alice_and_bob();
    let uow = factory.new_unit_of_work();
    let alice = uow.find::<Person>("alice").expect("alice should load");
    alice.set(Person::NAME, "Alicia").expect("name should be writable");

    // the finder matches committed state; the handle shows the local edit
    let builder = QueryBuilder::<Person>::new().filter(Person::NAME.eq("Alice"));
    let hit = uow
        .new_query(&builder)
        .find()
        .expect("query should run")
        .expect("committed name should match");
    assert_eq!(hit, alice);
    assert_eq!(hit.get(Person::NAME).expect("name should be readable"), "Alicia");
}

#[test]
fn association_paths_filter_by_related_fields() {
    let factory = alice_and_bob();
    let uow = factory.new_unit_of_work();
    let alice = uow.find::<Person>("alice").expect("alice should load");
    let bob = uow.find::<Person>("bob").expect("bob should load");
    alice
        .set_association(Person::FRIEND, Some(&bob))
        .expect("friend should be writable");
    uow.complete().expect("commit should succeed");

    let uow = factory.new_unit_of_work();
    let friends_of_bob = QueryBuilder::<Person>::new()
        .filter(Person::FRIEND.then(Person::NAME).eq("Bob") & Person::AGE.gte(18));
    assert_eq!(
        names(&uow.new_query(&friends_of_bob).list().expect("query should run")),
        ["Alice"]
    );

    let loners = QueryBuilder::<Person>::new().filter(Person::FRIEND.is_null());
    assert_eq!(
        names(&uow.new_query(&loners).list().expect("query should run")),
        ["Bob"]
    );
}

#[test]
fn in_process_queries_use_the_same_trees() {
    let factory = alice_and_bob();
    let uow = factory.new_unit_of_work();
    let people = vec![
        uow.find::<Person>("alice").expect("alice should load"),
        uow.find::<Person>("bob").expect("bob should load"),
    ];

    let builder =
        QueryBuilder::<Person>::new().filter(Person::AGE.lt(30) | Person::NAME.matches("^A"));
    let mut query = builder.new_query_over(people);
    query.order_by([Person::NAME.desc()]).max_results(1);

    assert_eq!(names(&query.list().expect("query should run")), ["Bob"]);
    assert_eq!(query.count().expect("count should run"), 2);
}
