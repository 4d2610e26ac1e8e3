//! Behaviour of the boolean and bounding combinators over fixed inputs.


use std::sync::Arc;

use graph_fixtures::{ids, nodes, pairs, results, MemStore};
use trellis_core::prelude::*;
use trellis_operators::value_filter::{CompareOp, ValueFilter};
use trellis_operators::{Base, Cursor, Prober, Shape};

#[test]
fn and_intersects() {
    let and = Shape::and(vec![nodes(&[1, 2, 3]), nodes(&[2, 4])]);
    assert_eq!(ids(&results(and.cursor())), vec![2]);

    let mut p = and.prober();
    assert!(p.contains(&Ref::node(2)));
    assert!(!p.contains(&Ref::node(3)));
    p.close().unwrap();
}

#[test]
fn plain_or_concatenates() {
    let or = Shape::or(vec![nodes(&[1, 2, 3]), nodes(&[3, 9, 20, 21])]);
    assert_eq!(ids(&results(or.cursor())), vec![1, 2, 3, 3, 9, 20, 21]);
}

#[test]
fn short_circuit_or_stops_at_first_productive_sub() {
    let sc = Shape::short_circuit_or(vec![nodes(&[1, 2, 3]), nodes(&[3, 9, 20, 21])]);
    assert_eq!(ids(&results(sc.cursor())), vec![1, 2, 3]);

    let sc = Shape::short_circuit_or(vec![nodes(&[]), nodes(&[3, 9, 20, 21])]);
    assert_eq!(ids(&results(sc.cursor())), vec![3, 9, 20, 21]);
}

#[test]
fn short_circuit_or_prober_uses_first_matching_sub() {
    let sc = Shape::short_circuit_or(vec![nodes(&[1, 2]), nodes(&[3])]);
    let mut p = sc.prober();
    assert!(p.contains(&Ref::node(2)));
    assert!(p.contains(&Ref::node(3)));
    assert!(!p.contains(&Ref::node(4)));
}

#[test]
fn not_is_restartable() {
    let not = Shape::not(nodes(&[2, 4]), nodes(&[1, 2, 3, 4]));
    assert_eq!(ids(&results(not.cursor())), vec![1, 3]);
    assert_eq!(ids(&results(not.cursor())), vec![1, 3]);

    let mut p = not.prober();
    assert!(p.contains(&Ref::node(3)));
    assert!(!p.contains(&Ref::node(2)));
}

#[test]
fn unique_keeps_first_occurrences_and_drops_paths() {
    let shape = nodes(&[1, 2, 3, 3, 2]).tagged("x").unique();
    let mut c = shape.cursor();
    let mut seen = Vec::new();
    while c.next() {
        seen.extend(c.result().cloned());
        assert!(!c.next_path());
    }
    c.close().unwrap();
    assert_eq!(ids(&seen), vec![1, 2, 3]);
}

#[test]
fn limit_and_skip() {
    let five = nodes(&[1, 2, 3, 4, 5]);
    assert_eq!(ids(&results(five.clone().limit(3).cursor())), vec![1, 2, 3]);
    assert_eq!(ids(&results(five.clone().limit(0).cursor())).len(), 5);
    assert_eq!(ids(&results(five.clone().skip(3).cursor())), vec![4, 5]);
    assert!(results(five.skip(10).cursor()).is_empty());
}

#[test]
fn skip_counts_paths_like_count_does() {
    // The folded 1 is one result with two paths.
    let skipped = nodes(&[1, 1, 2]).materialize().skip(1);
    let drained = pairs(skipped.cursor()).len() as i64;
    assert_eq!(drained, 2);
    assert_eq!(skipped.stats().unwrap().size, Size::exact(drained));
    let count = results(skipped.count().cursor());
    assert_eq!(count, vec![Ref::PreFetched(Value::Int(drained))]);
}

#[test]
fn resolver_maps_values_to_store_refs() {
    let store = MemStore::family();
    let values = ["alice", "nobody", "dani", "alice"].map(Value::raw);
    let shape = Shape::resolver(store.clone(), values);
    let got = results(shape.cursor());
    assert_eq!(store.names(&got), vec!["alice", "dani", "alice"]);

    let mut p = shape.prober();
    assert!(p.contains(&store.node("alice")));
    assert!(p.next_path());
    assert!(!p.next_path());
    assert!(p.contains(&store.node("dani")));
    assert!(!p.next_path());
    assert!(!p.contains(&store.node("bob")));
    assert!(!p.contains(&Ref::pre_fetched(Value::raw("dani"))));
    p.close().unwrap();
}

#[test]
fn resolver_joins_store_shapes() {
    let store = MemStore::family();
    let parents = Shape::resolver(store.clone(), ["fred", "greg", "bob"].map(Value::raw));
    let children = (store.out(graph_fixtures::PARENT))(parents);
    let alices = Shape::and(vec![children, store.nodes(&["alice"])]);
    assert_eq!(store.names(&results(alices.cursor())), vec!["alice", "alice"]);
}

#[test]
fn count_of_an_intersection() {
    let count = Shape::and(vec![nodes(&[1, 2, 3]), nodes(&[2, 4])]).count();
    let got = results(count.cursor());
    assert_eq!(got, vec![Ref::PreFetched(Value::Int(1))]);

    let mut p = count.prober();
    assert!(p.contains(&Ref::PreFetched(Value::Int(1))));
    assert!(!p.contains(&Ref::PreFetched(Value::Int(2))));
}

#[test]
fn tags_survive_intersection() {
    let and = Shape::and(vec![
        nodes(&[1, 2, 3]).tagged("left"),
        nodes(&[3, 2]).tagged("right"),
    ]);
    let got = pairs(and.cursor());
    assert_eq!(got.len(), 2);
    for (r, tags) in got {
        assert_eq!(tags.get("left"), Some(&r));
        assert_eq!(tags.get("right"), Some(&r));
    }
}

#[test]
fn duplicate_matches_become_paths() {
    // The checker sees 2 twice, so the single driver result has two paths.
    let and = Shape::and(vec![nodes(&[2]).tagged("a"), nodes(&[2, 2]).tagged("b")]);
    let got = pairs(and.cursor());
    assert_eq!(got.len(), 2);
}

#[test]
fn materialize_matches_its_fallback() {
    let input = Shape::or(vec![
        nodes(&[1, 2, 3]).tagged("a"),
        nodes(&[2, 5]).tagged("b"),
    ]);
    let cached = pairs(
        Shape::Materialize(trellis_operators::materialize::Materialize::with_limit(
            input.clone(),
            100,
        ))
        .cursor(),
    );
    let fallback = pairs(
        Shape::Materialize(trellis_operators::materialize::Materialize::with_limit(
            input, 2,
        ))
        .cursor(),
    );
    assert_eq!(
        graph_fixtures::multiset(cached),
        graph_fixtures::multiset(fallback)
    );
}

#[test]
fn sort_orders_by_name() {
    let store = MemStore::family();
    let shape = store
        .nodes(&["emily", "bob", "dani", "alice"])
        .sorted(store.clone() as Arc<dyn Namer>);
    let got = results(shape.cursor());
    assert_eq!(store.names(&got), vec!["alice", "bob", "dani", "emily"]);
}

#[test]
fn value_filters() {
    let store = MemStore::family();
    let namer = store.clone() as Arc<dyn Namer>;
    let people = store.nodes(&["alice", "bob", "charlie", "dani"]);

    let after_b = Shape::ValueFilter(ValueFilter::comparison(
        people.clone(),
        Arc::clone(&namer),
        CompareOp::Gt,
        Value::raw("bob"),
    ));
    assert_eq!(store.names(&results(after_b.cursor())), vec!["charlie", "dani"]);

    let like = Shape::ValueFilter(ValueFilter::like(people, namer, "%li%"));
    assert_eq!(store.names(&results(like.cursor())), vec!["alice", "charlie"]);
}

#[test]
fn backend_errors_are_sticky_and_returned_by_close() {
    let store = MemStore::family();
    let people = store.nodes(&["alice", "bob"]);
    store.fail_names("disk on fire");
    let shape = people.sorted(store.clone() as Arc<dyn Namer>);

    let mut c = shape.cursor();
    assert!(!c.next());
    assert_eq!(c.err(), Some(&Error::backend("disk on fire")));
    assert!(!c.next());
    assert_eq!(c.close(), Err(Error::backend("disk on fire")));
}
