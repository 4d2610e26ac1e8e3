//! Fixpoint closure over the family graph.


use std::collections::BTreeSet;

use graph_fixtures::{pairs, results, MemStore, PARENT};
use trellis_core::prelude::*;
use trellis_operators::recursive::Recursive;
use trellis_operators::{Base, Cursor, Prober, Shape, RECURSIVE_BASE_TAG};

fn names(store: &MemStore, refs: &[Ref]) -> BTreeSet<String> {
    store.names(refs).into_iter().collect()
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn closure_from_alice_terminates_despite_the_cycle() {
    graph_fixtures::init_tracing();
    let store = MemStore::family();
    let shape = store.nodes(&["alice"]).recursive(store.out(PARENT), 0);

    let got = results(shape.cursor());
    assert_eq!(got.len(), 4, "each value once: {:?}", store.names(&got));
    assert_eq!(names(&store, &got), set(&["bob", "charlie", "dani", "emily"]));
}

#[test]
fn start_reachable_through_a_cycle_is_reported() {
    let store = MemStore::family();
    let shape = store.nodes(&["bob"]).recursive(store.out(PARENT), 0);
    let got = results(shape.cursor());
    assert_eq!(got.len(), 4);
    assert_eq!(names(&store, &got), set(&["bob", "charlie", "dani", "emily"]));
}

#[test]
fn prober_pulls_the_closure_forward() {
    let store = MemStore::family();
    let shape = store.nodes(&["alice"]).recursive(store.out(PARENT), 0);
    let mut p = shape.prober();
    assert!(p.contains(&store.node("emily")));
    assert!(p.contains(&store.node("bob")));
    assert!(!p.contains(&store.node("fred")));
    assert!(!p.contains(&store.node("alice")));
    p.close().unwrap();
}

#[test]
fn every_root_binding_becomes_a_path() {
    let store = MemStore::family();
    // fred and greg both reach alice, so alice seeds the closure with two
    // bindings of `person`.
    let seed = (store.out(PARENT))(store.nodes(&["fred", "greg"]).tagged("person"));
    let shape = seed.recursive(store.out(PARENT), 0);

    let got = pairs(shape.cursor());
    assert_eq!(got.len(), 8);
    let fred = store.node("fred");
    let greg = store.node("greg");
    for (r, tags) in &got {
        assert!(!tags.contains_key(RECURSIVE_BASE_TAG));
        let who = tags.get("person").unwrap_or_else(|| panic!("{r} lost its binding"));
        assert!(who == &fred || who == &greg);
    }
    let results: Vec<Ref> = got.into_iter().map(|(r, _)| r).collect();
    assert_eq!(names(&store, &results), set(&["bob", "charlie", "dani", "emily"]));
}

#[test]
fn depth_tags_and_depth_bound() {
    let store = MemStore::family();
    let mut r = Recursive::new(store.nodes(&["alice"]), store.out(PARENT), 0);
    r.add_depth_tag("depth");
    r.add_depth_tag("hops");

    for (found, tags) in pairs(Shape::Recursive(r).cursor()) {
        let expected = match store.name(&found).as_str() {
            "bob" => 1,
            "charlie" => 2,
            "dani" => 3,
            "emily" => 4,
            other => panic!("unexpected {other}"),
        };
        assert_eq!(tags.get("depth"), Some(&Ref::PreFetched(Value::Int(expected))));
        assert_eq!(tags.get("hops"), tags.get("depth"));
    }

    let shallow = store.nodes(&["alice"]).recursive(store.out(PARENT), 2);
    let got = results(shallow.cursor());
    assert_eq!(names(&store, &got), set(&["bob", "charlie"]));
}

#[test]
fn arena_snapshot_serializes() {
    let store = MemStore::family();
    let r = Recursive::new(store.nodes(&["alice"]), store.out(PARENT), 0);
    let mut c = r.cursor();
    while c.next() {}
    assert!(c.err().is_none());

    let arena = c.arena_snapshot();
    assert_eq!(arena.len(), 4);
    assert_eq!(arena[0].depth, 1);
    assert_eq!(arena[0].base, store.node("alice"));
    // Every record points at a depth-1 ancestor.
    for d in arena {
        assert_eq!(arena[d.anchor].depth, 1);
    }

    let json = serde_json::to_value(arena).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(4));
    assert_eq!(json[0]["depth"], 1);
    c.close().unwrap();
}

#[test]
fn empty_start_yields_nothing() {
    let store = MemStore::family();
    let shape = Shape::Null.recursive(store.out(PARENT), 0);
    assert!(results(shape.cursor()).is_empty());
}

#[test]
fn stats_are_pessimistic() {
    let store = MemStore::family();
    let start = store.nodes(&["alice"]);
    let closure = start.clone().recursive(store.out(PARENT), 0);
    let one_hop = (store.out(PARENT))(start);
    let c = closure.stats().unwrap();
    let h = one_hop.stats().unwrap();
    assert!(c.size.value > h.size.value);
    assert!(!c.size.exact);
}
