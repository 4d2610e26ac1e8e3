//! Rewrite rules, and the guarantee that rewriting never changes what a
//! shape enumerates.


use std::sync::Arc;

use graph_fixtures::{multiset, nodes, pairs, MemStore, PARENT};
use proptest::prelude::*;
use trellis_core::prelude::*;
use trellis_operators::materialize::Materialize;
use trellis_operators::value_filter::ValueFilter;
use trellis_operators::{BoxCursor, BoxProber, LeafShape, Shape};
use trellis_planner::{optimize, Optimizer};

fn fully(shape: Shape) -> Shape {
    Optimizer::default().optimize_fully(shape).unwrap()
}

#[test]
fn degenerate_bounds_are_elided() {
    let (s, changed) = optimize(nodes(&[1, 2]).limit(0)).unwrap();
    assert!(changed);
    assert!(matches!(s, Shape::Fixed(_)));

    let (s, _) = optimize(nodes(&[1, 2]).skip(0)).unwrap();
    assert!(matches!(s, Shape::Fixed(_)));

    let (s, changed) = optimize(nodes(&[1, 2]).limit(1)).unwrap();
    assert!(!changed);
    assert!(matches!(s, Shape::Limit(_)));
}

#[test]
fn empty_children_collapse() {
    assert!(fully(nodes(&[]).tagged("x")).is_null());
    assert!(fully(Shape::and(vec![nodes(&[1]), nodes(&[])])).is_null());
    assert!(fully(nodes(&[]).unique()).is_null());
    assert!(fully(nodes(&[]).limit(3)).is_null());
    assert!(fully(Shape::not(nodes(&[1]), nodes(&[]))).is_null());

    let store = MemStore::family();
    assert!(fully(nodes(&[]).sorted(store.clone())).is_null());
    assert!(fully(Shape::Null.recursive(store.out(PARENT), 0)).is_null());
    let filtered = ValueFilter::like(Shape::Null, store, "%");
    assert!(fully(Shape::ValueFilter(filtered)).is_null());
}

#[test]
fn or_drops_empty_subs() {
    let or = Shape::or(vec![nodes(&[]), nodes(&[1]), Shape::Null]);
    assert!(matches!(fully(or), Shape::Fixed(_)));

    let all_empty = Shape::short_circuit_or(vec![nodes(&[]), Shape::Null]);
    assert!(fully(all_empty).is_null());
}

#[test]
fn not_primary_is_materialized_once() {
    let cfg = ExecConfig {
        materialize_limit: 7,
        ..ExecConfig::default()
    };
    let opt = Optimizer::new(&cfg);
    let shape = opt
        .optimize_fully(Shape::not(nodes(&[2]), nodes(&[1, 2, 3])))
        .unwrap();
    let Shape::Not(not) = &shape else {
        panic!("expected Not, got {shape:?}");
    };
    let Shape::Materialize(m) = &*not.primary else {
        panic!("primary not materialized: {shape:?}");
    };
    assert_eq!(m.limit, 7);
    assert!(matches!(&*m.sub, Shape::Fixed(_)));

    let (_, changed) = opt.optimize(shape).unwrap();
    assert!(!changed);
}

#[test]
fn nested_materialize_collapses() {
    let inner = Shape::Materialize(Materialize::with_limit(nodes(&[1]), 5));
    let outer = Shape::Materialize(Materialize::with_limit(inner, 7));
    let Shape::Materialize(m) = fully(outer) else {
        panic!("expected Materialize");
    };
    assert_eq!(m.limit, 7);
    assert!(matches!(&*m.sub, Shape::Fixed(_)));
}

#[test]
fn nested_materialize_keeps_folding_order() {
    // Three pairs: the outer cache fits them, the inner one does not.
    let input = Shape::or(vec![nodes(&[1, 2]).tagged("a"), nodes(&[1]).tagged("b")]);
    let nested = Shape::Materialize(Materialize::with_limit(
        Shape::Materialize(Materialize::with_limit(input, 1)),
        10,
    ));
    let first_two = |s: Shape| pairs(s.limit(2).cursor());
    let collapsed = fully(nested.clone());
    assert_eq!(first_two(collapsed), first_two(nested));
}

#[test]
fn not_without_primary_is_its_universe() {
    let not = Shape::not(nodes(&[]).tagged("x"), nodes(&[1, 2]));
    let shape = fully(not);
    assert!(matches!(shape, Shape::Fixed(_)));
    let (_, changed) = optimize(shape).unwrap();
    assert!(!changed);
}

struct Precomputed(Shape);

impl LeafShape for Precomputed {
    fn name(&self) -> &'static str {
        "precomputed"
    }

    fn cursor(&self) -> BoxCursor {
        self.0.cursor()
    }

    fn prober(&self) -> BoxProber {
        self.0.prober()
    }

    fn stats(&self) -> Result<Costs> {
        Ok(Costs::new(10, 10, self.0.stats()?.size))
    }

    fn optimize(&self) -> Result<Option<Shape>> {
        Ok(Some(self.0.clone()))
    }
}

#[test]
fn leaves_rewrite_themselves() {
    let leaf = Shape::Leaf(Arc::new(Precomputed(nodes(&[4, 5]))));
    let shape = fully(Shape::and(vec![leaf, nodes(&[5])]));
    let Shape::And(and) = shape else {
        panic!("expected And");
    };
    assert!(and.subs.iter().all(|s| matches!(s, Shape::Fixed(_))));
}

#[test]
fn pass_limit_is_respected() {
    let opt = Optimizer {
        materialize_limit: 10,
        max_passes: 1,
        preserve_order: false,
    };
    // The leaf rewrite happens in pass one; collapsing the empty result
    // would need a second pass.
    let leaf = Shape::Leaf(Arc::new(Precomputed(nodes(&[]))));
    let shape = opt.optimize_fully(leaf.tagged("x")).unwrap();
    assert!(matches!(shape, Shape::Tag(_)));
    assert!(fully(shape).is_null());
}

#[test]
fn optimizer_picks_the_smallest_driver() {
    let store = MemStore::family();
    let big = store.nodes(&["alice", "bob", "charlie", "dani", "emily"]);
    let small = store.nodes(&["dani"]);
    let Shape::And(and) = fully(Shape::and(vec![big, small])) else {
        panic!("expected And");
    };
    assert_eq!(and.subs[0].stats().unwrap().size.value, 1);
}

// Random shape trees over the family store's nodes. Tags always bind the
// result itself, so reordering And subs cannot change the bindings.
// Recursive seeds stay untagged for the same reason: their tags would bind
// the root instead.

const NAMES: [&str; 5] = ["alice", "bob", "dani", "fred", "nobody"];

fn leaf() -> impl Strategy<Value = Shape> {
    let fixed = prop::collection::vec(1u64..9, 0..5).prop_map(|ids| nodes(&ids));
    let resolved = prop::collection::vec(prop::sample::select(NAMES.to_vec()), 0..4)
        .prop_map(|names| Shape::resolver(MemStore::family(), names.into_iter().map(Value::raw)));
    let closure = (prop::collection::vec(1u64..9, 0..4), 1usize..4)
        .prop_map(|(ids, depth)| nodes(&ids).recursive(MemStore::family().out(PARENT), depth));
    (prop_oneof![3 => fixed, 1 => resolved, 1 => closure], 0usize..3)
        .prop_map(|(s, t)| s.tagged(format!("t{t}")))
}

fn set_tree() -> impl Strategy<Value = Shape> {
    leaf().prop_recursive(3, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Shape::and),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Shape::or),
            prop::collection::vec(inner.clone(), 1..3).prop_map(Shape::short_circuit_or),
            (inner.clone(), -1i64..3).prop_map(|(s, n)| s.limit(n)),
            (inner.clone(), -1i64..3).prop_map(|(s, n)| s.skip(n)),
            inner.clone().prop_map(Shape::unique),
            inner.clone().prop_map(|s| s.sorted(MemStore::family())),
            inner
                .clone()
                .prop_map(|s| Shape::ValueFilter(ValueFilter::like(s, MemStore::family(), "%a%"))),
            (inner.clone(), 0usize..4)
                .prop_map(|(s, limit)| Shape::Materialize(Materialize::with_limit(s, limit))),
            (inner.clone(), inner.clone()).prop_map(|(p, u)| Shape::not(p, u)),
            inner.prop_map(Shape::count),
        ]
    })
}

fn any_shape() -> impl Strategy<Value = Shape> {
    prop_oneof![
        set_tree(),
        (set_tree(), set_tree()).prop_map(|(p, u)| Shape::not(p, u)),
        set_tree().prop_map(Shape::count),
        (set_tree(), 1i64..4).prop_map(|(s, n)| s.limit(n)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn optimizing_preserves_enumerated_pairs(shape in any_shape()) {
        let before = multiset(pairs(shape.cursor()));
        let optimized = fully(shape);
        let after = multiset(pairs(optimized.cursor()));
        prop_assert_eq!(before, after);
    }

    #[test]
    fn materialize_fallback_preserves_pairs(shape in set_tree(), limit in 0usize..4) {
        let before = multiset(pairs(shape.cursor()));
        let cached = Shape::Materialize(Materialize::with_limit(shape, limit));
        prop_assert_eq!(before, multiset(pairs(cached.cursor())));
    }

    #[test]
    fn optimizing_twice_changes_nothing(shape in any_shape()) {
        let once = fully(shape);
        let (_, changed) = Optimizer::default().optimize(once).unwrap();
        prop_assert!(!changed);
    }
}
