//! End-to-end runs through the execution chain.


use std::collections::BTreeMap;
use std::sync::Arc;

use graph_fixtures::{nodes, MemStore, PARENT};
use tokio::sync::mpsc;
use trellis_core::prelude::*;
use trellis_exec::{CancellationToken, Chain, ExecContext};
use trellis_operators::{Shape, RECURSIVE_BASE_TAG};

fn family_closure(store: &Arc<MemStore>) -> Shape {
    store.nodes(&["alice"]).recursive(store.out(PARENT), 0)
}

#[test]
fn all_and_first() {
    let shape = Shape::and(vec![nodes(&[1, 2, 3]), nodes(&[3, 2])]);
    let all = Chain::new(shape.clone()).all().unwrap();
    assert_eq!(all.len(), 2);
    let first = Chain::new(shape).first().unwrap();
    assert!(first.is_some());
    assert!(Chain::new(Shape::Null).first().unwrap().is_none());
}

#[test]
fn optimized_and_raw_runs_agree() {
    let store = MemStore::family();
    let shape = Shape::not(store.nodes(&["bob", "dani"]), family_closure(&store));
    let mut fast = Chain::new(shape.clone()).on(store.clone()).all_values().unwrap();
    let mut slow = Chain::new(shape).unoptimized().on(store).all_values().unwrap();
    fast.sort();
    slow.sort();
    assert_eq!(fast, slow);
    assert_eq!(fast, vec![Value::raw("charlie"), Value::raw("emily")]);
}

#[test]
fn paths_can_be_suppressed() {
    let store = MemStore::family();
    let seed = (store.out(PARENT))(store.nodes(&["fred", "greg"]).tagged("person"));
    let shape = seed.recursive(store.out(PARENT), 0);

    assert_eq!(Chain::new(shape.clone()).all().unwrap().len(), 8);
    assert_eq!(Chain::new(shape.clone()).paths(false).all().unwrap().len(), 4);
    assert_eq!(Chain::new(shape).limit(5).all().unwrap().len(), 5);
}

#[test]
fn count_drains_when_stats_are_estimates() {
    let store = MemStore::family();
    assert_eq!(Chain::new(family_closure(&store)).count().unwrap(), 4);
    assert_eq!(Chain::new(nodes(&[4, 5, 6])).count().unwrap(), 3);
}

#[test]
fn tag_each_hides_internal_tags() {
    let shape = nodes(&[1, 2]).tagged("n").tagged(RECURSIVE_BASE_TAG);
    let mut seen = Vec::new();
    Chain::new(shape)
        .tag_each(|tags| seen.push(tags.clone()))
        .unwrap();
    assert_eq!(seen.len(), 2);
    for tags in seen {
        assert!(tags.contains_key("n"));
        assert!(!tags.contains_key(RECURSIVE_BASE_TAG));
    }
}

#[test]
fn tag_values_resolve_bindings() {
    let store = MemStore::family();
    let seed = (store.out(PARENT))(store.nodes(&["fred"]).tagged("person"));
    let shape = seed.tagged("start");
    let mut got: Vec<BTreeMap<String, Value>> = Vec::new();
    Chain::new(shape)
        .on(store)
        .tag_values(|m| got.push(m.clone()))
        .unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0]["person"], Value::raw("fred"));
    assert_eq!(got[0]["start"], Value::raw("alice"));
}

#[test]
fn value_operations() {
    let store = MemStore::family();
    let closure = family_closure(&store);

    let mut pairs = Vec::new();
    Chain::new(closure.clone())
        .on(store.clone())
        .each_value_pair(|r, v| pairs.push((r.clone(), v.clone())))
        .unwrap();
    assert_eq!(pairs.len(), 4);
    for (r, v) in &pairs {
        assert_eq!(store.name(r), v.lexical());
    }

    let first = Chain::new(closure).on(store.clone()).first_value().unwrap();
    assert!(first.is_some());

    // Refs the store cannot name are skipped, not reported.
    let unknown = Shape::fixed([Ref::quad(999), store.node("alice")]);
    let named = Chain::new(unknown).on(store).all_values().unwrap();
    assert_eq!(named, vec![Value::raw("alice")]);
}

#[test]
fn missing_namer_is_a_distinct_error() {
    let shape = nodes(&[1]);
    assert_eq!(Chain::new(shape.clone()).all_values(), Err(Error::NoNamer));
    assert_eq!(Chain::new(shape.clone()).first_value(), Err(Error::NoNamer));
    assert_eq!(Chain::new(shape).tag_values(|_| {}), Err(Error::NoNamer));
}

#[test]
fn backend_failures_reach_the_caller() {
    let store = MemStore::family();
    let shape = store.nodes(&["alice", "bob"]);
    store.fail_names("index corrupt");
    let err = Chain::new(shape).on(store).all_values().unwrap_err();
    assert_eq!(err, Error::backend("index corrupt"));
}

#[test]
fn cancellation_mid_iteration() {
    let token = CancellationToken::new();
    let ctx = ExecContext::with_token(token.clone());
    let mut seen = 0;
    let err = Chain::new(nodes(&[1, 2, 3, 4, 5]))
        .with_context(ctx)
        .each(|_| {
            seen += 1;
            if seen == 2 {
                token.cancel();
            }
        })
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);
    assert_eq!(seen, 2);
}

#[test]
fn zero_optimizer_passes_is_a_config_error() {
    let cfg = ExecConfig {
        max_optimize_passes: 0,
        ..ExecConfig::default()
    };
    let err = Chain::new(nodes(&[1])).with_config(cfg).all().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn explain_serializes() {
    let store = MemStore::family();
    let explain = Chain::new(family_closure(&store)).explain().unwrap();
    assert_eq!(explain.plan.kind, "recursive");
    assert_eq!(explain.estimate.nodes, explain.plan.node_count());
    let json = serde_json::to_value(&explain).unwrap();
    assert_eq!(json["plan"]["kind"], "recursive");
}

#[tokio::test]
async fn send_delivers_every_result() {
    let (tx, mut rx) = mpsc::channel(2);
    let chain = Chain::new(nodes(&[1, 2, 3, 4, 5]));
    let producer = async move {
        let res = chain.send(&tx).await;
        drop(tx);
        res
    };
    let consumer = async {
        let mut got = Vec::new();
        while let Some(r) = rx.recv().await {
            got.push(r);
        }
        got
    };
    let (res, got) = tokio::join!(producer, consumer);
    res.unwrap();
    assert_eq!(graph_fixtures::ids(&got), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn send_stops_when_the_receiver_leaves() {
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let err = Chain::new(nodes(&[1, 2])).send(&tx).await.unwrap_err();
    assert_eq!(err, Error::ChannelClosed);
}

#[tokio::test]
async fn send_honours_cancellation_while_blocked() {
    let (tx, _rx) = mpsc::channel(1);
    let token = CancellationToken::new();
    let chain = Chain::new(nodes(&[1, 2, 3])).with_context(ExecContext::with_token(token.clone()));
    let cancel = async {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        token.cancel();
    };
    // The channel holds one value; the second send blocks until cancelled.
    let (res, ()) = tokio::join!(chain.send(&tx), cancel);
    assert_eq!(res, Err(Error::Cancelled));
}

#[tokio::test]
async fn send_values_needs_a_namer() {
    let (tx, _rx) = mpsc::channel(4);
    let err = Chain::new(nodes(&[1])).send_values(&tx).await.unwrap_err();
    assert_eq!(err, Error::NoNamer);

    let store = MemStore::family();
    let (tx, mut rx) = mpsc::channel(4);
    Chain::new(store.nodes(&["dani", "emily"]))
        .on(store)
        .send_values(&tx)
        .await
        .unwrap();
    drop(tx);
    let mut got = Vec::new();
    while let Some(v) = rx.recv().await {
        got.push(v);
    }
    assert_eq!(got, vec![Value::raw("dani"), Value::raw("emily")]);
}
