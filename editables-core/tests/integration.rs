//! Integration Tests for Editables
//!
//! These tests drive cells, scopes and facades together through the public
//! API, the way an application would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use editables_core::reactive::{Effect, SubscriberId};
use editables_core::{
    EditError, EditOptions, EditablesConfig, Object, Observable, ScalarEquality, ScopeRegistry,
    Value,
};
use serde_json::json;

/// Applying the extension twice returns the same handle and keeps the open
/// transaction untouched.
#[test]
fn idempotent_wrap() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new("A");

    let first = registry.extend(&cell, true);
    first.begin_edit();
    cell.set("B");

    let second = registry.extend(&cell, EditOptions::in_scope("other"));

    assert!(first.ptr_eq(&second));
    assert!(second.in_transaction());
    assert_eq!(second.old_value(), Value::from("A"));
    assert!(!registry.contains("other"));
}

#[test]
fn double_begin_keeps_the_first_baseline() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new("B0");
    let editable = registry.extend(&cell, true);

    editable.begin_edit();
    cell.set("V1");
    editable.begin_edit();

    assert_eq!(editable.old_value(), Value::from("B0"));
}

#[test]
fn rollback_restores_and_closes() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new("A");
    let editable = registry.extend(&cell, true);

    editable.begin_edit();
    cell.set("B");
    editable.rollback();

    assert_eq!(cell.get(), Value::from("A"));
    assert!(!editable.in_transaction());
}

#[test]
fn commit_keeps_and_closes() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new("A");
    let editable = registry.extend(&cell, true);

    editable.begin_edit();
    cell.set("B");
    editable.commit();

    assert_eq!(cell.get(), Value::from("B"));
    assert!(!editable.in_transaction());

    editable.rollback();
    assert_eq!(cell.get(), Value::from("B"));
}

#[test]
fn has_changes_for_scalars() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new("A");
    let editable = registry.extend(&cell, true);

    editable.begin_edit();
    assert!(!editable.has_changes());

    cell.set("B");
    assert!(editable.has_changes());

    cell.set("A");
    assert!(!editable.has_changes());
}

#[test]
fn has_changes_for_sequences() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new(vec![1, 2, 3]);
    let editable = registry.extend(&cell, true);

    editable.begin_edit();
    cell.set(vec![1, 2, 3]);
    assert!(!editable.has_changes());

    cell.set(vec![1, 2]);
    assert!(editable.has_changes());
}

#[test]
fn loose_and_strict_scalar_policies() {
    let loose = ScopeRegistry::new();
    let strict = ScopeRegistry::with_config(
        EditablesConfig::from_json(r#"{ "scalar_equality": "strict" }"#).unwrap(),
    );
    assert_eq!(strict.config().scalar_equality, ScalarEquality::Strict);

    for (registry, expect_changes) in [(loose, false), (strict, true)] {
        let cell = Observable::new(0);
        let editable = registry.extend(&cell, true);
        editable.begin_edit();
        cell.set("0");
        assert_eq!(editable.has_changes(), expect_changes);
    }
}

#[test]
fn scope_aggregation() {
    let registry = ScopeRegistry::new();
    let a = Observable::new(1);
    let b = Observable::new(2);
    let edited = registry.extend(&a, EditOptions::in_scope("S"));
    registry.extend(&b, EditOptions::in_scope("S"));

    registry.begin_edit("S").unwrap();
    a.set(10);
    assert!(registry.has_changes("S").unwrap());

    edited.rollback();
    assert!(!registry.has_changes("S").unwrap());

    a.set(11);
    assert!(!registry.has_changes("S").unwrap());

    registry.begin_edit("S").unwrap();
    b.set(20);
    assert!(registry.has_changes("S").unwrap());
    registry.commit("S").unwrap();
    assert!(!registry.has_changes("S").unwrap());
    assert_eq!(b.get(), Value::from(20));
}

#[test]
fn scopes_are_independent() {
    let registry = ScopeRegistry::new();
    let orders = Observable::new("o");
    let users = Observable::new("u");
    registry.extend(&orders, EditOptions::in_scope("orders"));
    registry.extend(&users, EditOptions::in_scope("users"));

    registry.begin_edit("orders").unwrap();
    registry.begin_edit("users").unwrap();
    orders.set("o2");
    users.set("u2");

    registry.rollback("orders").unwrap();
    assert_eq!(orders.get(), Value::from("o"));
    assert_eq!(users.get(), Value::from("u2"));
    assert!(registry.has_changes("users").unwrap());
}

#[test]
fn unknown_scope_fails() {
    let registry = ScopeRegistry::new();
    let err = registry.has_changes("doesNotExist").unwrap_err();
    assert!(matches!(err, EditError::UnknownScope(_)));
    assert_eq!(err.to_string(), "unknown editable scope: ScopeId(\"doesNotExist\")");
}

/// A self-referencing graph is walked to completion and every reachable
/// writable cell is wrapped exactly once.
#[test]
fn graph_walk_terminates_on_cycles() {
    let registry = ScopeRegistry::new();
    let root = Object::from_json_observables(&json!({
        "name": "Ann",
        "address": { "city": "Kyiv", "zip": "01001" }
    }));
    let address = root.get("address").unwrap().unwrap_value();
    let address = address.as_object().unwrap().clone();
    address.set("owner", root.clone());
    root.set("self", Observable::new(root.clone()));

    let facade = registry.attach(&root, true);

    // name, city, zip and the cell holding the self reference
    assert_eq!(facade.len(), 4);
    let mut ids: Vec<u64> = facade.members().iter().map(|e| e.id()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    let found = registry.enable(&root, "again");
    assert_eq!(found.len(), 4);
    assert!(found.iter().zip(facade.members()).all(|(a, b)| a.ptr_eq(&b)));
}

#[test]
fn facade_composition() {
    let registry = ScopeRegistry::new();
    let first = Observable::new("Ann");
    let city = Observable::new("Kyiv");
    let qty = Observable::new(1);
    let root = Object::new()
        .with("first", first.clone())
        .with("address", Object::new().with("city", city.clone()))
        .with("lines", Value::from(vec![Object::new().with("qty", qty.clone())]))
        .with("label", editables_core::reactive::Memo::new(|| Value::from("computed")));

    let facade = registry.attach(&root, true);
    assert_eq!(facade.len(), 3);
    assert!(!facade.has_changes());

    facade.begin_edit();
    assert!(!facade.has_changes());

    city.set("Lviv");
    assert!(facade.has_changes());

    first.set("Bob");
    qty.set(5);
    facade.rollback();

    assert_eq!(first.get(), Value::from("Ann"));
    assert_eq!(city.get(), Value::from("Kyiv"));
    assert_eq!(qty.get(), Value::from(1));
    assert!(!facade.has_changes());
}

#[test]
fn facade_picks_up_later_additions() {
    let registry = ScopeRegistry::new();
    let root = Object::new().with("a", Observable::new(1));
    let facade = registry.attach(&root, true);

    let extra = Observable::new("x");
    facade.add_editable(&Object::new().with("extra", extra.clone()));
    assert_eq!(facade.len(), 2);

    facade.begin_edit();
    extra.set("y");
    assert!(facade.has_changes());
    assert!(registry.has_changes(facade.scope()).unwrap());
}

#[test]
fn effects_observe_change_flags() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new(1);
    let editable = registry.extend(&cell, true);
    let memo = editable.has_changes_memo().unwrap();

    let runs = Arc::new(AtomicUsize::new(0));
    let last = Arc::new(AtomicUsize::new(0));
    let (runs_clone, last_clone) = (runs.clone(), last.clone());
    let _effect = Effect::new(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
        last_clone.store(usize::from(memo.get()), Ordering::SeqCst);
    });

    editable.begin_edit();
    cell.set(2);
    assert_eq!(last.load(Ordering::SeqCst), 1);

    editable.rollback();
    assert_eq!(last.load(Ordering::SeqCst), 0);
    assert!(runs.load(Ordering::SeqCst) >= 3);
}

/// A change handler that restarts the edit while a scope rolls back is
/// ignored; the next explicit edit starts cleanly.
#[test]
fn reentrant_begin_during_scope_rollback() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new("A");
    let editable = registry.extend(&cell, EditOptions::in_scope("form"));

    let handler = editable.clone();
    cell.signal().subscribe(SubscriberId::new(), move || handler.begin_edit());

    registry.begin_edit("form").unwrap();
    cell.set("B");
    registry.rollback("form").unwrap();
    assert!(!editable.in_transaction());

    registry.begin_edit("form").unwrap();
    cell.set("C");
    assert!(editable.in_transaction());
    assert!(registry.has_changes("form").unwrap());
}

#[test]
fn concurrent_scope_transactions_settle_consistently() {
    let registry = ScopeRegistry::new();
    let cells: Vec<Observable> = (0..8).map(Observable::new).collect();
    for cell in &cells {
        registry.extend(cell, EditOptions::in_scope("shared"));
    }

    std::thread::scope(|scope| {
        for worker in 0..4 {
            let registry = &registry;
            let cells = &cells;
            scope.spawn(move || {
                for round in 0..200 {
                    registry.begin_edit("shared").unwrap();
                    cells[round % cells.len()].set(worker * 1000 + round as i32);
                    match round % 3 {
                        0 => registry.rollback("shared").unwrap(),
                        1 => registry.commit("shared").unwrap(),
                        _ => {}
                    }
                }
            });
        }
    });

    // Whatever each cell settled in, its flag agrees with its guard.
    for editable in registry.members("shared").unwrap() {
        if editable.in_transaction() {
            editable.commit();
            assert!(!editable.in_transaction());
        } else {
            editable.begin_edit();
            assert!(editable.in_transaction());
        }
    }

    registry.rollback("shared").unwrap();
    assert!(!registry.has_changes("shared").unwrap());
}

#[tokio::test(start_paused = true)]
async fn change_flag_coalesces_bursts() {
    let registry = ScopeRegistry::new();
    let cell = Observable::new(0);
    registry.extend(&cell, EditOptions::in_scope("flagged"));

    let flag = registry.get_has_changes_flag("flagged", None).unwrap();
    assert_eq!(flag.delay(), Duration::from_millis(100));
    assert!(!flag.get());

    let notifications = Arc::new(AtomicUsize::new(0));
    let notifications_clone = notifications.clone();
    flag.signal().subscribe(SubscriberId::new(), move || {
        notifications_clone.fetch_add(1, Ordering::SeqCst);
    });

    registry.begin_edit("flagged").unwrap();
    for value in 1..=10 {
        cell.set(value);
    }
    assert!(!flag.get());

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(flag.get());
    assert_eq!(notifications.load(Ordering::SeqCst), 1);

    registry.rollback("flagged").unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!flag.get());
    assert_eq!(notifications.load(Ordering::SeqCst), 2);
}

/// The process-wide free functions share one registry.
#[test]
fn global_surface() {
    let cell = Observable::new("draft");
    let editable = cell.extend(EditOptions::in_scope("global-surface"));
    assert!(editables_core::extend(&cell, true).ptr_eq(&editable));

    editables_core::begin_edit("global-surface").unwrap();
    cell.set("final");
    assert!(editables_core::has_changes("global-surface").unwrap());
    editables_core::rollback("global-surface").unwrap();
    assert_eq!(cell.get(), Value::from("draft"));

    let root = Object::new().with("title", Observable::new("t"));
    let found = editables_core::enable(&root, "global-enable");
    assert_eq!(found.len(), 1);
    editables_core::begin_edit("global-enable").unwrap();
    editables_core::commit("global-enable").unwrap();

    let form = Object::new().with("body", Observable::new("b"));
    let facade = editables_core::attach(&form, true);
    assert!(editables_core::registry().contains(facade.scope()));
    assert!(editables_core::attach(&form, false).scope() == facade.scope());
    assert!(editables_core::get_has_changes_flag("global-enable", None).is_ok());
    assert!(matches!(
        editables_core::init_registry(EditablesConfig::default()),
        Err(EditError::RegistryInitialized)
    ));
    assert!(editables_core::has_changes("global-missing").is_err());
}
