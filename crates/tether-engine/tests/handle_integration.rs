//! Integration tests for object handles and table nodes
//!
//! Exercises `tether-sdk` handles against a real engine: reference-table
//! bookkeeping, clone semantics, deferred reads and writes, and stack
//! neutrality of every operation.

use tether_engine::{Engine, Kind, Machine};
use tether_sdk::{globals, new_table, registry, Error, Nil, Object};

#[test]
fn test_new_table_anchors_one_slot() {
    let engine = Engine::new();
    let table = new_table(&engine);

    assert!(table.is_valid());
    assert!(!table.is_nil());
    assert_eq!(table.kind(), Kind::Table);
    assert_eq!(engine.live_refs(), 1);
    assert_eq!(engine.top(), 0);

    drop(table);
    assert_eq!(engine.live_refs(), 0);
}

#[test]
fn test_release_is_idempotent() {
    let engine = Engine::new();
    let mut table = new_table(&engine);

    table.release();
    table.release();
    assert!(!table.is_valid());
    assert_eq!(table.kind(), Kind::None);
    assert_eq!(engine.live_refs(), 0);

    // Dropping the released handle must not free anything else
    let other = new_table(&engine);
    drop(table);
    assert!(other.is_valid());
    assert_eq!(engine.live_refs(), 1);
}

#[test]
fn test_take_moves_the_binding() {
    let engine = Engine::new();
    let mut first = new_table(&engine);
    let second = first.take();

    assert!(!first.is_valid());
    assert!(second.is_valid());
    assert_eq!(engine.live_refs(), 1);
}

#[test]
fn test_clone_shares_tables() {
    let engine = Engine::new();
    let a = new_table(&engine);
    let b = a.clone();
    assert_eq!(engine.live_refs(), 2);

    b.index("x").set(1).unwrap();
    assert_eq!(a.index("x").value(0), 1);

    // Releasing one clone leaves the other usable
    drop(b);
    assert_eq!(engine.live_refs(), 1);
    assert_eq!(a.index("x").value(0), 1);
}

#[test]
fn test_clone_copies_primitives() {
    let engine = Engine::new();
    let table = new_table(&engine);
    table.index("n").set(5).unwrap();

    let n = table.index("n").get();
    let copy = n.clone();
    table.index("n").set(6).unwrap();

    assert_eq!(n.value(0), 5);
    assert_eq!(copy.value(0), 5);
    assert_eq!(table.index("n").value(0), 6);
}

#[test]
fn test_nil_values_take_no_slot() {
    let engine = Engine::new();
    let table = new_table(&engine);
    let missing = table.index("missing").get();

    assert!(missing.is_valid());
    assert!(missing.is_nil());
    assert_eq!(missing.kind(), Kind::Nil);
    assert_eq!(engine.live_refs(), 1);
}

#[test]
fn test_default_handle_is_invalid() {
    let engine = Engine::new();
    let object = Object::default();

    assert!(!object.is_valid());
    assert!(!object.is_nil());
    assert_eq!(object.value(7), 7);
    assert!(object.index("x").get().machine().is_none());
    assert_eq!(object.index("x").set(1), Err(Error::InvalidHandle));
    assert_eq!(object.call::<(), _>(()), Err(Error::InvalidHandle));
    assert_eq!(object.to_string(), "<invalid>");
    assert_eq!(engine.top(), 0);
}

#[test]
fn test_value_conversions() {
    let engine = Engine::new();
    let table = new_table(&engine);
    table.index("i").set(42).unwrap();
    table.index("f").set(2.5).unwrap();
    table.index("s").set("text").unwrap();
    table.index("b").set(true).unwrap();

    assert_eq!(table.index("i").value(0i64), 42);
    assert_eq!(table.index("i").value(0.0), 42.0);
    assert_eq!(table.index("f").value(0.0), 2.5);
    assert_eq!(table.index("s").get_as::<String>(), "text");
    assert!(table.index("b").get_as::<bool>());

    // Incompatible reads fall back to the default
    assert_eq!(table.index("s").value(7i32), 7);
    assert_eq!(table.index("f").value(7i32), 7);
    assert_eq!(table.index("missing").value(-1i64), -1);
    assert_eq!(table.index("i").value(Some(0u8)), Some(42));
    assert_eq!(table.index("missing").value(Some(3u8)), None);
    assert_eq!(engine.top(), 0);
}

#[test]
fn test_number_reads_as_string() {
    let engine = Engine::new();
    let table = new_table(&engine);
    table.index(1).set(10).unwrap();

    assert_eq!(table.index(1).get_as::<String>(), "10");
}

#[test]
fn test_nested_nodes() {
    let engine = Engine::new();
    let outer = new_table(&engine);
    let inner = new_table(&engine);
    outer.index("inner").set(&inner).unwrap();

    outer.index("inner").index("leaf").set("value").unwrap();
    assert_eq!(inner.index("leaf").get_as::<String>(), "value");

    // Reading an intermediate node is never cached
    outer.index("inner").set(Nil).unwrap();
    assert!(outer.index("inner").index("leaf").get().is_nil());
}

#[test]
fn test_node_as_value() {
    let engine = Engine::new();
    let a = new_table(&engine);
    let b = new_table(&engine);
    a.index("x").set(3).unwrap();

    b.index("copy").set(a.index("x")).unwrap();
    assert_eq!(b.index("copy").value(0), 3);

    let object: Object<'_> = a.index("x").into();
    assert_eq!(object.value(0), 3);
}

#[test]
fn test_read_through_non_table() {
    let engine = Engine::new();
    let table = new_table(&engine);
    table.index("n").set(1).unwrap();

    let through = table.index("n").index("x").get();
    assert!(through.is_nil());
    assert!(table.index("missing").index("x").get().is_nil());
    assert_eq!(engine.top(), 0);
}

#[test]
fn test_write_through_non_table_fails() {
    let engine = Engine::new();
    let table = new_table(&engine);
    table.index("n").set(1).unwrap();

    let err = table.index("n").index("x").set(2).unwrap_err();
    assert_eq!(err, Error::NotIndexable { kind: Kind::Number });
    assert_eq!(err.to_string(), "attempt to index a number value");
    assert_eq!(engine.top(), 0);
}

#[test]
fn test_invalid_keys() {
    let engine = Engine::new();
    let table = new_table(&engine);

    let err = table.index(Nil).set(1).unwrap_err();
    assert_eq!(err.to_string(), "table index is nil");
    let err = table.index(f64::NAN).set(1).unwrap_err();
    assert_eq!(err.to_string(), "table index is NaN");
    assert_eq!(engine.top(), 0);
}

#[test]
fn test_assigning_nil_removes() {
    let engine = Engine::new();
    let table = new_table(&engine);
    table.index("x").set(1).unwrap();
    table.index("x").set(Nil).unwrap();

    assert!(table.index("x").get().is_nil());
    assert_eq!(table.index("x").value(Some(1)), None);
}

#[test]
fn test_globals_and_registry_are_distinct() {
    let engine = Engine::new();
    globals(&engine).index("shared").set("global").unwrap();
    registry(&engine).index("shared").set("private").unwrap();

    assert_eq!(engine.global("shared").to_string(), "global");
    assert_eq!(globals(&engine).index("shared").get_as::<String>(), "global");
    assert_eq!(registry(&engine).index("shared").get_as::<String>(), "private");
    assert_eq!(engine.live_refs(), 0);
}

#[test]
fn test_table_as_key() {
    let engine = Engine::new();
    let table = new_table(&engine);
    let key = new_table(&engine);

    table.index(&key).set("by identity").unwrap();
    assert_eq!(table.index(&key).get_as::<String>(), "by identity");
    assert!(table.index(new_table(&engine)).get().is_nil());
}

#[test]
fn test_display_and_debug() {
    let engine = Engine::new();
    let table = new_table(&engine);
    table.index("f").set(1.0).unwrap();

    assert_eq!(table.index("f").get().to_string(), "1.0");
    assert!(table.to_string().starts_with("table: "));
    assert!(format!("{:?}", table).contains("Table"));
}

#[test]
fn test_slots_are_reused() {
    let engine = Engine::new();
    for _ in 0..1000 {
        let table = new_table(&engine);
        table.index("x").set(1).unwrap();
        let _read = table.index("x").get();
    }
    assert_eq!(engine.live_refs(), 0);
    assert_eq!(engine.top(), 0);
}
