use super::KeyValueStore;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_get_unset_key_is_absent() {
    let store = KeyValueStore::new();
    assert_eq!(store.get("missing"), None);
    assert!(store.is_empty());
}

#[test]
fn test_empty_value_is_distinct_from_absent() {
    let store = KeyValueStore::new();
    store.set("blank", "");

    assert_eq!(store.get("blank"), Some(String::new()));
    assert_eq!(store.get("other"), None);
}

#[test]
fn test_set_replaces_existing_value() {
    let store = KeyValueStore::new();
    store.set("color", "red");
    store.set("color", "blue");

    assert_eq!(store.get("color").as_deref(), Some("blue"));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_set_is_idempotent() {
    let once = KeyValueStore::new();
    once.set("k", "v");

    let twice = KeyValueStore::new();
    twice.set("k", "v");
    twice.set("k", "v");

    assert_eq!(once.list(), twice.list());
}

#[test]
fn test_list_contains_every_entry_once() {
    let store = KeyValueStore::new();
    store.set("b", "2");
    store.set("a", "1");

    let snapshot = store.list();
    let entries: Vec<_> = snapshot.iter().collect();
    assert_eq!(entries, vec![("a", "1"), ("b", "2")]);
    assert_eq!(snapshot.to_string(), "a:1, b:2");
}

#[test]
fn test_list_on_empty_store_renders_nothing() {
    let store = KeyValueStore::new();
    let snapshot = store.list();

    assert!(snapshot.is_empty());
    assert_eq!(snapshot.to_string(), "");
}

#[test]
fn test_snapshot_is_not_affected_by_later_writes() {
    let store = KeyValueStore::new();
    store.set("a", "1");

    let snapshot = store.list();
    store.set("a", "changed");
    store.set("b", "2");

    assert_eq!(snapshot.get("a"), Some("1"));
    assert_eq!(snapshot.get("b"), None);
    assert_eq!(snapshot.len(), 1);
}

#[test]
fn test_concurrent_writers_leave_one_whole_value() {
    for _ in 0..50 {
        let store = Arc::new(KeyValueStore::new());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["A", "B"]
            .into_iter()
            .map(|value| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store.set("k", value);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let value = store.get("k").unwrap();
        assert!(value == "A" || value == "B", "unexpected value {value:?}");
    }
}

#[test]
fn test_concurrent_readers_and_writers() {
    let store = Arc::new(KeyValueStore::new());
    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..100 {
                    store.set(format!("t{t}-{i}"), format!("{i}"));
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..100 {
                    let snapshot = store.list();
                    for (key, value) in snapshot.iter() {
                        assert!(key.ends_with(&format!("-{value}")));
                    }
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
    assert_eq!(store.len(), 400);
}

#[test]
fn test_poisoned_lock_does_not_break_store() {
    let store = Arc::new(KeyValueStore::new());
    store.set("before", "1");

    let poisoner = Arc::clone(&store);
    let result = thread::spawn(move || {
        let _guard = poisoner.data.write().unwrap();
        panic!("poison the lock");
    })
    .join();
    assert!(result.is_err());

    assert_eq!(store.get("before").as_deref(), Some("1"));
    store.set("after", "2");
    assert_eq!(store.len(), 2);
}
