//! Engine and session registry caching semantics.

mod common;

use common::MockBackend;
use shardbind::{BindKey, ConfigErrorKind, DbConfig, Error, Record, ShardBind};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Barrier};
use std::time::Duration;

fn plain_db(backend: Arc<MockBackend>) -> ShardBind {
    ShardBind::builder()
        .backend(backend)
        .config(
            DbConfig::new()
                .database_uri("mock://primary")
                .bind("shard_001", "mock://s1"),
        )
        .build()
        .expect("buildable registry")
}

#[test]
fn engine_caching_is_idempotent() {
    let backend = MockBackend::new();
    let db = plain_db(backend.clone());

    let first = db.get_engine("shard_001").unwrap().expect("engine");
    let second = db.get_engine("shard_001").unwrap().expect("engine");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(backend.create_count.load(Ordering::SeqCst), 1);
}

#[test]
fn engine_property_matches_default_bind() {
    let backend = MockBackend::new();
    let db = plain_db(backend.clone());

    let via_property = db.engine().unwrap().expect("engine");
    let via_key = db.get_engine(BindKey::Default).unwrap().expect("engine");

    assert!(Arc::ptr_eq(&via_property, &via_key));
    assert_eq!(backend.create_count.load(Ordering::SeqCst), 1);
}

#[test]
fn unconfigured_default_returns_none_not_error() {
    let backend = MockBackend::new();
    let db = ShardBind::builder()
        .backend(backend.clone())
        .build()
        .expect("buildable registry");

    // repeatedly checkable, never cached, never an error
    assert!(db.engine().unwrap().is_none());
    assert!(db.engine().unwrap().is_none());
    assert_eq!(backend.create_count.load(Ordering::SeqCst), 0);

    // an engine-less session is still handed out...
    let session = db.session().expect("engine-less session");
    session.add(Record::new("users").with("id", 1_i64));
    assert_eq!(session.pending_count(), 1);

    // ...but an operation that needs an engine is a config error
    match session.flush() {
        Err(Error::Config(c)) => assert_eq!(c.kind, ConfigErrorKind::MissingUri),
        other => panic!("expected missing-uri config error, got {other:?}"),
    }
}

#[test]
fn unknown_named_bind_fails() {
    let backend = MockBackend::new();
    let db = plain_db(backend);

    match db.get_engine("nonexistent") {
        Err(Error::Config(c)) => assert_eq!(c.kind, ConfigErrorKind::UnknownBind),
        other => panic!("expected unknown-bind config error, got {other:?}"),
    }

    // same outcome when no bind map is configured at all
    let db = ShardBind::builder()
        .backend(MockBackend::new())
        .build()
        .expect("buildable registry");
    assert!(matches!(db.get_engine("nonexistent"), Err(Error::Config(_))));
}

#[test]
fn concurrent_first_access_constructs_one_engine() {
    let backend = MockBackend::with_create_delay(Duration::from_millis(20));
    let db = Arc::new(plain_db(backend.clone()));

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let db = db.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                db.get_engine("shard_001").unwrap().expect("engine")
            })
        })
        .collect();

    let engines: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(backend.create_count.load(Ordering::SeqCst), 1);
    for engine in &engines[1..] {
        assert!(Arc::ptr_eq(&engines[0], engine));
    }
}

#[test]
fn session_factory_is_cached_per_bind() {
    let db = plain_db(MockBackend::new());

    let first = db.session_factory("shard_001").unwrap();
    let second = db.session_factory("shard_001").unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    // same-scope sessions are the same instance
    let a = db.get_session("shard_001").unwrap();
    let b = db.get_session("shard_001").unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    // distinct binds get distinct factories
    let default_factory = db.session_factory(BindKey::Default).unwrap();
    assert!(!Arc::ptr_eq(&first, &default_factory));
}

#[test]
fn reset_discards_scope_state_but_preserves_the_cache() {
    let db = plain_db(MockBackend::new());

    let factory_before = db.session_factory(BindKey::Default).unwrap();
    let session_before = db.session().unwrap();
    session_before.add(Record::new("users").with("id", 1_i64));
    assert_eq!(session_before.pending_count(), 1);

    db.reset();

    // registry entry identity is unchanged
    let factory_after = db.session_factory(BindKey::Default).unwrap();
    assert!(Arc::ptr_eq(&factory_before, &factory_after));

    // but the new scope instance starts with a fresh working set
    let session_after = db.session().unwrap();
    assert!(!Arc::ptr_eq(&session_before, &session_after));
    assert_eq!(session_after.pending_count(), 0);
}

#[test]
fn configure_does_not_affect_cached_engines() {
    let backend = MockBackend::new();
    let db = plain_db(backend.clone());

    let before = db.engine().unwrap().expect("engine");
    db.configure(DbConfig::new().database_uri("mock://elsewhere"))
        .unwrap();
    let after = db.engine().unwrap().expect("engine");

    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(before.uri(), "mock://primary");
}

#[test]
fn dispose_invalidates_and_allows_recreation() {
    let backend = MockBackend::new();
    let db = plain_db(backend.clone());

    let engine = db.engine().unwrap().expect("engine");
    db.dispose().unwrap();

    assert!(backend.state("mock://primary").disposed.load(Ordering::SeqCst));
    drop(engine);

    // next access creates a fresh engine
    let recreated = db.engine().unwrap().expect("engine");
    assert_eq!(backend.create_count.load(Ordering::SeqCst), 2);
    assert_eq!(recreated.uri(), "mock://primary");
}

#[test]
fn backend_failure_is_not_cached() {
    let backend = MockBackend::new();
    backend.fail_next_create.store(true, Ordering::SeqCst);
    let db = plain_db(backend.clone());

    assert!(matches!(db.engine(), Err(Error::Connection(_))));

    // the failure did not poison the cache; the retry succeeds
    let engine = db.engine().unwrap().expect("engine");
    assert_eq!(engine.uri(), "mock://primary");
    assert_eq!(backend.create_count.load(Ordering::SeqCst), 1);
}

#[test]
fn invalid_uri_is_a_config_error() {
    let db = ShardBind::builder()
        .backend(MockBackend::new())
        .config(DbConfig::new().database_uri("no-scheme-here"))
        .build()
        .expect("buildable registry");

    match db.engine() {
        Err(Error::Config(c)) => assert_eq!(c.kind, ConfigErrorKind::InvalidUri),
        other => panic!("expected invalid-uri config error, got {other:?}"),
    }
}
