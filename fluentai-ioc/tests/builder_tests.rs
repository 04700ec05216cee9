//! Builder lifecycle tests

use fluentai_ioc::prelude::*;
use std::sync::Arc;

struct Service;

fn service(_: &Session) -> DiResult<Arc<Service>> {
    Ok(Arc::new(Service))
}

fn assert_invalid_state(result: DiResult<impl Sized>, expected: BuilderState) {
    match result {
        Err(DiError::InvalidBuilderState { state, .. }) => assert_eq!(state, expected),
        Err(other) => panic!("expected InvalidBuilderState, got {other}"),
        Ok(_) => panic!("expected InvalidBuilderState, got Ok"),
    }
}

#[test]
fn test_result_before_finish_fails() {
    let builder = ContainerBuilder::new();
    assert_invalid_state(builder.result(), BuilderState::Free);
}

#[test]
fn test_finish_twice_fails() {
    let mut builder = ContainerBuilder::new();
    builder.finish().unwrap();
    assert_invalid_state(builder.finish(), BuilderState::Finished);

    // The first result stays available.
    assert!(builder.result().is_ok());
}

#[test]
fn test_changes_after_finish_fail() {
    let mut builder = ContainerBuilder::new();
    builder.finish().unwrap();

    assert_invalid_state(builder.register(service), BuilderState::Finished);
    assert_invalid_state(builder.for_key("key").map(|_| ()), BuilderState::Finished);
    assert!(builder.result().unwrap().is_empty());
}

#[test]
fn test_for_key_twice_fails() {
    let mut builder = ContainerBuilder::new();
    builder.for_key("first").unwrap();
    assert_invalid_state(builder.for_key("second").map(|_| ()), BuilderState::KeyPending);

    // The original key is still pending and the builder is usable.
    assert_eq!(builder.pending_key(), Some(&Discriminator::from("first")));
    builder.register(service).unwrap();
    let container = builder.build().unwrap();
    assert!(container.has_keyed_service::<Service>("first"));
}

#[test]
fn test_finish_with_pending_key_fails() {
    let mut builder = ContainerBuilder::new();
    builder.for_key("dangling").unwrap();
    assert_invalid_state(builder.finish(), BuilderState::KeyPending);
    assert_invalid_state(builder.result(), BuilderState::KeyPending);
}

#[test]
fn test_duplicate_registration_fails() {
    let mut builder = ContainerBuilder::new();
    builder.register(service).unwrap();

    let err = builder.register(service).unwrap_err();
    assert!(matches!(err, DiError::AlreadyRegistered { key: None, .. }));
    assert_eq!(builder.len(), 1);
    assert_eq!(builder.state(), BuilderState::Free);
}

#[test]
fn test_rejected_duplicate_is_never_invoked() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut builder = ContainerBuilder::new();
    builder.register(service).unwrap();
    assert!(builder
        .register(move |_: &Session| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Service))
        })
        .is_err());
    let container = builder.build().unwrap();

    for _ in 0..3 {
        container.resolve::<Service>().unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_duplicate_keyed_registration_fails() {
    let mut builder = ContainerBuilder::new();
    builder.for_key("k").unwrap().register(service).unwrap();

    let err = builder.for_key("k").unwrap().register(service).unwrap_err();
    assert_eq!(err.key(), Some(&Discriminator::from("k")));
    assert!(err.to_string().contains("already registered"));

    assert_eq!(builder.state(), BuilderState::KeyPending);

    // The failed registration left "k" pending; it has to be consumed before anything else.
    assert_invalid_state(builder.finish(), BuilderState::KeyPending);
}

#[test]
fn test_distinct_keys_are_distinct_entries() {
    let mut builder = ContainerBuilder::new();
    builder.register(service).unwrap();
    builder.for_key("a").unwrap().register(service).unwrap();
    builder.for_key("b").unwrap().register(service).unwrap();
    builder.for_key(1i32).unwrap().register(service).unwrap();

    let container = builder.build().unwrap();
    assert_eq!(container.len(), 4);
    assert!(container.has_service::<Service>());
    assert!(container.has_keyed_service::<Service>("a"));
    assert!(container.has_keyed_service::<Service>(1i32));
    assert!(!container.has_keyed_service::<Service>(1i64));
}

#[test]
fn test_result_is_stable_across_calls() {
    let mut builder = ContainerBuilder::new();
    builder.register(service).unwrap();
    builder.finish().unwrap();

    let first = builder.result().unwrap().clone();
    let second = builder.result().unwrap();
    assert!(first.ptr_eq(second));
}

#[test]
fn test_containers_from_separate_builders_are_independent() {
    let mut left = ContainerBuilder::new();
    left.register(service).unwrap();
    let left = left.build().unwrap();

    let right = ContainerBuilder::new().build().unwrap();

    assert!(!left.ptr_eq(&right));
    assert!(left.resolve::<Service>().is_ok());
    assert!(right.resolve::<Service>().is_err());
}

#[test]
fn test_config_is_carried_into_container() {
    let config = ContainerConfig::new().with_max_depth(3);
    let container = ContainerBuilder::with_config(config.clone()).build().unwrap();
    assert_eq!(container.config(), &config);
}
