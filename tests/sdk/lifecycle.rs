//! Runtime and entity lifecycle through the public API.

use crate::common::*;

#[test]
fn runtime_moves_through_each_state_once() {
    let (engine, runtime) = runtime();
    assert_eq!(runtime.state(), RuntimeState::Uninitialized);
    assert!(matches!(runtime.shutdown(), Err(Error::NotInitialized)));

    assert!(runtime.initialize(&InitOptions::default()).unwrap());
    assert_eq!(runtime.state(), RuntimeState::Initialized);
    assert!(engine.is_initialized());
    assert!(matches!(
        runtime.initialize(&InitOptions::default()),
        Err(Error::AlreadyInitialized)
    ));

    assert!(runtime.shutdown().unwrap());
    assert_eq!(runtime.state(), RuntimeState::ShutDown);
    assert!(matches!(
        runtime.initialize(&InitOptions::default()),
        Err(Error::ShutDown)
    ));
    assert!(matches!(runtime.shutdown(), Err(Error::ShutDown)));
    assert_eq!(engine.call_count("initialize"), 1);
    assert_eq!(engine.call_count("shutdown"), 1);
}

#[test]
fn declined_initialize_can_be_retried() {
    let (engine, runtime) = runtime();
    engine.reject("initialize");
    assert!(!runtime.initialize(&InitOptions::default()).unwrap());
    assert_eq!(runtime.state(), RuntimeState::Uninitialized);
    assert!(matches!(
        runtime.create_session(None, None),
        Err(Error::NotInitialized)
    ));

    engine.accept("initialize");
    assert!(runtime.initialize(&InitOptions::default()).unwrap());
    assert!(runtime.is_initialized());
}

#[test]
fn init_options_reach_the_engine() {
    let (engine, runtime) = runtime();
    let options = InitOptions::default()
        .with_working_directory("/src/project")
        .with_environment_variable("DD_SERVICE", "svc")
        .with_global_tag("team", "infra")
        .with_mock_tracer(true);
    runtime.initialize(&options).unwrap();

    let seen = engine.init_options().unwrap();
    assert_eq!(seen.language, "rust");
    assert_eq!(seen.runtime_name, "rustc");
    assert!(!seen.runtime_version.is_empty());
    assert_eq!(seen.working_directory.as_deref(), Some("/src/project"));
    assert_eq!(
        seen.environment_variables.get("DD_SERVICE").map(String::as_str),
        Some("svc")
    );
    assert_eq!(seen.global_tags.get("team").map(String::as_str), Some("infra"));
    assert!(seen.use_mock_tracer);
}

#[test]
fn shutdown_stops_open_entities_from_reaching_the_engine() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(Some("libtest"), None).unwrap();
    runtime.shutdown().unwrap();

    let before = engine.total_calls();
    assert!(matches!(
        session.set_string_tag("k", "v"),
        Err(Error::ShutDown)
    ));
    assert!(matches!(
        session.create_module("m", "libtest", "1"),
        Err(Error::ShutDown)
    ));
    assert!(matches!(runtime.known_tests(), Err(Error::ShutDown)));
    assert_eq!(engine.total_calls(), before);

    // The forced close on drop fails quietly.
    drop(session);
    assert_eq!(engine.total_calls(), before);
}

#[test]
fn closed_entities_fault_without_boundary_calls() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    let mut suite = module.create_test_suite("s").unwrap();
    let mut test = suite.create_test("t").unwrap();

    assert!(test.close(TestStatus::Pass).unwrap());
    assert_eq!(test.state(), Lifecycle::Closed);
    let before = engine.total_calls();

    assert!(matches!(test.close(TestStatus::Fail), Err(Error::Closed { .. })));
    assert!(matches!(test.set_number_tag("n", 1.0), Err(Error::Closed { .. })));
    assert!(matches!(test.log("late", None), Err(Error::Closed { .. })));
    assert!(matches!(
        test.set_coverage_data(&["src/lib.rs"]),
        Err(Error::Closed { .. })
    ));
    assert!(matches!(
        test.create_span(SpanOptions::new("late")),
        Err(Error::Closed { .. })
    ));
    assert_eq!(engine.total_calls(), before);

    suite.close().unwrap();
    module.close().unwrap();
    session.close(0).unwrap();
}

#[test]
fn rejected_close_keeps_entity_open_for_retry() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    let mut suite = module.create_test_suite("s").unwrap();
    let mut test = suite.create_test("t").unwrap();

    engine.reject("test_close");
    assert!(!test.close(TestStatus::Pass).unwrap());
    assert_eq!(test.state(), Lifecycle::Open);
    assert!(test.set_string_tag("still", "open").unwrap());

    engine.accept("test_close");
    assert!(test.close(TestStatus::Pass).unwrap());
    assert_eq!(
        engine.entity(test.test_id()).unwrap().string_tag(tags::STATUS),
        Some("pass")
    );
    assert_eq!(engine.call_count("test_close"), 2);

    suite.close().unwrap();
    module.close().unwrap();
    session.close(0).unwrap();
}

#[test]
fn rejected_mutation_is_reported_verbatim() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    engine.reject("session_set_number_tag");
    assert!(!session.set_number_tag("n", 1.0).unwrap());
    assert!(session.set_string_tag("s", "v").unwrap());
    session.close(0).unwrap();
}

#[test]
fn dropped_entities_are_closed_with_fallback_status() {
    let (engine, runtime) = mock_runtime();
    let session = runtime.create_session(None, None).unwrap();
    let session_id = session.session_id();
    let test_id;
    {
        let module = session.create_module("m", "libtest", "1").unwrap();
        let suite = module.create_test_suite("s").unwrap();
        let test = suite.create_test("forgotten").unwrap();
        test_id = test.test_id();
    }
    drop(session);

    let test = engine.entity(test_id).unwrap();
    assert!(!test.is_open());
    assert_eq!(test.string_tag(tags::STATUS), Some("skip"));
    assert_eq!(
        test.string_tag(tags::SKIP_REASON),
        Some(test_optimization::DROPPED_SKIP_REASON)
    );

    let session = engine.entity(session_id).unwrap();
    assert!(!session.is_open());
    assert_eq!(session.number_tag(tags::EXIT_CODE), Some(0.0));
    assert!(engine.entities().iter().all(|e| !e.is_open()));
}

#[test]
fn test_dropped_during_panic_fails() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    let mut suite = module.create_test_suite("s").unwrap();

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _test = suite.create_test("panics").unwrap();
        panic!("assertion failed inside the test body");
    }));
    assert!(outcome.is_err());

    let test = engine
        .entities()
        .into_iter()
        .find(|e| e.string_tag(tags::NAME) == Some("panics"))
        .unwrap();
    assert_eq!(test.string_tag(tags::STATUS), Some("fail"));
    assert_eq!(test.string_tag(tags::SKIP_REASON), None);

    suite.close().unwrap();
    module.close().unwrap();
    session.close(0).unwrap();
}
