//! The debug span recorder as a harness's own test suite would use it.

use crate::common::*;
use test_optimization::{EntityId, Span};

#[test]
fn recorder_sees_the_whole_hierarchy() {
    let (engine, runtime) = mock_runtime();
    let tracer = runtime.mock_tracer();
    assert!(tracer.reset().unwrap());

    let mut session = runtime.create_session(Some("libtest"), None).unwrap();
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    let mut suite = module.create_test_suite("s").unwrap();
    let mut test = suite.create_test("t").unwrap();

    let open = tracer.open_spans().unwrap();
    assert_eq!(open.len(), 4);
    assert!(tracer.finished_spans().unwrap().is_empty());

    test.close(TestStatus::Pass).unwrap();
    suite.close().unwrap();
    module.close().unwrap();
    session.close(0).unwrap();

    let finished = tracer.finished_spans().unwrap();
    let names: Vec<&str> = finished.iter().map(|s| s.operation_name.as_str()).collect();
    assert_eq!(names, vec!["test_session", "test_module", "test_suite", "test"]);
    assert!(tracer.open_spans().unwrap().is_empty());

    let test_span = &finished[3];
    assert_eq!(test_span.parent_span_id, suite.suite_id().as_raw());
    assert_eq!(test_span.trace_id, session.session_id().as_raw());
    assert_eq!(test_span.string_tag(tags::STATUS), Some("pass"));
    assert!(test_span.start_time <= test_span.finish_time);
    assert_eq!(finished[0].parent_span_id, 0);

    assert_eq!(engine.live_allocations(), 0);
    assert_eq!(
        engine.call_count("debug_mock_tracer_free_mock_span_array"),
        engine.call_count("debug_mock_tracer_get_open_spans")
            + engine.call_count("debug_mock_tracer_get_finished_spans")
    );
}

#[test]
fn reset_forgets_finished_spans() {
    let (_engine, runtime) = mock_runtime();
    let tracer = runtime.mock_tracer();

    let mut span =
        Span::create(&runtime, EntityId::from_raw(0), SpanOptions::new("first")).unwrap();
    span.close().unwrap();
    assert_eq!(tracer.finished_spans().unwrap().len(), 1);

    assert!(tracer.reset().unwrap());
    assert!(tracer.finished_spans().unwrap().is_empty());

    let mut span =
        Span::create(&runtime, EntityId::from_raw(0), SpanOptions::new("second")).unwrap();
    span.set_number_tag("attempt", 2.0).unwrap();
    span.close().unwrap();
    let finished = tracer.finished_spans().unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].operation_name, "second");
    assert_eq!(finished[0].number_tag("attempt"), Some(2.0));
}

#[test]
fn reset_forgets_spans_that_are_still_open() {
    let (_engine, runtime) = mock_runtime();
    let tracer = runtime.mock_tracer();
    let mut session = runtime.create_session(Some("libtest"), None).unwrap();
    assert_eq!(tracer.open_spans().unwrap().len(), 1);

    assert!(tracer.reset().unwrap());
    assert!(tracer.open_spans().unwrap().is_empty());
    assert!(tracer.finished_spans().unwrap().is_empty());

    // The session outlives the reset but is not reported again.
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    module.close().unwrap();
    session.close(0).unwrap();
    let finished = tracer.finished_spans().unwrap();
    let names: Vec<&str> = finished.iter().map(|s| s.operation_name.as_str()).collect();
    assert_eq!(names, vec!["test_module"]);
    assert!(tracer.open_spans().unwrap().is_empty());
}

#[test]
fn nothing_is_recorded_without_the_mock_tracer() {
    let (_engine, runtime) = runtime();
    assert!(runtime.initialize(&InitOptions::default()).unwrap());
    let tracer = runtime.mock_tracer();

    let mut session = runtime.create_session(None, None).unwrap();
    assert!(tracer.open_spans().unwrap().is_empty());
    session.close(0).unwrap();
    assert!(tracer.finished_spans().unwrap().is_empty());
}

#[test]
fn recorder_requires_an_initialized_runtime() {
    let (_engine, runtime) = runtime();
    let tracer = runtime.mock_tracer();
    assert!(matches!(tracer.reset(), Err(Error::NotInitialized)));
    assert!(matches!(tracer.finished_spans(), Err(Error::NotInitialized)));
}
