//! A full session reported the way a test harness drives it.

use std::collections::BTreeMap;

use crate::common::*;
use test_optimization::in_memory::BenchmarkData;
use test_optimization::{EntityId, EntityKind};

#[test]
fn full_session_is_recorded_in_order() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(Some("libtest"), Some("1.80")).unwrap();
    let mut module = session.create_module("my_crate", "libtest", "1.80").unwrap();
    let mut suite = module.create_test_suite("parser").unwrap();
    suite.set_test_source("src/parser.rs", Some(1), Some(400)).unwrap();

    let mut passing = suite.create_test("parses_empty_input").unwrap();
    passing.set_test_source("src/parser.rs", Some(12), Some(20)).unwrap();
    passing.set_coverage_data(&["src/parser.rs", "src/lexer.rs"]).unwrap();
    assert!(passing.close(TestStatus::Pass).unwrap());

    let mut failing = suite.create_test("rejects_garbage").unwrap();
    failing
        .set_error_info("AssertionError", "left != right", "at src/parser.rs:40")
        .unwrap();
    assert!(failing.close(TestStatus::Fail).unwrap());

    let mut skipped = suite.create_test("slow_case").unwrap();
    assert!(skipped.close_with_skip_reason("ignored").unwrap());

    assert!(suite.close().unwrap());
    assert!(module.close().unwrap());
    assert!(session.close(1).unwrap());

    let records = engine.entities();
    let kinds: Vec<EntityKind> = records.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::Session,
            EntityKind::Module,
            EntityKind::Suite,
            EntityKind::Test,
            EntityKind::Test,
            EntityKind::Test,
        ]
    );
    assert!(records.iter().all(|r| r.trace_id == session.session_id().as_raw()));

    let failed = engine.entity(failing.test_id()).unwrap();
    assert_eq!(failed.string_tag(tags::STATUS), Some("fail"));
    assert_eq!(failed.string_tag(tags::ERROR_MESSAGE), Some("left != right"));

    let skipped = engine.entity(skipped.test_id()).unwrap();
    assert_eq!(skipped.string_tag(tags::SKIP_REASON), Some("ignored"));

    let session_record = engine.entity(session.session_id()).unwrap();
    assert_eq!(session_record.number_tag(tags::EXIT_CODE), Some(1.0));
    assert_eq!(session_record.string_tag(tags::FRAMEWORK), Some("libtest"));

    let coverage = engine.coverage_payloads();
    assert_eq!(coverage.len(), 1);
    assert_eq!(coverage[0].test_id, passing.test_id().as_raw());
    assert_eq!(coverage[0].suite_id, suite.suite_id().as_raw());
    assert_eq!(coverage[0].files, vec!["src/parser.rs", "src/lexer.rs"]);
}

#[test]
fn children_carry_every_ancestor_handle() {
    let (_engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    let mut suite = module.create_test_suite("s").unwrap();
    let mut test = suite.create_test("t").unwrap();

    assert_eq!(module.session_id(), session.session_id());
    assert_eq!(suite.session_id(), session.session_id());
    assert_eq!(suite.module_id(), module.module_id());
    assert_eq!(test.session_id(), session.session_id());
    assert_eq!(test.module_id(), module.module_id());
    assert_eq!(test.suite_id(), suite.suite_id());

    test.close(TestStatus::Pass).unwrap();
    suite.close().unwrap();
    module.close().unwrap();
    session.close(0).unwrap();
}

#[test]
fn closed_parent_refuses_children() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    module.close().unwrap();

    assert!(matches!(
        module.create_test_suite("late"),
        Err(Error::Closed {
            kind: EntityKind::Module,
            ..
        })
    ));
    assert_eq!(engine.call_count("suite_create"), 0);
    session.close(0).unwrap();
}

#[test]
fn engine_refusing_creation_is_an_error() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    engine.reject("module_create");
    assert!(matches!(
        session.create_module("m", "libtest", "1"),
        Err(Error::CreationFailed {
            kind: EntityKind::Module
        })
    ));
    session.close(0).unwrap();
}

#[test]
fn test_logs_and_benchmarks() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    let mut suite = module.create_test_suite("s").unwrap();
    let mut test = suite.create_test("bench").unwrap();

    assert!(test.log("warming up", Some("phase:setup")).unwrap());
    assert!(test.log("done", None).unwrap());

    let mut stats = BTreeMap::new();
    stats.insert("mean_ns", 1250.0);
    stats.insert("runs", 100.0);
    assert!(test.set_benchmark_number_data("duration", stats).unwrap());
    assert!(test
        .set_benchmark_string_data("environment", [("cpu", "x86_64")])
        .unwrap());
    assert!(test
        .set_benchmark_number_data("empty", Vec::<(String, f64)>::new())
        .unwrap());
    assert_eq!(engine.call_count("test_set_benchmark_number_data"), 1);

    let logs = engine.logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].message, "warming up");
    assert_eq!(logs[0].tags.as_deref(), Some("phase:setup"));
    assert_eq!(logs[1].tags, None);

    let benchmarks = engine.benchmarks();
    assert_eq!(benchmarks.len(), 2);
    match &benchmarks[0].data {
        BenchmarkData::Numbers(values) => assert_eq!(values.get("runs"), Some(&100.0)),
        other => panic!("unexpected benchmark data: {other:?}"),
    }

    test.close(TestStatus::Pass).unwrap();
    suite.close().unwrap();
    module.close().unwrap();
    session.close(0).unwrap();
}

#[test]
fn spans_hang_off_any_entity() {
    let (engine, runtime) = mock_runtime();
    let mut session = runtime.create_session(None, None).unwrap();
    let mut module = session.create_module("m", "libtest", "1").unwrap();
    let mut suite = module.create_test_suite("s").unwrap();
    let mut test = suite.create_test("t").unwrap();

    let mut outer = test
        .create_span(SpanOptions::new("http.request").with_service_name("api"))
        .unwrap();
    let mut inner = outer
        .create_child(SpanOptions::new("db.query").with_number_tag("rows", 3.0))
        .unwrap();
    assert_eq!(outer.parent_id(), EntityId::from(test.test_id()));
    assert_eq!(inner.parent_id(), EntityId::from(outer.span_id()));

    let record = engine.entity(inner.span_id()).unwrap();
    assert_eq!(record.parent, Some(EntityId::from(outer.span_id())));
    assert_eq!(record.number_tag("rows"), Some(3.0));

    assert!(inner.close().unwrap());
    assert!(outer.close().unwrap());
    test.close(TestStatus::Pass).unwrap();
    suite.close().unwrap();
    module.close().unwrap();
    session.close(0).unwrap();
}
