//! The process-wide runtime slot. It lives for the whole test binary, so
//! the lifecycle is exercised by a single test.

mod common;

use std::sync::Arc;

use common::*;
use tempfile::TempDir;
use test_optimization::config::LIBRARY_FILE_NAME;
use test_optimization::{KnownTest, RuntimeConfig, Settings, TestOptimization};

#[test]
fn global_runtime_lifecycle() {
    init_tracing();
    assert!(!TestOptimization::is_initialized());
    assert!(matches!(
        TestOptimization::create_session(None, None),
        Err(Error::NotInitialized)
    ));

    // A library that fails to load leaves the slot empty.
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(LIBRARY_FILE_NAME), b"not a library").unwrap();
    let mut config = RuntimeConfig::default();
    config.library.search_path = Some(dir.path().to_path_buf());
    assert!(matches!(
        TestOptimization::init_with_config(&config, InitOptions::default()),
        Err(Error::LibraryLoad(_))
    ));
    assert!(!TestOptimization::is_initialized());

    let engine = Arc::new(InMemoryEngine::new());
    engine.add_known_test(KnownTest::new("my_crate", "parser", "parses_empty_input"));
    let options = InitOptions::default()
        .with_mock_tracer(true)
        .with_working_directory(dir.path());
    assert!(TestOptimization::init_with_engine(engine.clone(), &options).unwrap());

    let known = TestOptimization::known_tests().unwrap();
    assert!(known.contains("my_crate", "parser", "parses_empty_input"));
    assert!(TestOptimization::skippable_tests().unwrap().is_empty());
    assert!(TestOptimization::test_management_tests().unwrap().is_empty());
    assert_eq!(TestOptimization::settings().unwrap(), Settings::default());

    let mut session = TestOptimization::create_session(Some("libtest"), None).unwrap();
    let mut module = session.create_module("my_crate", "libtest", "1").unwrap();
    let mut suite = module.create_test_suite("parser").unwrap();
    let mut test = suite.create_test("parses_empty_input").unwrap();
    test.close(TestStatus::Pass).unwrap();
    suite.close().unwrap();
    module.close().unwrap();
    session.close(0).unwrap();

    let tracer = TestOptimization::mock_tracer().unwrap();
    assert_eq!(tracer.finished_spans().unwrap().len(), 4);

    assert!(TestOptimization::shutdown().unwrap());
    assert!(!engine.is_initialized());
    assert!(matches!(TestOptimization::runtime(), Err(Error::ShutDown)));
    assert!(matches!(TestOptimization::init_mock(), Err(Error::ShutDown)));
    assert!(matches!(TestOptimization::shutdown(), Err(Error::ShutDown)));
}
