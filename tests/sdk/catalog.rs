//! Settings and catalogs served by the engine.

use crate::common::*;
use serde_json::json;
use test_optimization::{
    EfdSettings, EfdSlowTestRetriesSettings, FlakyTestRetriesSettings, KnownTest, Settings,
    SkippableTest, TestManagementSettings, TestManagementTest,
};

#[test]
fn settings_are_copied_verbatim() {
    let (engine, runtime) = mock_runtime();
    let seeded = Settings {
        code_coverage: true,
        early_flake_detection: EfdSettings {
            enabled: true,
            slow_test_retries: EfdSlowTestRetriesSettings {
                five_s: 10,
                ten_s: 5,
                thirty_s: 3,
                five_m: 2,
            },
            faulty_session_threshold: 30,
        },
        flaky_test_retries_enabled: true,
        itr_enabled: false,
        require_git: false,
        tests_skipping: true,
        known_tests_enabled: true,
        test_management: TestManagementSettings {
            enabled: true,
            attempt_to_fix_retries: 20,
        },
    };
    engine.set_settings(seeded);
    engine.set_flaky_test_retries_settings(FlakyTestRetriesSettings {
        retry_count: 5,
        total_retry_count: 1000,
    });

    assert_eq!(runtime.settings().unwrap(), seeded);
    let retries = runtime.flaky_test_retries_settings().unwrap();
    assert_eq!(retries.retry_count, 5);
    assert_eq!(retries.total_retry_count, 1000);
}

#[test]
fn settings_serialize_for_harness_reports() {
    let (_engine, runtime) = mock_runtime();
    let value = serde_json::to_value(runtime.settings().unwrap()).unwrap();
    assert_eq!(value["code_coverage"], json!(false));
    assert_eq!(
        value["early_flake_detection"]["slow_test_retries"]["five_m"],
        json!(0)
    );
}

#[test]
fn known_tests_are_grouped_and_freed_once() {
    let (engine, runtime) = mock_runtime();
    engine.add_known_test(KnownTest::new("m1", "s1", "t1"));
    engine.add_known_test(KnownTest::new("m1", "s1", "t2"));
    engine.add_known_test(KnownTest::new("m1", "s2", "t1"));
    engine.add_known_test(KnownTest::new("m2", "s1", "t1"));

    let known = runtime.known_tests().unwrap();
    assert_eq!(known.len(), 4);
    assert_eq!(
        known.tests("m1", "s1"),
        Some(&["t1".to_string(), "t2".to_string()][..])
    );
    assert!(known.contains("m2", "s1", "t1"));
    assert!(!known.contains("m2", "s1", "t2"));
    assert_eq!(
        serde_json::to_value(&known).unwrap(),
        json!({"m1": {"s1": ["t1", "t2"], "s2": ["t1"]}, "m2": {"s1": ["t1"]}})
    );

    assert_eq!(engine.call_count("get_known_tests"), 1);
    assert_eq!(engine.call_count("free_known_tests"), 1);
    assert_eq!(engine.live_allocations(), 0);
}

#[test]
fn empty_catalogs_are_still_freed() {
    let (engine, runtime) = mock_runtime();
    assert!(runtime.known_tests().unwrap().is_empty());
    assert!(runtime.skippable_tests().unwrap().is_empty());
    assert!(runtime.test_management_tests().unwrap().is_empty());

    assert_eq!(engine.call_count("free_known_tests"), 1);
    assert_eq!(engine.call_count("free_skippable_tests"), 1);
    assert_eq!(engine.call_count("free_test_management_tests"), 1);
    assert_eq!(engine.live_allocations(), 0);
}

#[test]
fn rejected_catalog_query_decodes_empty() {
    let (engine, runtime) = mock_runtime();
    engine.add_known_test(KnownTest::new("m", "s", "t"));
    engine.reject("get_known_tests");
    assert!(runtime.known_tests().unwrap().is_empty());
    assert_eq!(engine.call_count("free_known_tests"), 1);
}

#[test]
fn skippable_tests_keep_parameters_and_configurations() {
    let (engine, runtime) = mock_runtime();
    engine.add_skippable_test(
        SkippableTest::new("parser", "parses_numbers")
            .with_parameters("[1, 2]")
            .with_custom_configurations_json(r#"{"os":"linux"}"#),
    );
    engine.add_skippable_test(SkippableTest::new("parser", "parses_numbers"));
    engine.add_skippable_test(SkippableTest::new("lexer", "tokens"));

    let skippable = runtime.skippable_tests().unwrap();
    assert_eq!(skippable.len(), 3);
    assert!(skippable.is_skippable("lexer", "tokens"));
    assert!(!skippable.is_skippable("lexer", "missing"));

    let variants = skippable.get("parser", "parses_numbers").unwrap();
    assert_eq!(variants.len(), 2);
    assert_eq!(variants[0].parameters, "[1, 2]");
    assert_eq!(
        variants[0].custom_configurations().unwrap(),
        json!({"os": "linux"})
    );
    assert_eq!(variants[1].custom_configurations().unwrap(), json!(null));
    assert_eq!(engine.live_allocations(), 0);
}

#[test]
fn test_management_keeps_first_duplicate() {
    let (engine, runtime) = mock_runtime();
    engine.add_test_management_test(TestManagementTest::new("m", "s", "flaky").quarantined());
    engine.add_test_management_test(TestManagementTest::new("m", "s", "flaky").disabled());
    engine.add_test_management_test(TestManagementTest::new("m", "s", "fixing").attempt_to_fix());

    let managed = runtime.test_management_tests().unwrap();
    assert_eq!(managed.len(), 2);
    let flaky = managed.get("m", "s", "flaky").unwrap();
    assert!(flaky.quarantined);
    assert!(!flaky.disabled);
    assert!(managed.get("m", "s", "fixing").unwrap().attempt_to_fix);
    assert_eq!(engine.call_count("free_test_management_tests"), 1);
}

#[test]
fn catalogs_require_an_initialized_runtime() {
    let (engine, runtime) = runtime();
    assert!(matches!(runtime.settings(), Err(Error::NotInitialized)));
    assert!(matches!(runtime.known_tests(), Err(Error::NotInitialized)));
    assert!(matches!(
        runtime.skippable_tests(),
        Err(Error::NotInitialized)
    ));
    assert_eq!(engine.total_calls(), 0);
}
