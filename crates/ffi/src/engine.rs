//! The engine boundary as a trait
//!
//! One method per wire function. Implementations never unwind across the
//! boundary; every failure is reported through the return value (a `Bool`
//! flag or a `valid` field in a result record).
//!
//! # Pointer validity
//!
//! Methods that take pointers are `unsafe`. Callers must pass NUL-terminated
//! strings and well-formed arrays, and must keep every pointed-to buffer
//! alive for as long as the engine may read it. The SDK keeps such buffers
//! pinned until the owning entity is closed, because the engine may retain
//! them for asynchronous processing beyond the call's return.
//!
//! Engine-allocated arrays returned by the `get_*` methods stay owned by the
//! engine until passed back to the matching `free_*` method, exactly once.

use std::os::raw::{c_char, c_int};

use crate::records::{
    FlakyTestRetriesSettings, InitOptions, KeyNumberArray, KeyValueArray, KnownTestArray,
    MockSpanArray, ModuleResult, SessionResult, SettingsResponse, SkippableTestArray,
    SpanResult, SpanStartOptions, SuiteResult, TestCloseOptions, TestCoverage,
    TestManagementTestPropertiesArray, TestResult,
};
use crate::types::{Bool, EntityId, ModuleId, SessionId, SpanId, SuiteId, TestId, UnixTime};

/// Every call the client can make into a test optimization engine.
#[allow(clippy::missing_safety_doc)]
pub trait Engine: Send + Sync {
    /// Engine name for logging.
    fn name(&self) -> &'static str;

    // --- process lifecycle ---

    unsafe fn initialize(&self, options: InitOptions) -> Bool;
    fn shutdown(&self) -> Bool;

    // --- settings and catalogs ---

    fn get_settings(&self) -> SettingsResponse;
    fn get_flaky_test_retries_settings(&self) -> FlakyTestRetriesSettings;
    fn get_known_tests(&self) -> KnownTestArray;
    fn get_skippable_tests(&self) -> SkippableTestArray;
    fn get_test_management_tests(&self) -> TestManagementTestPropertiesArray;
    unsafe fn free_known_tests(&self, array: KnownTestArray);
    unsafe fn free_skippable_tests(&self, array: SkippableTestArray);
    unsafe fn free_test_management_tests(&self, array: TestManagementTestPropertiesArray);
    unsafe fn send_code_coverage_payload(&self, coverages: *const TestCoverage, len: usize);

    // --- session ---

    unsafe fn session_create(
        &self,
        framework: *const c_char,
        framework_version: *const c_char,
        start_time: *const UnixTime,
    ) -> SessionResult;
    unsafe fn session_set_string_tag(
        &self,
        session_id: SessionId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool;
    unsafe fn session_set_number_tag(
        &self,
        session_id: SessionId,
        key: *const c_char,
        value: f64,
    ) -> Bool;
    unsafe fn session_set_error(
        &self,
        session_id: SessionId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool;
    unsafe fn session_close(
        &self,
        session_id: SessionId,
        exit_code: c_int,
        end_time: *const UnixTime,
    );

    // --- module ---

    unsafe fn module_create(
        &self,
        session_id: SessionId,
        name: *const c_char,
        framework_name: *const c_char,
        framework_version: *const c_char,
        start_time: *const UnixTime,
    ) -> ModuleResult;
    unsafe fn module_set_string_tag(
        &self,
        module_id: ModuleId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool;
    unsafe fn module_set_number_tag(
        &self,
        module_id: ModuleId,
        key: *const c_char,
        value: f64,
    ) -> Bool;
    unsafe fn module_set_error(
        &self,
        module_id: ModuleId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool;
    unsafe fn module_close(&self, module_id: ModuleId, end_time: *const UnixTime) -> Bool;

    // --- suite ---

    unsafe fn suite_create(
        &self,
        module_id: ModuleId,
        name: *const c_char,
        start_time: *const UnixTime,
    ) -> SuiteResult;
    unsafe fn suite_set_string_tag(
        &self,
        suite_id: SuiteId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool;
    unsafe fn suite_set_number_tag(
        &self,
        suite_id: SuiteId,
        key: *const c_char,
        value: f64,
    ) -> Bool;
    unsafe fn suite_set_error(
        &self,
        suite_id: SuiteId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool;
    unsafe fn suite_set_source(
        &self,
        suite_id: SuiteId,
        file: *const c_char,
        start_line: *const c_int,
        end_line: *const c_int,
    ) -> Bool;
    unsafe fn suite_close(&self, suite_id: SuiteId, end_time: *const UnixTime) -> Bool;

    // --- test ---

    unsafe fn test_create(
        &self,
        suite_id: SuiteId,
        name: *const c_char,
        start_time: *const UnixTime,
    ) -> TestResult;
    unsafe fn test_set_string_tag(
        &self,
        test_id: TestId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool;
    unsafe fn test_set_number_tag(&self, test_id: TestId, key: *const c_char, value: f64)
        -> Bool;
    unsafe fn test_set_error(
        &self,
        test_id: TestId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool;
    unsafe fn test_set_source(
        &self,
        test_id: TestId,
        file: *const c_char,
        start_line: *const c_int,
        end_line: *const c_int,
    ) -> Bool;
    unsafe fn test_close(&self, test_id: TestId, options: TestCloseOptions) -> Bool;
    unsafe fn test_set_benchmark_string_data(
        &self,
        test_id: TestId,
        measure_type: *const c_char,
        data: KeyValueArray,
    ) -> Bool;
    unsafe fn test_set_benchmark_number_data(
        &self,
        test_id: TestId,
        measure_type: *const c_char,
        data: KeyNumberArray,
    ) -> Bool;
    unsafe fn test_log(&self, test_id: TestId, message: *const c_char, tags: *const c_char)
        -> Bool;

    // --- span ---

    unsafe fn span_create(&self, parent_id: EntityId, options: SpanStartOptions) -> SpanResult;
    unsafe fn span_set_string_tag(
        &self,
        span_id: SpanId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool;
    unsafe fn span_set_number_tag(&self, span_id: SpanId, key: *const c_char, value: f64)
        -> Bool;
    unsafe fn span_set_error(
        &self,
        span_id: SpanId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool;
    unsafe fn span_close(&self, span_id: SpanId, end_time: *const UnixTime) -> Bool;

    // --- debug span recorder ---

    fn debug_mock_tracer_reset(&self) -> Bool;
    fn debug_mock_tracer_get_finished_spans(&self) -> MockSpanArray;
    fn debug_mock_tracer_get_open_spans(&self) -> MockSpanArray;
    unsafe fn debug_mock_tracer_free_mock_span_array(&self, array: MockSpanArray);
}
