//! Engine symbol table resolved from the shared library
//!
//! `EngineApi::load` opens the engine with [`DynLib`], resolves every
//! `topt_*` function once and keeps the library alive for the lifetime of
//! the table. The table implements [`Engine`] by calling straight through.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;

use crate::dl::DynLib;
use crate::engine::Engine;
use crate::records::{
    FlakyTestRetriesSettings, InitOptions, KeyNumberArray, KeyValueArray, KnownTestArray,
    MockSpanArray, ModuleResult, SessionResult, SettingsResponse, SkippableTestArray,
    SpanResult, SpanStartOptions, SuiteResult, TestCloseOptions, TestCoverage,
    TestManagementTestPropertiesArray, TestResult,
};
use crate::types::{Bool, EntityId, ModuleId, SessionId, SpanId, SuiteId, TestId, UnixTime};

// ---------------------------------------------------------------------------
// Function pointer types
// ---------------------------------------------------------------------------

type FnInitialize = unsafe extern "C" fn(options: InitOptions) -> Bool;
type FnShutdown = unsafe extern "C" fn() -> Bool;
type FnGetSettings = unsafe extern "C" fn() -> SettingsResponse;
type FnGetFlakyTestRetriesSettings = unsafe extern "C" fn() -> FlakyTestRetriesSettings;
type FnGetKnownTests = unsafe extern "C" fn() -> KnownTestArray;
type FnGetSkippableTests = unsafe extern "C" fn() -> SkippableTestArray;
type FnGetTestManagementTests = unsafe extern "C" fn() -> TestManagementTestPropertiesArray;
type FnFreeKnownTests = unsafe extern "C" fn(array: KnownTestArray);
type FnFreeSkippableTests = unsafe extern "C" fn(array: SkippableTestArray);
type FnFreeTestManagementTests = unsafe extern "C" fn(array: TestManagementTestPropertiesArray);
type FnSendCodeCoveragePayload = unsafe extern "C" fn(coverages: *const TestCoverage, len: usize);

type FnSetStringTag<Id> =
    unsafe extern "C" fn(id: Id, key: *const c_char, value: *const c_char) -> Bool;
type FnSetNumberTag<Id> = unsafe extern "C" fn(id: Id, key: *const c_char, value: f64) -> Bool;
type FnSetError<Id> = unsafe extern "C" fn(
    id: Id,
    error_type: *const c_char,
    error_message: *const c_char,
    error_stacktrace: *const c_char,
) -> Bool;
type FnSetSource<Id> = unsafe extern "C" fn(
    id: Id,
    file: *const c_char,
    start_line: *const c_int,
    end_line: *const c_int,
) -> Bool;
type FnClose<Id> = unsafe extern "C" fn(id: Id, end_time: *const UnixTime) -> Bool;

type FnSessionCreate = unsafe extern "C" fn(
    framework: *const c_char,
    framework_version: *const c_char,
    start_time: *const UnixTime,
) -> SessionResult;
type FnSessionClose =
    unsafe extern "C" fn(session_id: SessionId, exit_code: c_int, end_time: *const UnixTime);
type FnModuleCreate = unsafe extern "C" fn(
    session_id: SessionId,
    name: *const c_char,
    framework_name: *const c_char,
    framework_version: *const c_char,
    start_time: *const UnixTime,
) -> ModuleResult;
type FnSuiteCreate = unsafe extern "C" fn(
    module_id: ModuleId,
    name: *const c_char,
    start_time: *const UnixTime,
) -> SuiteResult;
type FnTestCreate = unsafe extern "C" fn(
    suite_id: SuiteId,
    name: *const c_char,
    start_time: *const UnixTime,
) -> TestResult;
type FnTestClose = unsafe extern "C" fn(test_id: TestId, options: TestCloseOptions) -> Bool;
type FnTestSetBenchmarkStringData =
    unsafe extern "C" fn(test_id: TestId, measure_type: *const c_char, data: KeyValueArray) -> Bool;
type FnTestSetBenchmarkNumberData = unsafe extern "C" fn(
    test_id: TestId,
    measure_type: *const c_char,
    data: KeyNumberArray,
) -> Bool;
type FnTestLog =
    unsafe extern "C" fn(test_id: TestId, message: *const c_char, tags: *const c_char) -> Bool;
type FnSpanCreate =
    unsafe extern "C" fn(parent_id: EntityId, options: SpanStartOptions) -> SpanResult;

type FnMockTracerReset = unsafe extern "C" fn() -> Bool;
type FnMockTracerGetSpans = unsafe extern "C" fn() -> MockSpanArray;
type FnMockTracerFreeSpans = unsafe extern "C" fn(array: MockSpanArray);

// ---------------------------------------------------------------------------
// EngineApi
// ---------------------------------------------------------------------------

/// The loaded engine library and every resolved `topt_*` function pointer.
pub struct EngineApi {
    /// Keeps the library mapped while any pointer below may be called.
    lib: DynLib,

    initialize: FnInitialize,
    shutdown: FnShutdown,
    get_settings: FnGetSettings,
    get_flaky_test_retries_settings: FnGetFlakyTestRetriesSettings,
    get_known_tests: FnGetKnownTests,
    get_skippable_tests: FnGetSkippableTests,
    get_test_management_tests: FnGetTestManagementTests,
    free_known_tests: FnFreeKnownTests,
    free_skippable_tests: FnFreeSkippableTests,
    free_test_management_tests: FnFreeTestManagementTests,
    send_code_coverage_payload: FnSendCodeCoveragePayload,

    session_create: FnSessionCreate,
    session_set_string_tag: FnSetStringTag<SessionId>,
    session_set_number_tag: FnSetNumberTag<SessionId>,
    session_set_error: FnSetError<SessionId>,
    session_close: FnSessionClose,

    module_create: FnModuleCreate,
    module_set_string_tag: FnSetStringTag<ModuleId>,
    module_set_number_tag: FnSetNumberTag<ModuleId>,
    module_set_error: FnSetError<ModuleId>,
    module_close: FnClose<ModuleId>,

    suite_create: FnSuiteCreate,
    suite_set_string_tag: FnSetStringTag<SuiteId>,
    suite_set_number_tag: FnSetNumberTag<SuiteId>,
    suite_set_error: FnSetError<SuiteId>,
    suite_set_source: FnSetSource<SuiteId>,
    suite_close: FnClose<SuiteId>,

    test_create: FnTestCreate,
    test_set_string_tag: FnSetStringTag<TestId>,
    test_set_number_tag: FnSetNumberTag<TestId>,
    test_set_error: FnSetError<TestId>,
    test_set_source: FnSetSource<TestId>,
    test_close: FnTestClose,
    test_set_benchmark_string_data: FnTestSetBenchmarkStringData,
    test_set_benchmark_number_data: FnTestSetBenchmarkNumberData,
    test_log: FnTestLog,

    span_create: FnSpanCreate,
    span_set_string_tag: FnSetStringTag<SpanId>,
    span_set_number_tag: FnSetNumberTag<SpanId>,
    span_set_error: FnSetError<SpanId>,
    span_close: FnClose<SpanId>,

    mock_tracer_reset: FnMockTracerReset,
    mock_tracer_get_finished_spans: FnMockTracerGetSpans,
    mock_tracer_get_open_spans: FnMockTracerGetSpans,
    mock_tracer_free_mock_span_array: FnMockTracerFreeSpans,
}

// SAFETY: the table only holds immutable function pointers and the library
// handle. Concurrent use of independent handles is part of the engine's
// contract; serialising calls on the same handle is the caller's job.
unsafe impl Send for EngineApi {}
unsafe impl Sync for EngineApi {}

/// Resolve a symbol and transmute it to the expected fn pointer type.
macro_rules! load_sym {
    ($lib:expr, $name:literal) => {{
        let cname = concat!($name, "\0");
        let cstr = CStr::from_bytes_with_nul(cname.as_bytes())
            .map_err(|e| format!("bad symbol name {}: {}", $name, e))?;
        let ptr = unsafe { $lib.sym(cstr) }
            .map_err(|e| format!("failed to load {}: {}", $name, e))?;
        if ptr.is_null() {
            return Err(format!("{} resolved to null", $name));
        }
        unsafe { std::mem::transmute::<*mut c_void, _>(ptr) }
    }};
}

impl EngineApi {
    /// Open the engine library at `path` and resolve every entry point.
    ///
    /// Fails if the library cannot be opened or any `topt_*` symbol is
    /// missing; a partially resolved table is never returned.
    pub fn load(path: &Path) -> Result<Self, String> {
        let lib = DynLib::open(path)?;

        Ok(Self {
            initialize: load_sym!(lib, "topt_initialize"),
            shutdown: load_sym!(lib, "topt_shutdown"),
            get_settings: load_sym!(lib, "topt_get_settings"),
            get_flaky_test_retries_settings: load_sym!(lib, "topt_get_flaky_test_retries_settings"),
            get_known_tests: load_sym!(lib, "topt_get_known_tests"),
            get_skippable_tests: load_sym!(lib, "topt_get_skippable_tests"),
            get_test_management_tests: load_sym!(lib, "topt_get_test_management_tests"),
            free_known_tests: load_sym!(lib, "topt_free_known_tests"),
            free_skippable_tests: load_sym!(lib, "topt_free_skippable_tests"),
            free_test_management_tests: load_sym!(lib, "topt_free_test_management_tests"),
            send_code_coverage_payload: load_sym!(lib, "topt_send_code_coverage_payload"),

            session_create: load_sym!(lib, "topt_session_create"),
            session_set_string_tag: load_sym!(lib, "topt_session_set_string_tag"),
            session_set_number_tag: load_sym!(lib, "topt_session_set_number_tag"),
            session_set_error: load_sym!(lib, "topt_session_set_error"),
            session_close: load_sym!(lib, "topt_session_close"),

            module_create: load_sym!(lib, "topt_module_create"),
            module_set_string_tag: load_sym!(lib, "topt_module_set_string_tag"),
            module_set_number_tag: load_sym!(lib, "topt_module_set_number_tag"),
            module_set_error: load_sym!(lib, "topt_module_set_error"),
            module_close: load_sym!(lib, "topt_module_close"),

            suite_create: load_sym!(lib, "topt_suite_create"),
            suite_set_string_tag: load_sym!(lib, "topt_suite_set_string_tag"),
            suite_set_number_tag: load_sym!(lib, "topt_suite_set_number_tag"),
            suite_set_error: load_sym!(lib, "topt_suite_set_error"),
            suite_set_source: load_sym!(lib, "topt_suite_set_source"),
            suite_close: load_sym!(lib, "topt_suite_close"),

            test_create: load_sym!(lib, "topt_test_create"),
            test_set_string_tag: load_sym!(lib, "topt_test_set_string_tag"),
            test_set_number_tag: load_sym!(lib, "topt_test_set_number_tag"),
            test_set_error: load_sym!(lib, "topt_test_set_error"),
            test_set_source: load_sym!(lib, "topt_test_set_source"),
            test_close: load_sym!(lib, "topt_test_close"),
            test_set_benchmark_string_data: load_sym!(lib, "topt_test_set_benchmark_string_data"),
            test_set_benchmark_number_data: load_sym!(lib, "topt_test_set_benchmark_number_data"),
            test_log: load_sym!(lib, "topt_test_log"),

            span_create: load_sym!(lib, "topt_span_create"),
            span_set_string_tag: load_sym!(lib, "topt_span_set_string_tag"),
            span_set_number_tag: load_sym!(lib, "topt_span_set_number_tag"),
            span_set_error: load_sym!(lib, "topt_span_set_error"),
            span_close: load_sym!(lib, "topt_span_close"),

            mock_tracer_reset: load_sym!(lib, "topt_debug_mock_tracer_reset"),
            mock_tracer_get_finished_spans: load_sym!(
                lib,
                "topt_debug_mock_tracer_get_finished_spans"
            ),
            mock_tracer_get_open_spans: load_sym!(lib, "topt_debug_mock_tracer_get_open_spans"),
            mock_tracer_free_mock_span_array: load_sym!(
                lib,
                "topt_debug_mock_tracer_free_mock_span_array"
            ),

            lib,
        })
    }

    /// Path or name the engine library was opened with.
    pub fn library_path(&self) -> &Path {
        self.lib.path()
    }
}

impl Engine for EngineApi {
    fn name(&self) -> &'static str {
        "native"
    }

    unsafe fn initialize(&self, options: InitOptions) -> Bool {
        (self.initialize)(options)
    }

    fn shutdown(&self) -> Bool {
        unsafe { (self.shutdown)() }
    }

    fn get_settings(&self) -> SettingsResponse {
        unsafe { (self.get_settings)() }
    }

    fn get_flaky_test_retries_settings(&self) -> FlakyTestRetriesSettings {
        unsafe { (self.get_flaky_test_retries_settings)() }
    }

    fn get_known_tests(&self) -> KnownTestArray {
        unsafe { (self.get_known_tests)() }
    }

    fn get_skippable_tests(&self) -> SkippableTestArray {
        unsafe { (self.get_skippable_tests)() }
    }

    fn get_test_management_tests(&self) -> TestManagementTestPropertiesArray {
        unsafe { (self.get_test_management_tests)() }
    }

    unsafe fn free_known_tests(&self, array: KnownTestArray) {
        (self.free_known_tests)(array)
    }

    unsafe fn free_skippable_tests(&self, array: SkippableTestArray) {
        (self.free_skippable_tests)(array)
    }

    unsafe fn free_test_management_tests(&self, array: TestManagementTestPropertiesArray) {
        (self.free_test_management_tests)(array)
    }

    unsafe fn send_code_coverage_payload(&self, coverages: *const TestCoverage, len: usize) {
        (self.send_code_coverage_payload)(coverages, len)
    }

    unsafe fn session_create(
        &self,
        framework: *const c_char,
        framework_version: *const c_char,
        start_time: *const UnixTime,
    ) -> SessionResult {
        (self.session_create)(framework, framework_version, start_time)
    }

    unsafe fn session_set_string_tag(
        &self,
        session_id: SessionId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        (self.session_set_string_tag)(session_id, key, value)
    }

    unsafe fn session_set_number_tag(
        &self,
        session_id: SessionId,
        key: *const c_char,
        value: f64,
    ) -> Bool {
        (self.session_set_number_tag)(session_id, key, value)
    }

    unsafe fn session_set_error(
        &self,
        session_id: SessionId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        (self.session_set_error)(session_id, error_type, error_message, error_stacktrace)
    }

    unsafe fn session_close(
        &self,
        session_id: SessionId,
        exit_code: c_int,
        end_time: *const UnixTime,
    ) {
        (self.session_close)(session_id, exit_code, end_time)
    }

    unsafe fn module_create(
        &self,
        session_id: SessionId,
        name: *const c_char,
        framework_name: *const c_char,
        framework_version: *const c_char,
        start_time: *const UnixTime,
    ) -> ModuleResult {
        (self.module_create)(session_id, name, framework_name, framework_version, start_time)
    }

    unsafe fn module_set_string_tag(
        &self,
        module_id: ModuleId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        (self.module_set_string_tag)(module_id, key, value)
    }

    unsafe fn module_set_number_tag(
        &self,
        module_id: ModuleId,
        key: *const c_char,
        value: f64,
    ) -> Bool {
        (self.module_set_number_tag)(module_id, key, value)
    }

    unsafe fn module_set_error(
        &self,
        module_id: ModuleId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        (self.module_set_error)(module_id, error_type, error_message, error_stacktrace)
    }

    unsafe fn module_close(&self, module_id: ModuleId, end_time: *const UnixTime) -> Bool {
        (self.module_close)(module_id, end_time)
    }

    unsafe fn suite_create(
        &self,
        module_id: ModuleId,
        name: *const c_char,
        start_time: *const UnixTime,
    ) -> SuiteResult {
        (self.suite_create)(module_id, name, start_time)
    }

    unsafe fn suite_set_string_tag(
        &self,
        suite_id: SuiteId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        (self.suite_set_string_tag)(suite_id, key, value)
    }

    unsafe fn suite_set_number_tag(
        &self,
        suite_id: SuiteId,
        key: *const c_char,
        value: f64,
    ) -> Bool {
        (self.suite_set_number_tag)(suite_id, key, value)
    }

    unsafe fn suite_set_error(
        &self,
        suite_id: SuiteId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        (self.suite_set_error)(suite_id, error_type, error_message, error_stacktrace)
    }

    unsafe fn suite_set_source(
        &self,
        suite_id: SuiteId,
        file: *const c_char,
        start_line: *const c_int,
        end_line: *const c_int,
    ) -> Bool {
        (self.suite_set_source)(suite_id, file, start_line, end_line)
    }

    unsafe fn suite_close(&self, suite_id: SuiteId, end_time: *const UnixTime) -> Bool {
        (self.suite_close)(suite_id, end_time)
    }

    unsafe fn test_create(
        &self,
        suite_id: SuiteId,
        name: *const c_char,
        start_time: *const UnixTime,
    ) -> TestResult {
        (self.test_create)(suite_id, name, start_time)
    }

    unsafe fn test_set_string_tag(
        &self,
        test_id: TestId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        (self.test_set_string_tag)(test_id, key, value)
    }

    unsafe fn test_set_number_tag(
        &self,
        test_id: TestId,
        key: *const c_char,
        value: f64,
    ) -> Bool {
        (self.test_set_number_tag)(test_id, key, value)
    }

    unsafe fn test_set_error(
        &self,
        test_id: TestId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        (self.test_set_error)(test_id, error_type, error_message, error_stacktrace)
    }

    unsafe fn test_set_source(
        &self,
        test_id: TestId,
        file: *const c_char,
        start_line: *const c_int,
        end_line: *const c_int,
    ) -> Bool {
        (self.test_set_source)(test_id, file, start_line, end_line)
    }

    unsafe fn test_close(&self, test_id: TestId, options: TestCloseOptions) -> Bool {
        (self.test_close)(test_id, options)
    }

    unsafe fn test_set_benchmark_string_data(
        &self,
        test_id: TestId,
        measure_type: *const c_char,
        data: KeyValueArray,
    ) -> Bool {
        (self.test_set_benchmark_string_data)(test_id, measure_type, data)
    }

    unsafe fn test_set_benchmark_number_data(
        &self,
        test_id: TestId,
        measure_type: *const c_char,
        data: KeyNumberArray,
    ) -> Bool {
        (self.test_set_benchmark_number_data)(test_id, measure_type, data)
    }

    unsafe fn test_log(
        &self,
        test_id: TestId,
        message: *const c_char,
        tags: *const c_char,
    ) -> Bool {
        (self.test_log)(test_id, message, tags)
    }

    unsafe fn span_create(&self, parent_id: EntityId, options: SpanStartOptions) -> SpanResult {
        (self.span_create)(parent_id, options)
    }

    unsafe fn span_set_string_tag(
        &self,
        span_id: SpanId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        (self.span_set_string_tag)(span_id, key, value)
    }

    unsafe fn span_set_number_tag(
        &self,
        span_id: SpanId,
        key: *const c_char,
        value: f64,
    ) -> Bool {
        (self.span_set_number_tag)(span_id, key, value)
    }

    unsafe fn span_set_error(
        &self,
        span_id: SpanId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        (self.span_set_error)(span_id, error_type, error_message, error_stacktrace)
    }

    unsafe fn span_close(&self, span_id: SpanId, end_time: *const UnixTime) -> Bool {
        (self.span_close)(span_id, end_time)
    }

    fn debug_mock_tracer_reset(&self) -> Bool {
        unsafe { (self.mock_tracer_reset)() }
    }

    fn debug_mock_tracer_get_finished_spans(&self) -> MockSpanArray {
        unsafe { (self.mock_tracer_get_finished_spans)() }
    }

    fn debug_mock_tracer_get_open_spans(&self) -> MockSpanArray {
        unsafe { (self.mock_tracer_get_open_spans)() }
    }

    unsafe fn debug_mock_tracer_free_mock_span_array(&self, array: MockSpanArray) {
        (self.mock_tracer_free_mock_span_array)(array)
    }
}
