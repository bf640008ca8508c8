use std::collections::BTreeMap;
use std::os::raw::{c_char, c_int};

use topt_ffi::{
    EntityId, Engine, FlakyTestRetriesSettings, InitOptions, KeyNumberArray, KeyValueArray,
    KnownTest, KnownTestArray, MockSpan, MockSpanArray, ModuleId, ModuleResult, SessionId,
    SessionResult, SettingsResponse, SkippableTest, SkippableTestArray, SpanId, SpanResult,
    SpanStartOptions, SuiteId, SuiteResult, TestCloseOptions, TestCoverage, TestId,
    TestManagementTestProperties, TestManagementTestPropertiesArray, TestResult, UnixTime, Bool,
    FALSE, TEST_STATUS_FAIL, TEST_STATUS_PASS, TEST_STATUS_SKIP, TRUE,
};

use super::owned::{
    free_key_numbers, free_key_values, free_string, leak_key_numbers, leak_key_values,
    leak_records, leak_string, reclaim_records,
};
use super::registry::{
    tags, BenchmarkData, BenchmarkRecord, CoverageRecord, EntityRecord, InitRecord, LogRecord,
    Parent,
};
use super::InMemoryEngine;
use crate::decode::{read_key_numbers, read_key_values, read_opt_string, read_string};
use crate::error::EntityKind;
use crate::settings::Settings;

unsafe fn read_time(ptr: *const UnixTime) -> UnixTime {
    if ptr.is_null() {
        UnixTime::now()
    } else {
        *ptr
    }
}

unsafe fn read_line(ptr: *const c_int) -> Option<f64> {
    if ptr.is_null() {
        None
    } else {
        Some(f64::from(*ptr))
    }
}

unsafe fn read_pairs(ptr: *const KeyValueArray) -> BTreeMap<String, String> {
    if ptr.is_null() {
        BTreeMap::new()
    } else {
        read_key_values(&*ptr)
    }
}

fn set_error(record: &mut EntityRecord, error_type: String, message: String, stack: String) {
    record.set_string(tags::ERROR_TYPE, error_type);
    record.set_string(tags::ERROR_MESSAGE, message);
    record.set_string(tags::ERROR_STACK, stack);
}

fn set_source(record: &mut EntityRecord, file: String, start: Option<f64>, end: Option<f64>) {
    record.set_string(tags::SOURCE_FILE, file);
    if let Some(start) = start {
        record.set_number(tags::SOURCE_START, start);
    }
    if let Some(end) = end {
        record.set_number(tags::SOURCE_END, end);
    }
}

impl InMemoryEngine {
    /// Apply `update` to an open entity of `kind`; false when there is none.
    fn with_open<F>(&self, operation: &'static str, raw: u64, kind: EntityKind, update: F) -> Bool
    where
        F: FnOnce(&mut EntityRecord),
    {
        if !self.enter(operation) {
            return FALSE;
        }
        match self.registry.lock().open_mut(raw, kind) {
            Some(record) => {
                update(record);
                TRUE
            }
            None => FALSE,
        }
    }

    /// Register a new entity; `None` when not initialized or the parent is unusable.
    fn create_entity<F>(
        &self,
        operation: &'static str,
        kind: EntityKind,
        parent: Parent,
        operation_name: String,
        start_time: UnixTime,
        init: F,
    ) -> Option<u64>
    where
        F: FnOnce(&mut EntityRecord),
    {
        if !self.enter(operation) {
            return None;
        }
        let mut registry = self.registry.lock();
        if !registry.initialized {
            return None;
        }
        let record = registry.create(kind, parent, operation_name, start_time)?;
        init(&mut *record);
        Some(record.id.as_raw())
    }

    fn span_array(&self, operation: &'static str, finished: bool) -> MockSpanArray {
        if !self.enter(operation) {
            return MockSpanArray {
                data: std::ptr::null(),
                len: 0,
            };
        }
        let spans: Vec<MockSpan> = self
            .registry
            .lock()
            .recorded(finished)
            .map(|record| MockSpan {
                span_id: record.id,
                trace_id: record.trace_id,
                parent_span_id: record.parent.map_or(0, EntityId::as_raw),
                start_time: record.start_time,
                finish_time: record.finish_time.unwrap_or(record.start_time),
                operation_name: leak_string(&record.operation_name),
                string_tags: leak_key_values(&record.string_tags),
                number_tags: leak_key_numbers(&record.number_tags),
            })
            .collect();
        let (data, len) = leak_records(spans);
        self.track_allocation(data);
        MockSpanArray { data, len }
    }
}

impl Engine for InMemoryEngine {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    unsafe fn initialize(&self, options: InitOptions) -> Bool {
        if !self.enter("initialize") {
            return FALSE;
        }
        let record = InitRecord {
            language: read_string(options.language),
            runtime_name: read_string(options.runtime_name),
            runtime_version: read_string(options.runtime_version),
            working_directory: read_opt_string(options.working_directory),
            environment_variables: read_pairs(options.environment_variables),
            global_tags: read_pairs(options.global_tags),
            use_mock_tracer: options.use_mock_tracer != FALSE,
        };
        let mut registry = self.registry.lock();
        registry.initialized = true;
        registry.recording = record.use_mock_tracer;
        registry.init = Some(record);
        TRUE
    }

    fn shutdown(&self) -> Bool {
        if !self.enter("shutdown") {
            return FALSE;
        }
        let mut registry = self.registry.lock();
        if !registry.initialized {
            return FALSE;
        }
        registry.initialized = false;
        TRUE
    }

    fn get_settings(&self) -> SettingsResponse {
        if !self.enter("get_settings") {
            return Settings::default().to_wire();
        }
        self.seed.read().settings.to_wire()
    }

    fn get_flaky_test_retries_settings(&self) -> FlakyTestRetriesSettings {
        if !self.enter("get_flaky_test_retries_settings") {
            return FlakyTestRetriesSettings::default();
        }
        self.seed.read().flaky_test_retries.to_wire()
    }

    fn get_known_tests(&self) -> KnownTestArray {
        let records: Vec<KnownTest> = if self.enter("get_known_tests") {
            self.seed
                .read()
                .known_tests
                .iter()
                .map(|t| KnownTest {
                    module_name: leak_string(&t.module_name),
                    suite_name: leak_string(&t.suite_name),
                    test_name: leak_string(&t.test_name),
                })
                .collect()
        } else {
            Vec::new()
        };
        let (data, len) = leak_records(records);
        self.track_allocation(data);
        KnownTestArray { data, len }
    }

    fn get_skippable_tests(&self) -> SkippableTestArray {
        let records: Vec<SkippableTest> = if self.enter("get_skippable_tests") {
            self.seed
                .read()
                .skippable_tests
                .iter()
                .map(|t| SkippableTest {
                    suite_name: leak_string(&t.suite_name),
                    test_name: leak_string(&t.test_name),
                    parameters: leak_string(&t.parameters),
                    custom_configurations_json: leak_string(&t.custom_configurations_json),
                })
                .collect()
        } else {
            Vec::new()
        };
        let (data, len) = leak_records(records);
        self.track_allocation(data);
        SkippableTestArray { data, len }
    }

    fn get_test_management_tests(&self) -> TestManagementTestPropertiesArray {
        let records: Vec<TestManagementTestProperties> =
            if self.enter("get_test_management_tests") {
                self.seed
                    .read()
                    .test_management_tests
                    .iter()
                    .map(|t| TestManagementTestProperties {
                        module_name: leak_string(&t.module_name),
                        suite_name: leak_string(&t.suite_name),
                        test_name: leak_string(&t.test_name),
                        quarantined: topt_ffi::from_bool(t.quarantined),
                        disabled: topt_ffi::from_bool(t.disabled),
                        attempt_to_fix: topt_ffi::from_bool(t.attempt_to_fix),
                    })
                    .collect()
            } else {
                Vec::new()
            };
        let (data, len) = leak_records(records);
        self.track_allocation(data);
        TestManagementTestPropertiesArray { data, len }
    }

    unsafe fn free_known_tests(&self, array: KnownTestArray) {
        self.count_only("free_known_tests");
        self.track_free(array.data);
        for record in reclaim_records(array.data, array.len) {
            free_string(record.module_name);
            free_string(record.suite_name);
            free_string(record.test_name);
        }
    }

    unsafe fn free_skippable_tests(&self, array: SkippableTestArray) {
        self.count_only("free_skippable_tests");
        self.track_free(array.data);
        for record in reclaim_records(array.data, array.len) {
            free_string(record.suite_name);
            free_string(record.test_name);
            free_string(record.parameters);
            free_string(record.custom_configurations_json);
        }
    }

    unsafe fn free_test_management_tests(&self, array: TestManagementTestPropertiesArray) {
        self.count_only("free_test_management_tests");
        self.track_free(array.data);
        for record in reclaim_records(array.data, array.len) {
            free_string(record.module_name);
            free_string(record.suite_name);
            free_string(record.test_name);
        }
    }

    unsafe fn send_code_coverage_payload(&self, coverages: *const TestCoverage, len: usize) {
        if !self.enter("send_code_coverage_payload") || coverages.is_null() {
            return;
        }
        let payloads: Vec<CoverageRecord> = std::slice::from_raw_parts(coverages, len)
            .iter()
            .map(|coverage| {
                let files = if coverage.files.is_null() {
                    &[][..]
                } else {
                    std::slice::from_raw_parts(coverage.files, coverage.files_len)
                };
                CoverageRecord {
                    session_id: coverage.session_id.as_raw(),
                    suite_id: coverage.suite_id.as_raw(),
                    test_id: coverage.test_id.as_raw(),
                    files: files.iter().map(|f| read_string(f.filename)).collect(),
                }
            })
            .collect();
        self.registry.lock().coverage.extend(payloads);
    }

    // --- session ---

    unsafe fn session_create(
        &self,
        framework: *const c_char,
        framework_version: *const c_char,
        start_time: *const UnixTime,
    ) -> SessionResult {
        let framework = read_opt_string(framework);
        let framework_version = read_opt_string(framework_version);
        let created = self.create_entity(
            "session_create",
            EntityKind::Session,
            Parent::Root,
            "test_session".to_string(),
            read_time(start_time),
            |record| {
                if let Some(framework) = framework {
                    record.set_string(tags::FRAMEWORK, framework);
                }
                if let Some(version) = framework_version {
                    record.set_string(tags::FRAMEWORK_VERSION, version);
                }
            },
        );
        match created {
            Some(raw) => SessionResult {
                session_id: SessionId::from_raw(raw),
                valid: TRUE,
            },
            None => SessionResult::default(),
        }
    }

    unsafe fn session_set_string_tag(
        &self,
        session_id: SessionId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        let (key, value) = (read_string(key), read_string(value));
        self.with_open(
            "session_set_string_tag",
            session_id.as_raw(),
            EntityKind::Session,
            |r| r.set_string(&key, value),
        )
    }

    unsafe fn session_set_number_tag(
        &self,
        session_id: SessionId,
        key: *const c_char,
        value: f64,
    ) -> Bool {
        let key = read_string(key);
        self.with_open(
            "session_set_number_tag",
            session_id.as_raw(),
            EntityKind::Session,
            |r| r.set_number(&key, value),
        )
    }

    unsafe fn session_set_error(
        &self,
        session_id: SessionId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        let error = (
            read_string(error_type),
            read_string(error_message),
            read_string(error_stacktrace),
        );
        self.with_open(
            "session_set_error",
            session_id.as_raw(),
            EntityKind::Session,
            |r| set_error(r, error.0, error.1, error.2),
        )
    }

    unsafe fn session_close(
        &self,
        session_id: SessionId,
        exit_code: c_int,
        end_time: *const UnixTime,
    ) {
        let end = read_time(end_time);
        self.with_open(
            "session_close",
            session_id.as_raw(),
            EntityKind::Session,
            |r| {
                r.set_number(tags::EXIT_CODE, f64::from(exit_code));
                r.finish(end);
            },
        );
    }

    // --- module ---

    unsafe fn module_create(
        &self,
        session_id: SessionId,
        name: *const c_char,
        framework_name: *const c_char,
        framework_version: *const c_char,
        start_time: *const UnixTime,
    ) -> ModuleResult {
        let name = read_string(name);
        let framework = read_opt_string(framework_name);
        let framework_version = read_opt_string(framework_version);
        let created = self.create_entity(
            "module_create",
            EntityKind::Module,
            Parent::Typed(session_id.as_raw(), EntityKind::Session),
            "test_module".to_string(),
            read_time(start_time),
            |record| {
                record.set_string(tags::MODULE, name);
                if let Some(framework) = framework {
                    record.set_string(tags::FRAMEWORK, framework);
                }
                if let Some(version) = framework_version {
                    record.set_string(tags::FRAMEWORK_VERSION, version);
                }
            },
        );
        match created {
            Some(raw) => ModuleResult {
                module_id: ModuleId::from_raw(raw),
                valid: TRUE,
            },
            None => ModuleResult::default(),
        }
    }

    unsafe fn module_set_string_tag(
        &self,
        module_id: ModuleId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        let (key, value) = (read_string(key), read_string(value));
        self.with_open(
            "module_set_string_tag",
            module_id.as_raw(),
            EntityKind::Module,
            |r| r.set_string(&key, value),
        )
    }

    unsafe fn module_set_number_tag(
        &self,
        module_id: ModuleId,
        key: *const c_char,
        value: f64,
    ) -> Bool {
        let key = read_string(key);
        self.with_open(
            "module_set_number_tag",
            module_id.as_raw(),
            EntityKind::Module,
            |r| r.set_number(&key, value),
        )
    }

    unsafe fn module_set_error(
        &self,
        module_id: ModuleId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        let error = (
            read_string(error_type),
            read_string(error_message),
            read_string(error_stacktrace),
        );
        self.with_open(
            "module_set_error",
            module_id.as_raw(),
            EntityKind::Module,
            |r| set_error(r, error.0, error.1, error.2),
        )
    }

    unsafe fn module_close(&self, module_id: ModuleId, end_time: *const UnixTime) -> Bool {
        let end = read_time(end_time);
        self.with_open("module_close", module_id.as_raw(), EntityKind::Module, |r| {
            r.finish(end)
        })
    }

    // --- suite ---

    unsafe fn suite_create(
        &self,
        module_id: ModuleId,
        name: *const c_char,
        start_time: *const UnixTime,
    ) -> SuiteResult {
        let name = read_string(name);
        let created = self.create_entity(
            "suite_create",
            EntityKind::Suite,
            Parent::Typed(module_id.as_raw(), EntityKind::Module),
            "test_suite".to_string(),
            read_time(start_time),
            |record| record.set_string(tags::SUITE, name),
        );
        match created {
            Some(raw) => SuiteResult {
                suite_id: SuiteId::from_raw(raw),
                valid: TRUE,
            },
            None => SuiteResult::default(),
        }
    }

    unsafe fn suite_set_string_tag(
        &self,
        suite_id: SuiteId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        let (key, value) = (read_string(key), read_string(value));
        self.with_open(
            "suite_set_string_tag",
            suite_id.as_raw(),
            EntityKind::Suite,
            |r| r.set_string(&key, value),
        )
    }

    unsafe fn suite_set_number_tag(
        &self,
        suite_id: SuiteId,
        key: *const c_char,
        value: f64,
    ) -> Bool {
        let key = read_string(key);
        self.with_open(
            "suite_set_number_tag",
            suite_id.as_raw(),
            EntityKind::Suite,
            |r| r.set_number(&key, value),
        )
    }

    unsafe fn suite_set_error(
        &self,
        suite_id: SuiteId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        let error = (
            read_string(error_type),
            read_string(error_message),
            read_string(error_stacktrace),
        );
        self.with_open(
            "suite_set_error",
            suite_id.as_raw(),
            EntityKind::Suite,
            |r| set_error(r, error.0, error.1, error.2),
        )
    }

    unsafe fn suite_set_source(
        &self,
        suite_id: SuiteId,
        file: *const c_char,
        start_line: *const c_int,
        end_line: *const c_int,
    ) -> Bool {
        let (file, start, end) = (read_string(file), read_line(start_line), read_line(end_line));
        self.with_open(
            "suite_set_source",
            suite_id.as_raw(),
            EntityKind::Suite,
            |r| set_source(r, file, start, end),
        )
    }

    unsafe fn suite_close(&self, suite_id: SuiteId, end_time: *const UnixTime) -> Bool {
        let end = read_time(end_time);
        self.with_open("suite_close", suite_id.as_raw(), EntityKind::Suite, |r| {
            r.finish(end)
        })
    }

    // --- test ---

    unsafe fn test_create(
        &self,
        suite_id: SuiteId,
        name: *const c_char,
        start_time: *const UnixTime,
    ) -> TestResult {
        let name = read_string(name);
        let created = self.create_entity(
            "test_create",
            EntityKind::Test,
            Parent::Typed(suite_id.as_raw(), EntityKind::Suite),
            "test".to_string(),
            read_time(start_time),
            |record| record.set_string(tags::NAME, name),
        );
        match created {
            Some(raw) => TestResult {
                test_id: TestId::from_raw(raw),
                valid: TRUE,
            },
            None => TestResult::default(),
        }
    }

    unsafe fn test_set_string_tag(
        &self,
        test_id: TestId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        let (key, value) = (read_string(key), read_string(value));
        self.with_open(
            "test_set_string_tag",
            test_id.as_raw(),
            EntityKind::Test,
            |r| r.set_string(&key, value),
        )
    }

    unsafe fn test_set_number_tag(&self, test_id: TestId, key: *const c_char, value: f64) -> Bool {
        let key = read_string(key);
        self.with_open(
            "test_set_number_tag",
            test_id.as_raw(),
            EntityKind::Test,
            |r| r.set_number(&key, value),
        )
    }

    unsafe fn test_set_error(
        &self,
        test_id: TestId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        let error = (
            read_string(error_type),
            read_string(error_message),
            read_string(error_stacktrace),
        );
        self.with_open(
            "test_set_error",
            test_id.as_raw(),
            EntityKind::Test,
            |r| set_error(r, error.0, error.1, error.2),
        )
    }

    unsafe fn test_set_source(
        &self,
        test_id: TestId,
        file: *const c_char,
        start_line: *const c_int,
        end_line: *const c_int,
    ) -> Bool {
        let (file, start, end) = (read_string(file), read_line(start_line), read_line(end_line));
        self.with_open(
            "test_set_source",
            test_id.as_raw(),
            EntityKind::Test,
            |r| set_source(r, file, start, end),
        )
    }

    unsafe fn test_close(&self, test_id: TestId, options: TestCloseOptions) -> Bool {
        let status = match options.status {
            TEST_STATUS_PASS => "pass",
            TEST_STATUS_FAIL => "fail",
            TEST_STATUS_SKIP => "skip",
            _ => {
                self.count_only("test_close");
                return FALSE;
            }
        };
        let end = read_time(options.finish_time);
        let skip_reason = read_opt_string(options.skip_reason);
        self.with_open("test_close", test_id.as_raw(), EntityKind::Test, |r| {
            r.set_string(tags::STATUS, status);
            if let Some(reason) = skip_reason {
                r.set_string(tags::SKIP_REASON, reason);
            }
            r.finish(end);
        })
    }

    unsafe fn test_set_benchmark_string_data(
        &self,
        test_id: TestId,
        measure_type: *const c_char,
        data: KeyValueArray,
    ) -> Bool {
        if !self.enter("test_set_benchmark_string_data") {
            return FALSE;
        }
        let mut registry = self.registry.lock();
        if registry.open(test_id.as_raw(), EntityKind::Test).is_none() {
            return FALSE;
        }
        registry.benchmarks.push(BenchmarkRecord {
            test_id,
            measure_type: read_string(measure_type),
            data: BenchmarkData::Strings(read_key_values(&data)),
        });
        TRUE
    }

    unsafe fn test_set_benchmark_number_data(
        &self,
        test_id: TestId,
        measure_type: *const c_char,
        data: KeyNumberArray,
    ) -> Bool {
        if !self.enter("test_set_benchmark_number_data") {
            return FALSE;
        }
        let mut registry = self.registry.lock();
        if registry.open(test_id.as_raw(), EntityKind::Test).is_none() {
            return FALSE;
        }
        registry.benchmarks.push(BenchmarkRecord {
            test_id,
            measure_type: read_string(measure_type),
            data: BenchmarkData::Numbers(read_key_numbers(&data)),
        });
        TRUE
    }

    unsafe fn test_log(
        &self,
        test_id: TestId,
        message: *const c_char,
        tags: *const c_char,
    ) -> Bool {
        if !self.enter("test_log") {
            return FALSE;
        }
        let mut registry = self.registry.lock();
        if registry.open(test_id.as_raw(), EntityKind::Test).is_none() {
            return FALSE;
        }
        registry.logs.push(LogRecord {
            test_id,
            message: read_string(message),
            tags: read_opt_string(tags),
        });
        TRUE
    }

    // --- span ---

    unsafe fn span_create(&self, parent_id: EntityId, options: SpanStartOptions) -> SpanResult {
        let operation_name = read_string(options.operation_name);
        let service = read_string(options.service_name);
        let resource = read_string(options.resource_name);
        let span_type = read_string(options.span_type);
        let string_tags = read_pairs(options.string_tags);
        let number_tags = if options.number_tags.is_null() {
            BTreeMap::new()
        } else {
            read_key_numbers(&*options.number_tags)
        };
        let created = self.create_entity(
            "span_create",
            EntityKind::Span,
            Parent::Any(parent_id.as_raw()),
            operation_name,
            read_time(options.start_time),
            |record| {
                for (key, value) in [
                    (tags::SERVICE, service),
                    (tags::RESOURCE, resource),
                    (tags::SPAN_TYPE, span_type),
                ] {
                    if !value.is_empty() {
                        record.set_string(key, value);
                    }
                }
                record.string_tags.extend(string_tags);
                record.number_tags.extend(number_tags);
            },
        );
        match created {
            Some(raw) => SpanResult {
                span_id: SpanId::from_raw(raw),
                valid: TRUE,
            },
            None => SpanResult::default(),
        }
    }

    unsafe fn span_set_string_tag(
        &self,
        span_id: SpanId,
        key: *const c_char,
        value: *const c_char,
    ) -> Bool {
        let (key, value) = (read_string(key), read_string(value));
        self.with_open(
            "span_set_string_tag",
            span_id.as_raw(),
            EntityKind::Span,
            |r| r.set_string(&key, value),
        )
    }

    unsafe fn span_set_number_tag(&self, span_id: SpanId, key: *const c_char, value: f64) -> Bool {
        let key = read_string(key);
        self.with_open(
            "span_set_number_tag",
            span_id.as_raw(),
            EntityKind::Span,
            |r| r.set_number(&key, value),
        )
    }

    unsafe fn span_set_error(
        &self,
        span_id: SpanId,
        error_type: *const c_char,
        error_message: *const c_char,
        error_stacktrace: *const c_char,
    ) -> Bool {
        let error = (
            read_string(error_type),
            read_string(error_message),
            read_string(error_stacktrace),
        );
        self.with_open(
            "span_set_error",
            span_id.as_raw(),
            EntityKind::Span,
            |r| set_error(r, error.0, error.1, error.2),
        )
    }

    unsafe fn span_close(&self, span_id: SpanId, end_time: *const UnixTime) -> Bool {
        let end = read_time(end_time);
        self.with_open("span_close", span_id.as_raw(), EntityKind::Span, |r| {
            r.finish(end)
        })
    }

    // --- debug span recorder ---

    fn debug_mock_tracer_reset(&self) -> Bool {
        if !self.enter("debug_mock_tracer_reset") {
            return FALSE;
        }
        self.registry.lock().reset_recorder();
        TRUE
    }

    fn debug_mock_tracer_get_finished_spans(&self) -> MockSpanArray {
        self.span_array("debug_mock_tracer_get_finished_spans", true)
    }

    fn debug_mock_tracer_get_open_spans(&self) -> MockSpanArray {
        self.span_array("debug_mock_tracer_get_open_spans", false)
    }

    unsafe fn debug_mock_tracer_free_mock_span_array(&self, array: MockSpanArray) {
        self.count_only("debug_mock_tracer_free_mock_span_array");
        self.track_free(array.data);
        for span in reclaim_records(array.data, array.len) {
            free_string(span.operation_name);
            free_key_values(span.string_tags);
            free_key_numbers(span.number_tags);
        }
    }
}
