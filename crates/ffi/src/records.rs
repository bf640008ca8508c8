//! Fixed-layout records exchanged with the engine
//!
//! Every record is `#[repr(C)]` and flat. Variable-length data travels as a
//! (pointer, length) pair; optional data is a null pointer. The `unusedNN`
//! slots are reserved by the engine for forward compatibility and must be
//! sent as null.

use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use crate::types::{
    Bool, EntityId, ModuleId, SessionId, SpanId, SuiteId, TestId, TestStatusCode, UnixTime, FALSE,
};

// ---------------------------------------------------------------------------
// Creation results
// ---------------------------------------------------------------------------

/// Result of `topt_session_create`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionResult {
    /// Assigned handle; meaningless unless `valid`.
    pub session_id: SessionId,
    /// Whether the engine created the session.
    pub valid: Bool,
}

/// Result of `topt_module_create`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleResult {
    /// Assigned handle; meaningless unless `valid`.
    pub module_id: ModuleId,
    /// Whether the engine created the module.
    pub valid: Bool,
}

/// Result of `topt_suite_create`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SuiteResult {
    /// Assigned handle; meaningless unless `valid`.
    pub suite_id: SuiteId,
    /// Whether the engine created the suite.
    pub valid: Bool,
}

/// Result of `topt_test_create`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TestResult {
    /// Assigned handle; meaningless unless `valid`.
    pub test_id: TestId,
    /// Whether the engine created the test.
    pub valid: Bool,
}

/// Result of `topt_span_create`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SpanResult {
    /// Assigned handle; meaningless unless `valid`.
    pub span_id: SpanId,
    /// Whether the engine created the span.
    pub valid: Bool,
}

// ---------------------------------------------------------------------------
// Key/value collections
// ---------------------------------------------------------------------------

/// One string-to-string entry.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KeyValuePair {
    pub key: *const c_char,
    pub value: *const c_char,
}

/// Array of string-to-string entries.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KeyValueArray {
    pub data: *const KeyValuePair,
    pub len: usize,
}

impl KeyValueArray {
    /// An array with no entries and a null data pointer.
    pub const fn empty() -> Self {
        Self {
            data: ptr::null(),
            len: 0,
        }
    }
}

/// One string-to-number entry.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KeyNumberPair {
    pub key: *const c_char,
    pub value: f64,
}

/// Array of string-to-number entries.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KeyNumberArray {
    pub data: *const KeyNumberPair,
    pub len: usize,
}

impl KeyNumberArray {
    /// An array with no entries and a null data pointer.
    pub const fn empty() -> Self {
        Self {
            data: ptr::null(),
            len: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Argument of `topt_initialize`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    pub language: *const c_char,
    pub runtime_name: *const c_char,
    pub runtime_version: *const c_char,
    /// Null means "current directory".
    pub working_directory: *const c_char,
    pub environment_variables: *const KeyValueArray,
    pub global_tags: *const KeyValueArray,
    pub use_mock_tracer: Bool,
    pub unused01: *mut c_void,
    pub unused02: *mut c_void,
    pub unused03: *mut c_void,
    pub unused04: *mut c_void,
    pub unused05: *mut c_void,
}

/// Argument of `topt_test_close`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestCloseOptions {
    pub status: TestStatusCode,
    pub finish_time: *const UnixTime,
    /// Null when the test was not skipped or no reason was given.
    pub skip_reason: *const c_char,
    pub unused01: *mut c_void,
    pub unused02: *mut c_void,
    pub unused03: *mut c_void,
    pub unused04: *mut c_void,
    pub unused05: *mut c_void,
}

/// Argument of `topt_span_create`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SpanStartOptions {
    pub operation_name: *const c_char,
    pub service_name: *const c_char,
    pub resource_name: *const c_char,
    pub span_type: *const c_char,
    pub start_time: *const UnixTime,
    pub string_tags: *const KeyValueArray,
    pub number_tags: *const KeyNumberArray,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Early-flake-detection retry counts by test duration bucket.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsEarlyFlakeDetectionSlowRetries {
    pub ten_s: c_int,
    pub thirty_s: c_int,
    pub five_m: c_int,
    pub five_s: c_int,
}

/// Early-flake-detection settings.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsEarlyFlakeDetection {
    pub enabled: Bool,
    pub slow_test_retries: SettingsEarlyFlakeDetectionSlowRetries,
    pub faulty_session_threshold: c_int,
}

/// Test-management settings.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsTestManagement {
    pub enabled: Bool,
    pub attempt_to_fix_retries: c_int,
}

/// Result of `topt_get_settings`, returned by value.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SettingsResponse {
    pub code_coverage: Bool,
    pub early_flake_detection: SettingsEarlyFlakeDetection,
    pub flaky_test_retries_enabled: Bool,
    pub itr_enabled: Bool,
    pub require_git: Bool,
    pub tests_skipping: Bool,
    pub known_tests_enabled: Bool,
    pub test_management: SettingsTestManagement,
    pub unused01: *mut c_void,
    pub unused02: *mut c_void,
    pub unused03: *mut c_void,
    pub unused04: *mut c_void,
    pub unused05: *mut c_void,
}

impl Default for SettingsResponse {
    fn default() -> Self {
        Self {
            code_coverage: FALSE,
            early_flake_detection: SettingsEarlyFlakeDetection::default(),
            flaky_test_retries_enabled: FALSE,
            itr_enabled: FALSE,
            require_git: FALSE,
            tests_skipping: FALSE,
            known_tests_enabled: FALSE,
            test_management: SettingsTestManagement::default(),
            unused01: ptr::null_mut(),
            unused02: ptr::null_mut(),
            unused03: ptr::null_mut(),
            unused04: ptr::null_mut(),
            unused05: ptr::null_mut(),
        }
    }
}

/// Result of `topt_get_flaky_test_retries_settings`, returned by value.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlakyTestRetriesSettings {
    pub retry_count: c_int,
    pub total_retry_count: c_int,
}

// ---------------------------------------------------------------------------
// Catalogs (engine-allocated; free with the matching topt_free_* call)
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KnownTest {
    pub module_name: *const c_char,
    pub suite_name: *const c_char,
    pub test_name: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct KnownTestArray {
    pub data: *const KnownTest,
    pub len: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SkippableTest {
    pub suite_name: *const c_char,
    pub test_name: *const c_char,
    pub parameters: *const c_char,
    pub custom_configurations_json: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SkippableTestArray {
    pub data: *const SkippableTest,
    pub len: usize,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestManagementTestProperties {
    pub module_name: *const c_char,
    pub suite_name: *const c_char,
    pub test_name: *const c_char,
    pub quarantined: Bool,
    pub disabled: Bool,
    pub attempt_to_fix: Bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestManagementTestPropertiesArray {
    pub data: *const TestManagementTestProperties,
    pub len: usize,
}

// ---------------------------------------------------------------------------
// Code coverage
// ---------------------------------------------------------------------------

/// Coverage of one source file. `bitmap` is always null from this client.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestCoverageFile {
    pub filename: *const c_char,
    pub bitmap: *const c_void,
    pub bitmap_len: usize,
}

/// Coverage payload for one test.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestCoverage {
    pub session_id: SessionId,
    pub suite_id: SuiteId,
    pub test_id: TestId,
    pub files: *const TestCoverageFile,
    pub files_len: usize,
}

// ---------------------------------------------------------------------------
// Debug span recorder
// ---------------------------------------------------------------------------

/// A span as materialized by the engine's in-memory recorder.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MockSpan {
    pub span_id: EntityId,
    pub trace_id: u64,
    pub parent_span_id: u64,
    pub start_time: UnixTime,
    pub finish_time: UnixTime,
    pub operation_name: *const c_char,
    pub string_tags: KeyValueArray,
    pub number_tags: KeyNumberArray,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MockSpanArray {
    pub data: *const MockSpan,
    pub len: usize,
}

/// Engine-allocated array of flat records.
///
/// Implemented by every `*Array` record the engine hands out so decoders can
/// walk them uniformly.
pub trait RecordArray: Copy {
    /// Element type.
    type Record;

    /// Pointer to the first element (may be null).
    fn data(&self) -> *const Self::Record;

    /// Number of elements.
    fn len(&self) -> usize;

    /// True when the array carries no elements or a null pointer.
    fn is_empty(&self) -> bool {
        self.data().is_null() || self.len() == 0
    }

    /// View the elements as a slice.
    ///
    /// # Safety
    ///
    /// `data` must point to `len` initialized records that stay valid for the
    /// returned lifetime (i.e. until the array is freed).
    unsafe fn as_slice<'a>(&self) -> &'a [Self::Record] {
        if self.is_empty() {
            &[]
        } else {
            std::slice::from_raw_parts(self.data(), self.len())
        }
    }
}

macro_rules! record_array {
    ($array:ty, $record:ty) => {
        impl RecordArray for $array {
            type Record = $record;

            #[inline]
            fn data(&self) -> *const $record {
                self.data
            }

            #[inline]
            fn len(&self) -> usize {
                self.len
            }
        }
    };
}

record_array!(KeyValueArray, KeyValuePair);
record_array!(KeyNumberArray, KeyNumberPair);
record_array!(KnownTestArray, KnownTest);
record_array!(SkippableTestArray, SkippableTest);
record_array!(TestManagementTestPropertiesArray, TestManagementTestProperties);
record_array!(MockSpanArray, MockSpan);
