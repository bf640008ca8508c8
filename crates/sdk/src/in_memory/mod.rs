//! Pure-Rust engine
//!
//! Implements the full engine boundary in process so the SDK can run (and
//! be tested) without the native library:
//! - handles come from a counter, and calls on unknown or closed handles are
//!   answered with `false` / an invalid result
//! - when initialized with the mock tracer, every session, module, suite,
//!   test and span is recorded and served through the debug span recorder
//!   calls; a reset forgets every recorded span and drops closed entities
//! - settings and catalogs are seeded by the caller and returned as
//!   engine-owned heap arrays that must come back through the free calls
//! - every boundary call is counted by name, and named calls can be forced
//!   to fail with [`InMemoryEngine::reject`]

mod engine;
mod owned;
mod registry;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use topt_ffi::EntityId;

use crate::catalog::{KnownTest, SkippableTest, TestManagementTest};
use crate::settings::{FlakyTestRetriesSettings, Settings};

pub use registry::{
    tags, BenchmarkData, BenchmarkRecord, CoverageRecord, EntityRecord, InitRecord, LogRecord,
};

use registry::Registry;

#[derive(Debug, Default)]
struct Seed {
    settings: Settings,
    flaky_test_retries: FlakyTestRetriesSettings,
    known_tests: Vec<KnownTest>,
    skippable_tests: Vec<SkippableTest>,
    test_management_tests: Vec<TestManagementTest>,
}

/// In-process engine with seeded catalogs and call accounting.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    registry: Mutex<Registry>,
    seed: RwLock<Seed>,
    calls: Mutex<HashMap<&'static str, usize>>,
    rejected: RwLock<HashSet<String>>,
    live_allocations: AtomicUsize,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // --- seeding ---

    pub fn set_settings(&self, settings: Settings) {
        self.seed.write().settings = settings;
    }

    pub fn set_flaky_test_retries_settings(&self, settings: FlakyTestRetriesSettings) {
        self.seed.write().flaky_test_retries = settings;
    }

    pub fn add_known_test(&self, test: KnownTest) {
        self.seed.write().known_tests.push(test);
    }

    pub fn add_skippable_test(&self, test: SkippableTest) {
        self.seed.write().skippable_tests.push(test);
    }

    pub fn add_test_management_test(&self, test: TestManagementTest) {
        self.seed.write().test_management_tests.push(test);
    }

    // --- failure injection ---

    /// Answer every later call named `operation` with `false` / invalid.
    ///
    /// Names are the wire function names without the `topt_` prefix, e.g.
    /// `"test_close"`. Free calls cannot be rejected.
    pub fn reject(&self, operation: &str) {
        self.rejected.write().insert(operation.to_string());
    }

    /// Undo [`InMemoryEngine::reject`].
    pub fn accept(&self, operation: &str) {
        self.rejected.write().remove(operation);
    }

    // --- inspection ---

    /// How many times the named boundary call was made.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    /// Total number of boundary calls made.
    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    /// Engine-owned arrays handed out and not yet freed.
    pub fn live_allocations(&self) -> usize {
        self.live_allocations.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.registry.lock().initialized
    }

    /// Options received by the last successful `initialize`.
    pub fn init_options(&self) -> Option<InitRecord> {
        self.registry.lock().init.clone()
    }

    /// Snapshot of one entity, open or closed.
    pub fn entity(&self, id: impl Into<EntityId>) -> Option<EntityRecord> {
        let raw = id.into().as_raw();
        self.registry.lock().entities.get(&raw).cloned()
    }

    /// Snapshots of every entity in creation order.
    pub fn entities(&self) -> Vec<EntityRecord> {
        self.registry.lock().entities.values().cloned().collect()
    }

    pub fn coverage_payloads(&self) -> Vec<CoverageRecord> {
        self.registry.lock().coverage.clone()
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.registry.lock().logs.clone()
    }

    pub fn benchmarks(&self) -> Vec<BenchmarkRecord> {
        self.registry.lock().benchmarks.clone()
    }

    // --- internals ---

    /// Count a call; false when the operation is being rejected.
    fn enter(&self, operation: &'static str) -> bool {
        *self.calls.lock().entry(operation).or_insert(0) += 1;
        !self.rejected.read().contains(operation)
    }

    fn count_only(&self, operation: &'static str) {
        *self.calls.lock().entry(operation).or_insert(0) += 1;
    }

    fn track_allocation<T>(&self, data: *const T) {
        if !data.is_null() {
            self.live_allocations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn track_free<T>(&self, data: *const T) {
        if !data.is_null() {
            self.live_allocations.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
