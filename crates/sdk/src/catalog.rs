//! Test catalogs fetched from the engine
//!
//! Each catalog arrives as an engine-allocated array of flat records and is
//! regrouped into nested ordered maps while an [`EngineArray`] guard holds
//! the array. The guard frees it exactly once, whether decoding finishes or
//! unwinds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use topt_ffi as ffi;
use topt_ffi::{as_bool, Engine};
use tracing::debug;

use crate::decode::{read_string, EngineArray};

// ---------------------------------------------------------------------------
// Known tests
// ---------------------------------------------------------------------------

/// One known test, identified by module, suite and test name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownTest {
    pub module_name: String,
    pub suite_name: String,
    pub test_name: String,
}

impl KnownTest {
    pub fn new(
        module_name: impl Into<String>,
        suite_name: impl Into<String>,
        test_name: impl Into<String>,
    ) -> Self {
        Self {
            module_name: module_name.into(),
            suite_name: suite_name.into(),
            test_name: test_name.into(),
        }
    }
}

/// Tests the backend has already seen: module -> suite -> test names.
///
/// Test names keep the order the engine reported them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownTests(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl KnownTests {
    /// Module -> suite -> test names.
    pub fn as_map(&self) -> &BTreeMap<String, BTreeMap<String, Vec<String>>> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, BTreeMap<String, Vec<String>>> {
        self.0
    }

    /// Test names of one suite, if the suite is known.
    pub fn tests(&self, module: &str, suite: &str) -> Option<&[String]> {
        self.0
            .get(module)
            .and_then(|suites| suites.get(suite))
            .map(Vec::as_slice)
    }

    /// Whether the named test is known.
    pub fn contains(&self, module: &str, suite: &str, test: &str) -> bool {
        self.tests(module, suite)
            .map_or(false, |tests| tests.iter().any(|t| t == test))
    }

    /// Number of test entries across all modules and suites.
    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, test: KnownTest) {
        self.0
            .entry(test.module_name)
            .or_default()
            .entry(test.suite_name)
            .or_default()
            .push(test.test_name);
    }
}

impl FromIterator<KnownTest> for KnownTests {
    fn from_iter<I: IntoIterator<Item = KnownTest>>(iter: I) -> Self {
        let mut known = KnownTests::default();
        for test in iter {
            known.push(test);
        }
        known
    }
}

// ---------------------------------------------------------------------------
// Skippable tests
// ---------------------------------------------------------------------------

/// A test the intelligent test runner allows to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippableTest {
    pub suite_name: String,
    pub test_name: String,
    /// Serialized test parameters, empty when the test takes none
    pub parameters: String,
    /// Custom configuration payload as raw JSON, possibly empty
    pub custom_configurations_json: String,
}

impl SkippableTest {
    pub fn new(suite_name: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            test_name: test_name.into(),
            ..Self::default()
        }
    }

    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }

    pub fn with_custom_configurations_json(mut self, json: impl Into<String>) -> Self {
        self.custom_configurations_json = json.into();
        self
    }

    /// Parse the custom configuration payload. An empty payload is `Null`.
    pub fn custom_configurations(&self) -> serde_json::Result<serde_json::Value> {
        if self.custom_configurations_json.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&self.custom_configurations_json)
    }
}

/// Skippable tests: suite -> test -> entries (one per parameter set).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkippableTests(BTreeMap<String, BTreeMap<String, Vec<SkippableTest>>>);

impl SkippableTests {
    pub fn as_map(&self) -> &BTreeMap<String, BTreeMap<String, Vec<SkippableTest>>> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, BTreeMap<String, Vec<SkippableTest>>> {
        self.0
    }

    /// Entries for one test, if any.
    pub fn get(&self, suite: &str, test: &str) -> Option<&[SkippableTest]> {
        self.0
            .get(suite)
            .and_then(|tests| tests.get(test))
            .map(Vec::as_slice)
    }

    /// Whether any parameter set of the test may be skipped.
    pub fn is_skippable(&self, suite: &str, test: &str) -> bool {
        self.get(suite, test).map_or(false, |entries| !entries.is_empty())
    }

    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, test: SkippableTest) {
        self.0
            .entry(test.suite_name.clone())
            .or_default()
            .entry(test.test_name.clone())
            .or_default()
            .push(test);
    }
}

impl FromIterator<SkippableTest> for SkippableTests {
    fn from_iter<I: IntoIterator<Item = SkippableTest>>(iter: I) -> Self {
        let mut skippable = SkippableTests::default();
        for test in iter {
            skippable.push(test);
        }
        skippable
    }
}

// ---------------------------------------------------------------------------
// Test management
// ---------------------------------------------------------------------------

/// Test-management flags of one test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestManagementTest {
    pub module_name: String,
    pub suite_name: String,
    pub test_name: String,
    pub quarantined: bool,
    pub disabled: bool,
    pub attempt_to_fix: bool,
}

impl TestManagementTest {
    pub fn new(
        module_name: impl Into<String>,
        suite_name: impl Into<String>,
        test_name: impl Into<String>,
    ) -> Self {
        Self {
            module_name: module_name.into(),
            suite_name: suite_name.into(),
            test_name: test_name.into(),
            ..Self::default()
        }
    }

    pub fn quarantined(mut self) -> Self {
        self.quarantined = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn attempt_to_fix(mut self) -> Self {
        self.attempt_to_fix = true;
        self
    }
}

/// Suite -> test -> flags, for one module.
pub type SuiteManagement = BTreeMap<String, BTreeMap<String, TestManagementTest>>;

/// Managed tests: module -> suite -> test -> flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestManagementTests(BTreeMap<String, SuiteManagement>);

impl TestManagementTests {
    pub fn as_map(&self) -> &BTreeMap<String, SuiteManagement> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, SuiteManagement> {
        self.0
    }

    pub fn get(&self, module: &str, suite: &str, test: &str) -> Option<&TestManagementTest> {
        self.0
            .get(module)
            .and_then(|suites| suites.get(suite))
            .and_then(|tests| tests.get(test))
    }

    pub fn len(&self) -> usize {
        self.0
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert unless the test is already present; the first record wins.
    fn insert_first(&mut self, test: TestManagementTest) {
        self.0
            .entry(test.module_name.clone())
            .or_default()
            .entry(test.suite_name.clone())
            .or_default()
            .entry(test.test_name.clone())
            .or_insert(test);
    }
}

impl FromIterator<TestManagementTest> for TestManagementTests {
    fn from_iter<I: IntoIterator<Item = TestManagementTest>>(iter: I) -> Self {
        let mut managed = TestManagementTests::default();
        for test in iter {
            managed.insert_first(test);
        }
        managed
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn free_known_tests(engine: &dyn Engine, array: ffi::KnownTestArray) {
    // SAFETY: only reached from EngineArray::drop, once per array.
    unsafe { engine.free_known_tests(array) }
}

fn free_skippable_tests(engine: &dyn Engine, array: ffi::SkippableTestArray) {
    // SAFETY: only reached from EngineArray::drop, once per array.
    unsafe { engine.free_skippable_tests(array) }
}

fn free_test_management_tests(engine: &dyn Engine, array: ffi::TestManagementTestPropertiesArray) {
    // SAFETY: only reached from EngineArray::drop, once per array.
    unsafe { engine.free_test_management_tests(array) }
}

/// Fetch and decode the known-tests catalog.
pub(crate) fn fetch_known_tests(engine: &dyn Engine) -> KnownTests {
    // SAFETY: fresh array from this engine, freed only by the guard.
    let array = unsafe { EngineArray::new(engine, engine.get_known_tests(), free_known_tests) };
    let known: KnownTests = array
        .records()
        .iter()
        .map(|record| unsafe {
            KnownTest {
                module_name: read_string(record.module_name),
                suite_name: read_string(record.suite_name),
                test_name: read_string(record.test_name),
            }
        })
        .collect();
    debug!(target: "topt::catalog", count = known.len(), "decoded known tests");
    known
}

/// Fetch and decode the skippable-tests catalog.
pub(crate) fn fetch_skippable_tests(engine: &dyn Engine) -> SkippableTests {
    // SAFETY: fresh array from this engine, freed only by the guard.
    let array =
        unsafe { EngineArray::new(engine, engine.get_skippable_tests(), free_skippable_tests) };
    let skippable: SkippableTests = array
        .records()
        .iter()
        .map(|record| unsafe {
            SkippableTest {
                suite_name: read_string(record.suite_name),
                test_name: read_string(record.test_name),
                parameters: read_string(record.parameters),
                custom_configurations_json: read_string(record.custom_configurations_json),
            }
        })
        .collect();
    debug!(target: "topt::catalog", count = skippable.len(), "decoded skippable tests");
    skippable
}

/// Fetch and decode the test-management catalog.
pub(crate) fn fetch_test_management_tests(engine: &dyn Engine) -> TestManagementTests {
    // SAFETY: fresh array from this engine, freed only by the guard.
    let array = unsafe {
        EngineArray::new(
            engine,
            engine.get_test_management_tests(),
            free_test_management_tests,
        )
    };
    let managed: TestManagementTests = array
        .records()
        .iter()
        .map(|record| unsafe {
            TestManagementTest {
                module_name: read_string(record.module_name),
                suite_name: read_string(record.suite_name),
                test_name: read_string(record.test_name),
                quarantined: as_bool(record.quarantined),
                disabled: as_bool(record.disabled),
                attempt_to_fix: as_bool(record.attempt_to_fix),
            }
        })
        .collect();
    debug!(target: "topt::catalog", count = managed.len(), "decoded test management tests");
    managed
}
