//! Runtime lifecycle
//!
//! A [`Runtime`] owns one engine and moves through
//! `Uninitialized -> Initialized -> ShutDown`. Entities, catalog queries and
//! the span recorder all go through [`Runtime::engine`], which refuses to
//! hand out the engine outside the `Initialized` state.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use topt_ffi as ffi;
use topt_ffi::{as_bool, from_bool, Engine};
use tracing::{debug, info};

use crate::arena::Arena;
use crate::catalog::{
    fetch_known_tests, fetch_skippable_tests, fetch_test_management_tests, KnownTests,
    SkippableTests, TestManagementTests,
};
use crate::entity::TestSession;
use crate::error::{Error, Result};
use crate::mock_tracer::MockTracer;
use crate::settings::{FlakyTestRetriesSettings, Settings};

/// Language reported to the engine.
pub const LANGUAGE: &str = "rust";
/// Runtime name reported to the engine.
pub const RUNTIME_NAME: &str = "rustc";
/// Version of the compiler that built this crate.
pub const RUNTIME_VERSION: &str = env!("TOPT_RUSTC_VERSION");

/// Options passed to the engine's `initialize`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitOptions {
    pub language: String,
    pub runtime_name: String,
    pub runtime_version: String,
    /// `None` lets the engine use the process working directory
    pub working_directory: Option<PathBuf>,
    /// Overrides for the environment the engine reads its configuration from
    pub environment_variables: BTreeMap<String, String>,
    /// Tags applied to every entity
    pub global_tags: BTreeMap<String, String>,
    /// Record spans in memory instead of sending them
    pub use_mock_tracer: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            language: LANGUAGE.to_string(),
            runtime_name: RUNTIME_NAME.to_string(),
            runtime_version: RUNTIME_VERSION.to_string(),
            working_directory: None,
            environment_variables: BTreeMap::new(),
            global_tags: BTreeMap::new(),
            use_mock_tracer: false,
        }
    }
}

impl InitOptions {
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_mock_tracer(mut self, enabled: bool) -> Self {
        self.use_mock_tracer = enabled;
        self
    }

    pub fn with_environment_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.environment_variables.insert(key.into(), value.into());
        self
    }

    pub fn with_global_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.global_tags.insert(key.into(), value.into());
        self
    }

    /// Encode into `arena`; every pointer in the result points into it.
    fn encode(&self, arena: &mut Arena) -> Result<ffi::InitOptions> {
        let working_directory = match &self.working_directory {
            Some(dir) => arena.pin_str("working_directory", &path_string(dir))?,
            None => std::ptr::null(),
        };
        let environment_variables =
            pin_optional_map(arena, "environment_variables", &self.environment_variables)?;
        let global_tags = pin_optional_map(arena, "global_tags", &self.global_tags)?;
        Ok(ffi::InitOptions {
            language: arena.pin_str("language", &self.language)?,
            runtime_name: arena.pin_str("runtime_name", &self.runtime_name)?,
            runtime_version: arena.pin_str("runtime_version", &self.runtime_version)?,
            working_directory,
            environment_variables,
            global_tags,
            use_mock_tracer: from_bool(self.use_mock_tracer),
            unused01: std::ptr::null_mut(),
            unused02: std::ptr::null_mut(),
            unused03: std::ptr::null_mut(),
            unused04: std::ptr::null_mut(),
            unused05: std::ptr::null_mut(),
        })
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Empty maps travel as null.
fn pin_optional_map(
    arena: &mut Arena,
    field: &'static str,
    map: &BTreeMap<String, String>,
) -> Result<*const ffi::KeyValueArray> {
    if map.is_empty() {
        return Ok(std::ptr::null());
    }
    let array = arena.pin_key_values(field, map.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
    Ok(arena.pin_record(array))
}

/// Lifecycle state of a [`Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Uninitialized,
    Initialized,
    ShutDown,
}

struct RuntimeInner {
    engine: Arc<dyn Engine>,
    state: RwLock<RuntimeState>,
    /// Buffers referenced by the last successful `initialize`
    init_buffers: Mutex<Arena>,
}

/// Shared handle to one engine and its lifecycle.
///
/// Cloning is cheap; every clone observes the same state.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

impl Runtime {
    /// Wrap an engine. The runtime starts out `Uninitialized`.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                engine,
                state: RwLock::new(RuntimeState::Uninitialized),
                init_buffers: Mutex::new(Arena::new()),
            }),
        }
    }

    /// Name of the underlying engine.
    pub fn engine_name(&self) -> &'static str {
        self.inner.engine.name()
    }

    pub fn state(&self) -> RuntimeState {
        *self.inner.state.read()
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == RuntimeState::Initialized
    }

    /// Initialize the engine.
    ///
    /// Returns `Ok(false)` and stays uninitialized when the engine declines.
    pub fn initialize(&self, options: &InitOptions) -> Result<bool> {
        let mut state = self.inner.state.write();
        match *state {
            RuntimeState::Initialized => return Err(Error::AlreadyInitialized),
            RuntimeState::ShutDown => return Err(Error::ShutDown),
            RuntimeState::Uninitialized => {}
        }

        let mut arena = Arena::new();
        let encoded = options.encode(&mut arena)?;
        // SAFETY: every pointer in `encoded` points into `arena`, which is
        // kept until shutdown on success.
        let accepted = as_bool(unsafe { self.inner.engine.initialize(encoded) });
        if !accepted {
            debug!(
                target: "topt::runtime",
                engine = self.engine_name(),
                "engine declined initialize"
            );
            return Ok(false);
        }

        *self.inner.init_buffers.lock() = arena;
        *state = RuntimeState::Initialized;
        info!(
            target: "topt::runtime",
            engine = self.engine_name(),
            language = %options.language,
            runtime_version = %options.runtime_version,
            mock_tracer = options.use_mock_tracer,
            "Test optimization runtime initialized"
        );
        Ok(true)
    }

    /// Shut the engine down. The runtime cannot be initialized again.
    ///
    /// Returns `Ok(false)` and stays initialized when the engine declines.
    pub fn shutdown(&self) -> Result<bool> {
        let mut state = self.inner.state.write();
        match *state {
            RuntimeState::Uninitialized => return Err(Error::NotInitialized),
            RuntimeState::ShutDown => return Err(Error::ShutDown),
            RuntimeState::Initialized => {}
        }

        if !as_bool(self.inner.engine.shutdown()) {
            debug!(
                target: "topt::runtime",
                engine = self.engine_name(),
                "engine declined shutdown"
            );
            return Ok(false);
        }

        *state = RuntimeState::ShutDown;
        self.inner.init_buffers.lock().release();
        info!(
            target: "topt::runtime",
            engine = self.engine_name(),
            "Test optimization runtime shut down"
        );
        Ok(true)
    }

    /// The engine, if the runtime is initialized.
    pub(crate) fn engine(&self) -> Result<&dyn Engine> {
        match *self.inner.state.read() {
            RuntimeState::Initialized => Ok(self.inner.engine.as_ref()),
            RuntimeState::Uninitialized => Err(Error::NotInitialized),
            RuntimeState::ShutDown => Err(Error::ShutDown),
        }
    }

    /// Fresh settings snapshot.
    pub fn settings(&self) -> Result<Settings> {
        let engine = self.engine()?;
        Ok(Settings::from_wire(&engine.get_settings()))
    }

    pub fn flaky_test_retries_settings(&self) -> Result<FlakyTestRetriesSettings> {
        let engine = self.engine()?;
        Ok(FlakyTestRetriesSettings::from_wire(
            &engine.get_flaky_test_retries_settings(),
        ))
    }

    pub fn known_tests(&self) -> Result<KnownTests> {
        Ok(fetch_known_tests(self.engine()?))
    }

    pub fn skippable_tests(&self) -> Result<SkippableTests> {
        Ok(fetch_skippable_tests(self.engine()?))
    }

    pub fn test_management_tests(&self) -> Result<TestManagementTests> {
        Ok(fetch_test_management_tests(self.engine()?))
    }

    /// Client for the engine's debug span recorder.
    pub fn mock_tracer(&self) -> MockTracer {
        MockTracer::new(self.clone())
    }

    /// Start a test session. Shorthand for [`TestSession::create`].
    pub fn create_session(
        &self,
        framework: Option<&str>,
        framework_version: Option<&str>,
    ) -> Result<TestSession> {
        TestSession::create(self, framework, framework_version)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("engine", &self.engine_name())
            .field("state", &self.state())
            .finish()
    }
}
