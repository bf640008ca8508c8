//! Process-wide runtime
//!
//! Most test harnesses want exactly one engine per process. [`TestOptimization`]
//! keeps that runtime in a global slot guarded by a mutex:
//!
//! ```text
//! Empty --init--> Active --shutdown--> Finished
//! ```
//!
//! A declined `init` leaves the slot `Empty`. Once `Finished`, the slot never
//! accepts another runtime.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use topt_ffi::Engine;
use tracing::debug;

use crate::catalog::{KnownTests, SkippableTests, TestManagementTests};
use crate::config::RuntimeConfig;
use crate::entity::TestSession;
use crate::error::{Error, Result};
use crate::mock_tracer::MockTracer;
use crate::native::load_engine;
use crate::runtime::{InitOptions, Runtime};
use crate::settings::{FlakyTestRetriesSettings, Settings};

enum GlobalState {
    Empty,
    Active(Runtime),
    Finished,
}

static GLOBAL: Lazy<Mutex<GlobalState>> = Lazy::new(|| Mutex::new(GlobalState::Empty));

/// Entry point to the process-wide runtime.
pub struct TestOptimization;

impl TestOptimization {
    /// Load the native engine (configured from the environment) and
    /// initialize it with default options.
    pub fn init() -> Result<bool> {
        Self::init_with_values(InitOptions::default())
    }

    /// Like [`init`](Self::init), recording spans in memory.
    pub fn init_mock() -> Result<bool> {
        Self::init_with_values(InitOptions::default().with_mock_tracer(true))
    }

    pub fn init_with_working_dir(working_dir: impl AsRef<Path>) -> Result<bool> {
        Self::init_with_values(
            InitOptions::default().with_working_directory(working_dir.as_ref()),
        )
    }

    pub fn init_mock_with_working_dir(working_dir: impl AsRef<Path>) -> Result<bool> {
        Self::init_with_values(
            InitOptions::default()
                .with_working_directory(working_dir.as_ref())
                .with_mock_tracer(true),
        )
    }

    /// Load the native engine and initialize it with `options`.
    pub fn init_with_values(options: InitOptions) -> Result<bool> {
        let config = RuntimeConfig::default().with_env_overrides();
        Self::init_with_config(&config, options)
    }

    /// Load the native engine located through `config` and initialize it.
    pub fn init_with_config(config: &RuntimeConfig, options: InitOptions) -> Result<bool> {
        Self::install(|| Ok(Runtime::new(load_engine(config)?)), &options)
    }

    /// Initialize the global runtime over an engine supplied by the caller.
    pub fn init_with_engine(engine: Arc<dyn Engine>, options: &InitOptions) -> Result<bool> {
        Self::install(|| Ok(Runtime::new(engine)), options)
    }

    fn install(make: impl FnOnce() -> Result<Runtime>, options: &InitOptions) -> Result<bool> {
        let mut global = GLOBAL.lock();
        match &*global {
            GlobalState::Active(_) => return Err(Error::AlreadyInitialized),
            GlobalState::Finished => return Err(Error::ShutDown),
            GlobalState::Empty => {}
        }
        let runtime = make()?;
        if !runtime.initialize(options)? {
            debug!(target: "topt::runtime", "global runtime left uninitialized");
            return Ok(false);
        }
        *global = GlobalState::Active(runtime);
        Ok(true)
    }

    /// Shut the global runtime down. It cannot be initialized again.
    pub fn shutdown() -> Result<bool> {
        let mut global = GLOBAL.lock();
        let runtime = match &*global {
            GlobalState::Active(runtime) => runtime.clone(),
            GlobalState::Empty => return Err(Error::NotInitialized),
            GlobalState::Finished => return Err(Error::ShutDown),
        };
        let accepted = runtime.shutdown()?;
        if accepted {
            *global = GlobalState::Finished;
        }
        Ok(accepted)
    }

    pub fn is_initialized() -> bool {
        matches!(&*GLOBAL.lock(), GlobalState::Active(_))
    }

    /// Handle to the global runtime.
    pub fn runtime() -> Result<Runtime> {
        match &*GLOBAL.lock() {
            GlobalState::Active(runtime) => Ok(runtime.clone()),
            GlobalState::Empty => Err(Error::NotInitialized),
            GlobalState::Finished => Err(Error::ShutDown),
        }
    }

    pub fn settings() -> Result<Settings> {
        Self::runtime()?.settings()
    }

    pub fn flaky_test_retries_settings() -> Result<FlakyTestRetriesSettings> {
        Self::runtime()?.flaky_test_retries_settings()
    }

    pub fn known_tests() -> Result<KnownTests> {
        Self::runtime()?.known_tests()
    }

    pub fn skippable_tests() -> Result<SkippableTests> {
        Self::runtime()?.skippable_tests()
    }

    pub fn test_management_tests() -> Result<TestManagementTests> {
        Self::runtime()?.test_management_tests()
    }

    pub fn mock_tracer() -> Result<MockTracer> {
        Ok(Self::runtime()?.mock_tracer())
    }

    /// Start a session on the global runtime.
    pub fn create_session(
        framework: Option<&str>,
        framework_version: Option<&str>,
    ) -> Result<TestSession> {
        Self::runtime()?.create_session(framework, framework_version)
    }
}
