use std::os::raw::c_int;

use topt_ffi::{as_bool, EntityId, SessionId, TRUE};

use super::{pin_error, pin_now, EntityCore, Lifecycle, Span, SpanOptions, TestModule};
use crate::arena::Arena;
use crate::error::{EntityKind, Error, Result};
use crate::runtime::Runtime;

/// Root of the hierarchy: one run of a test framework.
#[derive(Debug)]
pub struct TestSession {
    core: EntityCore,
    session_id: SessionId,
}

impl TestSession {
    /// Start a session. Either framework argument may be omitted.
    pub fn create(
        runtime: &Runtime,
        framework: Option<&str>,
        framework_version: Option<&str>,
    ) -> Result<Self> {
        let engine = runtime.engine()?;
        let mut arena = Arena::new();
        let framework = arena.pin_opt_str("framework", framework)?;
        let framework_version = arena.pin_opt_str("framework_version", framework_version)?;
        let start_time = pin_now(&mut arena);

        // SAFETY: all pointers point into `arena`, owned by the new session.
        let result = unsafe { engine.session_create(framework, framework_version, start_time) };
        if !as_bool(result.valid) {
            return Err(Error::CreationFailed {
                kind: EntityKind::Session,
            });
        }
        Ok(Self {
            core: EntityCore::open(runtime, EntityKind::Session, result.session_id, arena),
            session_id: result.session_id,
        })
    }

    /// Engine handle of this session.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Whether the session still accepts calls.
    pub fn state(&self) -> Lifecycle {
        self.core.state()
    }

    /// Set a string tag on the session.
    ///
    /// `Ok(false)` is the engine declining the tag, reported as-is.
    pub fn set_string_tag(&mut self, key: &str, value: &str) -> Result<bool> {
        let id = self.session_id;
        self.core.call("set_string_tag", |engine, arena| {
            let key = arena.pin_str("key", key)?;
            let value = arena.pin_str("value", value)?;
            Ok(unsafe { engine.session_set_string_tag(id, key, value) })
        })
    }

    /// Set a numeric tag on the session. `Ok(false)` is the engine's answer.
    pub fn set_number_tag(&mut self, key: &str, value: f64) -> Result<bool> {
        let id = self.session_id;
        self.core.call("set_number_tag", |engine, arena| {
            let key = arena.pin_str("key", key)?;
            Ok(unsafe { engine.session_set_number_tag(id, key, value) })
        })
    }

    /// Record an error against the whole session.
    pub fn set_error_info(
        &mut self,
        error_type: &str,
        message: &str,
        stacktrace: &str,
    ) -> Result<bool> {
        let id = self.session_id;
        self.core.call("set_error_info", |engine, arena| {
            let (error_type, message, stacktrace) =
                pin_error(arena, error_type, message, stacktrace)?;
            Ok(unsafe { engine.session_set_error(id, error_type, message, stacktrace) })
        })
    }

    /// Start a module inside this session.
    pub fn create_module(
        &self,
        name: &str,
        framework_name: &str,
        framework_version: &str,
    ) -> Result<TestModule> {
        self.core.ensure_open("create_module")?;
        TestModule::create(
            self.core.runtime(),
            self.session_id,
            name,
            framework_name,
            framework_version,
        )
    }

    /// Start a span parented on this session.
    pub fn create_span(&self, options: SpanOptions) -> Result<Span> {
        self.core.ensure_open("create_span")?;
        Span::create(self.core.runtime(), EntityId::from(self.session_id), options)
    }

    /// Close the session with the process exit code.
    ///
    /// The engine does not report an outcome for this call, so an accepted
    /// close always yields `Ok(true)`.
    pub fn close(&mut self, exit_code: i32) -> Result<bool> {
        let id = self.session_id;
        self.core.close(|engine, arena| {
            let end_time = pin_now(arena);
            unsafe { engine.session_close(id, exit_code as c_int, end_time) };
            Ok(TRUE)
        })
    }
}

impl Drop for TestSession {
    fn drop(&mut self) {
        if self.core.is_open() {
            let exit_code = if std::thread::panicking() { 1 } else { 0 };
            let outcome = self.close(exit_code);
            self.core.report_forced_close(outcome);
        }
        self.core.release();
    }
}
