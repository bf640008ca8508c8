use topt_ffi::{as_bool, EntityId, ModuleId, SessionId};

use super::{pin_error, pin_now, EntityCore, Lifecycle, Span, SpanOptions, TestSuite};
use crate::arena::Arena;
use crate::error::{EntityKind, Error, Result};
use crate::runtime::Runtime;

/// A test module: one package or crate under test inside a session.
#[derive(Debug)]
pub struct TestModule {
    core: EntityCore,
    session_id: SessionId,
    module_id: ModuleId,
}

impl TestModule {
    pub(crate) fn create(
        runtime: &Runtime,
        session_id: SessionId,
        name: &str,
        framework_name: &str,
        framework_version: &str,
    ) -> Result<Self> {
        let engine = runtime.engine()?;
        let mut arena = Arena::new();
        let name = arena.pin_str("name", name)?;
        let framework_name = arena.pin_str("framework_name", framework_name)?;
        let framework_version = arena.pin_str("framework_version", framework_version)?;
        let start_time = pin_now(&mut arena);

        // SAFETY: all pointers point into `arena`, owned by the new module.
        let result = unsafe {
            engine.module_create(session_id, name, framework_name, framework_version, start_time)
        };
        if !as_bool(result.valid) {
            return Err(Error::CreationFailed {
                kind: EntityKind::Module,
            });
        }
        Ok(Self {
            core: EntityCore::open(runtime, EntityKind::Module, result.module_id, arena),
            session_id,
            module_id: result.module_id,
        })
    }

    /// Handle of the enclosing session.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Engine handle of this module.
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    /// Whether the module still accepts calls.
    pub fn state(&self) -> Lifecycle {
        self.core.state()
    }

    /// Set a string tag. `Ok(false)` is the engine's verbatim answer.
    pub fn set_string_tag(&mut self, key: &str, value: &str) -> Result<bool> {
        let id = self.module_id;
        self.core.call("set_string_tag", |engine, arena| {
            let key = arena.pin_str("key", key)?;
            let value = arena.pin_str("value", value)?;
            Ok(unsafe { engine.module_set_string_tag(id, key, value) })
        })
    }

    /// Set a numeric tag. `Ok(false)` is the engine's verbatim answer.
    pub fn set_number_tag(&mut self, key: &str, value: f64) -> Result<bool> {
        let id = self.module_id;
        self.core.call("set_number_tag", |engine, arena| {
            let key = arena.pin_str("key", key)?;
            Ok(unsafe { engine.module_set_number_tag(id, key, value) })
        })
    }

    /// Record an error against the module.
    pub fn set_error_info(
        &mut self,
        error_type: &str,
        message: &str,
        stacktrace: &str,
    ) -> Result<bool> {
        let id = self.module_id;
        self.core.call("set_error_info", |engine, arena| {
            let (error_type, message, stacktrace) =
                pin_error(arena, error_type, message, stacktrace)?;
            Ok(unsafe { engine.module_set_error(id, error_type, message, stacktrace) })
        })
    }

    /// Start a suite inside this module.
    pub fn create_test_suite(&self, name: &str) -> Result<TestSuite> {
        self.core.ensure_open("create_test_suite")?;
        TestSuite::create(self.core.runtime(), self.session_id, self.module_id, name)
    }

    /// Start a span parented on this module.
    pub fn create_span(&self, options: SpanOptions) -> Result<Span> {
        self.core.ensure_open("create_span")?;
        Span::create(self.core.runtime(), EntityId::from(self.module_id), options)
    }

    /// Close the module.
    ///
    /// On `Ok(false)` the engine kept the module open and the call may be
    /// retried. Closing twice is [`Error::Closed`](crate::Error::Closed).
    pub fn close(&mut self) -> Result<bool> {
        let id = self.module_id;
        self.core.close(|engine, arena| {
            let end_time = pin_now(arena);
            Ok(unsafe { engine.module_close(id, end_time) })
        })
    }
}

impl Drop for TestModule {
    fn drop(&mut self) {
        if self.core.is_open() {
            let outcome = self.close();
            self.core.report_forced_close(outcome);
        }
        self.core.release();
    }
}
