use topt_ffi::{as_bool, EntityId, ModuleId, SessionId, SuiteId};

use super::{pin_error, pin_now, pin_source, EntityCore, Lifecycle, Span, SpanOptions, Test};
use crate::arena::Arena;
use crate::error::{EntityKind, Error, Result};
use crate::runtime::Runtime;

/// A test suite: a group of tests, typically one source file or type.
#[derive(Debug)]
pub struct TestSuite {
    core: EntityCore,
    session_id: SessionId,
    module_id: ModuleId,
    suite_id: SuiteId,
}

impl TestSuite {
    pub(crate) fn create(
        runtime: &Runtime,
        session_id: SessionId,
        module_id: ModuleId,
        name: &str,
    ) -> Result<Self> {
        let engine = runtime.engine()?;
        let mut arena = Arena::new();
        let name = arena.pin_str("name", name)?;
        let start_time = pin_now(&mut arena);

        // SAFETY: all pointers point into `arena`, owned by the new suite.
        let result = unsafe { engine.suite_create(module_id, name, start_time) };
        if !as_bool(result.valid) {
            return Err(Error::CreationFailed {
                kind: EntityKind::Suite,
            });
        }
        Ok(Self {
            core: EntityCore::open(runtime, EntityKind::Suite, result.suite_id, arena),
            session_id,
            module_id,
            suite_id: result.suite_id,
        })
    }

    /// Handle of the enclosing session.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Handle of the enclosing module.
    pub fn module_id(&self) -> ModuleId {
        self.module_id
    }

    /// Engine handle of this suite.
    pub fn suite_id(&self) -> SuiteId {
        self.suite_id
    }

    /// Whether the suite still accepts calls.
    pub fn state(&self) -> Lifecycle {
        self.core.state()
    }

    /// Set a string tag. `Ok(false)` is the engine's verbatim answer.
    pub fn set_string_tag(&mut self, key: &str, value: &str) -> Result<bool> {
        let id = self.suite_id;
        self.core.call("set_string_tag", |engine, arena| {
            let key = arena.pin_str("key", key)?;
            let value = arena.pin_str("value", value)?;
            Ok(unsafe { engine.suite_set_string_tag(id, key, value) })
        })
    }

    /// Set a numeric tag. `Ok(false)` is the engine's verbatim answer.
    pub fn set_number_tag(&mut self, key: &str, value: f64) -> Result<bool> {
        let id = self.suite_id;
        self.core.call("set_number_tag", |engine, arena| {
            let key = arena.pin_str("key", key)?;
            Ok(unsafe { engine.suite_set_number_tag(id, key, value) })
        })
    }

    /// Record an error against the suite.
    pub fn set_error_info(
        &mut self,
        error_type: &str,
        message: &str,
        stacktrace: &str,
    ) -> Result<bool> {
        let id = self.suite_id;
        self.core.call("set_error_info", |engine, arena| {
            let (error_type, message, stacktrace) =
                pin_error(arena, error_type, message, stacktrace)?;
            Ok(unsafe { engine.suite_set_error(id, error_type, message, stacktrace) })
        })
    }

    /// Attach the source location of the suite. Either line may be omitted.
    pub fn set_test_source(
        &mut self,
        file: &str,
        start_line: Option<i32>,
        end_line: Option<i32>,
    ) -> Result<bool> {
        let id = self.suite_id;
        self.core.call("set_test_source", |engine, arena| {
            let (file, start, end) = pin_source(arena, file, start_line, end_line)?;
            Ok(unsafe { engine.suite_set_source(id, file, start, end) })
        })
    }

    /// Start a test inside this suite.
    pub fn create_test(&self, name: &str) -> Result<Test> {
        self.core.ensure_open("create_test")?;
        Test::create(
            self.core.runtime(),
            self.session_id,
            self.module_id,
            self.suite_id,
            name,
        )
    }

    /// Start a span parented on this suite.
    pub fn create_span(&self, options: SpanOptions) -> Result<Span> {
        self.core.ensure_open("create_span")?;
        Span::create(self.core.runtime(), EntityId::from(self.suite_id), options)
    }

    /// Close the suite. On `Ok(false)` it stays open and may be closed again.
    pub fn close(&mut self) -> Result<bool> {
        let id = self.suite_id;
        self.core.close(|engine, arena| {
            let end_time = pin_now(arena);
            Ok(unsafe { engine.suite_close(id, end_time) })
        })
    }
}

impl Drop for TestSuite {
    fn drop(&mut self) {
        if self.core.is_open() {
            let outcome = self.close();
            self.core.report_forced_close(outcome);
        }
        self.core.release();
    }
}
