//! Entity hierarchy: session -> module -> suite -> test, plus spans
//!
//! Every entity is a handle issued by the engine plus an [`Arena`] pinning
//! the buffers its calls handed across the boundary. Entities move through
//! `Open -> Closed` exactly once:
//! - mutators on a closed entity fail with [`Error::Closed`] before any
//!   boundary call is made
//! - the engine's answer to a mutator is returned verbatim as `Ok(bool)`
//! - a close the engine accepts releases the arena; a close it declines
//!   leaves the entity open so the caller may retry
//! - dropping an open entity closes it with a fallback status and logs a
//!   warning

mod module;
mod session;
mod span;
mod suite;

pub use module::TestModule;
pub use session::TestSession;
pub use span::{Span, SpanOptions};
pub use suite::TestSuite;
pub use test::{Test, TestStatus, DROPPED_SKIP_REASON};

use std::os::raw::{c_char, c_int};

use topt_ffi::{as_bool, Bool, Engine, EntityId, UnixTime};
use tracing::{debug, warn};

use crate::arena::Arena;
use crate::error::{EntityKind, Error, Result};
use crate::runtime::Runtime;

/// Lifecycle state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    Closed,
}

/// State shared by every entity kind.
pub(crate) struct EntityCore {
    runtime: Runtime,
    kind: EntityKind,
    id: EntityId,
    state: Lifecycle,
    arena: Arena,
}

impl EntityCore {
    /// Wrap a handle the engine just issued. `arena` holds the creation buffers.
    pub(crate) fn open(
        runtime: &Runtime,
        kind: EntityKind,
        id: impl Into<EntityId>,
        arena: Arena,
    ) -> Self {
        let id = id.into();
        debug!(target: "topt::entity", kind = kind.as_str(), id = id.as_raw(), "created");
        Self {
            runtime: runtime.clone(),
            kind,
            id,
            state: Lifecycle::Open,
            arena,
        }
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub(crate) fn state(&self) -> Lifecycle {
        self.state
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == Lifecycle::Open
    }

    pub(crate) fn pinned(&self) -> usize {
        self.arena.len()
    }

    fn closed_error(&self, operation: &'static str) -> Error {
        Error::Closed {
            kind: self.kind,
            id: self.id.as_raw(),
            operation,
        }
    }

    /// Fail with `Closed` unless the entity is open.
    pub(crate) fn ensure_open(&self, operation: &'static str) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(self.closed_error(operation))
        }
    }

    /// Run one boundary call on an open entity.
    ///
    /// `call` gets the engine and this entity's arena; anything it pins
    /// stays alive until the entity is closed.
    pub(crate) fn call<F>(&mut self, operation: &'static str, call: F) -> Result<bool>
    where
        F: FnOnce(&dyn Engine, &mut Arena) -> Result<Bool>,
    {
        if self.state == Lifecycle::Closed {
            return Err(self.closed_error(operation));
        }
        let engine = self.runtime.engine()?;
        let accepted = as_bool(call(engine, &mut self.arena)?);
        if !accepted {
            debug!(
                target: "topt::entity",
                kind = self.kind.as_str(),
                id = self.id.as_raw(),
                operation,
                "engine rejected call"
            );
        }
        Ok(accepted)
    }

    /// Like [`EntityCore::call`]; an accepted call closes the entity and
    /// releases its arena.
    pub(crate) fn close<F>(&mut self, call: F) -> Result<bool>
    where
        F: FnOnce(&dyn Engine, &mut Arena) -> Result<Bool>,
    {
        let accepted = self.call("close", call)?;
        if accepted {
            self.state = Lifecycle::Closed;
            self.arena.release();
            debug!(
                target: "topt::entity",
                kind = self.kind.as_str(),
                id = self.id.as_raw(),
                "closed"
            );
        }
        Ok(accepted)
    }

    /// Log the outcome of a close forced by `Drop`.
    pub(crate) fn report_forced_close(&self, outcome: Result<bool>) {
        match outcome {
            Ok(true) => warn!(
                target: "topt::entity",
                kind = self.kind.as_str(),
                id = self.id.as_raw(),
                "entity dropped while open; closed implicitly"
            ),
            Ok(false) => warn!(
                target: "topt::entity",
                kind = self.kind.as_str(),
                id = self.id.as_raw(),
                "entity dropped while open; engine rejected the implicit close"
            ),
            Err(e) => warn!(
                target: "topt::entity",
                kind = self.kind.as_str(),
                id = self.id.as_raw(),
                error = %e,
                "entity dropped while open; implicit close failed"
            ),
        }
    }

    /// Release pinned buffers regardless of state. Used by `Drop`.
    pub(crate) fn release(&mut self) {
        self.arena.release();
    }
}

impl std::fmt::Debug for EntityCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityCore")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("state", &self.state)
            .field("pinned", &self.arena.len())
            .finish()
    }
}

/// Pin the current instant and return a pointer to it.
pub(crate) fn pin_now(arena: &mut Arena) -> *const UnixTime {
    arena.pin(UnixTime::now())
}

/// Pin the three strings of an error report.
pub(crate) fn pin_error(
    arena: &mut Arena,
    error_type: &str,
    message: &str,
    stacktrace: &str,
) -> Result<(*const c_char, *const c_char, *const c_char)> {
    Ok((
        arena.pin_str("error_type", error_type)?,
        arena.pin_str("error_message", message)?,
        arena.pin_str("error_stacktrace", stacktrace)?,
    ))
}

/// Pin a source location. Missing lines travel as null.
pub(crate) fn pin_source(
    arena: &mut Arena,
    file: &str,
    start_line: Option<i32>,
    end_line: Option<i32>,
) -> Result<(*const c_char, *const c_int, *const c_int)> {
    let file = arena.pin_str("file", file)?;
    let start = match start_line {
        Some(line) => arena.pin(line),
        None => std::ptr::null(),
    };
    let end = match end_line {
        Some(line) => arena.pin(line),
        None => std::ptr::null(),
    };
    Ok((file, start, end))
}
