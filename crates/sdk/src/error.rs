//! Error types for the test optimization SDK
//!
//! Two tiers of failure exist and only one of them lives here:
//! - The engine saying "no" is a normal outcome, reported as `Ok(false)`
//!   from mutation calls. It never becomes an `Error`.
//! - Client-side contract violations (using a closed entity, double close,
//!   calling before `initialize`) are programming errors and surface as
//!   `Error`. They are never retried.

use std::ffi::NulError;
use std::fmt;
use thiserror::Error;

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of entity an operation was attempted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Test session (root)
    Session,
    /// Test module
    Module,
    /// Test suite
    Suite,
    /// Single test
    Test,
    /// Custom span
    Span,
}

impl EntityKind {
    /// Lowercase name used in log fields and messages
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Session => "session",
            EntityKind::Module => "module",
            EntityKind::Suite => "suite",
            EntityKind::Test => "test",
            EntityKind::Span => "span",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for the test optimization SDK
#[derive(Debug, Error)]
pub enum Error {
    /// The runtime has not been initialized yet
    #[error("test optimization runtime is not initialized")]
    NotInitialized,

    /// `initialize` was called on a runtime that is already initialized
    #[error("test optimization runtime is already initialized")]
    AlreadyInitialized,

    /// The runtime was shut down; it cannot be used or re-initialized
    #[error("test optimization runtime has been shut down")]
    ShutDown,

    /// A mutating operation reached an entity that is already closed
    #[error("cannot {operation} on closed {kind} {id}")]
    Closed {
        /// Entity kind
        kind: EntityKind,
        /// Raw engine handle
        id: u64,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// The engine reported that it did not create the entity
    #[error("engine failed to create {kind}")]
    CreationFailed {
        /// Entity kind
        kind: EntityKind,
    },

    /// A string argument contains an interior NUL byte and cannot cross the boundary
    #[error("{field} contains an interior NUL byte at position {position}")]
    InteriorNul {
        /// Argument name
        field: &'static str,
        /// Byte offset of the NUL
        position: usize,
    },

    /// The engine library could not be located or loaded
    #[error("failed to load engine library: {0}")]
    LibraryLoad(String),

    /// Configuration could not be read or parsed
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build an `InteriorNul` error for the named argument
    pub(crate) fn interior_nul(field: &'static str, err: NulError) -> Self {
        Error::InteriorNul {
            field,
            position: err.nul_position(),
        }
    }

    /// Whether this error is a lifecycle fault (closed entity or runtime state)
    pub fn is_lifecycle_fault(&self) -> bool {
        matches!(
            self,
            Error::Closed { .. }
                | Error::NotInitialized
                | Error::AlreadyInitialized
                | Error::ShutDown
        )
    }
}
