//! Client runtime for the test optimization engine
//!
//! This crate drives the engine through the boundary described in `topt-ffi`:
//! - [`Runtime`]: one engine and its `Uninitialized -> Initialized -> ShutDown`
//!   lifecycle, and [`TestOptimization`], the process-wide slot holding one
//! - Entities: [`TestSession`] -> [`TestModule`] -> [`TestSuite`] -> [`Test`],
//!   plus custom [`Span`]s parented on any of them
//! - Catalogs and settings: [`Settings`], [`KnownTests`], [`SkippableTests`],
//!   [`TestManagementTests`]
//! - [`MockTracer`]: the engine's debug span recorder
//! - [`InMemoryEngine`]: a pure-Rust engine for tests and dry runs
//! - [`RuntimeConfig`]: `test-optimization.toml` and native library lookup

#![warn(clippy::all)]

pub mod arena;
pub mod catalog;
pub mod config;
mod decode;
pub mod entity;
pub mod error;
pub mod global;
pub mod in_memory;
pub mod mock_tracer;
pub mod native;
pub mod runtime;
pub mod settings;

pub use topt_ffi as ffi;
pub use topt_ffi::{Engine, EntityId, ModuleId, SessionId, SpanId, SuiteId, TestId, UnixTime};

pub use arena::Arena;
pub use catalog::{
    KnownTest, KnownTests, SkippableTest, SkippableTests, SuiteManagement, TestManagementTest,
    TestManagementTests,
};
pub use config::{LibraryConfig, RuntimeConfig};
pub use entity::{
    Lifecycle, Span, SpanOptions, Test, TestModule, TestSession, TestStatus, TestSuite,
    DROPPED_SKIP_REASON,
};
pub use error::{EntityKind, Error, Result};
pub use global::TestOptimization;
pub use in_memory::InMemoryEngine;
pub use mock_tracer::{MockSpan, MockTracer};
pub use runtime::{InitOptions, Runtime, RuntimeState};
pub use settings::{
    EfdSettings, EfdSlowTestRetriesSettings, FlakyTestRetriesSettings, Settings,
    TestManagementSettings,
};
