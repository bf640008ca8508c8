//! Wire contract for the test optimization engine
//!
//! This crate describes the foreign-call boundary and nothing else:
//! - Typed handles (`SessionId`, `ModuleId`, `SuiteId`, `TestId`, `SpanId`,
//!   and the type-erased `EntityId`) and the `UnixTime` timestamp record
//! - Fixed-layout `#[repr(C)]` records for options, results, catalogs,
//!   coverage payloads and recorded debug spans
//! - The [`Engine`] trait: one method per `topt_*` function
//! - [`EngineApi`]: the native engine loaded at runtime via [`DynLib`]
//!
//! Ownership rules live with the trait documentation in [`engine`].

#![warn(clippy::all)]

pub mod api;
pub mod dl;
pub mod engine;
pub mod records;
pub mod types;

pub use api::EngineApi;
pub use dl::DynLib;
pub use engine::Engine;
pub use records::*;
pub use types::{
    as_bool, from_bool, Bool, EntityId, ModuleId, SessionId, SpanId, SuiteId, TestId,
    TestStatusCode, UnixTime, FALSE, TEST_STATUS_FAIL, TEST_STATUS_PASS, TEST_STATUS_SKIP, TRUE,
};
