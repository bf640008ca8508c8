//! Shared helpers for the integration suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::{Arc, Once};

pub use test_optimization::in_memory::tags;
pub use test_optimization::{
    Error, InMemoryEngine, InitOptions, Lifecycle, Runtime, RuntimeState, SpanOptions, TestStatus,
};

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A runtime over a fresh in-memory engine, not yet initialized.
pub fn runtime() -> (Arc<InMemoryEngine>, Runtime) {
    init_tracing();
    let engine = Arc::new(InMemoryEngine::new());
    let runtime = Runtime::new(engine.clone());
    (engine, runtime)
}

/// A runtime over a fresh in-memory engine, initialized with the mock tracer.
pub fn mock_runtime() -> (Arc<InMemoryEngine>, Runtime) {
    let (engine, runtime) = runtime();
    assert!(runtime
        .initialize(&InitOptions::default().with_mock_tracer(true))
        .unwrap());
    (engine, runtime)
}
