//! Client for the engine's debug span recorder
//!
//! Only meaningful when the runtime was initialized with the mock tracer
//! enabled. Spans are copied out of the engine's array and the array is
//! handed back immediately.

use std::collections::BTreeMap;
use std::time::SystemTime;

use topt_ffi as ffi;
use topt_ffi::{as_bool, EntityId, Engine};

use crate::decode::{read_key_numbers, read_key_values, read_string, EngineArray};
use crate::error::Result;
use crate::runtime::Runtime;

/// A span captured by the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct MockSpan {
    pub span_id: EntityId,
    pub trace_id: u64,
    /// Zero for root spans
    pub parent_span_id: u64,
    pub start_time: SystemTime,
    /// Equals `start_time` for spans that are still open
    pub finish_time: SystemTime,
    pub operation_name: String,
    pub string_tags: BTreeMap<String, String>,
    pub number_tags: BTreeMap<String, f64>,
}

impl MockSpan {
    pub fn string_tag(&self, key: &str) -> Option<&str> {
        self.string_tags.get(key).map(String::as_str)
    }

    pub fn number_tag(&self, key: &str) -> Option<f64> {
        self.number_tags.get(key).copied()
    }

    /// SAFETY: `raw` must come from a live engine span array.
    unsafe fn from_wire(raw: &ffi::MockSpan) -> Self {
        MockSpan {
            span_id: raw.span_id,
            trace_id: raw.trace_id,
            parent_span_id: raw.parent_span_id,
            start_time: raw.start_time.to_system_time(),
            finish_time: raw.finish_time.to_system_time(),
            operation_name: read_string(raw.operation_name),
            string_tags: read_key_values(&raw.string_tags),
            number_tags: read_key_numbers(&raw.number_tags),
        }
    }
}

/// Handle to the recorder of one runtime.
#[derive(Clone)]
pub struct MockTracer {
    runtime: Runtime,
}

fn free_span_array(engine: &dyn Engine, array: ffi::MockSpanArray) {
    // SAFETY: only reached from EngineArray::drop, once per array.
    unsafe { engine.debug_mock_tracer_free_mock_span_array(array) }
}

fn decode_spans(engine: &dyn Engine, array: ffi::MockSpanArray) -> Vec<MockSpan> {
    // SAFETY: fresh array from this engine, freed only by the guard.
    let array = unsafe { EngineArray::new(engine, array, free_span_array) };
    array
        .records()
        .iter()
        .map(|raw| unsafe { MockSpan::from_wire(raw) })
        .collect()
}

impl MockTracer {
    pub(crate) fn new(runtime: Runtime) -> Self {
        Self { runtime }
    }

    /// Discard everything recorded so far.
    pub fn reset(&self) -> Result<bool> {
        let engine = self.runtime.engine()?;
        Ok(as_bool(engine.debug_mock_tracer_reset()))
    }

    /// Spans that have been closed since the last reset.
    pub fn finished_spans(&self) -> Result<Vec<MockSpan>> {
        let engine = self.runtime.engine()?;
        Ok(decode_spans(
            engine,
            engine.debug_mock_tracer_get_finished_spans(),
        ))
    }

    /// Spans created since the last reset that are still open.
    pub fn open_spans(&self) -> Result<Vec<MockSpan>> {
        let engine = self.runtime.engine()?;
        Ok(decode_spans(engine, engine.debug_mock_tracer_get_open_spans()))
    }
}

impl std::fmt::Debug for MockTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTracer")
            .field("engine", &self.runtime.engine_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::SpanOptions;
    use crate::error::Error;
    use crate::in_memory::InMemoryEngine;
    use crate::runtime::InitOptions;
    use crate::Span;
    use std::sync::Arc;

    fn mock_runtime() -> (Arc<InMemoryEngine>, Runtime) {
        let engine = Arc::new(InMemoryEngine::new());
        let runtime = Runtime::new(engine.clone());
        assert!(runtime
            .initialize(&InitOptions::default().with_mock_tracer(true))
            .unwrap());
        (engine, runtime)
    }

    #[test]
    fn test_reset_then_one_finished_span() {
        let (engine, runtime) = mock_runtime();
        let tracer = runtime.mock_tracer();
        assert!(tracer.reset().unwrap());

        let mut span = Span::create(
            &runtime,
            EntityId::from_raw(0),
            SpanOptions::new("op").with_string_tag("k", "v"),
        )
        .unwrap();
        assert!(span.close().unwrap());

        let finished = tracer.finished_spans().unwrap();
        assert_eq!(finished.len(), 1);
        let recorded = &finished[0];
        assert_eq!(recorded.operation_name, "op");
        assert!(recorded.start_time <= recorded.finish_time);
        assert_eq!(recorded.string_tag("k"), Some("v"));
        assert_eq!(recorded.span_id, EntityId::from(span.span_id()));
        assert!(tracer.open_spans().unwrap().is_empty());
        assert_eq!(engine.live_allocations(), 0);
        assert_eq!(engine.call_count("debug_mock_tracer_free_mock_span_array"), 2);
    }

    #[test]
    fn test_open_spans_lists_unclosed_entities() {
        let (_engine, runtime) = mock_runtime();
        let tracer = runtime.mock_tracer();
        let mut span = Span::create(&runtime, EntityId::from_raw(0), SpanOptions::new("pending"))
            .unwrap();

        let open = tracer.open_spans().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].operation_name, "pending");
        assert!(tracer.finished_spans().unwrap().is_empty());

        span.close().unwrap();
        assert!(tracer.open_spans().unwrap().is_empty());
    }

    #[test]
    fn test_reset_clears_recorded_spans() {
        let (_engine, runtime) = mock_runtime();
        let tracer = runtime.mock_tracer();
        let mut span =
            Span::create(&runtime, EntityId::from_raw(0), SpanOptions::new("old")).unwrap();
        span.close().unwrap();
        assert_eq!(tracer.finished_spans().unwrap().len(), 1);

        tracer.reset().unwrap();
        assert!(tracer.finished_spans().unwrap().is_empty());
    }

    #[test]
    fn test_tracer_requires_initialized_runtime() {
        let runtime = Runtime::new(Arc::new(InMemoryEngine::new()));
        let err = runtime.mock_tracer().finished_spans().unwrap_err();
        assert!(matches!(err, Error::NotInitialized));
    }
}
