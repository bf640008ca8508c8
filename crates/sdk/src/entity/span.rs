use std::collections::BTreeMap;

use topt_ffi as ffi;
use topt_ffi::{as_bool, EntityId, SpanId};

use super::{pin_error, pin_now, EntityCore, Lifecycle};
use crate::arena::Arena;
use crate::error::{EntityKind, Error, Result};
use crate::runtime::Runtime;

/// How to start a custom span.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanOptions {
    pub operation_name: String,
    pub service_name: String,
    pub resource_name: String,
    pub span_type: String,
    /// Tags set when the span starts
    pub string_tags: BTreeMap<String, String>,
    pub number_tags: BTreeMap<String, f64>,
}

impl SpanOptions {
    /// Options for a span named `operation_name`, everything else empty.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Self::default()
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_resource_name(mut self, resource_name: impl Into<String>) -> Self {
        self.resource_name = resource_name.into();
        self
    }

    pub fn with_span_type(mut self, span_type: impl Into<String>) -> Self {
        self.span_type = span_type.into();
        self
    }

    /// Tag sent with the span at creation.
    pub fn with_string_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.string_tags.insert(key.into(), value.into());
        self
    }

    pub fn with_number_tag(mut self, key: impl Into<String>, value: f64) -> Self {
        self.number_tags.insert(key.into(), value);
        self
    }

    /// Encode into `arena`. Empty tag maps travel as null.
    fn encode(&self, arena: &mut Arena) -> Result<ffi::SpanStartOptions> {
        let string_tags = if self.string_tags.is_empty() {
            std::ptr::null()
        } else {
            let array = arena.pin_key_values(
                "string_tags",
                self.string_tags.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            )?;
            arena.pin_record(array)
        };
        let number_tags = if self.number_tags.is_empty() {
            std::ptr::null()
        } else {
            let array = arena.pin_key_numbers(
                "number_tags",
                self.number_tags.iter().map(|(k, v)| (k.as_str(), *v)),
            )?;
            arena.pin_record(array)
        };
        Ok(ffi::SpanStartOptions {
            operation_name: arena.pin_str("operation_name", &self.operation_name)?,
            service_name: arena.pin_str("service_name", &self.service_name)?,
            resource_name: arena.pin_str("resource_name", &self.resource_name)?,
            span_type: arena.pin_str("span_type", &self.span_type)?,
            start_time: pin_now(arena),
            string_tags,
            number_tags,
        })
    }
}

/// A custom span, parented on any entity (including another span).
#[derive(Debug)]
pub struct Span {
    core: EntityCore,
    parent_id: EntityId,
    span_id: SpanId,
}

impl Span {
    /// Start a span under `parent`. A raw parent of 0 starts a root span.
    pub fn create(
        runtime: &Runtime,
        parent: impl Into<EntityId>,
        options: SpanOptions,
    ) -> Result<Self> {
        let parent_id = parent.into();
        let engine = runtime.engine()?;
        let mut arena = Arena::new();
        let encoded = options.encode(&mut arena)?;

        // SAFETY: all pointers in `encoded` point into `arena`, owned by the new span.
        let result = unsafe { engine.span_create(parent_id, encoded) };
        if !as_bool(result.valid) {
            return Err(Error::CreationFailed {
                kind: EntityKind::Span,
            });
        }
        Ok(Self {
            core: EntityCore::open(runtime, EntityKind::Span, result.span_id, arena),
            parent_id,
            span_id: result.span_id,
        })
    }

    /// Engine handle of this span.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// The entity this span was started under; raw 0 for a root span.
    pub fn parent_id(&self) -> EntityId {
        self.parent_id
    }

    /// Whether the span still accepts calls.
    pub fn state(&self) -> Lifecycle {
        self.core.state()
    }

    /// Set a string tag. `Ok(false)` is the engine's verbatim answer.
    pub fn set_string_tag(&mut self, key: &str, value: &str) -> Result<bool> {
        let id = self.span_id;
        self.core.call("set_string_tag", |engine, arena| {
            let key = arena.pin_str("key", key)?;
            let value = arena.pin_str("value", value)?;
            Ok(unsafe { engine.span_set_string_tag(id, key, value) })
        })
    }

    /// Set a numeric tag. `Ok(false)` is the engine's verbatim answer.
    pub fn set_number_tag(&mut self, key: &str, value: f64) -> Result<bool> {
        let id = self.span_id;
        self.core.call("set_number_tag", |engine, arena| {
            let key = arena.pin_str("key", key)?;
            Ok(unsafe { engine.span_set_number_tag(id, key, value) })
        })
    }

    /// Mark the span as errored.
    pub fn set_error_info(
        &mut self,
        error_type: &str,
        message: &str,
        stacktrace: &str,
    ) -> Result<bool> {
        let id = self.span_id;
        self.core.call("set_error_info", |engine, arena| {
            let (error_type, message, stacktrace) =
                pin_error(arena, error_type, message, stacktrace)?;
            Ok(unsafe { engine.span_set_error(id, error_type, message, stacktrace) })
        })
    }

    /// Start a span parented on this one.
    pub fn create_child(&self, options: SpanOptions) -> Result<Span> {
        self.core.ensure_open("create_child")?;
        Span::create(self.core.runtime(), self.span_id, options)
    }

    /// Finish the span now. On `Ok(false)` it stays open.
    pub fn close(&mut self) -> Result<bool> {
        let id = self.span_id;
        self.core.close(|engine, arena| {
            let end_time = pin_now(arena);
            Ok(unsafe { engine.span_close(id, end_time) })
        })
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if self.core.is_open() {
            let outcome = self.close();
            self.core.report_forced_close(outcome);
        }
        self.core.release();
    }
}
