//! Entity bookkeeping for the in-memory engine

use std::collections::BTreeMap;

use topt_ffi::{EntityId, TestId, UnixTime};

use crate::error::EntityKind;

/// Tag keys the in-memory engine writes on its own.
pub mod tags {
    pub const FRAMEWORK: &str = "test.framework";
    pub const FRAMEWORK_VERSION: &str = "test.framework_version";
    pub const MODULE: &str = "test.module";
    pub const SUITE: &str = "test.suite";
    pub const NAME: &str = "test.name";
    pub const STATUS: &str = "test.status";
    pub const SKIP_REASON: &str = "test.skip_reason";
    pub const EXIT_CODE: &str = "test.exit_code";
    pub const SOURCE_FILE: &str = "test.source.file";
    pub const SOURCE_START: &str = "test.source.start";
    pub const SOURCE_END: &str = "test.source.end";
    pub const ERROR_TYPE: &str = "error.type";
    pub const ERROR_MESSAGE: &str = "error.message";
    pub const ERROR_STACK: &str = "error.stack";
    pub const SERVICE: &str = "service.name";
    pub const RESOURCE: &str = "resource.name";
    pub const SPAN_TYPE: &str = "span.type";
}

/// Everything the engine knows about one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub id: EntityId,
    pub parent: Option<EntityId>,
    pub trace_id: u64,
    pub operation_name: String,
    pub start_time: UnixTime,
    pub finish_time: Option<UnixTime>,
    pub string_tags: BTreeMap<String, String>,
    pub number_tags: BTreeMap<String, f64>,
    /// Visible to the debug span recorder
    pub(super) recorded: bool,
}

impl EntityRecord {
    pub fn is_open(&self) -> bool {
        self.finish_time.is_none()
    }

    pub fn string_tag(&self, key: &str) -> Option<&str> {
        self.string_tags.get(key).map(String::as_str)
    }

    pub fn number_tag(&self, key: &str) -> Option<f64> {
        self.number_tags.get(key).copied()
    }

    pub(super) fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.string_tags.insert(key.to_string(), value.into());
    }

    pub(super) fn set_number(&mut self, key: &str, value: f64) {
        self.number_tags.insert(key.to_string(), value);
    }

    pub(super) fn finish(&mut self, at: UnixTime) {
        self.finish_time = Some(at);
    }
}

/// Options passed to `initialize`, as the engine decoded them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitRecord {
    pub language: String,
    pub runtime_name: String,
    pub runtime_version: String,
    pub working_directory: Option<String>,
    pub environment_variables: BTreeMap<String, String>,
    pub global_tags: BTreeMap<String, String>,
    pub use_mock_tracer: bool,
}

/// One coverage payload received for a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRecord {
    pub session_id: u64,
    pub suite_id: u64,
    pub test_id: u64,
    pub files: Vec<String>,
}

/// One log line attached to a test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub test_id: TestId,
    pub message: String,
    pub tags: Option<String>,
}

/// Benchmark measurements attached to a test.
#[derive(Debug, Clone, PartialEq)]
pub enum BenchmarkData {
    Strings(BTreeMap<String, String>),
    Numbers(BTreeMap<String, f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub test_id: TestId,
    pub measure_type: String,
    pub data: BenchmarkData,
}

/// Where a new entity hangs in the hierarchy.
pub(super) enum Parent {
    /// No parent (raw handle 0)
    Root,
    /// Must be an open entity of the given kind
    Typed(u64, EntityKind),
    /// Any open entity
    Any(u64),
}

/// Entity records plus the payload logs kept for inspection.
///
/// `coverage`, `logs` and `benchmarks` accumulate for the lifetime of the
/// engine. Closed entities are kept until the recorder is reset.
#[derive(Debug, Default)]
pub(super) struct Registry {
    pub(super) initialized: bool,
    /// Set from `use_mock_tracer` at initialization
    pub(super) recording: bool,
    pub(super) init: Option<InitRecord>,
    next_id: u64,
    pub(super) entities: BTreeMap<u64, EntityRecord>,
    pub(super) coverage: Vec<CoverageRecord>,
    pub(super) logs: Vec<LogRecord>,
    pub(super) benchmarks: Vec<BenchmarkRecord>,
}

impl Registry {
    /// Register a new entity under `parent`. `None` when the parent is not
    /// an open entity of the expected kind.
    pub(super) fn create(
        &mut self,
        kind: EntityKind,
        parent: Parent,
        operation_name: String,
        start_time: UnixTime,
    ) -> Option<&mut EntityRecord> {
        let (parent, trace_id) = match parent {
            Parent::Root => (None, None),
            Parent::Typed(raw, expected) => {
                let record = self.open(raw, expected)?;
                (Some(record.id), Some(record.trace_id))
            }
            Parent::Any(0) => (None, None),
            Parent::Any(raw) => {
                let record = self.entities.get(&raw).filter(|r| r.is_open())?;
                (Some(record.id), Some(record.trace_id))
            }
        };

        self.next_id += 1;
        let raw = self.next_id;
        let record = EntityRecord {
            kind,
            id: EntityId::from_raw(raw),
            parent,
            trace_id: trace_id.unwrap_or(raw),
            operation_name,
            start_time,
            finish_time: None,
            string_tags: BTreeMap::new(),
            number_tags: BTreeMap::new(),
            recorded: self.recording,
        };
        Some(self.entities.entry(raw).or_insert(record))
    }

    /// An open entity of the given kind.
    pub(super) fn open(&self, raw: u64, kind: EntityKind) -> Option<&EntityRecord> {
        self.entities
            .get(&raw)
            .filter(|r| r.kind == kind && r.is_open())
    }

    pub(super) fn open_mut(&mut self, raw: u64, kind: EntityKind) -> Option<&mut EntityRecord> {
        self.entities
            .get_mut(&raw)
            .filter(|r| r.kind == kind && r.is_open())
    }

    /// Drop closed entities and hide open ones from the recorder. Open
    /// entities stay usable as parents and targets.
    pub(super) fn reset_recorder(&mut self) {
        self.entities.retain(|_, record| record.is_open());
        for record in self.entities.values_mut() {
            record.recorded = false;
        }
    }

    pub(super) fn recorded(&self, finished: bool) -> impl Iterator<Item = &EntityRecord> {
        self.entities
            .values()
            .filter(move |r| r.recorded && r.is_open() != finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> UnixTime {
        UnixTime { sec: 10, nsec: 0 }
    }

    #[test]
    fn test_children_inherit_trace_id() {
        let mut registry = Registry::default();
        let session = registry
            .create(EntityKind::Session, Parent::Root, "test_session".into(), start())
            .unwrap()
            .id
            .as_raw();
        let module = registry
            .create(
                EntityKind::Module,
                Parent::Typed(session, EntityKind::Session),
                "test_module".into(),
                start(),
            )
            .unwrap();
        assert_eq!(module.trace_id, session);
        assert_eq!(module.parent, Some(EntityId::from_raw(session)));
    }

    #[test]
    fn test_wrong_parent_kind_is_rejected() {
        let mut registry = Registry::default();
        let session = registry
            .create(EntityKind::Session, Parent::Root, "test_session".into(), start())
            .unwrap()
            .id
            .as_raw();
        assert!(registry
            .create(
                EntityKind::Test,
                Parent::Typed(session, EntityKind::Suite),
                "test".into(),
                start(),
            )
            .is_none());
    }

    #[test]
    fn test_closed_parent_is_rejected() {
        let mut registry = Registry::default();
        let span = registry
            .create(EntityKind::Span, Parent::Root, "op".into(), start())
            .unwrap();
        span.finish(start());
        let raw = span.id.as_raw();
        assert!(registry
            .create(EntityKind::Span, Parent::Any(raw), "child".into(), start())
            .is_none());
        assert!(registry.open(raw, EntityKind::Span).is_none());
    }

    #[test]
    fn test_reset_forgets_open_and_finished_records() {
        let mut registry = Registry {
            recording: true,
            ..Registry::default()
        };
        let done = registry
            .create(EntityKind::Span, Parent::Root, "done".into(), start())
            .unwrap();
        done.finish(start());
        let done = done.id.as_raw();
        let running = registry
            .create(EntityKind::Span, Parent::Root, "running".into(), start())
            .unwrap()
            .id
            .as_raw();
        assert_eq!(registry.recorded(true).count(), 1);
        assert_eq!(registry.recorded(false).count(), 1);

        registry.reset_recorder();
        assert_eq!(registry.recorded(true).count(), 0);
        assert_eq!(registry.recorded(false).count(), 0);
        assert!(!registry.entities.contains_key(&done));

        // Still a usable parent, and its children are recorded.
        let child = registry
            .create(EntityKind::Span, Parent::Any(running), "child".into(), start())
            .unwrap();
        assert_eq!(child.parent, Some(EntityId::from_raw(running)));
        let open: Vec<_> = registry.recorded(false).map(|r| r.operation_name.as_str()).collect();
        assert_eq!(open, vec!["child"]);
    }

    #[test]
    fn test_nothing_is_recorded_without_the_mock_tracer() {
        let mut registry = Registry::default();
        registry
            .create(EntityKind::Span, Parent::Root, "op".into(), start())
            .unwrap()
            .finish(start());
        registry
            .create(EntityKind::Span, Parent::Root, "open".into(), start())
            .unwrap();
        assert_eq!(registry.recorded(true).count(), 0);
        assert_eq!(registry.recorded(false).count(), 0);
        assert_eq!(registry.entities.len(), 2);
    }
}
