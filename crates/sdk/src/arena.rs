//! Per-entity allocation arena
//!
//! Every buffer built to describe outgoing data (strings, pair arrays,
//! coverage records, timestamps, line numbers) is moved into the arena of
//! the entity that issued the call, and a raw pointer into it is handed to
//! the engine. The engine may keep reading those pointers after the call
//! returns, so nothing is released until the entity is closed or dropped.
//!
//! Heap buffers never move when their owning `Box`/`CString` moves into the
//! arena's vector, so the returned pointers stay valid until `release`.
//!
//! Only `Send` values can be pinned through the public API, so an arena can
//! follow its entity to another thread:
//!
//! ```compile_fail
//! use std::rc::Rc;
//!
//! let mut arena = topt_sdk::Arena::new();
//! arena.pin(Rc::new(5));
//! ```

use std::any::Any;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use topt_ffi::{
    KeyNumberArray, KeyNumberPair, KeyValueArray, KeyValuePair, TestCoverage, TestCoverageFile,
};

use crate::error::{Error, Result};

/// Boundary records whose raw pointers only ever point into buffers pinned
/// in the same arena.
///
/// # Safety
///
/// Implementors must be plain `#[repr(C)]` data: no interior mutability, no
/// drop glue, and pointer fields that are never dereferenced on the Rust side
/// except through the arena's own contract.
pub(crate) unsafe trait WireRecord: 'static {}

unsafe impl WireRecord for KeyValuePair {}
unsafe impl WireRecord for KeyValueArray {}
unsafe impl WireRecord for KeyNumberPair {}
unsafe impl WireRecord for KeyNumberArray {}
unsafe impl WireRecord for TestCoverageFile {}
unsafe impl WireRecord for TestCoverage {}
unsafe impl<T: WireRecord> WireRecord for [T] {}

/// Owner of a pinned boundary record.
struct WireBox<T: ?Sized>(#[allow(dead_code)] Box<T>);

// SAFETY: a `WireRecord` holds plain data plus raw pointers into sibling
// buffers of the same arena. Those buffers move between threads together
// with the record, and nothing is reference counted or thread-bound.
unsafe impl<T: ?Sized + WireRecord> Send for WireBox<T> {}

/// Owned buffers pinned for the remaining lifetime of one entity.
#[derive(Default)]
pub struct Arena {
    buffers: Vec<Box<dyn Any + Send>>,
}

impl Arena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffers currently pinned.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// True when nothing is pinned.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Pin a single value and return a pointer to it.
    pub fn pin<T: Send + 'static>(&mut self, value: T) -> *const T {
        let boxed = Box::new(value);
        let ptr: *const T = &*boxed;
        self.buffers.push(boxed);
        ptr
    }

    /// Pin a sequence and return (pointer, length).
    ///
    /// An empty sequence is not pinned and yields a null pointer.
    pub fn pin_slice<T: Send + 'static>(&mut self, values: Vec<T>) -> (*const T, usize) {
        if values.is_empty() {
            return (ptr::null(), 0);
        }
        let boxed = values.into_boxed_slice();
        let len = boxed.len();
        let ptr = boxed.as_ptr();
        self.buffers.push(Box::new(boxed));
        (ptr, len)
    }

    /// Pin a boundary record that points into this arena.
    pub(crate) fn pin_record<T: WireRecord>(&mut self, value: T) -> *const T {
        let boxed = Box::new(value);
        let ptr: *const T = &*boxed;
        self.buffers.push(Box::new(WireBox(boxed)));
        ptr
    }

    /// Like [`Arena::pin_slice`], for boundary records.
    pub(crate) fn pin_records<T: WireRecord>(&mut self, values: Vec<T>) -> (*const T, usize) {
        if values.is_empty() {
            return (ptr::null(), 0);
        }
        let boxed = values.into_boxed_slice();
        let len = boxed.len();
        let ptr = boxed.as_ptr();
        self.buffers.push(Box::new(WireBox(boxed)));
        (ptr, len)
    }

    /// Encode `value` as a NUL-terminated string and pin it.
    ///
    /// Empty strings are forwarded as-is (a pointer to a lone NUL).
    pub fn pin_str(&mut self, field: &'static str, value: &str) -> Result<*const c_char> {
        let encoded = CString::new(value).map_err(|e| Error::interior_nul(field, e))?;
        let ptr = encoded.as_ptr();
        self.buffers.push(Box::new(encoded));
        Ok(ptr)
    }

    /// Like [`Arena::pin_str`], with `None` encoded as a null pointer.
    pub fn pin_opt_str(
        &mut self,
        field: &'static str,
        value: Option<&str>,
    ) -> Result<*const c_char> {
        match value {
            Some(v) => self.pin_str(field, v),
            None => Ok(ptr::null()),
        }
    }

    /// Encode string pairs as a `KeyValueArray` whose storage is pinned.
    pub fn pin_key_values<'a, I>(&mut self, field: &'static str, pairs: I) -> Result<KeyValueArray>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut encoded = Vec::new();
        for (key, value) in pairs {
            encoded.push(KeyValuePair {
                key: self.pin_str(field, key)?,
                value: self.pin_str(field, value)?,
            });
        }
        let (data, len) = self.pin_records(encoded);
        Ok(KeyValueArray { data, len })
    }

    /// Encode string-to-number pairs as a `KeyNumberArray` whose storage is pinned.
    pub fn pin_key_numbers<'a, I>(
        &mut self,
        field: &'static str,
        pairs: I,
    ) -> Result<KeyNumberArray>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut encoded = Vec::new();
        for (key, value) in pairs {
            encoded.push(KeyNumberPair {
                key: self.pin_str(field, key)?,
                value,
            });
        }
        let (data, len) = self.pin_records(encoded);
        Ok(KeyNumberArray { data, len })
    }

    /// Drop every pinned buffer. Calling it again is a no-op.
    pub fn release(&mut self) {
        self.buffers.clear();
        self.buffers.shrink_to_fit();
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena").field("pinned", &self.buffers.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::ffi::CStr;
    use topt_ffi::{RecordArray, UnixTime};

    #[test]
    fn test_pin_str_stays_valid_after_more_pins() {
        let mut arena = Arena::new();
        let first = arena.pin_str("key", "hello").unwrap();
        for i in 0..100 {
            arena.pin_str("key", &format!("filler-{i}")).unwrap();
        }
        let text = unsafe { CStr::from_ptr(first) };
        assert_eq!(text.to_str().unwrap(), "hello");
        assert_eq!(arena.len(), 101);
    }

    #[test]
    fn test_pin_empty_string_is_forwarded() {
        let mut arena = Arena::new();
        let ptr = arena.pin_str("value", "").unwrap();
        assert!(!ptr.is_null());
        assert_eq!(unsafe { CStr::from_ptr(ptr) }.to_bytes(), b"");
    }

    #[test]
    fn test_pin_opt_str_none_is_null() {
        let mut arena = Arena::new();
        assert!(arena.pin_opt_str("tags", None).unwrap().is_null());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_pin_str_rejects_interior_nul() {
        let mut arena = Arena::new();
        let err = arena.pin_str("message", "a\0b").unwrap_err();
        assert!(matches!(err, Error::InteriorNul { field: "message", position: 1 }));
    }

    #[test]
    fn test_pin_value_returns_stable_pointer() {
        let mut arena = Arena::new();
        let t = arena.pin(UnixTime { sec: 5, nsec: 6 });
        arena.pin(42i32);
        assert_eq!(unsafe { *t }, UnixTime { sec: 5, nsec: 6 });
    }

    #[test]
    fn test_empty_slice_is_null() {
        let mut arena = Arena::new();
        let (ptr, len) = arena.pin_slice::<u32>(Vec::new());
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn test_pin_key_values_preserves_order() {
        let mut arena = Arena::new();
        let array = arena
            .pin_key_values("tags", [("b", "2"), ("a", "1")])
            .unwrap();
        let pairs = unsafe { array.as_slice() };
        assert_eq!(pairs.len(), 2);
        assert_eq!(unsafe { CStr::from_ptr(pairs[0].key) }.to_str().unwrap(), "b");
        assert_eq!(unsafe { CStr::from_ptr(pairs[1].value) }.to_str().unwrap(), "1");
    }

    #[test]
    fn test_pinned_records_travel_with_the_arena() {
        fn assert_send<T: Send>(_: &T) {}

        let mut arena = Arena::new();
        let array = arena.pin_key_values("tags", [("k", "v")]).unwrap();
        let pinned = arena.pin_record(array);
        assert_send(&arena);

        let pairs = unsafe { (*pinned).as_slice() };
        assert_eq!(unsafe { CStr::from_ptr(pairs[0].key) }.to_str().unwrap(), "k");

        let pinned_count = std::thread::spawn(move || {
            let count = arena.len();
            arena.release();
            count
        });
        assert_eq!(pinned_count.join().unwrap(), 4);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut arena = Arena::new();
        arena.pin_str("key", "x").unwrap();
        arena.release();
        assert!(arena.is_empty());
        arena.release();
        assert!(arena.is_empty());
    }

    proptest! {
        #[test]
        fn prop_key_numbers_round_through_pinned_storage(
            entries in proptest::collection::vec(("[a-z]{0,12}", -1.0e9f64..1.0e9), 0..32)
        ) {
            let mut arena = Arena::new();
            let array = arena
                .pin_key_numbers("data", entries.iter().map(|(k, v)| (k.as_str(), *v)))
                .unwrap();
            prop_assert_eq!(array.len, entries.len());
            let pairs = unsafe { array.as_slice() };
            for (pair, (key, value)) in pairs.iter().zip(entries.iter()) {
                let decoded = unsafe { CStr::from_ptr(pair.key) }.to_str().unwrap();
                prop_assert_eq!(decoded, key.as_str());
                prop_assert_eq!(pair.value, *value);
            }
        }
    }
}
