//! Decoding engine-owned buffers into caller-owned values
//!
//! Arrays returned by the engine belong to the engine until they are passed
//! back to the matching free call. [`EngineArray`] takes that ownership for
//! the duration of a decode and frees the array exactly once when it goes
//! out of scope, including when the decode unwinds.

use std::collections::BTreeMap;
use std::ffi::CStr;
use std::os::raw::c_char;

use topt_ffi::{Engine, KeyNumberArray, KeyValueArray, RecordArray};

/// Function that hands an engine-owned array back to the engine.
pub(crate) type FreeFn<A> = fn(&dyn Engine, A);

/// Scoped ownership of one engine-allocated array.
pub(crate) struct EngineArray<'e, A: RecordArray> {
    engine: &'e dyn Engine,
    array: A,
    free: FreeFn<A>,
}

impl<'e, A: RecordArray> EngineArray<'e, A> {
    /// Take ownership of `array`.
    ///
    /// # Safety
    ///
    /// `array` must have been returned by `engine`, must not have been freed
    /// yet, and `free` must be the engine's matching free call. Nothing else
    /// may free it afterwards.
    pub(crate) unsafe fn new(engine: &'e dyn Engine, array: A, free: FreeFn<A>) -> Self {
        Self {
            engine,
            array,
            free,
        }
    }

    /// The records, valid until this guard drops. Null data reads as empty.
    pub(crate) fn records(&self) -> &[A::Record] {
        // SAFETY: guaranteed by the contract of `new`; the slice borrows self,
        // so it cannot outlive the free in `drop`.
        unsafe { self.array.as_slice() }
    }
}

impl<A: RecordArray> Drop for EngineArray<'_, A> {
    fn drop(&mut self) {
        (self.free)(self.engine, self.array);
    }
}

/// Copy a NUL-terminated string out of engine memory. Null reads as empty.
///
/// # Safety
///
/// `ptr` must be null or point to a valid NUL-terminated string.
pub(crate) unsafe fn read_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Like [`read_string`], with null mapped to `None`.
///
/// # Safety
///
/// Same as [`read_string`].
pub(crate) unsafe fn read_opt_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(read_string(ptr))
    }
}

/// Decode a string-pair array; later duplicates overwrite earlier ones.
///
/// # Safety
///
/// `array` must describe valid pairs of valid strings.
pub(crate) unsafe fn read_key_values(array: &KeyValueArray) -> BTreeMap<String, String> {
    array
        .as_slice()
        .iter()
        .map(|pair| (read_string(pair.key), read_string(pair.value)))
        .collect()
}

/// Decode a string-to-number array; later duplicates overwrite earlier ones.
///
/// # Safety
///
/// `array` must describe valid pairs with valid key strings.
pub(crate) unsafe fn read_key_numbers(array: &KeyNumberArray) -> BTreeMap<String, f64> {
    array
        .as_slice()
        .iter()
        .map(|pair| (read_string(pair.key), pair.value))
        .collect()
}
