//! Engine-side allocation of result arrays
//!
//! The in-memory engine hands out arrays the same way a native engine does:
//! leaked heap memory that only the matching free call may reclaim.

use std::collections::BTreeMap;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use topt_ffi::{KeyNumberArray, KeyNumberPair, KeyValueArray, KeyValuePair};

/// Leak `value` as a NUL-terminated string. Interior NULs are dropped.
pub(super) fn leak_string(value: &str) -> *const c_char {
    CString::new(value.replace('\0', ""))
        .unwrap_or_default()
        .into_raw()
}

/// Reclaim a string produced by [`leak_string`].
///
/// # Safety
///
/// `ptr` must be null or come from `leak_string` and not be freed yet.
pub(super) unsafe fn free_string(ptr: *const c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

/// Leak `records` as a (pointer, length) pair. Empty input yields null.
pub(super) fn leak_records<T>(records: Vec<T>) -> (*const T, usize) {
    if records.is_empty() {
        return (ptr::null(), 0);
    }
    let len = records.len();
    let data = Box::into_raw(records.into_boxed_slice()) as *const T;
    (data, len)
}

/// Reclaim records produced by [`leak_records`].
///
/// # Safety
///
/// `(data, len)` must be null or come from `leak_records` and not be freed yet.
pub(super) unsafe fn reclaim_records<T>(data: *const T, len: usize) -> Vec<T> {
    if data.is_null() {
        return Vec::new();
    }
    Box::from_raw(ptr::slice_from_raw_parts_mut(data as *mut T, len)).into_vec()
}

pub(super) fn leak_key_values(map: &BTreeMap<String, String>) -> KeyValueArray {
    let pairs: Vec<KeyValuePair> = map
        .iter()
        .map(|(k, v)| KeyValuePair {
            key: leak_string(k),
            value: leak_string(v),
        })
        .collect();
    let (data, len) = leak_records(pairs);
    KeyValueArray { data, len }
}

/// # Safety
///
/// `array` must come from [`leak_key_values`] and not be freed yet.
pub(super) unsafe fn free_key_values(array: KeyValueArray) {
    for pair in reclaim_records(array.data, array.len) {
        free_string(pair.key);
        free_string(pair.value);
    }
}

pub(super) fn leak_key_numbers(map: &BTreeMap<String, f64>) -> KeyNumberArray {
    let pairs: Vec<KeyNumberPair> = map
        .iter()
        .map(|(k, v)| KeyNumberPair {
            key: leak_string(k),
            value: *v,
        })
        .collect();
    let (data, len) = leak_records(pairs);
    KeyNumberArray { data, len }
}

/// # Safety
///
/// `array` must come from [`leak_key_numbers`] and not be freed yet.
pub(super) unsafe fn free_key_numbers(array: KeyNumberArray) {
    for pair in reclaim_records(array.data, array.len) {
        free_string(pair.key);
    }
}
