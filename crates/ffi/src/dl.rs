//! Runtime loading of the engine shared library (no external crates).
//!
//! `DynLib` wraps `dlopen`/`dlsym` on Unix and `LoadLibraryA`/`GetProcAddress`
//! on Windows. The engine is loaded once per process and kept alive for as
//! long as any resolved symbol may be called.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::path::{Path, PathBuf};

/// Handle to a dynamically loaded shared library.
#[derive(Debug)]
pub struct DynLib {
    handle: *mut c_void,
    path: PathBuf,
}

// SAFETY: the handle is a process-global loader token. Resolving symbols is
// thread-safe on every supported loader; the engine itself documents which
// of its functions may be called concurrently.
unsafe impl Send for DynLib {}
unsafe impl Sync for DynLib {}

impl DynLib {
    /// Open a shared library by file path or bare library name.
    ///
    /// A bare name (no separator) is resolved through the platform's default
    /// search order.
    pub fn open(path: &Path) -> Result<Self, String> {
        let name = path_to_cstring(path)?;
        let handle = open_raw(&name)?;
        Ok(Self {
            handle,
            path: path.to_path_buf(),
        })
    }

    /// Path or name the library was opened with.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a symbol by name, returning a raw pointer.
    ///
    /// # Safety
    ///
    /// The caller must cast the returned pointer to the exact function
    /// signature the library exports before calling it.
    pub unsafe fn sym(&self, name: &CStr) -> Result<*mut c_void, String> {
        #[cfg(unix)]
        {
            // Clear any stale error so a null symbol can be told apart from a failure.
            dlerror();
            let ptr = dlsym(self.handle, name.as_ptr());
            let err = dlerror();
            if !err.is_null() {
                return Err(CStr::from_ptr(err).to_string_lossy().into_owned());
            }
            Ok(ptr)
        }

        #[cfg(windows)]
        {
            let ptr = GetProcAddress(self.handle, name.as_ptr());
            if ptr.is_null() {
                return Err(format!("GetProcAddress failed for {:?}", name));
            }
            Ok(ptr)
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = name;
            Err("dynamic library loading not supported on this platform".to_string())
        }
    }
}

impl Drop for DynLib {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }

        #[cfg(unix)]
        unsafe {
            dlclose(self.handle);
        }

        #[cfg(windows)]
        unsafe {
            FreeLibrary(self.handle);
        }
    }
}

fn path_to_cstring(path: &Path) -> Result<CString, String> {
    let text = path
        .to_str()
        .ok_or_else(|| format!("library path is not valid UTF-8: {}", path.display()))?;
    CString::new(text).map_err(|_| format!("library path contains a NUL byte: {}", text))
}

#[cfg(unix)]
fn open_raw(name: &CStr) -> Result<*mut c_void, String> {
    // SAFETY: name is a valid C string. RTLD_NOW resolves every symbol up
    // front so a broken engine fails here instead of on first call.
    let handle = unsafe { dlopen(name.as_ptr(), RTLD_NOW | RTLD_LOCAL) };
    if !handle.is_null() {
        return Ok(handle);
    }
    let err = unsafe { dlerror() };
    if err.is_null() {
        Err(format!("unknown dlopen error for {:?}", name))
    } else {
        Err(unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned())
    }
}

#[cfg(windows)]
fn open_raw(name: &CStr) -> Result<*mut c_void, String> {
    let handle = unsafe { LoadLibraryA(name.as_ptr()) };
    if handle.is_null() {
        return Err(format!("LoadLibraryA failed for {:?}", name));
    }
    Ok(handle)
}

#[cfg(not(any(unix, windows)))]
fn open_raw(_name: &CStr) -> Result<*mut c_void, String> {
    Err("dynamic library loading not supported on this platform".to_string())
}

// --- Unix (Linux + macOS) bindings ---

#[cfg(unix)]
const RTLD_NOW: i32 = 2;
#[cfg(unix)]
const RTLD_LOCAL: i32 = 0;

#[cfg(unix)]
extern "C" {
    fn dlopen(filename: *const c_char, flags: i32) -> *mut c_void;
    fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
    fn dlclose(handle: *mut c_void) -> i32;
    fn dlerror() -> *const c_char;
}

// --- Windows bindings ---

#[cfg(windows)]
extern "system" {
    fn LoadLibraryA(name: *const c_char) -> *mut c_void;
    fn GetProcAddress(module: *mut c_void, name: *const c_char) -> *mut c_void;
    fn FreeLibrary(module: *mut c_void) -> i32;
}
