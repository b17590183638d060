//! Loading the applet image and resolving its dispatch entry point.
//!
//! The image is a shared object exporting one C-callable function with the
//! conventional `main(argc, argv)` signature. Which applet runs is decided
//! by the entry point itself, from `argv[0]`.

use crate::error::LoadError;
use libc::{c_char, c_int, c_void};
use std::ffi::{CStr, CString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr::NonNull;

/// The applet-dispatch entry point exported by the image.
///
/// Calling it is unsafe: the image may do anything a C `main` can do,
/// which is why invocation always happens in a forked child.
pub(crate) type EntryFn = unsafe extern "C" fn(c_int, *mut *mut c_char) -> c_int;

/// An open applet image with its entry point resolved.
///
/// Owns the underlying dl handle exclusively; `Drop` closes it.
pub(crate) struct Image {
    raw: NonNull<c_void>,
    entry: EntryFn,
    name: String,
}

// The dl handle and entry pointer are written once at open time and
// read-only afterwards, so sharing across threads is sound.
unsafe impl Send for Image {}
unsafe impl Sync for Image {}

impl Image {
    /// Open `path` for lazy, process-local resolution and resolve `symbol`.
    ///
    /// On any failure the partially acquired handle is closed before
    /// returning, so a failed open leaks nothing.
    pub(crate) fn open(path: &Path, symbol: &CStr) -> Result<Self, LoadError> {
        let display = path.display().to_string();
        let c_path =
            CString::new(path.as_os_str().as_bytes()).map_err(|_| LoadError::ImageOpen {
                path: display.clone(),
                reason: "path contains an interior NUL byte".into(),
            })?;

        let raw = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_LAZY | libc::RTLD_LOCAL) };
        let raw = NonNull::new(raw).ok_or_else(|| LoadError::ImageOpen {
            path: display.clone(),
            reason: last_dl_error(),
        })?;

        let sym = unsafe { libc::dlsym(raw.as_ptr(), symbol.as_ptr()) };
        if sym.is_null() {
            unsafe { libc::dlclose(raw.as_ptr()) };
            return Err(LoadError::EntryPointMissing {
                path: display,
                symbol: symbol.to_string_lossy().into_owned(),
            });
        }
        // A non-null dlsym result for a function symbol is a function pointer.
        let entry: EntryFn = unsafe { std::mem::transmute::<*mut c_void, EntryFn>(sym) };

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "applet".into());

        Ok(Self { raw, entry, name })
    }

    pub(crate) fn entry(&self) -> EntryFn {
        self.entry
    }

    /// Display name used as `argv[0]` for the self-listing invocation.
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe { libc::dlclose(self.raw.as_ptr()) };
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("name", &self.name)
            .field("raw", &self.raw.as_ptr())
            .finish()
    }
}

/// Fetch and clear the thread's pending `dlerror` message.
fn last_dl_error() -> String {
    let msg = unsafe { libc::dlerror() };
    if msg.is_null() {
        "unknown dl error".into()
    } else {
        unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned()
    }
}
