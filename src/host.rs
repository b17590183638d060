//! The host handle: one loaded image plus its discovered catalog.

use crate::catalog::{self, AppletCatalog};
use crate::child::AppletChild;
use crate::error::{InvokeError, LoadError};
use crate::image::Image;
use crate::invoke;
use std::ffi::CStr;
use std::os::fd::BorrowedFd;
use std::path::Path;

/// Entry symbol resolved by [`AppletHost::load`].
pub const DEFAULT_ENTRY_SYMBOL: &CStr = c"applet_main";

/// A loaded applet image, ready for repeated invocations.
///
/// A host only ever exists fully constructed: the image is open, the entry
/// point resolved, and the applet catalog built. Any failure along the way
/// releases everything acquired so far and yields a [`LoadError`] instead.
///
/// The image and catalog are read-only after construction, so a host can be
/// shared across threads and invoked concurrently; each invocation is an
/// independent child process.
///
/// Dropping the host frees the catalog and unloads the image.
#[derive(Debug)]
pub struct AppletHost {
    image: Image,
    catalog: AppletCatalog,
}

impl AppletHost {
    /// Load the image at `path` and discover its applets.
    ///
    /// Resolves [`DEFAULT_ENTRY_SYMBOL`]; images with a differently named
    /// dispatcher (BusyBox exports `busybox_main`) go through
    /// [`load_with_entry`](Self::load_with_entry).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_with_entry(path, DEFAULT_ENTRY_SYMBOL)
    }

    /// Load the image at `path`, resolving `symbol` as its entry point.
    pub fn load_with_entry(path: impl AsRef<Path>, symbol: &CStr) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let image = Image::open(path, symbol)?;
        let catalog = catalog::discover(&image)?;
        tracing::debug!(
            image = %path.display(),
            applets = catalog.len(),
            "loaded applet image"
        );
        Ok(Self { image, catalog })
    }

    /// The discovered applet catalog.
    pub fn applets(&self) -> &AppletCatalog {
        &self.catalog
    }

    /// Number of discovered applets.
    pub fn applet_count(&self) -> usize {
        self.catalog.len()
    }

    /// Applet name at `index`; `None` when out of range.
    pub fn applet_name(&self, index: usize) -> Option<&str> {
        self.catalog.get(index)
    }

    /// Run an applet to completion and return its normalized exit code.
    ///
    /// `argv[0]` selects the applet; `stdout`/`stderr` redirect the child's
    /// streams, `None` inherits the caller's. The applet's own outcome is
    /// data, never an error: a non-zero exit or signal death still returns
    /// `Ok` with the normalized code. `Err` means the shim itself failed
    /// (invalid argv, fork failure, wait failure).
    pub fn run(
        &self,
        argv: &[impl AsRef<str>],
        stdout: Option<BorrowedFd<'_>>,
        stderr: Option<BorrowedFd<'_>>,
    ) -> Result<i32, InvokeError> {
        self.spawn(argv, stdout, stderr)?.wait()
    }

    /// Spawn an applet without waiting, yielding its [`AppletChild`] token.
    pub fn spawn(
        &self,
        argv: &[impl AsRef<str>],
        stdout: Option<BorrowedFd<'_>>,
        stderr: Option<BorrowedFd<'_>>,
    ) -> Result<AppletChild, InvokeError> {
        invoke::spawn(self.image.entry(), argv, stdout, stderr)
    }
}
