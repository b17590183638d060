//! # applet_host
//!
//! Host shim for a dynamically loaded multi-applet utility image.
//!
//! `applet_host` loads a shared object that bundles many Unix utilities
//! behind one C-callable dispatch entry point (BusyBox built as a shared
//! library is the canonical example), discovers which applets it provides,
//! and runs any of them as an isolated child process with redirected
//! output streams. A shell-like runtime gets standard utility behavior
//! without shelling out to an installed binary and without linking the
//! utility image into its own process.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use applet_host::AppletHost;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load the image and discover its applets (runs `--list` once).
//! let host = AppletHost::load_with_entry("vendor/libbusybox.so", c"busybox_main")?;
//! for applet in host.applets() {
//!     println!("{applet}");
//! }
//!
//! // Run an applet; argv[0] selects it. None inherits our streams.
//! let code = host.run(&["echo", "hello"], None, None)?;
//! assert_eq!(code, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Design Principles
//!
//! - **Process isolation**: every invocation forks; the entry point runs in
//!   the child and terminates there via `_exit`, never returning into host
//!   control flow
//! - **Atomic construction**: an [`AppletHost`] exists only after load,
//!   symbol resolution, and catalog discovery have all succeeded
//! - **Outcomes are data**: an applet's non-zero exit or signal death is
//!   reported as a normalized exit code (`128 + signo` for signal death),
//!   not as a shim error
//! - **Synchronous and blocking**: no internal threads or event loop;
//!   concurrency, if wanted, is the caller's across independent invocations
//!
//! ## Platform Support
//!
//! Unix only (Linux, macOS). The isolation model is `fork`, which Windows
//! does not provide.

#[cfg(windows)]
compile_error!("applet_host does not support Windows: the isolation model is fork.");

mod catalog;
mod child;
mod error;
mod host;
mod image;
mod invoke;
mod lines;

// Public API
pub use catalog::AppletCatalog;
pub use child::AppletChild;
pub use error::{InvokeError, LoadError};
pub use host::{AppletHost, DEFAULT_ENTRY_SYMBOL};

// Process tokens and signals are expressed in nix's types.
pub use nix::sys::signal::Signal;
pub use nix::unistd::Pid;
