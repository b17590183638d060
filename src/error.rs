//! Error types for applet_host.
//!
//! This module defines two main error categories:
//! - [`LoadError`]: failures while constructing an [`AppletHost`](crate::AppletHost) -
//!   the image could not be opened, its entry point resolved, or its applet
//!   listing captured. No host value exists after any of these.
//! - [`InvokeError`]: shim-level failures while running an applet. An applet
//!   that runs and exits non-zero (or dies to a signal) is *not* an error;
//!   its normalized exit code is the `Ok` payload of `run`/`wait`.

use nix::errno::Errno;
use thiserror::Error;

/// Failure to load an applet image and discover its catalog.
///
/// Construction is atomic: whichever variant is returned, no partially
/// initialized host exists and every acquired resource (the open image,
/// pipe descriptors, the listing child) has been released.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The dynamic image could not be opened.
    #[error("failed to open applet image {path}: {reason}")]
    ImageOpen { path: String, reason: String },

    /// The image loaded but does not export the dispatch entry point.
    #[error("applet image {path} does not export `{symbol}`")]
    EntryPointMissing { path: String, symbol: String },

    /// The pipe for capturing the applet listing could not be created.
    #[error("failed to create listing pipe: {0}")]
    ListingPipe(#[source] Errno),

    /// The self-listing invocation failed at the shim level.
    #[error("failed to invoke applet listing: {0}")]
    ListingInvoke(#[from] InvokeError),

    /// The self-listing child ran but reported failure.
    #[error("applet listing exited with code {code}")]
    ListingFailed { code: i32 },

    /// Reading the listing output from the pipe failed.
    #[error("failed to read applet listing: {0}")]
    ListingRead(#[source] std::io::Error),
}

/// Shim-level failure while spawning or supervising an applet child.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The argument vector was empty. Applets dispatch on `argv[0]`,
    /// so there is nothing to invoke.
    #[error("argument vector is empty")]
    EmptyArgv,

    /// An argument contains an interior NUL byte and cannot cross the
    /// C entry-point boundary.
    #[error("argument contains an interior NUL byte: {arg:?}")]
    NulInArgument { arg: String },

    /// The child process could not be created.
    #[error("fork failed: {0}")]
    Fork(#[source] Errno),

    /// Waiting for the child failed for a reason other than interruption.
    #[error("wait for applet child failed: {0}")]
    Wait(#[source] Errno),

    /// Delivering a signal to the child failed.
    #[error("failed to signal applet child: {0}")]
    Signal(#[source] Errno),
}
