//! Forked invocation of the image's entry point.
//!
//! Every applet runs in a fresh child process. The child redirects its
//! output streams as requested, calls the entry point, and terminates with
//! the returned value via `_exit`. That transition is one-way: the child
//! never returns to the invoker's control flow, so nothing the entry point
//! does can unwind into host state.

use crate::child::AppletChild;
use crate::error::InvokeError;
use crate::image::EntryFn;
use libc::c_char;
use nix::unistd::{close, dup2, fork, ForkResult};
use std::ffi::CString;
use std::os::fd::{AsRawFd, BorrowedFd, RawFd};
use std::ptr;

/// Spawn a child that runs `entry` with `argv`.
///
/// `stdout`/`stderr` name a destination descriptor for the corresponding
/// stream; `None` inherits the caller's stream. The caller keeps ownership
/// of the supplied descriptors and should close its copy of a pipe write
/// end after spawning, or the read side will never see end of stream.
///
/// The argument vector is duplicated into C storage before the fork, so
/// the child performs no allocation.
pub(crate) fn spawn(
    entry: EntryFn,
    argv: &[impl AsRef<str>],
    stdout: Option<BorrowedFd<'_>>,
    stderr: Option<BorrowedFd<'_>>,
) -> Result<AppletChild, InvokeError> {
    if argv.is_empty() {
        return Err(InvokeError::EmptyArgv);
    }
    let c_args: Vec<CString> = argv
        .iter()
        .map(|arg| {
            CString::new(arg.as_ref()).map_err(|_| InvokeError::NulInArgument {
                arg: arg.as_ref().to_owned(),
            })
        })
        .collect::<Result<_, _>>()?;
    let mut c_ptrs: Vec<*mut c_char> = c_args
        .iter()
        .map(|arg| arg.as_ptr() as *mut c_char)
        .collect();
    c_ptrs.push(ptr::null_mut());

    match unsafe { fork() }.map_err(InvokeError::Fork)? {
        ForkResult::Parent { child } => Ok(AppletChild::new(child)),
        ForkResult::Child => {
            redirect(stdout, libc::STDOUT_FILENO);
            redirect(stderr, libc::STDERR_FILENO);
            let rc = unsafe { entry(c_args.len() as libc::c_int, c_ptrs.as_mut_ptr()) };
            unsafe { libc::_exit(rc) }
        }
    }
}

/// Child-side stream redirection: duplicate the destination onto `stream`,
/// then close the original so it does not leak into the invoked applet.
fn redirect(dest: Option<BorrowedFd<'_>>, stream: RawFd) {
    let Some(fd) = dest else { return };
    let raw = fd.as_raw_fd();
    if raw == stream {
        return;
    }
    if dup2(raw, stream).is_err() {
        // No stream left to report on; 127 follows the shell convention
        // for "cannot execute".
        unsafe { libc::_exit(127) }
    }
    let _ = close(raw);
}
