//! The applet child process token.
//!
//! [`AppletChild`] is the handle for one spawned applet: it supports
//! blocking and bounded waits and explicit termination requests, so callers
//! never need to reach into OS process tables themselves.

use crate::error::InvokeError;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use std::time::{Duration, Instant};

/// Poll interval for [`AppletChild::wait_timeout`].
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A running (or already reaped) applet child process.
///
/// The wait operations report the child's *normalized* exit code: the plain
/// exit status for a normal exit, or `128 + signal number` when the child
/// was killed by a signal, the shell convention for signal death. Once
/// reaped, the code is cached and later waits return it without touching
/// the process table again.
///
/// Dropping an unreaped `AppletChild` does not kill or reap the child; call
/// one of the wait operations to collect it.
#[derive(Debug)]
pub struct AppletChild {
    pid: Pid,
    status: Option<i32>,
}

impl AppletChild {
    pub(crate) fn new(pid: Pid) -> Self {
        Self { pid, status: None }
    }

    /// Process id of the child.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Block until the child terminates and return its normalized exit code.
    ///
    /// Interrupted waits are retried transparently; any other wait failure
    /// surfaces as [`InvokeError::Wait`].
    pub fn wait(&mut self) -> Result<i32, InvokeError> {
        if let Some(code) = self.status {
            return Ok(code);
        }
        loop {
            match waitpid(self.pid, None) {
                Ok(status) => {
                    if let Some(code) = normalize(status) {
                        self.status = Some(code);
                        return Ok(code);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(InvokeError::Wait(e)),
            }
        }
    }

    /// Non-blocking probe: `Ok(None)` while the child is still running.
    pub fn try_wait(&mut self) -> Result<Option<i32>, InvokeError> {
        if self.status.is_some() {
            return Ok(self.status);
        }
        loop {
            match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => return Ok(None),
                Ok(status) => {
                    self.status = normalize(status);
                    return Ok(self.status);
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(InvokeError::Wait(e)),
            }
        }
    }

    /// Await completion for at most `timeout`.
    ///
    /// Returns `Ok(None)` if the child is still running when the deadline
    /// passes; the caller may then [`terminate`](Self::terminate) it and
    /// [`wait`](Self::wait) again.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<Option<i32>, InvokeError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(code) = self.try_wait()? {
                return Ok(Some(code));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            std::thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }

    /// Request termination with `SIGTERM`.
    pub fn terminate(&self) -> Result<(), InvokeError> {
        self.signal(Signal::SIGTERM)
    }

    /// Deliver an arbitrary signal to the child.
    ///
    /// A no-op once the child has been reaped, so a stale pid is never
    /// signalled.
    pub fn signal(&self, sig: Signal) -> Result<(), InvokeError> {
        if self.status.is_some() {
            return Ok(());
        }
        kill(self.pid, sig).map_err(InvokeError::Signal)
    }
}

/// Collapse a wait status into the normalized exit code, if terminal.
fn normalize(status: WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(code),
        WaitStatus::Signaled(_, sig, _) => Some(128 + sig as i32),
        _ => None,
    }
}
