//! Integration tests for applet_host.
//!
//! These tests compile a small C fixture image with the system C compiler
//! and exercise the full load / discover / invoke path against it. The
//! fixture's applets use only `write(2)` so they stay safe to run from a
//! forked child of the threaded test harness.

use applet_host::{AppletHost, InvokeError, LoadError};
use std::fs::{self, File};
use std::io::Read;
use std::os::fd::{AsFd, OwnedFd};
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Applet image used by most tests. Its `--list` behavior switches on
/// `argv[0]`, which the host derives from the image's file stem, so the
/// same object compiled once serves as the normal, empty-listing, and
/// failing-listing images under different file names.
const FIXTURE_SRC: &str = r#"
#include <stdlib.h>
#include <string.h>
#include <unistd.h>

static void put(int fd, const char *s) {
  ssize_t ignored = write(fd, s, strlen(s));
  (void)ignored;
}

int applet_main(int argc, char **argv) {
  if (argc < 1 || !argv[0]) return 64;
  if (argc >= 2 && strcmp(argv[1], "--list") == 0) {
    if (strcmp(argv[0], "empty") == 0) {
      put(1, "\r\n\n");
      return 0;
    }
    if (strcmp(argv[0], "broken") == 0) {
      put(2, "listing unavailable\n");
      return 3;
    }
    put(1, "true\nfalse\r\n\r\necho\rexitcode\nspin\n");
    return 0;
  }
  const char *applet = argv[0];
  if (strcmp(applet, "true") == 0) return 0;
  if (strcmp(applet, "false") == 0) return 1;
  if (strcmp(applet, "echo") == 0) {
    for (int i = 1; i < argc; i++) {
      if (i > 1) put(1, " ");
      put(1, argv[i]);
    }
    put(1, "\n");
    return 0;
  }
  if (strcmp(applet, "exitcode") == 0 && argc >= 2) return atoi(argv[1]);
  if (strcmp(applet, "spin") == 0) {
    for (;;) sleep(1);
  }
  return 127;
}

int dispatch_main(int argc, char **argv) {
  return applet_main(argc, argv);
}
"#;

struct Fixture {
    _dir: tempfile::TempDir,
    image: PathBuf,
    empty: PathBuf,
    broken: PathBuf,
}

fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let dir = tempfile::TempDir::new().expect("create fixture dir");
        let src = dir.path().join("applets.c");
        fs::write(&src, FIXTURE_SRC).expect("write fixture source");
        let image = dir.path().join("applets.so");
        let cc = std::env::var("CC").unwrap_or_else(|_| "cc".into());
        let status = Command::new(cc)
            .args(["-shared", "-fPIC", "-o"])
            .arg(&image)
            .arg(&src)
            .status()
            .expect("run C compiler");
        assert!(status.success(), "fixture image failed to compile");
        let empty = dir.path().join("empty.so");
        let broken = dir.path().join("broken.so");
        fs::copy(&image, &empty).expect("copy fixture");
        fs::copy(&image, &broken).expect("copy fixture");
        Fixture {
            _dir: dir,
            image,
            empty,
            broken,
        }
    })
}

fn load_fixture() -> AppletHost {
    AppletHost::load(&fixture().image).expect("load fixture image")
}

fn drain(fd: OwnedFd) -> String {
    let mut out = String::new();
    File::from(fd).read_to_string(&mut out).expect("drain pipe");
    out
}

#[test]
fn test_load_discovers_listed_applets_in_order() {
    let host = load_fixture();
    assert_eq!(host.applet_count(), 5);
    let names: Vec<_> = host.applets().iter().collect();
    assert_eq!(names, ["true", "false", "echo", "exitcode", "spin"]);
    assert_eq!(host.applet_name(0), Some("true"));
    assert_eq!(host.applet_name(4), Some("spin"));
    assert_eq!(host.applet_name(5), None);
    assert!(host.applets().contains("echo"));
    assert!(!host.applets().contains("rm"));
}

#[test]
fn test_run_echo_round_trips_through_a_pipe() {
    let host = load_fixture();
    let (read_end, write_end) = nix::unistd::pipe().unwrap();
    let code = host
        .run(&["echo", "hello", "shim"], Some(write_end.as_fd()), None)
        .unwrap();
    drop(write_end);
    assert_eq!(code, 0);
    assert_eq!(drain(read_end), "hello shim\n");
}

#[test]
fn test_applet_failure_is_data_not_error() {
    let host = load_fixture();
    assert_eq!(host.run(&["false"], None, None).unwrap(), 1);
    assert_eq!(host.run(&["exitcode", "42"], None, None).unwrap(), 42);
    assert_eq!(host.run(&["exitcode", "255"], None, None).unwrap(), 255);
}

#[test]
fn test_unknown_applet_exits_127() {
    let host = load_fixture();
    assert_eq!(host.run(&["no-such-applet"], None, None).unwrap(), 127);
}

#[test]
fn test_empty_argv_is_invalid_usage() {
    let host = load_fixture();
    let err = host.run(&[] as &[&str], None, None).unwrap_err();
    assert!(matches!(err, InvokeError::EmptyArgv));
}

#[test]
fn test_load_unloadable_path_fails() {
    let err = AppletHost::load("/nonexistent/libapplets.so").unwrap_err();
    assert!(matches!(err, LoadError::ImageOpen { .. }));
}

#[test]
fn test_load_with_missing_entry_symbol_fails() {
    let err = AppletHost::load_with_entry(&fixture().image, c"missing_main").unwrap_err();
    assert!(matches!(err, LoadError::EntryPointMissing { .. }));
}

#[test]
fn test_load_with_alternate_entry_symbol() {
    let host = AppletHost::load_with_entry(&fixture().image, c"dispatch_main").unwrap();
    assert_eq!(host.applet_count(), 5);
    assert_eq!(host.run(&["true"], None, None).unwrap(), 0);
}

#[test]
fn test_empty_listing_is_success_with_empty_catalog() {
    let host = AppletHost::load(&fixture().empty).expect("empty listing still loads");
    assert!(host.applets().is_empty());
    assert_eq!(host.applet_count(), 0);
    assert_eq!(host.applet_name(0), None);
}

#[test]
fn test_failing_listing_fails_the_load() {
    let err = AppletHost::load(&fixture().broken).unwrap_err();
    assert!(matches!(err, LoadError::ListingFailed { code: 3 }));
}

#[test]
fn test_spawn_timeout_then_terminate() {
    let host = load_fixture();
    let mut child = host.spawn(&["spin"], None, None).unwrap();
    assert_eq!(
        child.wait_timeout(Duration::from_millis(100)).unwrap(),
        None
    );
    child.terminate().unwrap();
    assert_eq!(child.wait().unwrap(), 128 + libc::SIGTERM);
}

#[test]
fn test_concurrent_runs_do_not_cross_contaminate() {
    let host = Arc::new(load_fixture());
    let mut workers = Vec::new();
    for i in 0..16 {
        let host = Arc::clone(&host);
        workers.push(std::thread::spawn(move || {
            let tag = format!("worker-{i}");
            let (read_end, write_end) = nix::unistd::pipe().unwrap();
            let code = host
                .run(&["echo", tag.as_str()], Some(write_end.as_fd()), None)
                .unwrap();
            drop(write_end);
            (code, tag, drain(read_end))
        }));
    }
    for worker in workers {
        let (code, tag, output) = worker.join().expect("worker panicked");
        assert_eq!(code, 0);
        assert_eq!(output, format!("{tag}\n"));
    }
}
