//! # execrs `call` / `run` Integration Tests
//!
//! File: lib/tests/call.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! End-to-end tests of the synchronous entry points against real child
//! processes: capture fidelity, the strict-error contract, large outputs,
//! stdin round-trips, log-file appending and option validation.
//!
//! All commands go through POSIX `sh`, so the suite is Unix-only.
//!
#![cfg(unix)]

mod common;
use common::*;

use execrs::{call, run, CallOptions, CallOutput, ExecError, Stream};
use predicates::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::tempdir;

type TestResult = anyhow::Result<()>;

/// # Capture Fidelity
///
/// Stdout comes back exactly as written, trailing newline included.
#[test]
fn test_call_returns_stdout_verbatim() -> TestResult {
    init_tracing();
    let out = call(&sh("echo hello"), &CallOptions::default())?;
    assert_eq!(out, CallOutput::Stdout("hello\n".to_string()));

    let out = call(&sh("printf 'no newline'"), &CallOptions::default())?;
    assert_eq!(out.stdout(), Some("no newline"));
    Ok(())
}

/// # Trailing Newline Trimming
///
/// The opt-in policy removes exactly one trailing newline.
#[test]
fn test_call_trims_one_trailing_newline_when_asked() -> TestResult {
    let options = CallOptions::default().trim_trailing_newline(true);
    assert_eq!(call(&sh("echo hello"), &options)?.stdout(), Some("hello"));
    assert_eq!(call(&sh("printf 'a\\n\\n'"), &options)?.stdout(), Some("a\n"));
    Ok(())
}

/// # Strict Error Contract
///
/// A non-zero exit in strict mode raises an error carrying the exit code,
/// and its message contains the command and both streams.
#[test]
fn test_strict_mode_reports_exit_code_and_command() {
    init_tracing();
    let command = sh("echo partial; echo oops >&2; exit 7");
    let err = call(&command, &CallOptions::default()).unwrap_err();
    let exec_err = err
        .downcast_ref::<ExecError>()
        .expect("strict failure should be an ExecError");

    assert_eq!(exec_err.returncode(), Some(7));
    assert_eq!(exec_err.command(), Some(command.as_slice()));
    let result = exec_err.execution_result().unwrap();
    assert_eq!(result.stdout, "partial\n");
    assert_eq!(result.stderr, "oops\n");

    let message = err.to_string();
    assert!(predicate::str::starts_with("error while executing [\"sh\", \"-c\"").eval(&message));
    assert!(predicate::str::contains("stdout: partial\n").eval(&message));
    assert!(predicate::str::contains("stderr: oops\n").eval(&message));
}

/// # Non-Strict Passthrough
///
/// The same failing command returns a result with the exit code instead.
#[test]
fn test_non_strict_returns_result_with_exit_code() -> TestResult {
    let result = run(&sh("echo out; exit 7"), &CallOptions::default().strict(false))?;
    assert_eq!(result.returncode, 7);
    assert_eq!(result.stdout, "out\n");
    assert!(!result.success());
    Ok(())
}

/// # Stderr Alone Is Not Fatal
#[test]
fn test_stderr_output_is_returned_not_raised() -> TestResult {
    let options = CallOptions::default().return_stderr(true);
    let out = call(&sh("echo warn >&2"), &options)?;
    assert_eq!(
        out,
        CallOutput::Both {
            stdout: String::new(),
            stderr: "warn\n".to_string(),
        }
    );
    Ok(())
}

/// # Stderr As Error (opt-in)
#[test]
fn test_stderr_is_error_when_configured() {
    let options = CallOptions::default().stderr_is_error(true);
    let err = call(&sh("echo warn >&2"), &options).unwrap_err();
    match err.downcast_ref::<ExecError>() {
        Some(ExecError::StderrNotEmpty {
            returncode, stderr, ..
        }) => {
            assert_eq!(*returncode, 0);
            assert_eq!(stderr, "warn\n");
        }
        other => panic!("expected StderrNotEmpty, got {:?}", other),
    }

    // A quiet child passes even with the stricter rule.
    assert!(call(&sh("echo fine"), &options).is_ok());
}

/// # Large Output Does Not Deadlock
///
/// 10 MiB is far beyond any OS pipe buffer; it must be captured exactly.
#[test]
fn test_large_output_is_captured_without_deadlock() -> TestResult {
    init_tracing();
    const SIZE: usize = 10 * 1024 * 1024;
    let started = Instant::now();
    let options = CallOptions::default().timeout(Duration::from_secs(120));
    let out = call(
        &sh(&format!("yes abcdefghi | head -c {SIZE}; echo tail >&2")),
        &options.return_stderr(true),
    )?;

    let expected: String = "abcdefghi\n".repeat(SIZE / 10 + 1)[..SIZE].to_string();
    let stdout = out.stdout().unwrap();
    assert_eq!(stdout.len(), SIZE);
    assert!(stdout == expected, "10 MiB output differs from what was written");
    assert_eq!(out.stderr(), Some("tail\n"));
    assert!(started.elapsed() < Duration::from_secs(120));
    Ok(())
}

/// # Stdin Round-Trip
#[test]
fn test_stdin_round_trip_through_cat() -> TestResult {
    let text = "line one\nline two\nünïcödé\n";
    let out = call(&["cat"], &CallOptions::default().stdin_str(text))?;
    assert_eq!(out.stdout(), Some(text));

    // Larger than a pipe buffer in both directions at once.
    let payload = "0123456789abcdef\n".repeat(64 * 1024).into_bytes();
    let out = call(&["cat"], &CallOptions::default().stdin_bytes(payload.clone()))?;
    assert_eq!(out.stdout().map(str::as_bytes), Some(payload.as_slice()));
    Ok(())
}

/// # Early Exit While Feeding Stdin
///
/// A child that ignores stdin must not turn the broken pipe into a failure.
#[test]
fn test_child_ignoring_stdin_is_not_an_error() -> TestResult {
    let payload = vec![b'x'; 4 * 1024 * 1024];
    let out = call(&sh("echo done"), &CallOptions::default().stdin_bytes(payload))?;
    assert_eq!(out.stdout(), Some("done\n"));
    Ok(())
}

/// # Log File Appends
///
/// Two calls against the same log file leave both outputs in it.
#[test]
fn test_log_file_is_appended_across_calls() -> TestResult {
    let dir = tempdir()?;
    let log = dir.path().join("logs/nested/calls.log");
    let options = CallOptions::default().log_file(&log);

    call(&sh("echo first"), &options)?;
    call(&sh("echo second"), &options)?;

    assert_eq!(std::fs::read_to_string(&log)?, "first\nsecond\n");
    Ok(())
}

/// # Log File Without Directory Creation
#[test]
fn test_missing_log_dir_errors_when_creation_disabled() -> TestResult {
    let dir = tempdir()?;
    let marker = dir.path().join("spawned");
    let options = CallOptions::default()
        .log_file(dir.path().join("absent/calls.log"))
        .create_log_dir(false);

    let err = call(&sh(&format!("touch {}", marker.display())), &options).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExecError>(),
        Some(ExecError::FileSystem(_))
    ));
    assert!(!marker.exists(), "no process may be spawned");
    Ok(())
}

/// # Mutually Exclusive Stdin
///
/// Both stdin forms are rejected before anything is spawned.
#[test]
fn test_both_stdin_forms_fail_before_spawn() -> TestResult {
    let dir = tempdir()?;
    let marker = dir.path().join("spawned");
    let options = CallOptions::default()
        .stdin_str("text")
        .stdin_bytes(b"bytes".to_vec());

    let err = call(&sh(&format!("touch {}", marker.display())), &options).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExecError>(),
        Some(ExecError::Config(_))
    ));
    assert!(!marker.exists(), "no process may be spawned");
    Ok(())
}

/// # Capture Disabled
///
/// Nothing is returned, but output still reaches the log file.
#[test]
fn test_capture_disabled_returns_nothing_but_logs() -> TestResult {
    let dir = tempdir()?;
    let log = dir.path().join("quiet.log");
    let options = CallOptions::default().capture_output(false).log_file(&log);

    let out = call(&sh("echo logged; echo also >&2"), &options)?;
    assert_eq!(out, CallOutput::Discarded);

    let logged = std::fs::read_to_string(&log)?;
    assert!(logged.contains("logged\n"));
    assert!(logged.contains("also\n"));
    Ok(())
}

/// # Unterminated Output With Capture Disabled
///
/// A megabyte with no newline is handed on in bounded pieces rather than
/// buffered whole.
#[test]
fn test_unterminated_output_is_drained_in_bounded_chunks() -> TestResult {
    let largest = Arc::new(Mutex::new((0usize, 0usize)));
    let sink = Arc::clone(&largest);
    let options = CallOptions::default()
        .capture_output(false)
        .on_line(Arc::new(move |_: Stream, chunk: &str| {
            let mut seen = sink.lock().unwrap();
            seen.0 = seen.0.max(chunk.len());
            seen.1 += chunk.len();
        }));

    let out = call(&sh("head -c 1048576 /dev/zero | tr '\\0' x"), &options)?;
    assert_eq!(out, CallOutput::Discarded);

    let (max_chunk, total) = *largest.lock().unwrap();
    assert_eq!(total, 1_048_576);
    assert!(max_chunk <= 64 * 1024, "chunk of {} bytes", max_chunk);
    Ok(())
}

/// # Line Handler
#[test]
fn test_line_handler_sees_both_streams() -> TestResult {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let options = CallOptions::default().on_line(Arc::new(move |stream: Stream, line: &str| {
        sink.lock().unwrap().push((stream, line.to_string()));
    }));

    call(&sh("echo a; echo b; echo c >&2"), &options)?;

    let mut seen = lines.lock().unwrap().clone();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            (Stream::Stdout, "a\n".to_string()),
            (Stream::Stdout, "b\n".to_string()),
            (Stream::Stderr, "c\n".to_string()),
        ]
    );
    Ok(())
}

/// # Working Directory
#[test]
fn test_cwd_is_applied() -> TestResult {
    let dir = tempdir()?;
    let out = call(&["pwd"], &CallOptions::default().cwd(dir.path()))?;
    let reported = std::path::PathBuf::from(out.stdout().unwrap().trim_end());
    assert_eq!(reported.canonicalize()?, dir.path().canonicalize()?);
    Ok(())
}

/// # Environment Replacement
#[test]
fn test_env_replaces_instead_of_merging() -> TestResult {
    std::env::set_var("EXECRS_PARENT_ONLY", "leaked");
    let mut env = HashMap::new();
    env.insert("EXECRS_CHILD".to_string(), "given".to_string());

    let out = call(
        &["/bin/sh", "-c", "echo \"${EXECRS_CHILD}:${EXECRS_PARENT_ONLY:-absent}\""],
        &CallOptions::default().env(env),
    )?;
    assert_eq!(out.stdout(), Some("given:absent\n"));

    // Without `env`, the caller's environment is inherited.
    let out = call(&sh("echo $EXECRS_PARENT_ONLY"), &CallOptions::default())?;
    assert_eq!(out.stdout(), Some("leaked\n"));
    Ok(())
}

/// # Spawn Failure
///
/// A missing executable surfaces as the native `io::Error`.
#[test]
fn test_missing_executable_is_native_not_found() {
    let err = call(&["no-such-binary-execrs-test"], &CallOptions::default()).unwrap_err();
    let io_err = err
        .downcast_ref::<std::io::Error>()
        .expect("spawn failures are not wrapped");
    assert_eq!(io_err.kind(), std::io::ErrorKind::NotFound);
}

/// # Timeout
///
/// `sleep` runs as a grandchild of `sh` and holds the output pipes open, so
/// the timeout only returns promptly if the whole process group is killed.
#[test]
fn test_timeout_kills_long_running_child() {
    let started = Instant::now();
    let options = CallOptions::default().timeout(Duration::from_millis(300));
    let err = call(&sh("echo before; sleep 5; echo after"), &options).unwrap_err();
    match err.downcast_ref::<ExecError>() {
        Some(ExecError::TimedOut { stdout, timeout, .. }) => {
            assert_eq!(stdout, "before\n");
            assert_eq!(*timeout, Duration::from_millis(300));
        }
        other => panic!("expected TimedOut, got {:?}", other),
    }
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "timeout took {:?}",
        started.elapsed()
    );
}

/// # Concurrent Independent Calls
#[test]
fn test_concurrent_calls_do_not_interfere() {
    let workers: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                call(&sh(&format!("echo worker-{i}")), &CallOptions::default())
                    .map(|out| out.stdout().map(str::to_string))
            })
        })
        .collect();

    for (i, worker) in workers.into_iter().enumerate() {
        let out = worker.join().expect("worker panicked").expect("call failed");
        assert_eq!(out, Some(format!("worker-{i}\n")));
    }
}

/// # Empty Command
#[test]
fn test_empty_command_is_config_error() {
    let err = call(&Vec::<String>::new(), &CallOptions::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ExecError>(),
        Some(ExecError::Config(_))
    ));
}
