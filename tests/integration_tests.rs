//! Integration tests for progress-watcher
//!
//! These drive full runs with scripted backends, so no external command or
//! terminal is needed.

mod common;

use common::{no_confirm, RecordingReporter, ReporterCall, ScriptedSource, ScriptedWorkload};
use progress_watcher::error::Role;
use progress_watcher::snapshot::snapshot_file_name;
use progress_watcher::{ProgressError, ProgressRun, RunConfig, StopReason};
use std::collections::HashSet;
use std::time::Duration;
use tempfile::tempdir;

fn config(interval_ms: u64, output_dir: &std::path::Path) -> RunConfig {
    let mut config = RunConfig::new("scripted work");
    config.interval = Duration::from_millis(interval_ms);
    config.output_dir = output_dir.to_path_buf();
    config
}

fn files_in(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_samples_stream_until_work_finishes() {
    let dir = tempdir().unwrap();
    let workload = ScriptedWorkload::new(Duration::from_millis(350));
    let source = ScriptedSource::new();
    let mut reporter = RecordingReporter::new();

    let outcome = ProgressRun::new(config(100, dir.path()), workload.clone(), source.clone())
        .execute(&mut reporter, no_confirm)
        .unwrap();

    assert!(reporter.fractions().len() >= 3);
    assert_eq!(
        reporter.calls.first(),
        Some(&ReporterCall::Start("scripted work".into()))
    );
    assert!(reporter.stopped());
    assert_eq!(outcome.samples_delivered, reporter.fractions().len() as u64);
    assert_eq!(outcome.identifier.as_str(), "scripted-run");
    assert_eq!(outcome.stop_reason, StopReason::WorkFinished);
    assert_eq!(workload.executions(), 1);

    // Nothing requested, nothing written
    assert!(outcome.snapshot_files.is_empty());
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn test_fractions_arrive_in_sampling_order() {
    let dir = tempdir().unwrap();
    let mut reporter = RecordingReporter::new();

    let outcome = ProgressRun::new(
        config(10, dir.path()),
        ScriptedWorkload::new(Duration::from_millis(120)),
        ScriptedSource::new(),
    )
    .execute(&mut reporter, no_confirm)
    .unwrap();

    let fractions = reporter.fractions();
    assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(outcome.last_fraction, fractions.last().copied());
}

#[test]
fn test_snapshots_are_numbered_contiguously() {
    let dir = tempdir().unwrap();
    let mut config = config(20, dir.path());
    config.capture_snapshots = true;
    let mut reporter = RecordingReporter::new();

    let outcome = ProgressRun::new(
        config,
        ScriptedWorkload::new(Duration::from_millis(250)),
        ScriptedSource::with_snapshots(3),
    )
    .execute(&mut reporter, no_confirm)
    .unwrap();

    let expected: Vec<String> = (0..3).map(|i| snapshot_file_name(i, "dot")).collect();
    assert_eq!(files_in(dir.path()), expected);
    assert_eq!(outcome.snapshot_files.len(), 3);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("0000_snapshot.dot")).unwrap(),
        "digraph s1 { a -> b }"
    );
    assert!(outcome.snapshot_bytes > 0);
}

#[test]
fn test_interactive_start_holds_both_participants() {
    let dir = tempdir().unwrap();
    let mut config = config(10, dir.path());
    config.interactive_start = true;
    let workload = ScriptedWorkload::new(Duration::from_millis(50));
    let source = ScriptedSource::new();
    let mut reporter = RecordingReporter::new();

    let (seen_workload, seen_source) = (workload.clone(), source.clone());
    let outcome = ProgressRun::new(config, workload.clone(), source.clone())
        .execute(&mut reporter, move || {
            // Several intervals pass while we "think"
            std::thread::sleep(Duration::from_millis(100));
            assert_eq!(seen_workload.executions(), 0);
            assert_eq!(seen_source.updates(), 0);
            Ok(true)
        })
        .unwrap();

    assert_eq!(workload.executions(), 1);
    assert!(source.updates() >= 1);
    assert!(outcome.samples_delivered >= 1);
}

#[test]
fn test_workload_failure_is_surfaced_and_monitor_stops() {
    let dir = tempdir().unwrap();
    let mut reporter = RecordingReporter::new();

    let err = ProgressRun::new(
        config(20, dir.path()),
        ScriptedWorkload::failing(Duration::from_millis(60)),
        ScriptedSource::new(),
    )
    .execute(&mut reporter, no_confirm)
    .unwrap_err();

    assert!(matches!(err, ProgressError::Workload(_)));
    // The stream was still closed properly
    assert!(reporter.started());
    assert!(reporter.stopped());
    assert!(!reporter.fractions().is_empty());
}

#[test]
fn test_workload_connect_failure_never_samples() {
    let dir = tempdir().unwrap();
    let mut workload = ScriptedWorkload::new(Duration::from_millis(10));
    workload.connect_fail = true;
    let source = ScriptedSource::new();
    let mut reporter = RecordingReporter::new();

    let err = ProgressRun::new(config(10, dir.path()), workload, source.clone())
        .execute(&mut reporter, no_confirm)
        .unwrap_err();

    assert!(matches!(err, ProgressError::Setup { role: Role::Worker, .. }));
    assert!(err.is_setup());
    assert_eq!(source.updates(), 0);
    assert!(reporter.calls.is_empty());
}

#[test]
fn test_sampler_connect_failure_never_executes() {
    let dir = tempdir().unwrap();
    let workload = ScriptedWorkload::new(Duration::from_millis(10));
    let source = ScriptedSource {
        connect_fail: true,
        ..ScriptedSource::new()
    };
    let mut reporter = RecordingReporter::new();

    let err = ProgressRun::new(config(10, dir.path()), workload.clone(), source)
        .execute(&mut reporter, no_confirm)
        .unwrap_err();

    assert!(matches!(err, ProgressError::Setup { role: Role::Monitor, .. }));
    assert_eq!(workload.executions(), 0);
    assert!(reporter.calls.is_empty());
}

#[test]
fn test_declined_start_runs_nothing() {
    let dir = tempdir().unwrap();
    let mut config = config(10, dir.path());
    config.interactive_start = true;
    config.capture_snapshots = true;
    let workload = ScriptedWorkload::new(Duration::from_millis(10));
    let source = ScriptedSource::with_snapshots(5);
    let mut reporter = RecordingReporter::new();

    let err = ProgressRun::new(config, workload.clone(), source.clone())
        .execute(&mut reporter, || Ok(false))
        .unwrap_err();

    assert!(matches!(err, ProgressError::StartDeclined));
    assert_eq!(workload.executions(), 0);
    assert_eq!(source.updates(), 0);
    assert!(reporter.calls.is_empty());
    assert!(files_in(dir.path()).is_empty());
}

#[test]
fn test_confirmation_error_is_reported() {
    let dir = tempdir().unwrap();
    let mut config = config(10, dir.path());
    config.interactive_start = true;
    let workload = ScriptedWorkload::new(Duration::from_millis(10));
    let mut reporter = RecordingReporter::new();

    let err = ProgressRun::new(config, workload.clone(), ScriptedSource::new())
        .execute(&mut reporter, || Err(std::io::Error::other("no terminal")))
        .unwrap_err();

    // The abandoned gates seen by both participants do not mask the cause
    assert!(matches!(err, ProgressError::Io(_)));
    assert_eq!(workload.executions(), 0);
}

#[test]
fn test_sampling_failures_are_skipped() {
    let dir = tempdir().unwrap();
    let source = ScriptedSource {
        failing_updates: HashSet::from([1, 2]),
        ..ScriptedSource::new()
    };
    let mut reporter = RecordingReporter::new();

    let outcome = ProgressRun::new(
        config(20, dir.path()),
        ScriptedWorkload::new(Duration::from_millis(200)),
        source,
    )
    .execute(&mut reporter, no_confirm)
    .unwrap();

    assert_eq!(outcome.sampling_failures, 2);
    assert_eq!(
        outcome.iterations,
        outcome.samples_delivered + outcome.sampling_failures
    );
    // Samples after the failures still arrive, starting at the third update
    assert_eq!(reporter.fractions().first(), Some(&0.3));
}

#[test]
fn test_concurrent_runs_are_independent() {
    let handles: Vec<_> = (0..3)
        .map(|i| {
            std::thread::spawn(move || {
                let dir = tempdir().unwrap();
                let mut config = config(10, dir.path());
                config.capture_snapshots = true;
                let mut reporter = RecordingReporter::new();
                let outcome = ProgressRun::new(
                    config,
                    ScriptedWorkload::new(Duration::from_millis(60 + i * 20)),
                    ScriptedSource::with_snapshots(2),
                )
                .execute(&mut reporter, no_confirm)
                .unwrap();
                (outcome.snapshot_files.len(), files_in(dir.path()).len())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), (2, 2));
    }
}
