//! Run orchestration
//!
//! Builds the per-run channels and gates, spawns both coordinators and drives
//! the reporter from the calling thread until the end of the stream.

use super::monitor::{
    MonitorCoordinator, MonitorLinks, MonitorReport, MonitorSettings, StopReason,
};
use super::worker::{WorkerCoordinator, WorkerLinks, WorkerReport};
use super::Participant;
use crate::backend::{RunIdentifier, SamplingSource, Workload};
use crate::config::RunConfig;
use crate::error::{CoordinationError, ProgressError, ReporterError, Result};
use crate::rendezvous::{
    handoff, stop, stream, AbandonOnDrop, ProgressEvent, ProgressReceiver, RendezvousGate,
};
use crate::reporter::Reporter;
use chrono::{DateTime, Utc};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long the drain waits for a sample before calling `Reporter::idle`
pub const PUMP_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Identifier of the workload context
    pub identifier: RunIdentifier,

    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,

    /// Total run time, setup and drain included
    pub elapsed: Duration,

    /// Time the workload itself took
    pub workload_elapsed: Duration,

    /// Samples handed to the reporter
    pub samples_delivered: u64,

    /// Last fraction the reporter saw
    pub last_fraction: Option<f64>,

    /// Sampling iterations performed by the monitor
    pub iterations: u64,

    /// Sampling requests that failed and were skipped
    pub sampling_failures: u64,

    /// Why sampling ended
    pub stop_reason: StopReason,

    /// Snapshot files written, in index order
    pub snapshot_files: Vec<PathBuf>,

    /// Total size of the snapshot files
    pub snapshot_bytes: u64,
}

#[derive(Debug, Default)]
struct DrainReport {
    samples: u64,
    last_fraction: Option<f64>,
    stream_error: Option<CoordinationError>,
    reporter_error: Option<ReporterError>,
}

/// One watched execution of a workload
pub struct ProgressRun<W: Workload, S: SamplingSource> {
    config: RunConfig,
    workload: W,
    source: S,
}

impl<W: Workload, S: SamplingSource> ProgressRun<W, S> {
    pub fn new(config: RunConfig, workload: W, source: S) -> Self {
        Self {
            config,
            workload,
            source,
        }
    }

    /// Run the workload to completion while reporting its progress
    ///
    /// `confirm` is only consulted for an interactive start, after both
    /// contexts are open. Returning `false` declines the run and nothing is
    /// executed or sampled.
    pub fn execute<R, F>(self, reporter: &mut R, confirm: F) -> Result<RunOutcome>
    where
        R: Reporter + ?Sized,
        F: FnOnce() -> io::Result<bool>,
    {
        let ProgressRun {
            config,
            workload,
            source,
        } = self;

        let started_at = Utc::now();
        let clock = Instant::now();

        let (handoff_tx, handoff_rx) = handoff::channel();
        let (stop_tx, stop_rx) = stop::channel();
        let (progress_tx, progress_rx) = stream::channel();

        let armed = Arc::new(RendezvousGate::new());
        let start = Arc::new(if config.interactive_start {
            RendezvousGate::new()
        } else {
            RendezvousGate::pre_released()
        });
        let shutdown = Arc::new(RendezvousGate::new());

        // Whatever path leaves this function, no participant stays parked.
        let _start_guard = AbandonOnDrop::new(Arc::clone(&start));
        let _shutdown_guard = AbandonOnDrop::new(Arc::clone(&shutdown));

        let worker = WorkerCoordinator::new(
            workload,
            config.command.clone(),
            WorkerLinks {
                handoff: handoff_tx,
                armed: Arc::clone(&armed),
                start: Arc::clone(&start),
                shutdown: Arc::clone(&shutdown),
                stop: stop_tx,
            },
        )
        .spawn()?;

        let monitor = MonitorCoordinator::new(
            source,
            MonitorSettings {
                interval: config.interval,
                capture_snapshots: config.capture_snapshots,
                output_dir: config.output_dir.clone(),
            },
            MonitorLinks {
                handoff: handoff_rx,
                armed: Arc::clone(&armed),
                start: Arc::clone(&start),
                shutdown: Arc::clone(&shutdown),
                stop: stop_rx,
                progress: progress_tx,
            },
        );
        let monitor = match monitor.spawn() {
            Ok(monitor) => monitor,
            Err(e) => {
                armed.abandon();
                start.abandon();
                shutdown.abandon();
                if let Err(worker_err) = worker.join() {
                    debug!(error = %worker_err, "Worker stopped after monitor spawn failure");
                }
                return Err(e);
            }
        };

        // Both contexts are open once the monitor arms; setup failures surface here.
        if let Err(e) = armed.wait() {
            start.abandon();
            shutdown.abandon();
            return Err(join_failed(worker, monitor, e.into()));
        }

        if config.interactive_start {
            let declined = match confirm() {
                Ok(true) => None,
                Ok(false) => Some(ProgressError::StartDeclined),
                Err(e) => Some(ProgressError::Io(e)),
            };
            if let Some(e) = declined {
                info!("Start declined");
                start.abandon();
                shutdown.abandon();
                return Err(join_failed(worker, monitor, e));
            }
        }

        start.release();
        info!(command = %config.command, "Run started");

        let drain = drain_progress(&progress_rx, reporter, &config.command);
        shutdown.release();

        let worker_result = worker.join();
        let monitor_result = monitor.join();

        let mut failures = Vec::new();
        let worker_report = keep_report(worker_result, &mut failures);
        let monitor_report = keep_report(monitor_result, &mut failures);
        failures.extend(drain.stream_error.map(ProgressError::from));
        failures.extend(drain.reporter_error.map(ProgressError::from));

        if let Some(e) = most_significant(failures) {
            return Err(e);
        }
        let (Some(worker), Some(monitor)) = (worker_report, monitor_report) else {
            return Err(CoordinationError::StreamClosed.into());
        };

        let outcome = RunOutcome {
            identifier: worker.identifier,
            started_at,
            elapsed: clock.elapsed(),
            workload_elapsed: worker.workload_elapsed,
            samples_delivered: drain.samples,
            last_fraction: drain.last_fraction,
            iterations: monitor.iterations,
            sampling_failures: monitor.sampling_failures,
            stop_reason: monitor.stop_reason,
            snapshot_files: monitor.snapshot_files,
            snapshot_bytes: monitor.snapshot_bytes,
        };
        info!(
            identifier = %outcome.identifier,
            samples = outcome.samples_delivered,
            snapshots = outcome.snapshot_files.len(),
            "Run finished"
        );
        Ok(outcome)
    }
}

fn keep_report<T>(result: Result<T>, failures: &mut Vec<ProgressError>) -> Option<T> {
    match result {
        Ok(report) => Some(report),
        Err(e) => {
            failures.push(e);
            None
        }
    }
}

/// Feed every sample to the reporter until end of stream
///
/// A failing reporter is not called again but the stream is still drained,
/// so the monitor can always finish.
fn drain_progress<R: Reporter + ?Sized>(
    progress: &ProgressReceiver,
    reporter: &mut R,
    description: &str,
) -> DrainReport {
    let mut report = DrainReport::default();

    let started = match reporter.start(description) {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Reporter failed to start");
            report.reporter_error = Some(e);
            false
        }
    };

    loop {
        let step = match progress.pop_timeout(PUMP_INTERVAL) {
            Ok(Some(ProgressEvent::Sample(sample))) => {
                report.samples += 1;
                report.last_fraction = Some(sample.fraction);
                if report.reporter_error.is_some() {
                    continue;
                }
                reporter.on_progress(sample.fraction)
            }
            Ok(Some(ProgressEvent::EndOfStream)) => {
                debug!(samples = report.samples, "End of stream");
                break;
            }
            Ok(None) => {
                if report.reporter_error.is_some() {
                    continue;
                }
                reporter.idle()
            }
            Err(e) => {
                warn!(error = %e, "Progress stream closed without end marker");
                report.stream_error = Some(e);
                break;
            }
        };

        if let Err(e) = step {
            warn!(error = %e, "Reporter failed, draining without display");
            report.reporter_error = Some(e);
        }
    }

    if started {
        if let Err(e) = reporter.stop() {
            warn!(error = %e, "Reporter failed to stop");
            if report.reporter_error.is_none() {
                report.reporter_error = Some(e);
            }
        }
    }

    report
}

/// Join both participants after an early exit and pick the error to report
fn join_failed(
    worker: Participant<WorkerReport>,
    monitor: Participant<MonitorReport>,
    cause: ProgressError,
) -> ProgressError {
    let mut failures = vec![cause];
    failures.extend(worker.join().err());
    failures.extend(monitor.join().err());
    most_significant(failures).unwrap_or(ProgressError::StartDeclined)
}

fn precedence(error: &ProgressError) -> u8 {
    match error {
        ProgressError::Setup { .. } => 0,
        ProgressError::StartDeclined => 1,
        ProgressError::Workload(_) => 2,
        ProgressError::Coordination(CoordinationError::StreamClosed) => 6,
        ProgressError::Reporter(_) => 7,
        e if e.is_secondary() => 5,
        ProgressError::Coordination(_) => 4,
        _ => 3,
    }
}

/// The failure that caused the others
fn most_significant(failures: Vec<ProgressError>) -> Option<ProgressError> {
    failures.into_iter().min_by_key(precedence)
}
