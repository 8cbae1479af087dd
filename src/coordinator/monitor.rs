//! Monitor coordinator
//!
//! Owns the sampling context for the whole run. Once the worker has
//! registered and the start gate opens, it samples on a fixed tick until the
//! worker raises the stop marker, closes the progress stream, waits for the
//! shutdown rendezvous and only then persists buffered snapshots.
//!
//! The iteration that observes the stop marker still takes its sample, so
//! the final state of the workload always reaches the reporter.

use super::Participant;
use crate::backend::{RunIdentifier, Sampler, SamplingSource};
use crate::error::{ProgressError, Result, Role};
use crate::rendezvous::gate::AbandonOnDrop;
use crate::rendezvous::stop::StopState;
use crate::rendezvous::{
    HandoffReceiver, ProgressSample, ProgressSender, RendezvousGate, StopListener,
};
use crate::snapshot::SnapshotBuffer;
use crossbeam_channel::{select, tick};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Monitor state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    AwaitingRegistration,
    AwaitingStart,
    Sampling,
    Flushing,
    Persisting,
    Done,
}

/// Why the sampling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The worker raised the stop marker
    WorkFinished,
    /// The worker went away without raising it
    WorkerVanished,
}

/// Channels and gates the monitor participates in
pub struct MonitorLinks {
    /// Identifier handoff from the worker
    pub handoff: HandoffReceiver,

    /// Released once the sampling context is ready, abandoned on failure
    pub armed: Arc<RendezvousGate>,

    /// Start gate shared with the worker
    pub start: Arc<RendezvousGate>,

    /// Released once the reporter has drained the stream
    pub shutdown: Arc<RendezvousGate>,

    /// Work-finished marker from the worker
    pub stop: StopListener,

    /// Progress stream to the reporter
    pub progress: ProgressSender,
}

/// Sampling behaviour
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Time between samples
    pub interval: Duration,

    /// Request and persist snapshots
    pub capture_snapshots: bool,

    /// Where snapshot files are written
    pub output_dir: PathBuf,
}

/// What the monitor reports after a successful run
#[derive(Debug, Clone)]
pub struct MonitorReport {
    /// Identifier of the sampled run
    pub identifier: RunIdentifier,

    /// Sampling iterations performed
    pub iterations: u64,

    /// Samples pushed to the progress stream
    pub samples_published: u64,

    /// Failed sampling requests (logged and skipped)
    pub sampling_failures: u64,

    /// Why sampling ended
    pub stop_reason: StopReason,

    /// Snapshot files written, in index order
    pub snapshot_files: Vec<PathBuf>,

    /// Total bytes of snapshot data written
    pub snapshot_bytes: u64,
}

#[derive(Debug, Default)]
struct SamplingStats {
    iterations: u64,
    published: u64,
    failures: u64,
}

/// Samples the workload and walks the monitor side of the protocol
pub struct MonitorCoordinator<S: SamplingSource> {
    source: S,
    settings: MonitorSettings,
    links: MonitorLinks,
}

impl<S: SamplingSource> MonitorCoordinator<S> {
    /// Create a monitor
    pub fn new(source: S, settings: MonitorSettings, links: MonitorLinks) -> Self {
        Self {
            source,
            settings,
            links,
        }
    }

    /// Run the monitor on its own thread
    pub fn spawn(self) -> Result<Participant<MonitorReport>> {
        Participant::spawn(Role::Monitor, move || self.run())
    }

    /// Walk the monitor state machine to completion
    pub fn run(self) -> Result<MonitorReport> {
        let MonitorCoordinator {
            source,
            settings,
            links,
        } = self;
        let MonitorLinks {
            handoff,
            armed,
            start,
            shutdown,
            stop,
            progress,
        } = links;

        // Nobody may wait forever on the armed gate, whichever way we leave.
        let armed = AbandonOnDrop::new(armed);

        enter(MonitorState::AwaitingRegistration);
        let identifier = handoff.receive()?;
        let mut sampler = source.connect().map_err(|source| ProgressError::Setup {
            role: Role::Monitor,
            source,
        })?;
        info!(identifier = %identifier, "Sampling context opened");
        armed.release();

        enter(MonitorState::AwaitingStart);
        if let Err(e) = start.wait() {
            debug!("Start gate abandoned, nothing sampled");
            close_sampler(&mut sampler);
            return Err(e.into());
        }

        enter(MonitorState::Sampling);
        let mut snapshots = SnapshotBuffer::new(sampler.snapshot_extension());
        let (stats, stop_reason) = sample_until_stopped(
            &mut sampler,
            &identifier,
            &settings,
            &stop,
            &progress,
            &mut snapshots,
        );
        info!(
            iterations = stats.iterations,
            samples = stats.published,
            failures = stats.failures,
            reason = ?stop_reason,
            "Sampling stopped"
        );

        enter(MonitorState::Flushing);
        if let Err(e) = progress.finish() {
            warn!(error = %e, "Reporter went away before end of stream");
        }

        // Keep the sampling context alive until the reporter has drained.
        enter(MonitorState::Persisting);
        let shutdown_result = shutdown.wait();
        let persisted = match shutdown_result {
            Ok(()) => {
                if !snapshots.is_empty() {
                    info!(
                        count = snapshots.len(),
                        dir = %settings.output_dir.display(),
                        "Writing snapshots"
                    );
                }
                snapshots.persist(&settings.output_dir)
            }
            Err(_) => Ok(Vec::new()),
        };

        enter(MonitorState::Done);
        close_sampler(&mut sampler);
        shutdown_result?;
        let snapshot_files = persisted?;
        info!("Monitoring done");

        Ok(MonitorReport {
            identifier,
            iterations: stats.iterations,
            samples_published: stats.published,
            sampling_failures: stats.failures,
            stop_reason,
            snapshot_files,
            snapshot_bytes: snapshots.total_bytes(),
        })
    }
}

/// Sample on every tick until the stop marker is seen
///
/// The wait is a select over the ticker and the stop signal, so a stop
/// raised mid-interval is acted on right away: the iteration that sees it
/// takes one last sample and then ends the loop.
fn sample_until_stopped<P: Sampler>(
    sampler: &mut P,
    identifier: &RunIdentifier,
    settings: &MonitorSettings,
    stop: &StopListener,
    progress: &ProgressSender,
    snapshots: &mut SnapshotBuffer,
) -> (SamplingStats, StopReason) {
    let ticker = tick(settings.interval);
    let mut stats = SamplingStats::default();

    loop {
        let mut stop_state = StopState::Running;
        select! {
            recv(ticker) -> _ => {}
            recv(stop.receiver()) -> msg => {
                stop_state = if msg.is_ok() {
                    StopState::Finished
                } else {
                    StopState::Vanished
                };
            }
        }

        sample_once(
            sampler,
            identifier,
            stats.iterations,
            settings.capture_snapshots,
            progress,
            snapshots,
            &mut stats,
        );
        stats.iterations += 1;

        if stop_state == StopState::Running {
            stop_state = stop.poll();
        }

        match stop_state {
            StopState::Running => continue,
            StopState::Finished => return (stats, StopReason::WorkFinished),
            StopState::Vanished => return (stats, StopReason::WorkerVanished),
        }
    }
}

fn sample_once<P: Sampler>(
    sampler: &mut P,
    identifier: &RunIdentifier,
    iteration: u64,
    capture_snapshots: bool,
    progress: &ProgressSender,
    snapshots: &mut SnapshotBuffer,
    stats: &mut SamplingStats,
) {
    if let Err(e) = sampler.request_update(identifier) {
        warn!(iteration, error = %e, "Progress update failed");
        stats.failures += 1;
        return;
    }

    let snapshot: Option<Arc<str>> = if capture_snapshots {
        match sampler.request_snapshot() {
            Ok(snapshot) => snapshot.filter(|s| !s.trim().is_empty()).map(Arc::from),
            Err(e) => {
                warn!(iteration, error = %e, "Snapshot request failed");
                stats.failures += 1;
                None
            }
        }
    } else {
        None
    };

    let fraction = match sampler.request_fraction() {
        Ok(fraction) => fraction,
        Err(e) => {
            warn!(iteration, error = %e, "Progress request failed");
            stats.failures += 1;
            return;
        }
    };

    let sample = ProgressSample {
        iteration,
        fraction,
        snapshot,
    };
    let buffered = sample.snapshot.clone();

    match progress.push(sample) {
        Ok(()) => {
            trace!(iteration, fraction, "Sample published");
            stats.published += 1;
            if let Some(snapshot) = buffered {
                snapshots.record(iteration, &snapshot);
            }
        }
        Err(e) => debug!(iteration, error = %e, "Sample dropped, reporter is gone"),
    }
}

fn enter(state: MonitorState) {
    debug!(role = %Role::Monitor, state = ?state, "State transition");
}

fn close_sampler<P: Sampler>(sampler: &mut P) {
    if let Err(e) = sampler.close() {
        warn!(error = %e, "Failed to close sampling context");
    }
}
