//! Worker coordinator
//!
//! Owns the workload context for the whole run:
//! - Opens the context and publishes its identifier to the monitor
//! - Waits until the monitor is armed and the start gate opens
//! - Runs the workload synchronously
//! - Raises the stop marker (also on failure) and waits for shutdown

use super::Participant;
use crate::backend::{RunIdentifier, Workload, WorkloadSession};
use crate::error::{ProgressError, Result, Role};
use crate::rendezvous::{HandoffSender, RendezvousGate, StopNotifier};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Worker state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Registered,
    AwaitingStart,
    Running,
    AwaitingShutdown,
    Done,
}

/// Channels and gates the worker participates in
pub struct WorkerLinks {
    /// Identifier handoff to the monitor
    pub handoff: HandoffSender,

    /// Released by the monitor once its sampling context is ready
    pub armed: Arc<RendezvousGate>,

    /// Start gate shared with the monitor
    pub start: Arc<RendezvousGate>,

    /// Released once the reporter has drained the stream
    pub shutdown: Arc<RendezvousGate>,

    /// Work-finished marker for the monitor
    pub stop: StopNotifier,
}

/// What the worker reports after a successful run
#[derive(Debug, Clone)]
pub struct WorkerReport {
    /// Identifier of the workload context
    pub identifier: RunIdentifier,

    /// Time spent executing the workload
    pub workload_elapsed: Duration,
}

/// Runs the workload and walks the worker side of the protocol
pub struct WorkerCoordinator<W: Workload> {
    workload: W,
    command: String,
    links: WorkerLinks,
}

impl<W: Workload> WorkerCoordinator<W> {
    /// Create a worker for `command`
    pub fn new(workload: W, command: impl Into<String>, links: WorkerLinks) -> Self {
        Self {
            workload,
            command: command.into(),
            links,
        }
    }

    /// Run the worker on its own thread
    pub fn spawn(self) -> Result<Participant<WorkerReport>> {
        Participant::spawn(Role::Worker, move || self.run())
    }

    /// Walk the worker state machine to completion
    pub fn run(self) -> Result<WorkerReport> {
        let WorkerCoordinator {
            workload,
            command,
            links,
        } = self;
        let WorkerLinks {
            handoff,
            armed,
            start,
            shutdown,
            stop,
        } = links;

        enter(WorkerState::Connecting);
        let mut session = workload.connect().map_err(|source| ProgressError::Setup {
            role: Role::Worker,
            source,
        })?;

        let identifier = session.identifier();
        info!(identifier = %identifier, "Workload context opened");

        enter(WorkerState::Registered);
        if let Err(e) = handoff.publish(identifier.clone()) {
            close_session(&mut session);
            return Err(e.into());
        }

        enter(WorkerState::AwaitingStart);
        if let Err(e) = armed.wait().and_then(|()| start.wait()) {
            debug!("Start gate abandoned, workload not executed");
            close_session(&mut session);
            return Err(e.into());
        }

        enter(WorkerState::Running);
        info!(identifier = %identifier, "Workload executing");
        let started = Instant::now();
        let outcome = session.execute(&command);
        let workload_elapsed = started.elapsed();

        match &outcome {
            Ok(()) => info!(
                elapsed_ms = workload_elapsed.as_millis() as u64,
                "Workload finished"
            ),
            Err(e) => warn!(error = %e, "Workload failed"),
        }

        // The monitor must be able to stop whatever the outcome was.
        enter(WorkerState::AwaitingShutdown);
        stop.notify();
        let shutdown_result = shutdown.wait();

        enter(WorkerState::Done);
        close_session(&mut session);

        outcome.map_err(ProgressError::Workload)?;
        shutdown_result?;

        Ok(WorkerReport {
            identifier,
            workload_elapsed,
        })
    }
}

fn enter(state: WorkerState) {
    debug!(role = %Role::Worker, state = ?state, "State transition");
}

fn close_session<S: WorkloadSession>(session: &mut S) {
    if let Err(e) = session.close() {
        warn!(error = %e, "Failed to close workload context");
    }
}
