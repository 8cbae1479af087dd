//! Coordinators for a watched run
//!
//! ```text
//!   caller                 worker thread                 monitor thread
//!   ──────                 ─────────────                 ──────────────
//!   spawn ───────────────▶ Connecting                    AwaitingRegistration
//!                          Registered ── handoff(id) ──▶   (connect sampler)
//!   armed.wait ◀────────── AwaitingStart ◀── armed ──────  armed.release
//!   [confirm]              (armed, start)                AwaitingStart (start)
//!   start.release ───────▶ Running                       Sampling ◀─┐ tick/stop
//!   drain stream ◀─────────────────────────── samples ──────────────┘
//!                          AwaitingShutdown ── stop ───▶ Flushing ── end of stream
//!   shutdown.release ────▶ Done                          Persisting (snapshots)
//!   join both                                            Done
//! ```

pub mod monitor;
pub mod run;
pub mod worker;

pub use monitor::{
    MonitorCoordinator, MonitorLinks, MonitorReport, MonitorSettings, MonitorState, StopReason,
};
pub use run::{ProgressRun, RunOutcome};
pub use worker::{WorkerCoordinator, WorkerLinks, WorkerReport, WorkerState};

use crate::error::{CoordinationError, Result, Role};
use std::thread::{self, JoinHandle};

/// A coordinator running on its own thread
pub struct Participant<T> {
    role: Role,
    handle: JoinHandle<Result<T>>,
}

impl<T: Send + 'static> Participant<T> {
    /// Spawn a named thread for `role`
    pub(crate) fn spawn<F>(role: Role, body: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(format!("progress-{}", role))
            .spawn(body)
            .map_err(|e| CoordinationError::SpawnFailed {
                role,
                reason: e.to_string(),
            })?;

        Ok(Self { role, handle })
    }

    /// Role of this participant
    pub fn role(&self) -> Role {
        self.role
    }

    /// Wait for the participant to finish
    pub fn join(self) -> Result<T> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(CoordinationError::Panicked { role: self.role }.into()),
        }
    }
}
