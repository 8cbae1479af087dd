//! progress-watcher - Live progress display for long-running commands
//!
//! Runs a workload command on one thread while a second thread samples its
//! progress on a fixed interval, and renders the samples on the calling
//! thread as a text bar or a full-screen gauge.
//!
//! # Features
//!
//! - **Two coordinated participants**: the worker and the monitor each own
//!   their backend context and meet only through channels and gates.
//!
//! - **Ordered progress stream**: samples arrive in order and the stream is
//!   always terminated by an end marker, even when the workload fails.
//!
//! - **Snapshots**: optional point-in-time views of the workload, written as
//!   numbered files once the run is over and assembled into an animation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   handoff(id)   ┌──────────────────────┐
//! │    Worker thread     │ ──────────────▶ │    Monitor thread    │
//! │  WorkloadSession     │                 │  Sampler             │
//! │  execute(command)    │ ──── stop ────▶ │  tick: update,       │
//! └──────────┬───────────┘                 │  snapshot, fraction  │
//!            │                             └──────────┬───────────┘
//!            │   armed / start / shutdown gates       │ progress stream
//!            ▼                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Calling thread                           │
//! │  confirm start ─▶ drain stream into Reporter ─▶ release shutdown │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//!                 NNNN_snapshot.dot ─▶ snapshot.gif
//! ```
//!
//! # Example
//!
//! ```bash
//! # Text bar, a sample every 200ms
//! progress-watcher -c './import.sh' -i 0.2
//!
//! # Full-screen gauge with snapshots, waiting for confirmation
//! progress-watcher -c './import.sh' -g -d -W -o frames/
//! ```
//!
//! The command reports through the file named by `$PROGRESS_FILE`, one
//! record per line: either a bare fraction or
//! `{"fraction": 0.42, "snapshot": "digraph {...}"}`.

pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod rendezvous;
pub mod reporter;
pub mod snapshot;
pub mod summary;

pub use backend::{RunIdentifier, Sampler, SamplingSource, Workload, WorkloadSession};
pub use config::{CliArgs, RunConfig};
pub use coordinator::{ProgressRun, RunOutcome, StopReason};
pub use error::{ProgressError, Result};
pub use reporter::{Reporter, ReporterKind};
