//! Workload and sampling backends
//!
//! The coordinators only know the two contracts defined here:
//!
//! - [`Workload`] opens a [`WorkloadSession`] that names itself with a
//!   [`RunIdentifier`] and executes the command synchronously.
//! - [`SamplingSource`] opens a [`Sampler`] that, given that identifier,
//!   reports a progress fraction and optionally a serialized snapshot.
//!
//! Each context is opened on, and owned by, the thread that uses it, so
//! sessions and samplers need not be `Send` themselves.

pub mod process;

pub use process::{ProcessSampler, ProcessSession, ProcessSource, ProcessWorkload};

use crate::error::BackendResult;
use std::fmt;

/// Opaque handle naming the in-flight workload instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunIdentifier(String);

impl RunIdentifier {
    /// Wrap an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Factory for the worker's execution context
pub trait Workload: Send + 'static {
    /// Session type opened by this workload
    type Session: WorkloadSession;

    /// Establish the execution context
    fn connect(&self) -> BackendResult<Self::Session>;
}

/// Execution context owned by the worker
pub trait WorkloadSession {
    /// Identifier the monitor uses to address this session
    fn identifier(&self) -> RunIdentifier;

    /// Run the workload to completion
    fn execute(&mut self, command: &str) -> BackendResult<()>;

    /// Release the context
    fn close(&mut self) -> BackendResult<()> {
        Ok(())
    }
}

/// Factory for the monitor's sampling context
pub trait SamplingSource: Send + 'static {
    /// Sampler type opened by this source
    type Sampler: Sampler;

    /// Establish the sampling context
    fn connect(&self) -> BackendResult<Self::Sampler>;
}

/// Sampling context owned by the monitor
pub trait Sampler {
    /// Refresh the progress information for the given run
    fn request_update(&mut self, identifier: &RunIdentifier) -> BackendResult<()>;

    /// Snapshot captured by the last update, if any
    fn request_snapshot(&mut self) -> BackendResult<Option<String>>;

    /// Progress fraction captured by the last update
    fn request_fraction(&mut self) -> BackendResult<f64>;

    /// File extension for persisted snapshots
    fn snapshot_extension(&self) -> &str {
        "dot"
    }

    /// Release the context
    fn close(&mut self) -> BackendResult<()> {
        Ok(())
    }
}
