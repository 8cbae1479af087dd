//! Error types for progress-watcher
//!
//! This module defines the error hierarchy for a watched run:
//! - Setup failures (worker or monitor cannot establish its context)
//! - Workload failures (the observed work itself failed)
//! - Coordination failures (gates, handoff and progress stream)
//! - Snapshot persistence and post-processing failures
//! - Reporter and configuration errors
//!
//! Sampling failures have their own type but are never fatal: the monitor
//! logs and counts them, then keeps sampling.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The two participants of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Executes the workload
    Worker,
    /// Samples the workload's progress
    Monitor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Worker => f.write_str("worker"),
            Role::Monitor => f.write_str("monitor"),
        }
    }
}

/// Top-level error type for a watched run
#[derive(Error, Debug)]
pub enum ProgressError {
    /// A participant could not establish its context
    #[error("{role} setup failed: {source}")]
    Setup {
        role: Role,
        #[source]
        source: BackendError,
    },

    /// The workload itself failed
    #[error("Workload failed: {0}")]
    Workload(#[source] BackendError),

    /// Synchronization protocol violation or breakdown
    #[error("Coordination error: {0}")]
    Coordination(#[from] CoordinationError),

    /// Snapshot files could not be written
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The external image pipeline failed
    #[error("Post-processing failed: {0}")]
    PostProcessing(#[from] PipelineError),

    /// The progress display failed
    #[error("Reporter error: {0}")]
    Reporter(#[from] ReporterError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The interactive start confirmation was declined
    #[error("Run start was declined")]
    StartDeclined,
}

impl ProgressError {
    /// Check if this error happened while a participant was setting up
    pub fn is_setup(&self) -> bool {
        matches!(self, ProgressError::Setup { .. })
    }

    /// Check if this error is fallout from another participant failing
    ///
    /// Abandoned gates and lost registrations are consequences, never the
    /// root cause, and lose to any other error when a run is settled.
    pub fn is_secondary(&self) -> bool {
        matches!(
            self,
            ProgressError::Coordination(
                CoordinationError::GateAbandoned | CoordinationError::RegistrationLost
            )
        )
    }
}

/// Errors raised by workload and sampling backends
#[derive(Error, Debug)]
pub enum BackendError {
    /// Could not open the workload or sampling context
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// The workload command could not be launched
    #[error("Failed to launch '{command}': {reason}")]
    Launch { command: String, reason: String },

    /// The workload finished unsuccessfully
    #[error("'{command}' exited with {status}")]
    ExitStatus { command: String, status: String },

    /// A sampling request failed
    #[error("{request} request failed: {reason}")]
    Request {
        request: &'static str,
        reason: String,
    },

    /// A progress record could not be parsed
    #[error("Malformed progress record '{record}': {reason}")]
    MalformedRecord { record: String, reason: String },

    /// I/O error in a backend context
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Build a request failure
    pub fn request(request: &'static str, reason: impl Into<String>) -> Self {
        BackendError::Request {
            request,
            reason: reason.into(),
        }
    }
}

/// Errors of the synchronization primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// The run identifier was published more than once
    #[error("Run identifier was already published")]
    AlreadyPublished,

    /// The worker went away without publishing its identifier
    #[error("Worker exited before publishing its run identifier")]
    RegistrationLost,

    /// A gate was abandoned while a participant waited on it
    #[error("Rendezvous gate was abandoned")]
    GateAbandoned,

    /// The progress stream closed without an end-of-stream marker
    #[error("Progress stream closed before end of stream")]
    StreamClosed,

    /// A participant thread panicked
    #[error("{role} thread panicked")]
    Panicked { role: Role },

    /// A participant thread could not be spawned
    #[error("Failed to spawn {role} thread: {reason}")]
    SpawnFailed { role: Role, reason: String },
}

/// Snapshot persistence errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The output directory could not be created
    #[error("Failed to create output directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A snapshot file could not be written
    #[error("Failed to write snapshot '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Post-processing pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An external tool could not be started
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited unsuccessfully
    #[error("'{program}' exited with {status}: {output}")]
    Failed {
        program: String,
        status: String,
        output: String,
    },

    /// I/O error while shuffling frame files
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress display errors
#[derive(Error, Debug)]
pub enum ReporterError {
    /// Invalid indicatif template
    #[error("Invalid progress template: {0}")]
    Template(#[from] indicatif::style::TemplateError),

    /// Terminal I/O failed
    #[error("Terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reporter was used before `start`
    #[error("Reporter was not started")]
    NotStarted,

    /// The requested reporter variant was not compiled in
    #[error("The {0} reporter is not available in this build")]
    Unavailable(crate::reporter::ReporterKind),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Empty workload command
    #[error("Workload command must not be empty")]
    EmptyCommand,

    /// Invalid sampling interval
    #[error("Invalid interval {value}s: must be between {min}s and {max}s")]
    InvalidInterval { value: f64, min: f64, max: f64 },

    /// Invalid frame delay
    #[error("Invalid frame delay {0}: must be at least 1")]
    InvalidFrameDelay(u32),

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Graphical reporter requested but not compiled in
    #[error("Graphical reporter is not available (built without the 'tui' feature)")]
    GraphicalUnavailable,
}

/// Result type alias for ProgressError
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Result type alias for BackendError
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Result type alias for CoordinationError
pub type CoordinationResult<T> = std::result::Result<T, CoordinationError>;

/// Result type alias for ReporterError
pub type ReporterResult<T> = std::result::Result<T, ReporterError>;
