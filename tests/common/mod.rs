//! Scripted backends and a recording reporter for integration tests

#![allow(dead_code)]

use progress_watcher::backend::{RunIdentifier, Sampler, SamplingSource, Workload, WorkloadSession};
use progress_watcher::error::{BackendError, BackendResult, ReporterResult};
use progress_watcher::Reporter;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Workload that sleeps for a fixed time
#[derive(Clone)]
pub struct ScriptedWorkload {
    pub duration: Duration,
    pub fail: bool,
    pub connect_fail: bool,
    pub executions: Arc<AtomicUsize>,
}

impl ScriptedWorkload {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            fail: false,
            connect_fail: false,
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(duration: Duration) -> Self {
        Self {
            fail: true,
            ..Self::new(duration)
        }
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSession {
    duration: Duration,
    fail: bool,
    executions: Arc<AtomicUsize>,
}

impl Workload for ScriptedWorkload {
    type Session = ScriptedSession;

    fn connect(&self) -> BackendResult<ScriptedSession> {
        if self.connect_fail {
            return Err(BackendError::Connect("workload backend unavailable".into()));
        }
        Ok(ScriptedSession {
            duration: self.duration,
            fail: self.fail,
            executions: Arc::clone(&self.executions),
        })
    }
}

impl WorkloadSession for ScriptedSession {
    fn identifier(&self) -> RunIdentifier {
        RunIdentifier::new("scripted-run")
    }

    fn execute(&mut self, command: &str) -> BackendResult<()> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.duration);
        if self.fail {
            return Err(BackendError::ExitStatus {
                command: command.to_string(),
                status: "exit status: 3".into(),
            });
        }
        Ok(())
    }
}

/// Sampling source whose fraction grows by 0.1 per update
#[derive(Clone, Default)]
pub struct ScriptedSource {
    /// Updates that return a snapshot, counting from one
    pub snapshot_limit: usize,
    pub connect_fail: bool,
    /// Update numbers (from one) that fail
    pub failing_updates: HashSet<usize>,
    pub updates: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshots(limit: usize) -> Self {
        Self {
            snapshot_limit: limit,
            ..Self::default()
        }
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

pub struct ScriptedSampler {
    source: ScriptedSource,
    current: usize,
}

impl SamplingSource for ScriptedSource {
    type Sampler = ScriptedSampler;

    fn connect(&self) -> BackendResult<ScriptedSampler> {
        if self.connect_fail {
            return Err(BackendError::Connect("sampling backend unavailable".into()));
        }
        Ok(ScriptedSampler {
            source: self.clone(),
            current: 0,
        })
    }
}

impl Sampler for ScriptedSampler {
    fn request_update(&mut self, identifier: &RunIdentifier) -> BackendResult<()> {
        assert_eq!(identifier.as_str(), "scripted-run");
        self.current = self.source.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if self.source.failing_updates.contains(&self.current) {
            return Err(BackendError::request("update", "scripted failure"));
        }
        Ok(())
    }

    fn request_snapshot(&mut self) -> BackendResult<Option<String>> {
        if self.current <= self.source.snapshot_limit {
            Ok(Some(format!("digraph s{} {{ a -> b }}", self.current)))
        } else {
            Ok(None)
        }
    }

    fn request_fraction(&mut self) -> BackendResult<f64> {
        Ok((self.current as f64 / 10.0).min(1.0))
    }
}

/// What a reporter was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum ReporterCall {
    Start(String),
    Progress(f64),
    Stop,
}

/// Reporter recording every call except `idle`
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub calls: Vec<ReporterCall>,
    pub idles: usize,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fractions(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                ReporterCall::Progress(f) => Some(*f),
                _ => None,
            })
            .collect()
    }

    pub fn started(&self) -> bool {
        matches!(self.calls.first(), Some(ReporterCall::Start(_)))
    }

    pub fn stopped(&self) -> bool {
        matches!(self.calls.last(), Some(ReporterCall::Stop))
    }
}

impl Reporter for RecordingReporter {
    fn start(&mut self, description: &str) -> ReporterResult<()> {
        self.calls.push(ReporterCall::Start(description.to_string()));
        Ok(())
    }

    fn on_progress(&mut self, fraction: f64) -> ReporterResult<()> {
        self.calls.push(ReporterCall::Progress(fraction));
        Ok(())
    }

    fn idle(&mut self) -> ReporterResult<()> {
        self.idles += 1;
        Ok(())
    }

    fn stop(&mut self) -> ReporterResult<()> {
        self.calls.push(ReporterCall::Stop);
        Ok(())
    }
}

/// Confirmation that must never be asked
pub fn no_confirm() -> std::io::Result<bool> {
    panic!("confirmation requested for a non-interactive run")
}
