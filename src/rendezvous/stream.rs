//! Ordered progress stream from the monitor to the reporter
//!
//! An unbounded FIFO closed by a single end-of-stream marker. The producer
//! rate is bounded by the sampling interval, so no backpressure is applied.

use crate::error::{CoordinationError, CoordinationResult};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

/// One progress observation
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    /// Sampling iteration that produced this sample (0-based)
    pub iteration: u64,

    /// Progress fraction, expected in [0, 1]
    pub fraction: f64,

    /// Serialized snapshot taken in the same iteration, if any
    pub snapshot: Option<Arc<str>>,
}

impl ProgressSample {
    /// Create a sample without a snapshot
    pub fn new(iteration: u64, fraction: f64) -> Self {
        Self {
            iteration,
            fraction,
            snapshot: None,
        }
    }

    /// Attach a snapshot
    pub fn with_snapshot(mut self, snapshot: impl Into<Arc<str>>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }
}

/// Item travelling through the progress stream
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A progress sample
    Sample(ProgressSample),

    /// No more samples follow
    EndOfStream,
}

/// Create a connected progress stream
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (sender, receiver) = unbounded();
    (ProgressSender { sender }, ProgressReceiver { receiver })
}

/// Producing side, owned by the monitor
#[derive(Debug)]
pub struct ProgressSender {
    sender: Sender<ProgressEvent>,
}

impl ProgressSender {
    /// Publish a sample; never blocks
    pub fn push(&self, sample: ProgressSample) -> CoordinationResult<()> {
        self.sender
            .send(ProgressEvent::Sample(sample))
            .map_err(|_| CoordinationError::StreamClosed)
    }

    /// Publish the end-of-stream marker
    ///
    /// Consumes the sender, so the marker is sent exactly once and nothing
    /// can follow it.
    pub fn finish(self) -> CoordinationResult<()> {
        self.sender
            .send(ProgressEvent::EndOfStream)
            .map_err(|_| CoordinationError::StreamClosed)
    }
}

/// Consuming side, owned by whoever drives the reporter
#[derive(Debug)]
pub struct ProgressReceiver {
    receiver: Receiver<ProgressEvent>,
}

impl ProgressReceiver {
    /// Block until the next item is available
    ///
    /// Returns `StreamClosed` if the producer went away without finishing
    /// the stream.
    pub fn pop(&self) -> CoordinationResult<ProgressEvent> {
        self.receiver
            .recv()
            .map_err(|_| CoordinationError::StreamClosed)
    }

    /// Wait at most `timeout` for the next item
    ///
    /// `Ok(None)` means nothing arrived in time.
    pub fn pop_timeout(&self, timeout: Duration) -> CoordinationResult<Option<ProgressEvent>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(CoordinationError::StreamClosed),
        }
    }

    /// Number of items waiting to be popped
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Check if no items are waiting
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}
