//! One-shot run identifier handoff from the worker to the monitor

use crate::backend::RunIdentifier;
use crate::error::{CoordinationError, CoordinationResult};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};

/// Create a connected handoff pair
pub fn channel() -> (HandoffSender, HandoffReceiver) {
    let (sender, receiver) = bounded(1);
    (
        HandoffSender {
            sender,
            published: AtomicBool::new(false),
        },
        HandoffReceiver { receiver },
    )
}

/// Publishing side, owned by the worker
#[derive(Debug)]
pub struct HandoffSender {
    sender: Sender<RunIdentifier>,
    published: AtomicBool,
}

impl HandoffSender {
    /// Publish the run identifier
    ///
    /// Only the first call succeeds; any further call is a protocol
    /// violation and returns `AlreadyPublished`.
    pub fn publish(&self, identifier: RunIdentifier) -> CoordinationResult<()> {
        if self.published.swap(true, Ordering::SeqCst) {
            return Err(CoordinationError::AlreadyPublished);
        }

        // A gone receiver means the monitor already failed; its own error
        // is what the run reports.
        let _ = self.sender.send(identifier);
        Ok(())
    }

    /// Check if the identifier has been published
    pub fn is_published(&self) -> bool {
        self.published.load(Ordering::SeqCst)
    }
}

/// Receiving side, owned by the monitor
#[derive(Debug)]
pub struct HandoffReceiver {
    receiver: Receiver<RunIdentifier>,
}

impl HandoffReceiver {
    /// Block until the worker publishes its identifier
    ///
    /// Consumes the receiver: the identifier is read exactly once. Returns
    /// `RegistrationLost` if the worker dropped its sender without
    /// publishing.
    pub fn receive(self) -> CoordinationResult<RunIdentifier> {
        self.receiver
            .recv()
            .map_err(|_| CoordinationError::RegistrationLost)
    }
}
