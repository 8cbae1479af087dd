//! Private "work finished" marker from the worker to the monitor

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Create a connected stop signal pair
pub fn channel() -> (StopNotifier, StopListener) {
    let (sender, receiver) = bounded(1);
    (StopNotifier { sender }, StopListener { receiver })
}

/// Worker side of the stop signal
#[derive(Debug)]
pub struct StopNotifier {
    sender: Sender<()>,
}

impl StopNotifier {
    /// Tell the monitor the work has finished
    pub fn notify(self) {
        // The monitor may already be gone; nothing left to tell it then.
        let _ = self.sender.send(());
    }
}

/// Monitor side of the stop signal
///
/// A notifier dropped without `notify` (the worker died) reads as stopped
/// too, so the monitor can never outlive a vanished worker.
#[derive(Debug)]
pub struct StopListener {
    receiver: Receiver<()>,
}

impl StopListener {
    /// Non-blocking check of the stop marker
    pub fn poll(&self) -> StopState {
        match self.receiver.try_recv() {
            Ok(()) => StopState::Finished,
            Err(TryRecvError::Empty) => StopState::Running,
            Err(TryRecvError::Disconnected) => StopState::Vanished,
        }
    }

    /// Underlying receiver, for use in `select!`
    pub fn receiver(&self) -> &Receiver<()> {
        &self.receiver
    }
}

/// What the stop signal says about the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopState {
    /// Work still in progress
    Running,
    /// The worker reported that the work has finished
    Finished,
    /// The worker dropped the signal without reporting
    Vanished,
}
