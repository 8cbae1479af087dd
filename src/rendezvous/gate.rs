//! Rendezvous gate
//!
//! A latch that holds any number of participants until it is released.
//! Participants do not have to arrive together and their count is not fixed
//! up front: whoever calls `wait` before the release blocks, whoever calls it
//! after passes straight through. Releasing twice is harmless, so each
//! participant can be released independently.

use crate::error::{CoordinationError, CoordinationResult};
use parking_lot::{Condvar, Mutex};
use std::ops::Deref;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Closed,
    Released,
    Abandoned,
}

/// Gate that blocks callers until it is released
#[derive(Debug)]
pub struct RendezvousGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl RendezvousGate {
    /// Create a closed gate
    pub fn new() -> Self {
        Self::with_state(GateState::Closed)
    }

    /// Create a gate that never blocks
    pub fn pre_released() -> Self {
        Self::with_state(GateState::Released)
    }

    fn with_state(state: GateState) -> Self {
        Self {
            state: Mutex::new(state),
            changed: Condvar::new(),
        }
    }

    /// Block until the gate is released
    ///
    /// Returns `GateAbandoned` if the gate was abandoned instead.
    pub fn wait(&self) -> CoordinationResult<()> {
        let mut state = self.state.lock();
        while *state == GateState::Closed {
            self.changed.wait(&mut state);
        }

        match *state {
            GateState::Released => Ok(()),
            _ => Err(CoordinationError::GateAbandoned),
        }
    }

    /// Release every current and future waiter
    pub fn release(&self) {
        let mut state = self.state.lock();
        if *state == GateState::Closed {
            *state = GateState::Released;
            self.changed.notify_all();
        }
    }

    /// Wake every waiter with an error
    ///
    /// Has no effect on a gate that was already released.
    pub fn abandon(&self) {
        let mut state = self.state.lock();
        if *state == GateState::Closed {
            *state = GateState::Abandoned;
            self.changed.notify_all();
        }
    }

    /// Check if the gate has been released
    pub fn is_released(&self) -> bool {
        *self.state.lock() == GateState::Released
    }
}

impl Default for RendezvousGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared gate that is abandoned when the guard goes out of scope
///
/// Releasing through the guard first makes the abandon a no-op.
#[derive(Debug)]
pub struct AbandonOnDrop(Arc<RendezvousGate>);

impl AbandonOnDrop {
    pub fn new(gate: Arc<RendezvousGate>) -> Self {
        Self(gate)
    }
}

impl Deref for AbandonOnDrop {
    type Target = RendezvousGate;

    fn deref(&self) -> &RendezvousGate {
        &self.0
    }
}

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        self.0.abandon();
    }
}
