//! Synchronization primitives shared by the worker, the monitor and the
//! caller driving the reporter
//!
//! ```text
//!            ┌──────────── handoff (RunIdentifier, once) ───────────┐
//!            │                                                      ▼
//!      ┌──────────┐        stop (work finished, once)        ┌───────────┐
//!      │  Worker  │ ───────────────────────────────────────▶ │  Monitor  │
//!      └────┬─────┘                                          └─────┬─────┘
//!           │  waits: armed, start, shutdown gates                 │ stream
//!           │                                                      ▼
//!           │                                              ┌──────────────┐
//!           └──────────────── gates released by ─────────▶ │    Caller    │
//!                                                          │  (reporter)  │
//!                                                          └──────────────┘
//! ```
//!
//! Every primitive is constructed per run and handed to the participants
//! that use it. Nothing here is global.

pub mod gate;
pub mod handoff;
pub mod stop;
pub mod stream;

pub use gate::{AbandonOnDrop, RendezvousGate};
pub use handoff::{HandoffReceiver, HandoffSender};
pub use stop::{StopListener, StopNotifier, StopState};
pub use stream::{ProgressEvent, ProgressReceiver, ProgressSample, ProgressSender};
