//! Virtual tag reader emulator.
//!
//! This crate contains the state machine and session logic for emulating a
//! near-field tag reader on top of a virtual tag source.
//!
//! - [`StateMachine`]: session/device states, guards and the status
//!   transition table, without locking or I/O
//! - [`Session`]: one client's reader session with its background status
//!   poller and event signals
//! - [`SessionManager`]: opens sessions while emulation is on
//! - [`EventSignal`] / [`SignalReceiver`]: auto-clearing event signals

pub mod config;
pub mod manager;
mod poller;
pub mod session;
mod shared;
pub mod signal;
pub mod state_machine;

pub use config::SessionConfig;
pub use manager::SessionManager;
pub use session::{HostServices, Session};
pub use signal::{EventSignal, SignalKind, SignalReceiver};
pub use state_machine::{
    MachineState, StateMachine, StateMachineBuilder, StateTransition, TransitionCause,
};
