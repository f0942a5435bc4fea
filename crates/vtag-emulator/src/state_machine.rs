//! Reader session state machine.
//!
//! This module holds the pure (lock-free, I/O-free) part of a reader session:
//! the pair of session and device states, the guards every client operation
//! checks, and the table translating tag status samples into device state
//! transitions. Locking and event signalling are layered on top of it by
//! [`Session`](crate::Session).
//!
//! # States
//!
//! The session state tracks whether the client finished the initialize
//! handshake:
//! - `NonInitialized` → `Initialized` on initialize
//! - any → `NonInitialized` on finalize
//!
//! The device state tracks the tag-presence lifecycle:
//! - `Unavailable`: before the first initialize
//! - `Initialized`: initialized, not searching
//! - `SearchingForTag`: the client asked to detect tags
//! - `TagFound`: a tag arrived while searching
//! - `TagMounted`: the client mounted the tag
//! - `TagRemoved`: reserved by the protocol; accepted by start detection
//! - `Finalized`: after finalize
//!
//! # Status Transitions
//!
//! | Device state | Sample | New device state | Signal |
//! |---|---|---|---|
//! | `SearchingForTag` | `Connected` | `TagFound` | activate |
//! | `TagFound` | `Disconnected` | `SearchingForTag` | deactivate |
//! | `TagMounted` | `Disconnected` | `SearchingForTag` | deactivate |
//! | any other | any | unchanged | none |
//!
//! # Examples
//!
//! ```
//! use vtag_emulator::{SignalKind, StateMachine};
//! use vtag_core::{DeviceState, TagStatus};
//!
//! let mut machine = StateMachine::new();
//! machine.initialize();
//! machine.start_detection().unwrap();
//!
//! assert_eq!(machine.apply_status(TagStatus::Connected), Some(SignalKind::Activate));
//! assert_eq!(machine.device_state(), DeviceState::TagFound);
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use vtag_core::constants::DEFAULT_HISTORY_SIZE;
use vtag_core::{DeviceState, Error, NotReadyReason, Result, SessionState, TagStatus};

use crate::signal::SignalKind;

/// Device states from which detection may be started.
const DETECTION_START_STATES: &[DeviceState] = &[DeviceState::Initialized, DeviceState::TagRemoved];

/// Session and device state observed together.
///
/// Both halves always come from the same instant; there is no way to read
/// one without the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MachineState {
    pub session: SessionState,
    pub device: DeviceState,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.device)
    }
}

/// What drove a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionCause {
    Initialize,
    Finalize,
    StartDetection,
    StopDetection,
    Mount,
    Unmount,
    Status(TagStatus),
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionCause::Initialize => write!(f, "Initialize"),
            TransitionCause::Finalize => write!(f, "Finalize"),
            TransitionCause::StartDetection => write!(f, "StartDetection"),
            TransitionCause::StopDetection => write!(f, "StopDetection"),
            TransitionCause::Mount => write!(f, "Mount"),
            TransitionCause::Unmount => write!(f, "Unmount"),
            TransitionCause::Status(status) => write!(f, "Status({status})"),
        }
    }
}

/// Represents a single state transition with timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    /// The state transitioned from.
    pub from: MachineState,

    /// The state transitioned to.
    pub to: MachineState,

    /// The operation or sample that caused it.
    pub cause: TransitionCause,

    /// When the transition occurred.
    pub timestamp: Instant,
}

impl StateTransition {
    fn new(from: MachineState, to: MachineState, cause: TransitionCause) -> Self {
        Self {
            from,
            to,
            cause,
            timestamp: Instant::now(),
        }
    }

    /// Get the duration since this transition occurred.
    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Session/device state machine of one reader session.
///
/// Every guard failure returns before anything is modified, so a refused
/// operation never leaves a partial transition behind.
///
/// # Thread Safety
///
/// This struct is not thread-safe. [`Session`](crate::Session)
/// keeps it behind a single `std::sync::Mutex` so both states are always
/// read and written together.
#[derive(Debug)]
pub struct StateMachine {
    state: MachineState,
    history: VecDeque<StateTransition>,
    history_size: usize,
}

impl StateMachine {
    /// Create a machine in `NonInitialized`/`Unavailable`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for constructing a machine in an arbitrary state.
    ///
    /// # Examples
    ///
    /// ```
    /// use vtag_emulator::StateMachine;
    /// use vtag_core::{DeviceState, SessionState};
    ///
    /// let machine = StateMachine::builder()
    ///     .with_session_state(SessionState::Initialized)
    ///     .with_device_state(DeviceState::TagMounted)
    ///     .build();
    ///
    /// assert_eq!(machine.device_state(), DeviceState::TagMounted);
    /// ```
    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::default()
    }

    /// Current session and device state.
    pub fn snapshot(&self) -> MachineState {
        self.state
    }

    pub fn session_state(&self) -> SessionState {
        self.state.session
    }

    pub fn device_state(&self) -> DeviceState {
        self.state.device
    }

    /// Recorded transitions, oldest first.
    pub fn history(&self) -> &VecDeque<StateTransition> {
        &self.history
    }

    /// Get the last `count` transitions, oldest first.
    pub fn last_transitions(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.history.len().saturating_sub(count);
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Fail unless the session is initialized.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotReady` if the client has not initialized the session.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.state.session.is_initialized() {
            return Err(Error::not_ready(NotReadyReason::SessionNotInitialized));
        }
        Ok(())
    }

    /// Fail unless the session is initialized and the device is in one of
    /// `allowed`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotReady` if either check fails.
    pub fn ensure_device_in(&self, allowed: &[DeviceState]) -> Result<()> {
        self.ensure_initialized()?;
        if !allowed.contains(&self.state.device) {
            return Err(Error::not_ready(NotReadyReason::DeviceState {
                state: self.state.device,
            }));
        }
        Ok(())
    }

    /// Complete the initialize handshake. Always succeeds.
    pub fn initialize(&mut self) -> StateTransition {
        self.change_to(
            SessionState::Initialized,
            DeviceState::Initialized,
            TransitionCause::Initialize,
        )
    }

    /// Tear down the handshake. Always succeeds.
    pub fn finalize(&mut self) -> StateTransition {
        self.change_to(
            SessionState::NonInitialized,
            DeviceState::Finalized,
            TransitionCause::Finalize,
        )
    }

    /// Start searching for a tag.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotReady` unless the session is initialized and the
    /// device is `Initialized` or `TagRemoved`.
    pub fn start_detection(&mut self) -> Result<StateTransition> {
        self.ensure_device_in(DETECTION_START_STATES)?;
        Ok(self.change_device(DeviceState::SearchingForTag, TransitionCause::StartDetection))
    }

    /// Stop searching. Resets the device to `Initialized` from any phase,
    /// including a mounted tag.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotReady` if the session is not initialized.
    pub fn stop_detection(&mut self) -> Result<StateTransition> {
        self.ensure_initialized()?;
        Ok(self.change_device(DeviceState::Initialized, TransitionCause::StopDetection))
    }

    /// Mount the tag. Tag presence is not checked.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotReady` if the session is not initialized.
    pub fn mount(&mut self) -> Result<StateTransition> {
        self.ensure_initialized()?;
        Ok(self.change_device(DeviceState::TagMounted, TransitionCause::Mount))
    }

    /// Unmount the tag. The tag stays present, so the device goes to
    /// `TagFound` rather than back to searching.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotReady` if the session is not initialized.
    pub fn unmount(&mut self) -> Result<StateTransition> {
        self.ensure_initialized()?;
        Ok(self.change_device(DeviceState::TagFound, TransitionCause::Unmount))
    }

    /// Feed one status sample through the transition table.
    ///
    /// Returns the signal to raise if the sample caused a transition. The
    /// state is already committed when this returns.
    pub fn apply_status(&mut self, status: TagStatus) -> Option<SignalKind> {
        let (next, signal) = match (status, self.state.device) {
            (TagStatus::Connected, DeviceState::SearchingForTag) => {
                (DeviceState::TagFound, SignalKind::Activate)
            }
            (TagStatus::Disconnected, DeviceState::TagFound | DeviceState::TagMounted) => {
                (DeviceState::SearchingForTag, SignalKind::Deactivate)
            }
            _ => return None,
        };

        self.change_device(next, TransitionCause::Status(status));
        Some(signal)
    }

    fn change_device(&mut self, device: DeviceState, cause: TransitionCause) -> StateTransition {
        self.change_to(self.state.session, device, cause)
    }

    fn change_to(
        &mut self,
        session: SessionState,
        device: DeviceState,
        cause: TransitionCause,
    ) -> StateTransition {
        let from = self.state;
        self.state = MachineState { session, device };

        let transition = StateTransition::new(from, self.state, cause);
        self.add_to_history(transition.clone());
        transition
    }

    fn add_to_history(&mut self, transition: StateTransition) {
        self.history.push_back(transition);
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing `StateMachine` instances in a chosen state.
#[derive(Debug)]
pub struct StateMachineBuilder {
    session: SessionState,
    device: DeviceState,
    history_size: usize,
}

impl StateMachineBuilder {
    pub fn with_session_state(mut self, session: SessionState) -> Self {
        self.session = session;
        self
    }

    pub fn with_device_state(mut self, device: DeviceState) -> Self {
        self.device = device;
        self
    }

    /// Set how many transitions are kept.
    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    pub fn build(self) -> StateMachine {
        StateMachine {
            state: MachineState {
                session: self.session,
                device: self.device,
            },
            history: VecDeque::with_capacity(self.history_size),
            history_size: self.history_size,
        }
    }
}

impl Default for StateMachineBuilder {
    fn default() -> Self {
        Self {
            session: SessionState::NonInitialized,
            device: DeviceState::Unavailable,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}
