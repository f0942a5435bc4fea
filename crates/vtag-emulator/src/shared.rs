//! State shared between a session and its status poller.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use vtag_core::TagStatus;

use crate::signal::{EventSignal, SignalKind};
use crate::state_machine::StateMachine;

/// The three signals of a session.
#[derive(Debug)]
pub(crate) struct SessionSignals {
    pub(crate) activate: EventSignal,
    pub(crate) deactivate: EventSignal,
    pub(crate) availability_change: EventSignal,
}

impl SessionSignals {
    fn new() -> Self {
        Self {
            activate: EventSignal::new(SignalKind::Activate),
            deactivate: EventSignal::new(SignalKind::Deactivate),
            availability_change: EventSignal::new(SignalKind::AvailabilityChange),
        }
    }

    pub(crate) fn get(&self, kind: SignalKind) -> &EventSignal {
        match kind {
            SignalKind::Activate => &self.activate,
            SignalKind::Deactivate => &self.deactivate,
            SignalKind::AvailabilityChange => &self.availability_change,
        }
    }
}

/// Machine and signals of one session.
///
/// Both states live in the one mutex-guarded [`StateMachine`], so every
/// reader sees a consistent pair. No critical section awaits, so the lock
/// is a blocking one and is never held across an `.await`.
#[derive(Debug)]
pub(crate) struct SessionShared {
    machine: Mutex<StateMachine>,
    stopped: CancellationToken,
    pub(crate) signals: SessionSignals,
}

impl SessionShared {
    pub(crate) fn new(machine: StateMachine) -> Self {
        Self {
            machine: Mutex::new(machine),
            stopped: CancellationToken::new(),
            signals: SessionSignals::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, StateMachine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Token cancelled once status samples must no longer be handled.
    pub(crate) fn stop_token(&self) -> &CancellationToken {
        &self.stopped
    }

    /// Refuse every later status sample and wait for one already being
    /// handled to finish.
    ///
    /// After this returns, no sample changes the state or raises a signal.
    pub(crate) fn stop(&self) {
        self.stopped.cancel();
        drop(self.lock());
    }

    /// Run one status sample through the transition table.
    ///
    /// The signal is raised while the lock is still held, after the new
    /// state is stored, so a woken waiter always observes the new state.
    /// Samples arriving after [`SessionShared::stop`] are ignored.
    pub(crate) fn handle_status(&self, status: TagStatus) -> Option<SignalKind> {
        let mut machine = self.lock();
        if self.stopped.is_cancelled() {
            debug!(%status, "Session stopped, status sample ignored");
            return None;
        }
        let from = machine.device_state();

        let signal = machine.apply_status(status)?;
        self.signals.get(signal).raise();

        debug!(
            %status,
            %from,
            to = %machine.device_state(),
            %signal,
            "Tag status transition"
        );
        Some(signal)
    }
}
