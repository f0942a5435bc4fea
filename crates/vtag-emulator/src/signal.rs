//! Auto-clearing event signals.
//!
//! A session owns one [`EventSignal`] per event kind. Clients attach by
//! taking a [`SignalReceiver`]; every receiver of a signal shares its flag.
//! Raising sets the flag and wakes one waiter, and a successful wait clears
//! it again. Raises that happen while the flag is already set coalesce.

use std::fmt;
use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// The events a session can signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// A tag was detected while searching.
    Activate,
    /// A found or mounted tag went away.
    Deactivate,
    /// Controller availability changed.
    AvailabilityChange,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Activate => write!(f, "Activate"),
            SignalKind::Deactivate => write!(f, "Deactivate"),
            SignalKind::AvailabilityChange => write!(f, "AvailabilityChange"),
        }
    }
}

#[derive(Debug, Default)]
struct SignalSlot {
    raised: AtomicBool,
    notify: Notify,
}

/// Sending side of an auto-clearing signal.
#[derive(Debug, Clone)]
pub struct EventSignal {
    kind: SignalKind,
    slot: Arc<SignalSlot>,
}

impl EventSignal {
    pub fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            slot: Arc::new(SignalSlot::default()),
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// Set the flag and wake one waiter.
    pub fn raise(&self) {
        self.slot.raised.store(true, Ordering::SeqCst);
        self.slot.notify.notify_one();
    }

    /// Get a receiver sharing this signal's flag.
    pub fn subscribe(&self) -> SignalReceiver {
        SignalReceiver {
            kind: self.kind,
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Waiting side of an auto-clearing signal.
///
/// # Examples
///
/// ```
/// use vtag_emulator::{EventSignal, SignalKind};
///
/// # tokio_test_block_on(async {
/// let signal = EventSignal::new(SignalKind::Activate);
/// let receiver = signal.subscribe();
///
/// signal.raise();
/// signal.raise();
/// receiver.wait().await;
///
/// // Both raises were consumed by the one wait
/// assert!(!receiver.try_consume());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SignalReceiver {
    kind: SignalKind,
    slot: Arc<SignalSlot>,
}

impl SignalReceiver {
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// Whether the signal is raised and not yet consumed.
    pub fn is_raised(&self) -> bool {
        self.slot.raised.load(Ordering::SeqCst)
    }

    /// Clear the flag without waiting. Returns whether it was raised.
    pub fn try_consume(&self) -> bool {
        self.slot.raised.swap(false, Ordering::SeqCst)
    }

    /// Wait until the signal is raised, then clear it.
    ///
    /// Returns immediately if the signal was raised before the call.
    pub async fn wait(&self) {
        loop {
            let mut notified = pin!(self.slot.notify.notified());
            // Register before checking the flag so a raise in between is not lost
            notified.as_mut().enable();

            if self.try_consume() {
                return;
            }

            notified.await;
        }
    }
}
