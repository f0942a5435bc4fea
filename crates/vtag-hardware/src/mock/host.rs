//! Mock host services: interception registry, controllers, forwarded
//! connection and emulation switch.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vtag_core::{ApplicationId, NpadId};

use crate::traits::{ApplicationRegistry, ControllerProbe, EmulationProbe, ForwardConnection};

/// In-memory interception registry.
///
/// Clones share the same set, so a test can keep a clone to inspect what a
/// session registered.
///
/// # Examples
///
/// ```
/// use vtag_hardware::mock::MockRegistry;
/// use vtag_hardware::traits::ApplicationRegistry;
/// use vtag_core::ApplicationId;
///
/// let registry = MockRegistry::new();
/// let id = ApplicationId::new(0x0100_0000_0000_1000);
///
/// registry.register(id);
/// assert!(registry.is_registered(id));
///
/// registry.unregister(id);
/// assert!(registry.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    applications: Arc<Mutex<HashSet<ApplicationId>>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered applications.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no application is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ApplicationId>> {
        self.applications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ApplicationRegistry for MockRegistry {
    fn register(&self, id: ApplicationId) {
        self.lock().insert(id);
    }

    fn unregister(&self, id: ApplicationId) {
        self.lock().remove(&id);
    }

    fn is_registered(&self, id: ApplicationId) -> bool {
        self.lock().contains(&id)
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    player_1_connected: AtomicBool,
    scans: AtomicU64,
}

/// Mock controller probe.
///
/// Only the first player controller can be toggled; the handheld pair is
/// always reported connected.
#[derive(Debug, Clone)]
pub struct MockControllers {
    state: Arc<ControllerState>,
}

impl MockControllers {
    /// Create a probe with player 1 disconnected.
    pub fn new() -> (Self, MockControllersHandle) {
        let state = Arc::new(ControllerState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            MockControllersHandle { state },
        )
    }
}

impl ControllerProbe for MockControllers {
    fn is_connected(&self, npad_id: NpadId) -> bool {
        self.state.scans.fetch_add(1, Ordering::SeqCst);
        match npad_id {
            NpadId::PLAYER_1 => self.state.player_1_connected.load(Ordering::SeqCst),
            NpadId::HANDHELD => true,
            _ => false,
        }
    }
}

/// Handle for controlling a [`MockControllers`] probe.
#[derive(Debug, Clone)]
pub struct MockControllersHandle {
    state: Arc<ControllerState>,
}

impl MockControllersHandle {
    /// Attach or detach the first player controller.
    pub fn set_player_1_connected(&self, connected: bool) {
        self.state
            .player_1_connected
            .store(connected, Ordering::SeqCst);
    }

    /// Number of times the probe was queried.
    pub fn scan_count(&self) -> u64 {
        self.state.scans.load(Ordering::SeqCst)
    }
}

/// Mock forwarded connection recording how often it was closed.
#[derive(Debug)]
pub struct MockForward {
    closes: Arc<AtomicU32>,
}

impl MockForward {
    pub fn new() -> (Self, MockForwardHandle) {
        let closes = Arc::new(AtomicU32::new(0));
        (
            Self {
                closes: Arc::clone(&closes),
            },
            MockForwardHandle { closes },
        )
    }
}

impl ForwardConnection for MockForward {
    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handle for inspecting a [`MockForward`].
#[derive(Debug, Clone)]
pub struct MockForwardHandle {
    closes: Arc<AtomicU32>,
}

impl MockForwardHandle {
    /// Whether the connection was closed at least once.
    pub fn is_closed(&self) -> bool {
        self.close_count() > 0
    }

    /// Number of times the connection was closed.
    pub fn close_count(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Mock emulation switch.
#[derive(Debug, Clone)]
pub struct MockEmulation {
    enabled: Arc<AtomicBool>,
}

impl MockEmulation {
    /// Create a switch in the given position.
    pub fn new(enabled: bool) -> (Self, MockEmulationHandle) {
        let enabled = Arc::new(AtomicBool::new(enabled));
        (
            Self {
                enabled: Arc::clone(&enabled),
            },
            MockEmulationHandle { enabled },
        )
    }
}

impl EmulationProbe for MockEmulation {
    fn is_emulation_on(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// Handle for flipping a [`MockEmulation`] switch.
#[derive(Debug, Clone)]
pub struct MockEmulationHandle {
    enabled: Arc<AtomicBool>,
}

impl MockEmulationHandle {
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}
