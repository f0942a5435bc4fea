//! Emulated reader session.
//!
//! A [`Session`] is what one client application talks to. It owns the
//! state machine (behind one mutex), the three event signals and the
//! status poller, and exposes the reader operations as async methods.
//!
//! Every operation except the state queries first requires the session to
//! be initialized. Refusals are reported as [`Error::NotReady`], whatever
//! the precise reason, and never modify any state.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vtag_emulator::{HostServices, Session, SessionConfig};
//! use vtag_hardware::mock::{MockControllers, MockForward, MockRegistry, MockTagSource};
//! use vtag_core::{ApplicationId, ClientProcess, DeviceState};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> vtag_core::Result<()> {
//! let (source, _tags) = MockTagSource::new();
//! let (controllers, _pads) = MockControllers::new();
//! let services = HostServices::new(Arc::new(source), Arc::new(MockRegistry::new()), Arc::new(controllers));
//! let (forward, _forward) = MockForward::new();
//!
//! let session = Session::open(
//!     ApplicationId::new(0x0100_0000_0000_1000),
//!     services,
//!     Box::new(forward),
//!     SessionConfig::default(),
//! )?;
//!
//! session.initialize(ClientProcess::default()).await;
//! let handle = session.list_devices().await?[0];
//! session.start_detection(handle).await?;
//! assert_eq!(session.get_device_state(handle).await, DeviceState::SearchingForTag);
//!
//! session.close().await;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use vtag_core::constants::LISTED_DEVICE_COUNT;
use vtag_core::{
    ApplicationId, ClientProcess, CommonInfo, DeviceHandle, DeviceState, Error, ModelInfo,
    NotReadyReason, NpadId, RegisterInfo, Result, SessionState, TagInfo,
};
use vtag_hardware::{
    ApplicationRegistry, ControllerProbe, ForwardConnection, StatusSource, VirtualTag,
};

use crate::config::SessionConfig;
use crate::poller::StatusPoller;
use crate::shared::SessionShared;
use crate::signal::{SignalKind, SignalReceiver};
use crate::state_machine::{StateMachine, StateTransition};

/// Device states in which the tag identification can be read.
const TAG_INFO_STATES: &[DeviceState] = &[DeviceState::TagFound, DeviceState::TagMounted];

/// Device states in which the tag payloads can be read.
const MOUNTED_STATES: &[DeviceState] = &[DeviceState::TagMounted];

/// Host collaborators shared by every session.
#[derive(Clone)]
pub struct HostServices {
    pub status_source: Arc<dyn StatusSource>,
    pub registry: Arc<dyn ApplicationRegistry>,
    pub controllers: Arc<dyn ControllerProbe>,
}

impl HostServices {
    pub fn new(
        status_source: Arc<dyn StatusSource>,
        registry: Arc<dyn ApplicationRegistry>,
        controllers: Arc<dyn ControllerProbe>,
    ) -> Self {
        Self {
            status_source,
            registry,
            controllers,
        }
    }
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices").finish_non_exhaustive()
    }
}

/// One client's emulated reader session.
///
/// Prefer [`Session::close`] for teardown. Dropping a session performs the
/// same steps but cannot wait for the poller task; it only waits for a
/// status sample already being handled, and ignores any later one.
pub struct Session {
    app_id: ApplicationId,
    shared: Arc<SessionShared>,
    services: HostServices,
    forward: Box<dyn ForwardConnection>,
    poller: Option<StatusPoller>,
    released: bool,
}

impl Session {
    /// Register `app_id` with the interception registry and start polling.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` does not validate, and
    /// `Error::Runtime` if called outside a Tokio runtime. Nothing is
    /// registered in either case.
    pub fn open(
        app_id: ApplicationId,
        services: HostServices,
        forward: Box<dyn ForwardConnection>,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| Error::Runtime(e.to_string()))?;

        let machine = StateMachine::builder()
            .with_history_size(config.history_size)
            .build();
        let shared = Arc::new(SessionShared::new(machine));

        services.registry.register(app_id);
        let poller = StatusPoller::spawn(
            &runtime,
            Arc::clone(&services.status_source),
            Arc::clone(&shared),
            config.poll_interval(),
        );

        info!(%app_id, poll_interval_ms = config.poll_interval_ms, "Session opened");

        Ok(Self {
            app_id,
            shared,
            services,
            forward,
            poller: Some(poller),
            released: false,
        })
    }

    /// Application owning this session.
    pub fn app_id(&self) -> ApplicationId {
        self.app_id
    }

    // ========================================================================
    // Handshake
    // ========================================================================

    /// Complete the initialize handshake.
    pub async fn initialize(&self, client: ClientProcess) {
        let transition = self.shared.lock().initialize();
        debug!(
            app_id = %self.app_id,
            process_id = client.process_id,
            applet_resource_user_id = client.applet_resource_user_id,
            from = %transition.from,
            "Initialize"
        );
    }

    /// Tear down the initialize handshake.
    pub async fn finalize(&self) {
        let transition = self.shared.lock().finalize();
        debug!(app_id = %self.app_id, from = %transition.from, "Finalize");
    }

    // ========================================================================
    // Device operations
    // ========================================================================

    /// List the reader devices.
    ///
    /// Always yields exactly one handle: player 1 if that controller is
    /// attached right now, the handheld pair otherwise.
    pub async fn list_devices(&self) -> Result<Vec<DeviceHandle>> {
        let npad_id = if self.services.controllers.is_connected(NpadId::PLAYER_1) {
            NpadId::PLAYER_1
        } else {
            NpadId::HANDHELD
        };

        self.shared.lock().ensure_initialized()?;

        let mut devices = Vec::with_capacity(LISTED_DEVICE_COUNT);
        devices.push(DeviceHandle::new(npad_id));
        debug!(app_id = %self.app_id, %npad_id, "ListDevices");
        Ok(devices)
    }

    /// Start searching for a tag.
    pub async fn start_detection(&self, handle: DeviceHandle) -> Result<()> {
        self.transition(handle, StateMachine::start_detection).await
    }

    /// Stop searching and reset the device, even if a tag is mounted.
    pub async fn stop_detection(&self, handle: DeviceHandle) -> Result<()> {
        self.transition(handle, StateMachine::stop_detection).await
    }

    /// Mount the tag.
    ///
    /// `model_type` and `mount_target` are accepted for protocol
    /// compatibility and only logged.
    pub async fn mount(&self, handle: DeviceHandle, model_type: u32, mount_target: u32) -> Result<()> {
        debug!(app_id = %self.app_id, model_type, mount_target, "Mount requested");
        self.transition(handle, StateMachine::mount).await
    }

    /// Unmount the tag. The tag is still considered present.
    pub async fn unmount(&self, handle: DeviceHandle) -> Result<()> {
        self.transition(handle, StateMachine::unmount).await
    }

    /// Acknowledge a flush. Nothing is written.
    pub async fn flush(&self, handle: DeviceHandle) -> Result<()> {
        self.acknowledge(handle, "Flush").await
    }

    /// Acknowledge a restore. Nothing is restored.
    pub async fn restore(&self, handle: DeviceHandle) -> Result<()> {
        self.acknowledge(handle, "Restore").await
    }

    // ========================================================================
    // Tag data
    // ========================================================================

    /// Read the tag identification. Requires a found or mounted tag.
    pub async fn get_tag_info(&self, handle: DeviceHandle) -> Result<TagInfo> {
        self.read_tag(handle, TAG_INFO_STATES, "GetTagInfo", |tag| tag.tag_info())
            .await
    }

    /// Read the owner registration. Requires a mounted tag.
    pub async fn get_register_info(&self, handle: DeviceHandle) -> Result<RegisterInfo> {
        self.read_tag(handle, MOUNTED_STATES, "GetRegisterInfo", |tag| {
            tag.register_info()
        })
        .await
    }

    /// Read the character/figure identification. Requires a mounted tag.
    pub async fn get_model_info(&self, handle: DeviceHandle) -> Result<ModelInfo> {
        self.read_tag(handle, MOUNTED_STATES, "GetModelInfo", |tag| tag.model_info())
            .await
    }

    /// Read the write bookkeeping. Requires a mounted tag.
    pub async fn get_common_info(&self, handle: DeviceHandle) -> Result<CommonInfo> {
        self.read_tag(handle, MOUNTED_STATES, "GetCommonInfo", |tag| tag.common_info())
            .await
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Get a receiver for the tag-detected signal.
    pub async fn attach_activate_event(&self, handle: DeviceHandle) -> Result<SignalReceiver> {
        self.attach(Some(handle), SignalKind::Activate).await
    }

    /// Get a receiver for the tag-lost signal.
    pub async fn attach_deactivate_event(&self, handle: DeviceHandle) -> Result<SignalReceiver> {
        self.attach(Some(handle), SignalKind::Deactivate).await
    }

    /// Get a receiver for the availability-change signal.
    ///
    /// The session itself never raises this signal.
    pub async fn attach_availability_change_event(&self) -> Result<SignalReceiver> {
        self.attach(None, SignalKind::AvailabilityChange).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current session state. No precondition.
    pub async fn get_state(&self) -> SessionState {
        self.shared.lock().session_state()
    }

    /// Current device state. No precondition.
    pub async fn get_device_state(&self, handle: DeviceHandle) -> DeviceState {
        let state = self.shared.lock().device_state();
        debug!(app_id = %self.app_id, npad_id = %handle.npad_id, %state, "GetDeviceState");
        state
    }

    /// Npad id carried by `handle`, echoed back without cross-checking.
    pub async fn get_npad_id(&self, handle: DeviceHandle) -> Result<NpadId> {
        self.shared.lock().ensure_initialized()?;
        Ok(handle.npad_id)
    }

    /// Recorded state transitions, oldest first.
    pub async fn history(&self) -> Vec<StateTransition> {
        self.shared.lock().history().iter().cloned().collect()
    }

    /// Feed one status sample through the transition table, as the poller
    /// does on every tick. Returns the signal raised, if any.
    #[cfg(test)]
    pub(crate) fn handle_status(&self, status: vtag_core::TagStatus) -> Option<SignalKind> {
        self.shared.handle_status(status)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Close the forwarded connection, unregister the application and stop
    /// the poller, in that order.
    ///
    /// The poller is awaited, so no status sample is handled after this
    /// returns.
    pub async fn close(mut self) {
        info!(app_id = %self.app_id, "Closing session");
        self.release();

        if let Some(poller) = self.poller.take() {
            poller.stop().await;
        }

        info!(app_id = %self.app_id, "Session closed");
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.forward.close();
        self.services.registry.unregister(self.app_id);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn transition(
        &self,
        handle: DeviceHandle,
        op: impl FnOnce(&mut StateMachine) -> Result<StateTransition>,
    ) -> Result<()> {
        let mut machine = self.shared.lock();
        let transition = op(&mut *machine).inspect_err(|e| {
            debug!(app_id = %self.app_id, npad_id = %handle.npad_id, error = %e, "Operation refused");
        })?;

        debug!(
            app_id = %self.app_id,
            npad_id = %handle.npad_id,
            cause = %transition.cause,
            from = %transition.from,
            to = %transition.to,
            "Device state changed"
        );
        Ok(())
    }

    async fn acknowledge(&self, handle: DeviceHandle, operation: &'static str) -> Result<()> {
        self.shared.lock().ensure_initialized()?;
        debug!(app_id = %self.app_id, npad_id = %handle.npad_id, operation, "Acknowledged");
        Ok(())
    }

    async fn attach(&self, handle: Option<DeviceHandle>, kind: SignalKind) -> Result<SignalReceiver> {
        self.shared.lock().ensure_initialized()?;
        debug!(
            app_id = %self.app_id,
            npad_id = ?handle.map(|h| h.npad_id),
            signal = %kind,
            "Attached event"
        );
        Ok(self.shared.signals.get(kind).subscribe())
    }

    /// Fetch the active tag outside the lock, check the phase inside it,
    /// then read the payload outside it again.
    async fn read_tag<T>(
        &self,
        handle: DeviceHandle,
        allowed: &[DeviceState],
        operation: &'static str,
        read: impl FnOnce(&dyn VirtualTag) -> vtag_hardware::Result<T>,
    ) -> Result<T> {
        let active = self.services.status_source.active_tag();

        self.shared.lock().ensure_device_in(allowed)?;

        let tag = match active {
            Ok(Some(tag)) if tag.is_valid() => tag,
            Ok(Some(tag)) => {
                debug!(app_id = %self.app_id, operation, tag = tag.name(), "Active tag is invalid");
                return Err(Error::not_ready(NotReadyReason::InvalidTag));
            }
            Ok(None) => {
                debug!(app_id = %self.app_id, operation, "No active tag");
                return Err(Error::not_ready(NotReadyReason::InvalidTag));
            }
            Err(e) => {
                warn!(app_id = %self.app_id, operation, error = %e, "Active tag unavailable");
                return Err(Error::not_ready(NotReadyReason::InvalidTag));
            }
        };

        let payload = read(tag.as_ref()).map_err(|e| {
            warn!(app_id = %self.app_id, operation, tag = tag.name(), error = %e, "Tag payload unreadable");
            Error::not_ready(NotReadyReason::InvalidTag)
        })?;

        debug!(app_id = %self.app_id, npad_id = %handle.npad_id, operation, tag = tag.name(), "Tag data read");
        Ok(payload)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("app_id", &self.app_id)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let Some(poller) = self.poller.take() else {
            return;
        };

        self.release();
        poller.abort();
        self.shared.stop();
        info!(app_id = %self.app_id, "Session dropped");
    }
}
