//! Session manager and emulation gate.
//!
//! The manager decides, per incoming client, whether the client gets an
//! emulated [`Session`] or is forwarded to the original service.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use vtag_core::{ApplicationId, Error, Result};
use vtag_hardware::{EmulationProbe, ForwardConnection};

use crate::config::SessionConfig;
use crate::session::{HostServices, Session};

/// Opens emulated sessions while emulation is on.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use vtag_emulator::{HostServices, SessionConfig, SessionManager};
/// use vtag_hardware::ForwardConnection;
/// use vtag_hardware::mock::{MockControllers, MockEmulation, MockForward, MockRegistry, MockTagSource};
/// use vtag_core::{ApplicationId, Error};
///
/// fn connect() -> Box<dyn ForwardConnection> {
///     Box::new(MockForward::new().0)
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> vtag_core::Result<()> {
/// let (source, _tags) = MockTagSource::new();
/// let (controllers, _pads) = MockControllers::new();
/// let (emulation, switch) = MockEmulation::new(false);
/// let services = HostServices::new(Arc::new(source), Arc::new(MockRegistry::new()), Arc::new(controllers));
/// let manager = SessionManager::new(services, Arc::new(emulation), SessionConfig::default())?;
///
/// let app = ApplicationId::new(0x0100_0000_0000_1000);
/// assert_eq!(manager.open_session(app, connect).unwrap_err(), Error::ShouldForward);
///
/// switch.set_enabled(true);
/// let session = manager.open_session(app, connect)?;
/// session.close().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionManager {
    services: HostServices,
    emulation: Arc<dyn EmulationProbe>,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a manager.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` does not validate.
    pub fn new(
        services: HostServices,
        emulation: Arc<dyn EmulationProbe>,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            services,
            emulation,
            config,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open an emulated session for `app_id`.
    ///
    /// `connect` opens the connection to the original service; it is only
    /// called when a session is actually created.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShouldForward` if emulation is off. The caller should
    /// then hand the client to the original service. Otherwise fails as
    /// [`Session::open`] does.
    pub fn open_session<F>(&self, app_id: ApplicationId, connect: F) -> Result<Session>
    where
        F: FnOnce() -> Box<dyn ForwardConnection>,
    {
        if !self.emulation.is_emulation_on() {
            debug!(%app_id, "Emulation off, forwarding client");
            return Err(Error::ShouldForward);
        }

        let session = Session::open(app_id, self.services.clone(), connect(), self.config.clone())?;
        info!(%app_id, "Created emulated reader session");
        Ok(session)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vtag_hardware::ApplicationRegistry;
    use vtag_hardware::mock::{
        MockControllers, MockEmulation, MockEmulationHandle, MockForward, MockRegistry,
        MockTagSource, MockTagSourceHandle,
    };

    const APP: ApplicationId = ApplicationId::new(0x0100_0000_0000_4000);

    fn manager(enabled: bool) -> (SessionManager, MockRegistry, MockEmulationHandle, MockTagSourceHandle) {
        let (source, tags) = MockTagSource::new();
        let (controllers, _pads) = MockControllers::new();
        let (emulation, switch) = MockEmulation::new(enabled);
        let registry = MockRegistry::new();

        let services = HostServices::new(
            Arc::new(source),
            Arc::new(registry.clone()),
            Arc::new(controllers),
        );
        let config = SessionConfig::default().with_poll_interval(Duration::from_millis(10));
        let manager = SessionManager::new(services, Arc::new(emulation), config).unwrap();

        (manager, registry, switch, tags)
    }

    #[tokio::test]
    async fn test_emulation_off_forwards() {
        let (manager, registry, _switch, _tags) = manager(false);
        let mut connected = false;

        let result = manager.open_session(APP, || {
            connected = true;
            Box::new(MockForward::new().0)
        });

        assert_eq!(result.unwrap_err(), Error::ShouldForward);
        assert_eq!(Error::ShouldForward.result_code(), Some(0x7D015));
        assert!(!connected);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_emulation_on_opens_session() {
        let (manager, registry, _switch, _tags) = manager(true);
        let (forward, forward_handle) = MockForward::new();

        let session = manager.open_session(APP, || Box::new(forward)).unwrap();
        assert!(registry.is_registered(APP));
        assert_eq!(session.app_id(), APP);

        session.close().await;
        assert!(forward_handle.is_closed());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_switch_is_read_per_session() {
        let (manager, _registry, switch, _tags) = manager(true);

        let first = manager
            .open_session(APP, || Box::new(MockForward::new().0))
            .unwrap();

        switch.set_enabled(false);
        let second = manager.open_session(ApplicationId::new(2), || Box::new(MockForward::new().0));
        assert!(matches!(second, Err(Error::ShouldForward)));

        first.close().await;
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let (source, _tags) = MockTagSource::new();
        let (controllers, _pads) = MockControllers::new();
        let (emulation, _switch) = MockEmulation::new(true);
        let services = HostServices::new(
            Arc::new(source),
            Arc::new(MockRegistry::new()),
            Arc::new(controllers),
        );

        let config = SessionConfig::default().with_poll_interval(Duration::ZERO);
        let result = SessionManager::new(services, Arc::new(emulation), config);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
