//! Common test utilities for session integration tests.
//!
//! Every fixture wires a real [`Session`] to the mock collaborators from
//! `vtag_hardware::mock` and hands back the mock handles, so a test can play
//! the host side (present a tag, attach a controller) while the session's
//! own poller picks the changes up.

#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use vtag_core::{ApplicationId, DeviceHandle, NpadId};
use vtag_emulator::{HostServices, Session, SessionConfig};
use vtag_hardware::mock::{
    MockControllers, MockControllersHandle, MockForward, MockForwardHandle, MockRegistry,
    MockTagSource, MockTagSourceHandle, MockVirtualTag,
};

/// Standard test application id
pub const TEST_APP: ApplicationId = ApplicationId::new(0x0100_0000_0000_1000);

/// Poll interval short enough to keep tests fast
pub const FAST_POLL: Duration = Duration::from_millis(5);

/// Upper bound for anything a test waits on
pub const WAIT_LIMIT: Duration = Duration::from_secs(2);

/// A session plus the handles driving its collaborators.
pub struct TestSession {
    pub session: Session,
    pub tags: MockTagSourceHandle,
    pub registry: MockRegistry,
    pub pads: MockControllersHandle,
    pub forward: MockForwardHandle,
}

/// Open a session with the given poll interval.
pub fn open_session(poll_interval: Duration) -> TestSession {
    let (source, tags) = MockTagSource::new();
    let (controllers, pads) = MockControllers::new();
    let (forward_conn, forward) = MockForward::new();
    let registry = MockRegistry::new();

    let services = HostServices::new(
        Arc::new(source),
        Arc::new(registry.clone()),
        Arc::new(controllers),
    );
    let config = SessionConfig::default().with_poll_interval(poll_interval);
    let session = Session::open(TEST_APP, services, Box::new(forward_conn), config)
        .expect("default config should be valid");

    TestSession {
        session,
        tags,
        registry,
        pads,
        forward,
    }
}

/// Open a session polling every [`FAST_POLL`].
pub fn open_fast_session() -> TestSession {
    open_session(FAST_POLL)
}

/// The handle the session lists while no player 1 controller is attached.
pub fn handheld() -> DeviceHandle {
    DeviceHandle::new(NpadId::HANDHELD)
}

/// A valid tag with a fixed 7-byte UUID.
pub fn sample_tag(name: &str) -> MockVirtualTag {
    MockVirtualTag::new(name, vec![0x04, 0x3C, 0x5D, 0x7E, 0x9F, 0xA0, 0xB1])
}

/// Await `future`, failing the test if it takes longer than [`WAIT_LIMIT`].
pub async fn within_limit<F: Future>(what: &str, future: F) -> F::Output {
    match tokio::time::timeout(WAIT_LIMIT, future).await {
        Ok(output) => output,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}
