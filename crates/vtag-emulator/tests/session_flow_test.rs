//! Integration tests for the end-to-end reader session flow.
//!
//! These tests run a real session with its background poller against the
//! mock tag source and check the flow a client goes through:
//! 1. Initialize → list devices → start detection
//! 2. Tag arrives → activate → read tag data → mount/unmount
//! 3. Tag leaves → deactivate → back to searching

mod common;

use common::{handheld, open_fast_session, sample_tag, within_limit};
use vtag_core::{
    ClientProcess, DeviceState, Error, NotReadyReason, NpadId, SessionState, TagStatus,
};
use vtag_emulator::TransitionCause;

// ============================================================================
// Detection Flow
// ============================================================================

#[tokio::test]
async fn test_tag_arrives_and_leaves() {
    let t = open_fast_session();
    let session = &t.session;

    assert_eq!(session.get_state().await, SessionState::NonInitialized);
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::Unavailable);

    session
        .initialize(ClientProcess {
            process_id: 0x51,
            applet_resource_user_id: 0x7E,
        })
        .await;
    assert_eq!(session.get_state().await, SessionState::Initialized);
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::Initialized);

    let handle = session.list_devices().await.unwrap()[0];
    assert_eq!(handle, handheld());

    let activate = session.attach_activate_event(handle).await.unwrap();
    let deactivate = session.attach_deactivate_event(handle).await.unwrap();

    session.start_detection(handle).await.unwrap();
    assert_eq!(session.get_device_state(handle).await, DeviceState::SearchingForTag);

    // Tag arrives
    t.tags.present(sample_tag("Mario"));
    within_limit("activate", activate.wait()).await;
    assert_eq!(session.get_device_state(handle).await, DeviceState::TagFound);

    let info = session.get_tag_info(handle).await.unwrap();
    assert_eq!(info.uuid_hex(), "043C5D7E9FA0B1");

    // Tag stays put, nothing else is raised
    within_limit("samples", t.tags.wait_for_samples(3)).await;
    assert!(!activate.is_raised());
    assert!(!deactivate.is_raised());

    // Tag leaves
    t.tags.remove();
    within_limit("deactivate", deactivate.wait()).await;
    assert_eq!(session.get_device_state(handle).await, DeviceState::SearchingForTag);
    assert!(!activate.is_raised());

    let causes: Vec<_> = session.history().await.iter().map(|tr| tr.cause).collect();
    assert_eq!(
        causes,
        vec![
            TransitionCause::Initialize,
            TransitionCause::StartDetection,
            TransitionCause::Status(TagStatus::Connected),
            TransitionCause::Status(TagStatus::Disconnected),
        ]
    );

    t.session.close().await;
}

#[tokio::test]
async fn test_invalid_tag_is_found_but_unreadable() {
    let t = open_fast_session();
    let session = &t.session;

    session.initialize(ClientProcess::default()).await;
    let activate = session.attach_activate_event(handheld()).await.unwrap();
    session.start_detection(handheld()).await.unwrap();

    t.tags.present(sample_tag("Broken").invalid());
    within_limit("activate", activate.wait()).await;

    assert_eq!(session.get_device_state(handheld()).await, DeviceState::TagFound);
    assert_eq!(
        session.get_tag_info(handheld()).await.unwrap_err(),
        Error::not_ready(NotReadyReason::InvalidTag)
    );

    t.session.close().await;
}

#[tokio::test]
async fn test_tag_present_before_detection_is_not_activated() {
    let t = open_fast_session();
    let session = &t.session;

    session.initialize(ClientProcess::default()).await;
    let activate = session.attach_activate_event(handheld()).await.unwrap();

    t.tags.present(sample_tag("Early"));
    within_limit("samples", t.tags.wait_for_samples(3)).await;
    assert!(!activate.is_raised());
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::Initialized);

    // Searching picks up the tag that was already there
    session.start_detection(handheld()).await.unwrap();
    within_limit("activate", activate.wait()).await;
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::TagFound);

    t.session.close().await;
}

// ============================================================================
// Mount / Unmount
// ============================================================================

#[tokio::test]
async fn test_mount_read_unmount() {
    let t = open_fast_session();
    let session = &t.session;

    session.initialize(ClientProcess::default()).await;
    let activate = session.attach_activate_event(handheld()).await.unwrap();
    session.start_detection(handheld()).await.unwrap();
    t.tags.present(sample_tag("Peach").with_write_counter(9));
    within_limit("activate", activate.wait()).await;

    session.mount(handheld(), 0, 2).await.unwrap();
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::TagMounted);

    assert_eq!(session.get_register_info(handheld()).await.unwrap().name(), "Peach");
    assert_eq!(session.get_common_info(handheld()).await.unwrap().write_counter, 9);
    session.get_model_info(handheld()).await.unwrap();
    session.get_tag_info(handheld()).await.unwrap();
    session.flush(handheld()).await.unwrap();
    session.restore(handheld()).await.unwrap();

    session.unmount(handheld()).await.unwrap();
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::TagFound);
    assert!(session.get_register_info(handheld()).await.unwrap_err().is_not_ready());

    t.session.close().await;
}

#[tokio::test]
async fn test_removing_mounted_tag_returns_to_searching() {
    let t = open_fast_session();
    let session = &t.session;

    session.initialize(ClientProcess::default()).await;
    let activate = session.attach_activate_event(handheld()).await.unwrap();
    let deactivate = session.attach_deactivate_event(handheld()).await.unwrap();
    session.start_detection(handheld()).await.unwrap();
    t.tags.present(sample_tag("Luigi"));
    within_limit("activate", activate.wait()).await;
    session.mount(handheld(), 0, 2).await.unwrap();

    t.tags.remove();
    within_limit("deactivate", deactivate.wait()).await;
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::SearchingForTag);

    // Putting it back activates again
    t.tags.connect();
    within_limit("activate", activate.wait()).await;

    t.session.close().await;
}

#[tokio::test]
async fn test_stop_detection_resets_mounted_tag() {
    let t = open_fast_session();
    let session = &t.session;

    session.initialize(ClientProcess::default()).await;
    let activate = session.attach_activate_event(handheld()).await.unwrap();
    let deactivate = session.attach_deactivate_event(handheld()).await.unwrap();
    session.start_detection(handheld()).await.unwrap();
    t.tags.present(sample_tag("Yoshi"));
    within_limit("activate", activate.wait()).await;
    session.mount(handheld(), 0, 2).await.unwrap();

    session.stop_detection(handheld()).await.unwrap();
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::Initialized);

    // The tag is still there, but nobody is searching: no signal either way
    t.tags.remove();
    within_limit("samples", t.tags.wait_for_samples(3)).await;
    assert!(!deactivate.is_raised());
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::Initialized);

    // Detection can start over
    session.start_detection(handheld()).await.unwrap();

    t.session.close().await;
}

#[tokio::test]
async fn test_start_detection_twice_is_refused() {
    let t = open_fast_session();
    let session = &t.session;

    session.initialize(ClientProcess::default()).await;
    session.start_detection(handheld()).await.unwrap();

    let error = session.start_detection(handheld()).await.unwrap_err();
    assert_eq!(
        error,
        Error::not_ready(NotReadyReason::DeviceState {
            state: DeviceState::SearchingForTag
        })
    );
    assert_eq!(error.result_code(), Some(0x8073));

    t.session.close().await;
}

// ============================================================================
// Guards
// ============================================================================

async fn assert_every_guarded_operation_refused(t: &common::TestSession) {
    let session = &t.session;
    let handle = handheld();

    let state = session.get_state().await;
    let device = session.get_device_state(handle).await;
    let history = session.history().await.len();

    assert!(session.list_devices().await.unwrap_err().is_not_ready());
    assert!(session.start_detection(handle).await.unwrap_err().is_not_ready());
    assert!(session.stop_detection(handle).await.unwrap_err().is_not_ready());
    assert!(session.mount(handle, 0, 2).await.unwrap_err().is_not_ready());
    assert!(session.unmount(handle).await.unwrap_err().is_not_ready());
    assert!(session.flush(handle).await.unwrap_err().is_not_ready());
    assert!(session.restore(handle).await.unwrap_err().is_not_ready());
    assert!(session.get_tag_info(handle).await.unwrap_err().is_not_ready());
    assert!(session.get_register_info(handle).await.unwrap_err().is_not_ready());
    assert!(session.get_model_info(handle).await.unwrap_err().is_not_ready());
    assert!(session.get_common_info(handle).await.unwrap_err().is_not_ready());
    assert!(session.attach_activate_event(handle).await.unwrap_err().is_not_ready());
    assert!(session.attach_deactivate_event(handle).await.unwrap_err().is_not_ready());
    assert!(session.attach_availability_change_event().await.unwrap_err().is_not_ready());
    assert!(session.get_npad_id(handle).await.unwrap_err().is_not_ready());

    assert_eq!(session.get_state().await, state);
    assert_eq!(session.get_device_state(handle).await, device);
    assert_eq!(session.history().await.len(), history);
}

#[tokio::test]
async fn test_guards_before_initialize() {
    let t = open_fast_session();
    t.tags.present(sample_tag("Toad"));

    assert_every_guarded_operation_refused(&t).await;
    assert_eq!(t.session.get_device_state(handheld()).await, DeviceState::Unavailable);

    t.session.close().await;
}

#[tokio::test]
async fn test_guards_after_finalize() {
    let t = open_fast_session();
    let session = &t.session;

    session.initialize(ClientProcess::default()).await;
    session.start_detection(handheld()).await.unwrap();
    session.finalize().await;

    assert_eq!(session.get_state().await, SessionState::NonInitialized);
    assert_eq!(session.get_device_state(handheld()).await, DeviceState::Finalized);
    assert_every_guarded_operation_refused(&t).await;

    t.session.close().await;
}

// ============================================================================
// Devices
// ============================================================================

#[tokio::test]
async fn test_list_devices_and_npad_id() {
    let t = open_fast_session();
    let session = &t.session;
    session.initialize(ClientProcess::default()).await;

    let devices = session.list_devices().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(session.get_npad_id(devices[0]).await.unwrap(), NpadId::HANDHELD);

    t.pads.set_player_1_connected(true);
    let devices = session.list_devices().await.unwrap();
    assert_eq!(session.get_npad_id(devices[0]).await.unwrap(), NpadId::PLAYER_1);

    t.pads.set_player_1_connected(false);
    let devices = session.list_devices().await.unwrap();
    assert_eq!(devices[0].npad_id, NpadId::HANDHELD);

    t.session.close().await;
}

#[tokio::test]
async fn test_availability_change_is_never_raised() {
    let t = open_fast_session();
    let session = &t.session;

    session.initialize(ClientProcess::default()).await;
    let availability = session.attach_availability_change_event().await.unwrap();
    let activate = session.attach_activate_event(handheld()).await.unwrap();
    session.start_detection(handheld()).await.unwrap();

    t.pads.set_player_1_connected(true);
    t.tags.present(sample_tag("Wario"));
    within_limit("activate", activate.wait()).await;
    t.tags.remove();
    within_limit("samples", t.tags.wait_for_samples(3)).await;

    assert!(!availability.is_raised());

    t.session.close().await;
}
