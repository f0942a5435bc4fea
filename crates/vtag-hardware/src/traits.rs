//! Host collaborator trait definitions.
//!
//! This module defines the contracts between the emulated reader session and
//! the host environment it runs in: the virtual tag status source, the tag
//! data provider, the process-wide interception registry, the controller
//! probe used to pick a device handle, the forwarded connection to the
//! original service and the global emulation switch.
//!
//! Unlike device traits that wait on hardware, every method here is a quick
//! synchronous query of in-memory host state. The traits are object-safe so
//! a session can hold them as `Arc<dyn Trait>` and share them with its
//! poller task.

use std::fmt;
use std::sync::Arc;

use vtag_core::{ApplicationId, CommonInfo, ModelInfo, NpadId, RegisterInfo, TagInfo, TagStatus};

use crate::error::Result;

/// A virtual tag whose data the reader exposes.
///
/// Payload accessors are fallible because producing them usually means
/// decoding a stored dump; a decode failure is reported as an error rather
/// than as a default payload.
pub trait VirtualTag: Send + Sync + fmt::Debug {
    /// Human-readable tag name, for logs.
    fn name(&self) -> &str;

    /// Whether the tag data is usable at all.
    fn is_valid(&self) -> bool;

    /// Identification data (UUID, protocol, tag type).
    fn tag_info(&self) -> Result<TagInfo>;

    /// Owner registration data.
    fn register_info(&self) -> Result<RegisterInfo>;

    /// Character/figure identification.
    fn model_info(&self) -> Result<ModelInfo>;

    /// Write bookkeeping data.
    fn common_info(&self) -> Result<CommonInfo>;
}

/// Source of truth for the virtual tag.
///
/// # Examples
///
/// ```
/// use vtag_hardware::mock::MockTagSource;
/// use vtag_hardware::traits::StatusSource;
/// use vtag_core::TagStatus;
///
/// let (source, handle) = MockTagSource::new();
/// assert_eq!(source.sample_status().unwrap(), TagStatus::Disconnected);
///
/// handle.connect();
/// assert_eq!(source.sample_status().unwrap(), TagStatus::Connected);
/// ```
pub trait StatusSource: Send + Sync {
    /// Sample the current presence status of the virtual tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the status could not be obtained. Callers treat
    /// this as "no sample".
    fn sample_status(&self) -> Result<TagStatus>;

    /// Get the currently selected virtual tag, if any.
    ///
    /// A selected tag may still be invalid; check [`VirtualTag::is_valid`].
    fn active_tag(&self) -> Result<Option<Arc<dyn VirtualTag>>>;
}

/// Process-wide registry of applications whose sessions are intercepted.
pub trait ApplicationRegistry: Send + Sync {
    /// Record that a session for `id` exists.
    fn register(&self, id: ApplicationId);

    /// Forget the session for `id`.
    fn unregister(&self, id: ApplicationId);

    /// Whether `id` is currently registered.
    fn is_registered(&self, id: ApplicationId) -> bool;
}

/// Live view of the connected controllers.
pub trait ControllerProbe: Send + Sync {
    /// Whether the controller with the given npad id is currently connected.
    ///
    /// Implementations must refresh their view on every call; results are
    /// never cached by the caller.
    fn is_connected(&self, npad_id: NpadId) -> bool;
}

/// Connection to the original service that a session was intercepted from.
pub trait ForwardConnection: Send + Sync {
    /// Close the connection. Called exactly once, at session teardown.
    fn close(&self);
}

/// Global switch deciding whether new sessions are emulated or forwarded.
pub trait EmulationProbe: Send + Sync {
    /// Whether emulation is currently on.
    fn is_emulation_on(&self) -> bool;
}
