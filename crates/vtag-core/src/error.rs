use std::fmt;

use thiserror::Error;

use crate::constants::{RESULT_DEVICE_NOT_FOUND, RESULT_SHOULD_FORWARD};
use crate::types::DeviceState;

/// Why an operation was refused with [`Error::NotReady`].
///
/// Callers see a single "device not found" condition regardless of the
/// reason; the reason only exists for logs and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotReadyReason {
    /// The client has not initialized the session.
    SessionNotInitialized,

    /// The device is not in a phase that allows the operation.
    DeviceState { state: DeviceState },

    /// No valid tag is available from the status source.
    InvalidTag,
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::SessionNotInitialized => write!(f, "session not initialized"),
            NotReadyReason::DeviceState { state } => write!(f, "device is {state}"),
            NotReadyReason::InvalidTag => write!(f, "no valid tag"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Session errors
    #[error("Device not found: {reason}")]
    NotReady { reason: NotReadyReason },

    // Interception errors
    #[error("Emulation is off, client should be forwarded to the original service")]
    ShouldForward,

    // Tag payload errors
    #[error("Invalid tag data: {0}")]
    InvalidTagData(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Host errors
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl Error {
    /// Shorthand for a [`Error::NotReady`] with the given reason.
    #[must_use]
    pub fn not_ready(reason: NotReadyReason) -> Self {
        Error::NotReady { reason }
    }

    /// Returns `true` for the "device not found" condition.
    #[must_use]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Error::NotReady { .. })
    }

    /// Packed result code reported to intercepted clients, if this error
    /// has one.
    #[must_use]
    pub fn result_code(&self) -> Option<u32> {
        match self {
            Error::NotReady { .. } => Some(RESULT_DEVICE_NOT_FOUND),
            Error::ShouldForward => Some(RESULT_SHOULD_FORWARD),
            Error::InvalidTagData(_) | Error::Config(_) | Error::Runtime(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
