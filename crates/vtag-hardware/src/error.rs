//! Error types for host collaborator operations.
//!
//! This module defines the errors a status source or a virtual tag can
//! report: the source going away, communication failures while sampling,
//! and tag payloads that cannot be produced.

/// Result type alias for host collaborator operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to host collaborators.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The collaborator is gone (its controlling side was dropped).
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Sampling or querying the collaborator failed.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// The collaborator returned data that cannot be used.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Tag payload construction failed.
    #[error("Tag data error: {0}")]
    TagData(#[from] vtag_core::Error),
}

impl HardwareError {
    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}
