//! Core constants for the virtual tag reader emulation.
//!
//! This module collects the numeric values shared by every crate in the
//! workspace: the result codes reported to intercepted clients, controller
//! (npad) identifiers, poller timing defaults and tag payload limits.
//!
//! # Result Codes
//!
//! Results use the packed `module | (description << 9)` layout of the host
//! service framework:
//!
//! | Result | Module | Description | Packed |
//! |--------|--------|-------------|--------|
//! | Device not found | 115 | 64 | `0x8073` |
//! | Should forward to session | 21 | 1000 | `0x7D015` |
//!
//! # Usage
//!
//! ```
//! use vtag_core::constants::*;
//!
//! assert_eq!(pack_result(NFP_RESULT_MODULE, DEVICE_NOT_FOUND_DESCRIPTION), RESULT_DEVICE_NOT_FOUND);
//!
//! use std::time::Duration;
//! let interval = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
//! assert_eq!(interval.as_millis(), 100);
//! ```

// ============================================================================
// Result Codes
// ============================================================================

/// Result module of the tag reader service.
pub const NFP_RESULT_MODULE: u32 = 115;

/// Description of the "device not found" result within [`NFP_RESULT_MODULE`].
pub const DEVICE_NOT_FOUND_DESCRIPTION: u32 = 64;

/// Result module of the service manager interception layer.
pub const SM_RESULT_MODULE: u32 = 21;

/// Description of "should forward to session" within [`SM_RESULT_MODULE`].
pub const SHOULD_FORWARD_DESCRIPTION: u32 = 1000;

/// Packed "device not found" result.
pub const RESULT_DEVICE_NOT_FOUND: u32 = pack_result(NFP_RESULT_MODULE, DEVICE_NOT_FOUND_DESCRIPTION);

/// Packed "should forward to session" result.
pub const RESULT_SHOULD_FORWARD: u32 = pack_result(SM_RESULT_MODULE, SHOULD_FORWARD_DESCRIPTION);

/// Pack a module/description pair into a single result value.
///
/// # Examples
///
/// ```
/// use vtag_core::constants::pack_result;
///
/// assert_eq!(pack_result(115, 64), 0x8073);
/// ```
#[must_use]
pub const fn pack_result(module: u32, description: u32) -> u32 {
    (module & 0x1FF) | ((description & 0x1FFF) << 9)
}

// ============================================================================
// Controller Identifiers
// ============================================================================

/// Npad id of the first player controller (detached joy-cons or a pro controller).
pub const NPAD_ID_PLAYER_1: u32 = 0x0;

/// Npad id of the handheld controller pair.
pub const NPAD_ID_HANDHELD: u32 = 0x20;

/// Number of devices reported by a device listing.
///
/// The emulated reader always exposes exactly one logical device.
pub const LISTED_DEVICE_COUNT: usize = 1;

// ============================================================================
// Poller Timing
// ============================================================================

/// Default interval between two status samples, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default number of state transitions kept in a session's history.
///
/// Each record is a few dozen bytes, so the default keeps the history
/// around 4KB per session while still covering many detect/mount cycles.
pub const DEFAULT_HISTORY_SIZE: usize = 100;

// ============================================================================
// Tag Payload Limits
// ============================================================================

/// Maximum length of a tag UUID in bytes.
pub const MAX_TAG_UUID_LENGTH: usize = 10;

/// Maximum length of a tag nickname in bytes (UTF-8).
pub const MAX_TAG_NAME_LENGTH: usize = 40;

/// Protocol value reported for emulated tags (ISO 14443 type A).
pub const TAG_PROTOCOL_TYPE_A: u32 = 1;

/// Tag type value reported for emulated tags (NFC forum type 2).
pub const TAG_TYPE_2: u32 = 2;

/// Size of the application area exposed by emulated tags, in bytes.
pub const APPLICATION_AREA_SIZE: u32 = 0xD8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_result() {
        assert_eq!(RESULT_DEVICE_NOT_FOUND, 0x8073);
    }

    #[test]
    fn test_should_forward_result() {
        assert_eq!(RESULT_SHOULD_FORWARD, 0x7D015);
    }

    #[test]
    fn test_pack_result_masks_fields() {
        assert_eq!(pack_result(0x200 | 115, 64), 0x8073);
    }

    #[test]
    fn test_npad_ids_distinct() {
        assert_ne!(NPAD_ID_PLAYER_1, NPAD_ID_HANDHELD);
    }
}
