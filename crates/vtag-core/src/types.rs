use crate::{
    Result,
    constants::{
        APPLICATION_AREA_SIZE, MAX_TAG_NAME_LENGTH, MAX_TAG_UUID_LENGTH, NPAD_ID_HANDHELD,
        NPAD_ID_PLAYER_1, TAG_PROTOCOL_TYPE_A, TAG_TYPE_2,
    },
    error::Error,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether the client has completed the initialize handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum SessionState {
    NonInitialized = 0,
    Initialized = 1,
}

impl SessionState {
    /// Convert the session state to its wire value.
    #[inline]
    #[must_use]
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// Returns `true` if the session is initialized.
    #[inline]
    #[must_use]
    pub fn is_initialized(self) -> bool {
        matches!(self, SessionState::Initialized)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionState::NonInitialized => write!(f, "NonInitialized"),
            SessionState::Initialized => write!(f, "Initialized"),
        }
    }
}

/// Tag-presence lifecycle phase of the emulated device.
///
/// Discriminants match the values reported to clients by the device state
/// query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum DeviceState {
    Initialized = 0,
    SearchingForTag = 1,
    TagFound = 2,
    TagRemoved = 3,
    TagMounted = 4,
    Unavailable = 5,
    Finalized = 6,
}

impl DeviceState {
    /// Convert the device state to its wire value.
    #[inline]
    #[must_use]
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    /// Returns `true` if the client currently sees a tag on the reader.
    #[inline]
    #[must_use]
    pub fn is_tag_present(self) -> bool {
        matches!(self, DeviceState::TagFound | DeviceState::TagMounted)
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state_str = match self {
            DeviceState::Initialized => "Initialized",
            DeviceState::SearchingForTag => "SearchingForTag",
            DeviceState::TagFound => "TagFound",
            DeviceState::TagRemoved => "TagRemoved",
            DeviceState::TagMounted => "TagMounted",
            DeviceState::Unavailable => "Unavailable",
            DeviceState::Finalized => "Finalized",
        };
        write!(f, "{}", state_str)
    }
}

/// One presence sample of the virtual tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for TagStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TagStatus::Connected => write!(f, "Connected"),
            TagStatus::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Controller identifier a device handle is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpadId(u32);

impl NpadId {
    /// First player controller.
    pub const PLAYER_1: NpadId = NpadId(NPAD_ID_PLAYER_1);

    /// Handheld controller pair.
    pub const HANDHELD: NpadId = NpadId(NPAD_ID_HANDHELD);

    /// Wrap a raw npad id.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        NpadId(id)
    }

    /// Get the raw npad id.
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for NpadId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

/// Logical device handle handed out by the device listing.
///
/// Handles are not validated by the session beyond its state checks; the
/// npad id is echoed back as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle {
    pub npad_id: NpadId,
}

impl DeviceHandle {
    #[must_use]
    pub fn new(npad_id: NpadId) -> Self {
        Self { npad_id }
    }
}

/// Program id of a client application owning a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(u64);

impl ApplicationId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        ApplicationId(id)
    }

    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Identity of the process calling the initialize handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProcess {
    pub process_id: u64,
    pub applet_resource_user_id: u64,
}

// ============================================================================
// Tag Payloads
// ============================================================================

/// Identification data of the tag on the reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    uuid: Vec<u8>,
    pub protocol: u32,
    pub tag_type: u32,
}

impl TagInfo {
    /// Create tag info for an emulated type A / type 2 tag.
    ///
    /// # Errors
    /// Returns `Error::InvalidTagData` if the UUID is empty or longer than
    /// [`MAX_TAG_UUID_LENGTH`] bytes.
    pub fn new(uuid: &[u8]) -> Result<Self> {
        if uuid.is_empty() || uuid.len() > MAX_TAG_UUID_LENGTH {
            return Err(Error::InvalidTagData(format!(
                "UUID must be 1-{MAX_TAG_UUID_LENGTH} bytes, got {}",
                uuid.len()
            )));
        }
        Ok(Self {
            uuid: uuid.to_vec(),
            protocol: TAG_PROTOCOL_TYPE_A,
            tag_type: TAG_TYPE_2,
        })
    }

    #[must_use]
    pub fn uuid(&self) -> &[u8] {
        &self.uuid
    }

    /// UUID formatted as uppercase hex.
    #[must_use]
    pub fn uuid_hex(&self) -> String {
        self.uuid.iter().map(|b| format!("{b:02X}")).collect()
    }
}

/// Owner registration data of a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterInfo {
    name: String,
    pub first_write_date: NaiveDate,
    pub font_region: u8,
}

impl RegisterInfo {
    /// # Errors
    /// Returns `Error::InvalidTagData` if the name exceeds
    /// [`MAX_TAG_NAME_LENGTH`] bytes.
    pub fn new(name: &str, first_write_date: NaiveDate) -> Result<Self> {
        if name.len() > MAX_TAG_NAME_LENGTH {
            return Err(Error::InvalidTagData(format!(
                "Name must be at most {MAX_TAG_NAME_LENGTH} bytes, got {}",
                name.len()
            )));
        }
        Ok(Self {
            name: name.to_string(),
            first_write_date,
            font_region: 0,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Character/figure identification of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub game_character_id: u16,
    pub character_variant: u8,
    pub figure_type: u8,
    pub model_number: u16,
    pub series: u8,
}

/// Write bookkeeping data of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonInfo {
    pub last_write_date: NaiveDate,
    pub write_counter: u16,
    pub version: u16,
    pub application_area_size: u32,
}

impl CommonInfo {
    #[must_use]
    pub fn new(last_write_date: NaiveDate, write_counter: u16) -> Self {
        Self {
            last_write_date,
            write_counter,
            version: 0,
            application_area_size: APPLICATION_AREA_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DeviceState::Initialized, 0)]
    #[case(DeviceState::SearchingForTag, 1)]
    #[case(DeviceState::TagFound, 2)]
    #[case(DeviceState::TagRemoved, 3)]
    #[case(DeviceState::TagMounted, 4)]
    #[case(DeviceState::Unavailable, 5)]
    #[case(DeviceState::Finalized, 6)]
    fn test_device_state_wire_value(#[case] state: DeviceState, #[case] expected: u32) {
        assert_eq!(state.to_u32(), expected);
    }

    #[test]
    fn test_session_state_wire_value() {
        assert_eq!(SessionState::NonInitialized.to_u32(), 0);
        assert_eq!(SessionState::Initialized.to_u32(), 1);
        assert!(SessionState::Initialized.is_initialized());
        assert!(!SessionState::NonInitialized.is_initialized());
    }

    #[test]
    fn test_tag_present_states() {
        assert!(DeviceState::TagFound.is_tag_present());
        assert!(DeviceState::TagMounted.is_tag_present());
        assert!(!DeviceState::SearchingForTag.is_tag_present());
        assert!(!DeviceState::TagRemoved.is_tag_present());
    }

    #[test]
    fn test_npad_id_display() {
        assert_eq!(NpadId::HANDHELD.to_string(), "0x20");
        assert_eq!(NpadId::PLAYER_1.as_u32(), 0);
    }

    #[test]
    fn test_application_id_display() {
        let id = ApplicationId::new(0x0100_0000_0000_1000);
        assert_eq!(id.to_string(), "0100000000001000");
    }

    #[rstest]
    #[case(vec![0x04, 0xAB, 0xCD, 0xEF, 0x12, 0x34, 0x56], "04ABCDEF123456")]
    #[case(vec![0x01], "01")]
    fn test_tag_info_valid(#[case] uuid: Vec<u8>, #[case] expected: &str) {
        let info = TagInfo::new(&uuid).unwrap();
        assert_eq!(info.uuid_hex(), expected);
        assert_eq!(info.protocol, TAG_PROTOCOL_TYPE_A);
        assert_eq!(info.tag_type, TAG_TYPE_2);
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![0u8; 11])]
    fn test_tag_info_invalid(#[case] uuid: Vec<u8>) {
        assert!(matches!(TagInfo::new(&uuid), Err(Error::InvalidTagData(_))));
    }

    #[test]
    fn test_register_info_name_limit() {
        let date = NaiveDate::from_ymd_opt(2020, 3, 20).unwrap();
        assert_eq!(RegisterInfo::new("Isabelle", date).unwrap().name(), "Isabelle");
        assert!(RegisterInfo::new(&"x".repeat(41), date).is_err());
    }

    #[test]
    fn test_common_info_defaults() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        let info = CommonInfo::new(date, 3);
        assert_eq!(info.application_area_size, 0xD8);
        assert_eq!(info.write_counter, 3);
    }

    #[test]
    fn test_tag_status_serialization() {
        let json = serde_json::to_string(&TagStatus::Connected).unwrap();
        assert_eq!(json, "\"connected\"");
        let status: TagStatus = serde_json::from_str("\"disconnected\"").unwrap();
        assert_eq!(status, TagStatus::Disconnected);
    }
}
