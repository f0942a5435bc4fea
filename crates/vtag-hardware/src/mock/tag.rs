//! Mock virtual tag holding its payload data in memory.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vtag_core::{CommonInfo, ModelInfo, RegisterInfo, TagInfo};

use crate::{HardwareError, Result, traits::VirtualTag};

fn default_true() -> bool {
    true
}

fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// In-memory virtual tag.
///
/// The tag can be built in code or loaded from a JSON description, and can
/// be flagged invalid or corrupted to exercise the reader's failure paths.
///
/// # Examples
///
/// ```
/// use vtag_hardware::mock::MockVirtualTag;
/// use vtag_hardware::traits::VirtualTag;
///
/// let tag = MockVirtualTag::new("Isabelle", vec![0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66])
///     .with_write_counter(7);
///
/// assert!(tag.is_valid());
/// assert_eq!(tag.tag_info().unwrap().uuid_hex(), "04112233445566");
/// assert_eq!(tag.common_info().unwrap().write_counter, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockVirtualTag {
    name: String,

    uuid: Vec<u8>,

    #[serde(default = "default_date")]
    first_write_date: NaiveDate,

    #[serde(default = "default_date")]
    last_write_date: NaiveDate,

    #[serde(default)]
    write_counter: u16,

    model: ModelInfo,

    #[serde(default = "default_true")]
    valid: bool,

    /// When set, every payload accessor fails as if the dump could not be decoded.
    #[serde(default)]
    corrupted: bool,
}

impl MockVirtualTag {
    /// Create a valid tag with default model and dates.
    pub fn new(name: impl Into<String>, uuid: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            uuid,
            first_write_date: default_date(),
            last_write_date: default_date(),
            write_counter: 0,
            model: ModelInfo {
                game_character_id: 0,
                character_variant: 0,
                figure_type: 0,
                model_number: 0,
                series: 0,
            },
            valid: true,
            corrupted: false,
        }
    }

    /// Parse a tag description from JSON.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidData` if the JSON does not describe a tag.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HardwareError::invalid_data(e.to_string()))
    }

    /// Set the model info.
    pub fn with_model_info(mut self, model: ModelInfo) -> Self {
        self.model = model;
        self
    }

    /// Set the write counter.
    pub fn with_write_counter(mut self, write_counter: u16) -> Self {
        self.write_counter = write_counter;
        self
    }

    /// Set the first and last write dates.
    pub fn with_dates(mut self, first_write: NaiveDate, last_write: NaiveDate) -> Self {
        self.first_write_date = first_write;
        self.last_write_date = last_write;
        self
    }

    /// Mark the tag data as unusable.
    pub fn invalid(mut self) -> Self {
        self.valid = false;
        self
    }

    /// Make every payload accessor fail.
    pub fn corrupted(mut self) -> Self {
        self.corrupted = true;
        self
    }

    fn check_decodable(&self) -> Result<()> {
        if self.corrupted {
            return Err(HardwareError::invalid_data(format!(
                "Dump of '{}' could not be decoded",
                self.name
            )));
        }
        Ok(())
    }
}

impl VirtualTag for MockVirtualTag {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_valid(&self) -> bool {
        self.valid
    }

    fn tag_info(&self) -> Result<TagInfo> {
        self.check_decodable()?;
        Ok(TagInfo::new(&self.uuid)?)
    }

    fn register_info(&self) -> Result<RegisterInfo> {
        self.check_decodable()?;
        Ok(RegisterInfo::new(&self.name, self.first_write_date)?)
    }

    fn model_info(&self) -> Result<ModelInfo> {
        self.check_decodable()?;
        Ok(self.model)
    }

    fn common_info(&self) -> Result<CommonInfo> {
        self.check_decodable()?;
        Ok(CommonInfo::new(self.last_write_date, self.write_counter))
    }
}
