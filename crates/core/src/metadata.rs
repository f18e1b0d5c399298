use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ORIENTATION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub date_taken: Option<DateTime<Local>>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub iso: Option<u32>,
    pub aperture: Option<f64>,
    pub shutter_speed: Option<f64>,
    pub focal_length: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    #[serde(default = "default_orientation")]
    pub orientation: u16,
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self {
            date_taken: None,
            make: None,
            model: None,
            lens: None,
            iso: None,
            aperture: None,
            shutter_speed: None,
            focal_length: None,
            width: None,
            height: None,
            latitude: None,
            longitude: None,
            altitude: None,
            orientation: DEFAULT_ORIENTATION,
        }
    }
}

impl MetadataRecord {
    pub fn normalized_make(&self) -> Option<&str> {
        normalized(self.make.as_deref())
    }

    pub fn normalized_model(&self) -> Option<&str> {
        normalized(self.model.as_deref())
    }

    pub fn normalized_lens(&self) -> Option<&str> {
        normalized(self.lens.as_deref())
    }
}

fn default_orientation() -> u16 {
    DEFAULT_ORIENTATION
}

fn normalized(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Produces a [`MetadataRecord`] from raw file bytes.
///
/// Implementations must not panic on unsupported or corrupt input; they
/// return `None` instead.
pub trait MetadataProvider: Sync {
    fn extract(&self, bytes: &[u8]) -> Option<MetadataRecord>;
}
