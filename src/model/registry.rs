//! Registry entry types.
//!
//! Each entry decodes the fields callers commonly need and keeps everything
//! else in `extra` so newer hub versions decode without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entity registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEntry {
    /// Entity id.
    pub entity_id: String,
    /// Registry-internal id.
    #[serde(default)]
    pub id: Option<String>,
    /// Integration that provides the entity.
    #[serde(default)]
    pub platform: Option<String>,
    /// User-assigned name.
    #[serde(default)]
    pub name: Option<String>,
    /// Owning device.
    #[serde(default)]
    pub device_id: Option<String>,
    /// Assigned area.
    #[serde(default)]
    pub area_id: Option<String>,
    /// Disabling source, if disabled.
    #[serde(default)]
    pub disabled_by: Option<String>,
    /// Hiding source, if hidden.
    #[serde(default)]
    pub hidden_by: Option<String>,
    /// Assigned labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Device registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Device id.
    pub id: String,
    /// Integration-reported name.
    #[serde(default)]
    pub name: Option<String>,
    /// User-assigned name.
    #[serde(default)]
    pub name_by_user: Option<String>,
    /// Manufacturer.
    #[serde(default)]
    pub manufacturer: Option<String>,
    /// Model.
    #[serde(default)]
    pub model: Option<String>,
    /// Assigned area.
    #[serde(default)]
    pub area_id: Option<String>,
    /// Assigned labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Area registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaEntry {
    /// Area id.
    pub area_id: String,
    /// Display name.
    pub name: String,
    /// Floor the area belongs to.
    #[serde(default)]
    pub floor_id: Option<String>,
    /// Alternative names.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Assigned labels.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Floor registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorEntry {
    /// Floor id.
    pub floor_id: String,
    /// Display name.
    pub name: String,
    /// Floor level, 0 is ground.
    #[serde(default)]
    pub level: Option<i64>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Label registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    /// Label id.
    pub label_id: String,
    /// Display name.
    pub name: String,
    /// Color name or hex.
    #[serde(default)]
    pub color: Option<String>,
    /// Icon.
    #[serde(default)]
    pub icon: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
