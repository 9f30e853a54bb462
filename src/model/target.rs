//! Operation target selector.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Target
// ============================================================================

/// Selects entities directly or through devices, areas, floors and labels.
///
/// Empty lists are omitted on the wire.
///
/// ```ignore
/// let target = Target::entities(["light.kitchen"]).with_area("living_room");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Entity ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_id: Vec<String>,
    /// Device ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_id: Vec<String>,
    /// Area ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub area_id: Vec<String>,
    /// Floor ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub floor_id: Vec<String>,
    /// Label ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_id: Vec<String>,
}

impl Target {
    /// Creates an empty target.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a target selecting the given entities.
    #[must_use]
    pub fn entities<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entity_id: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Adds an entity id.
    #[must_use]
    pub fn with_entity(mut self, id: impl Into<String>) -> Self {
        self.entity_id.push(id.into());
        self
    }

    /// Adds a device id.
    #[must_use]
    pub fn with_device(mut self, id: impl Into<String>) -> Self {
        self.device_id.push(id.into());
        self
    }

    /// Adds an area id.
    #[must_use]
    pub fn with_area(mut self, id: impl Into<String>) -> Self {
        self.area_id.push(id.into());
        self
    }

    /// Adds a floor id.
    #[must_use]
    pub fn with_floor(mut self, id: impl Into<String>) -> Self {
        self.floor_id.push(id.into());
        self
    }

    /// Adds a label id.
    #[must_use]
    pub fn with_label(mut self, id: impl Into<String>) -> Self {
        self.label_id.push(id.into());
        self
    }

    /// Returns `true` if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_id.is_empty()
            && self.device_id.is_empty()
            && self.area_id.is_empty()
            && self.floor_id.is_empty()
            && self.label_id.is_empty()
    }
}

// ============================================================================
// TargetExtraction
// ============================================================================

/// Result of expanding a [`Target`] into concrete ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetExtraction {
    /// Entities referenced by the target.
    #[serde(default)]
    pub referenced_entities: Vec<String>,
    /// Devices referenced by the target.
    #[serde(default)]
    pub referenced_devices: Vec<String>,
    /// Areas referenced by the target.
    #[serde(default)]
    pub referenced_areas: Vec<String>,
    /// Explicitly named entities that do not exist.
    #[serde(default)]
    pub missing_entities: Vec<String>,
    /// Explicitly named devices that do not exist.
    #[serde(default)]
    pub missing_devices: Vec<String>,
    /// Explicitly named areas that do not exist.
    #[serde(default)]
    pub missing_areas: Vec<String>,
}

// ============================================================================
// Tests
// ============================================================================
