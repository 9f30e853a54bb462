//! Helper (input primitive) platforms.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// HelperKind
// ============================================================================

/// The five helper platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperKind {
    /// `input_boolean`
    InputBoolean,
    /// `input_number`
    InputNumber,
    /// `input_text`
    InputText,
    /// `input_select`
    InputSelect,
    /// `input_datetime`
    InputDatetime,
}

impl HelperKind {
    /// All helper platforms.
    pub const ALL: [HelperKind; 5] = [
        HelperKind::InputBoolean,
        HelperKind::InputNumber,
        HelperKind::InputText,
        HelperKind::InputSelect,
        HelperKind::InputDatetime,
    ];

    /// Platform / domain name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputBoolean => "input_boolean",
            Self::InputNumber => "input_number",
            Self::InputText => "input_text",
            Self::InputSelect => "input_select",
            Self::InputDatetime => "input_datetime",
        }
    }

    /// Entity id prefix (`input_boolean.`).
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::InputBoolean => "input_boolean.",
            Self::InputNumber => "input_number.",
            Self::InputText => "input_text.",
            Self::InputSelect => "input_select.",
            Self::InputDatetime => "input_datetime.",
        }
    }

    /// Key naming the helper in update/delete commands (`input_boolean_id`).
    #[must_use]
    pub fn id_field(self) -> String {
        format!("{}_id", self.as_str())
    }

    /// Returns the helper platform of an entity id, if it is a helper.
    #[must_use]
    pub fn from_entity_id(entity_id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| entity_id.starts_with(kind.prefix()))
    }
}

impl fmt::Display for HelperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HelperKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::invalid_argument(format!("unknown helper type '{s}'")))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_id_field() {
        assert_eq!(HelperKind::InputNumber.prefix(), "input_number.");
        assert_eq!(HelperKind::InputSelect.id_field(), "input_select_id");
    }

    #[test]
    fn test_from_entity_id() {
        assert_eq!(
            HelperKind::from_entity_id("input_datetime.alarm"),
            Some(HelperKind::InputDatetime)
        );
        assert_eq!(HelperKind::from_entity_id("light.kitchen"), None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "input_text".parse::<HelperKind>().expect("parse"),
            HelperKind::InputText
        );
        assert!("input_button".parse::<HelperKind>().is_err());
    }
}
