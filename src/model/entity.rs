//! Entity state types.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Target;

// ============================================================================
// Entity
// ============================================================================

/// Snapshot of one entity's state as reported by the hub.
///
/// # Format
///
/// ```json
/// {
///   "entity_id": "light.kitchen",
///   "state": "on",
///   "attributes": { "brightness": 180 },
///   "last_changed": "2024-05-01T10:00:00+00:00",
///   "last_updated": "2024-05-01T10:00:00+00:00",
///   "context": { "id": "01HX...", "parent_id": null, "user_id": null }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// `domain.object_id` identifier.
    pub entity_id: String,

    /// Current state string.
    pub state: String,

    /// Full attribute map, kept verbatim.
    #[serde(default)]
    pub attributes: Map<String, Value>,

    /// Last time the state value changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<String>,

    /// Last time the state or attributes changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Context of the change that produced this state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
}

impl Entity {
    /// Returns the domain part of the entity id.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or_default()
    }

    /// Returns the `friendly_name` attribute, if any.
    #[must_use]
    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes.get("friendly_name").and_then(Value::as_str)
    }

    /// Returns `true` if the entity id starts with `prefix`.
    #[inline]
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.entity_id.starts_with(prefix)
    }
}

// ============================================================================
// Context
// ============================================================================

/// Origin of a state change or service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Context id.
    pub id: String,
    /// Parent context id.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// User who triggered the change.
    #[serde(default)]
    pub user_id: Option<String>,
}

// ============================================================================
// StateUpdate
// ============================================================================

/// New state to write for an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    /// New state value.
    pub state: String,
    /// Attributes to store alongside the state.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl StateUpdate {
    /// Creates an update with no attributes.
    #[must_use]
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    /// Adds one attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// ServiceCall
// ============================================================================

/// A `(domain, service)` invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceCall {
    /// Service domain (e.g. `light`).
    pub domain: String,
    /// Service name (e.g. `turn_on`).
    pub service: String,
    /// Service data payload.
    pub service_data: Option<Value>,
    /// Entities/devices/areas/labels to act on.
    pub target: Option<Target>,
    /// Ask the hub to include the service response.
    pub return_response: bool,
}

impl ServiceCall {
    /// Creates a call with no data or target.
    #[must_use]
    pub fn new(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            ..Default::default()
        }
    }

    /// Sets the service data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.service_data = Some(data);
        self
    }

    /// Sets the target.
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Requests the service response.
    #[must_use]
    pub fn with_response(mut self) -> Self {
        self.return_response = true;
        self
    }
}

// ============================================================================
// HassConfig
// ============================================================================

/// Subset of the hub's core configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HassConfig {
    /// Display name of the installation.
    #[serde(default)]
    pub location_name: String,
    /// Hub version.
    #[serde(default)]
    pub version: String,
    /// Time zone name.
    #[serde(default)]
    pub time_zone: String,
    /// Loaded integrations.
    #[serde(default)]
    pub components: Vec<String>,
    /// Run state (`RUNNING`, `STARTING`, ...).
    #[serde(default)]
    pub state: Option<String>,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_entity_deserialize_keeps_attributes() {
        let entity: Entity = serde_json::from_value(json!({
            "entity_id": "light.kitchen",
            "state": "on",
            "attributes": {"brightness": 180, "friendly_name": "Kitchen"},
            "last_changed": "2024-05-01T10:00:00+00:00",
            "context": {"id": "abc"}
        }))
        .expect("parse");

        assert_eq!(entity.domain(), "light");
        assert_eq!(entity.friendly_name(), Some("Kitchen"));
        assert_eq!(entity.attributes.get("brightness"), Some(&json!(180)));
        assert_eq!(entity.context.map(|c| c.id), Some("abc".to_string()));
    }

    #[test]
    fn test_entity_missing_attributes_defaults() {
        let entity: Entity =
            serde_json::from_value(json!({"entity_id": "sun.sun", "state": "above_horizon"}))
                .expect("parse");
        assert!(entity.attributes.is_empty());
        assert!(entity.last_updated.is_none());
    }

    #[test]
    fn test_state_update_serialization() {
        let update = StateUpdate::new("42").with_attribute("unit_of_measurement", "W");
        let json = serde_json::to_value(&update).expect("serialize");
        assert_eq!(
            json,
            json!({"state": "42", "attributes": {"unit_of_measurement": "W"}})
        );
    }

    #[test]
    fn test_service_call_builder() {
        let call = ServiceCall::new("light", "turn_on")
            .with_data(json!({"brightness": 100}))
            .with_target(Target::entities(["light.kitchen"]))
            .with_response();
        assert_eq!(call.domain, "light");
        assert!(call.return_response);
        assert!(call.target.is_some());
    }

    #[test]
    fn test_config_keeps_unknown_fields() {
        let config: HassConfig = serde_json::from_value(json!({
            "location_name": "Home",
            "version": "2024.5.0",
            "time_zone": "Europe/Berlin",
            "components": ["light"],
            "unit_system": {"length": "km"}
        }))
        .expect("parse");
        assert_eq!(config.version, "2024.5.0");
        assert!(config.extra.contains_key("unit_system"));
    }
}
