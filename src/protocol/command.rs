//! Typed command definitions.
//!
//! Each variant serializes to `{"type": "<command>", ...params}`; the
//! transport adds the `id` envelope.
//!
//! # Command Groups
//!
//! | Group | Commands |
//! |-------|----------|
//! | core | `get_states`, `get_config`, `get_services`, `call_service`, `ping` |
//! | config | `automation/config`, `script/config`, `config/{automation,script,scene}/{create,update}` |
//! | registries | `config/{entity,device,area,floor,label}_registry/*` |
//! | media | `media_player/browse_media` |
//! | recorder | `recorder/statistics_during_period`, `recorder/list_statistic_ids` |
//! | targets | `extract_from_target`, `get_{triggers,conditions,services}_for_target` |
//!
//! Helper commands (`input_boolean/create`, ...) have per-platform names and
//! go through the untyped `(type, params)` path instead.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{StatisticsQuery, Target};

// ============================================================================
// Command
// ============================================================================

/// All typed protocol commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Command {
    // ========================================================================
    // Core
    // ========================================================================
    /// Full entity-state snapshot.
    #[serde(rename = "get_states")]
    GetStates,

    /// Core configuration.
    #[serde(rename = "get_config")]
    GetConfig,

    /// Service catalogue by domain.
    #[serde(rename = "get_services")]
    GetServices,

    /// Invoke a service.
    #[serde(rename = "call_service")]
    CallService {
        /// Service domain.
        domain: String,
        /// Service name.
        service: String,
        /// Service data.
        #[serde(skip_serializing_if = "Option::is_none")]
        service_data: Option<Value>,
        /// Target selector.
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<Target>,
        /// Include the service response.
        #[serde(skip_serializing_if = "Option::is_none")]
        return_response: Option<bool>,
    },

    /// Heartbeat.
    #[serde(rename = "ping")]
    Ping,

    // ========================================================================
    // Config
    // ========================================================================
    /// Read an automation's stored configuration.
    #[serde(rename = "automation/config")]
    AutomationConfig {
        /// `automation.*` entity id.
        entity_id: String,
    },

    /// Create an automation.
    #[serde(rename = "config/automation/create")]
    CreateAutomation {
        /// Automation configuration.
        config: Value,
    },

    /// Replace an automation's configuration.
    #[serde(rename = "config/automation/update")]
    UpdateAutomation {
        /// Automation config id.
        automation_id: String,
        /// New configuration.
        config: Value,
    },

    /// Read a script's stored configuration.
    #[serde(rename = "script/config")]
    ScriptConfig {
        /// `script.*` entity id.
        entity_id: String,
    },

    /// Create a script.
    #[serde(rename = "config/script/create")]
    CreateScript {
        /// Script object id.
        script_id: String,
        /// Script configuration.
        config: Value,
    },

    /// Replace a script's configuration.
    #[serde(rename = "config/script/update")]
    UpdateScript {
        /// Script object id.
        script_id: String,
        /// New configuration.
        config: Value,
    },

    /// Create a scene.
    #[serde(rename = "config/scene/create")]
    CreateScene {
        /// Scene configuration.
        config: Value,
    },

    /// Replace a scene's configuration.
    #[serde(rename = "config/scene/update")]
    UpdateScene {
        /// Scene config id.
        scene_id: String,
        /// New configuration.
        config: Value,
    },

    // ========================================================================
    // Registries
    // ========================================================================
    /// List entity registry.
    #[serde(rename = "config/entity_registry/list")]
    EntityRegistryList,

    /// Read one entity registry entry.
    #[serde(rename = "config/entity_registry/get")]
    EntityRegistryGet {
        /// Entity id.
        entity_id: String,
    },

    /// Update one entity registry entry.
    #[serde(rename = "config/entity_registry/update")]
    EntityRegistryUpdate {
        /// Entity id.
        entity_id: String,
        /// Fields to change (`name`, `area_id`, `labels`, ...).
        #[serde(flatten)]
        changes: Map<String, Value>,
    },

    /// List device registry.
    #[serde(rename = "config/device_registry/list")]
    DeviceRegistryList,

    /// List area registry.
    #[serde(rename = "config/area_registry/list")]
    AreaRegistryList,

    /// List floor registry.
    #[serde(rename = "config/floor_registry/list")]
    FloorRegistryList,

    /// List label registry.
    #[serde(rename = "config/label_registry/list")]
    LabelRegistryList,

    // ========================================================================
    // Media
    // ========================================================================
    /// Browse a media player's library.
    #[serde(rename = "media_player/browse_media")]
    BrowseMedia {
        /// `media_player.*` entity id.
        entity_id: String,
        /// Node to browse, root if absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        media_content_id: Option<String>,
        /// Type of the node to browse.
        #[serde(skip_serializing_if = "Option::is_none")]
        media_content_type: Option<String>,
    },

    // ========================================================================
    // Recorder
    // ========================================================================
    /// Aggregated statistics over a period.
    #[serde(rename = "recorder/statistics_during_period")]
    StatisticsDuringPeriod {
        /// Query parameters.
        #[serde(flatten)]
        query: StatisticsQuery,
    },

    /// Recorded statistic ids.
    #[serde(rename = "recorder/list_statistic_ids")]
    ListStatisticIds {
        /// `mean` or `sum`, all if absent.
        #[serde(skip_serializing_if = "Option::is_none")]
        statistic_type: Option<String>,
    },

    // ========================================================================
    // Targets
    // ========================================================================
    /// Expand a target into concrete ids.
    #[serde(rename = "extract_from_target")]
    ExtractFromTarget {
        /// Selector.
        target: Target,
        /// Expand group entities.
        expand_group: bool,
    },

    /// Triggers applicable to a target.
    #[serde(rename = "get_triggers_for_target")]
    TriggersForTarget {
        /// Selector.
        target: Target,
        /// Expand group entities.
        expand_group: bool,
    },

    /// Conditions applicable to a target.
    #[serde(rename = "get_conditions_for_target")]
    ConditionsForTarget {
        /// Selector.
        target: Target,
        /// Expand group entities.
        expand_group: bool,
    },

    /// Services applicable to a target.
    #[serde(rename = "get_services_for_target")]
    ServicesForTarget {
        /// Selector.
        target: Target,
        /// Expand group entities.
        expand_group: bool,
    },
}

impl Command {
    /// Splits the command into its name and flat parameter map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails, or [`Error::Protocol`]
    /// if the command does not serialize to a tagged object.
    pub fn into_parts(self) -> Result<(String, Map<String, Value>)> {
        match serde_json::to_value(&self)? {
            Value::Object(mut params) => match params.remove("type") {
                Some(Value::String(command_type)) => Ok((command_type, params)),
                _ => Err(Error::protocol("command serialized without a type tag")),
            },
            _ => Err(Error::protocol("command did not serialize to an object")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
