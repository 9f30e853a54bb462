//! The operation surface consumed by callers.
//!
//! [`HomeAssistant`] is implemented by [`HybridClient`](super::HybridClient);
//! the trait exists so callers and tests can substitute fakes.
//!
//! Every method is cancellable by dropping its future. [`close`] is always
//! present and defaults to a no-op.
//!
//! [`close`]: HomeAssistant::close

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::{
    AreaEntry, BrowseMedia, DeviceEntry, Entity, EntityEntry, FloorEntry, HassConfig, HelperKind,
    LabelEntry, ServiceCall, StateUpdate, StatisticMetadata, StatisticValue, StatisticsQuery,
    Target, TargetExtraction,
};

// ============================================================================
// HomeAssistant
// ============================================================================

/// Entity, automation, script, scene, helper, registry, media, statistics
/// and target operations.
#[async_trait]
pub trait HomeAssistant: Send + Sync {
    // ========================================================================
    // States
    // ========================================================================

    /// Returns every entity's current state.
    async fn get_states(&self) -> Result<Vec<Entity>>;

    /// Returns one entity's state.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if the entity
    /// does not exist.
    async fn get_state(&self, entity_id: &str) -> Result<Entity>;

    /// Writes an entity's state record.
    async fn set_state(&self, entity_id: &str, update: StateUpdate) -> Result<Entity>;

    /// Invokes a service and returns the entities it changed.
    ///
    /// Services that answer with only a context yield an empty list.
    async fn call_service(&self, call: ServiceCall) -> Result<Vec<Entity>>;

    /// Returns the hub's core configuration.
    async fn get_config(&self) -> Result<HassConfig>;

    /// Returns the service catalogue keyed by domain.
    async fn get_services(&self) -> Result<Map<String, Value>>;

    // ========================================================================
    // Automations
    // ========================================================================

    /// Lists `automation.*` entities.
    async fn list_automations(&self) -> Result<Vec<Entity>>;

    /// Returns an automation's stored configuration.
    async fn get_automation_config(&self, entity_id: &str) -> Result<Value>;

    /// Creates an automation.
    async fn create_automation(&self, config: Value) -> Result<Value>;

    /// Replaces an automation's configuration.
    async fn update_automation(&self, automation_id: &str, config: Value) -> Result<Value>;

    /// Deletes an automation by config id.
    async fn delete_automation(&self, automation_id: &str) -> Result<()>;

    /// Runs an automation's actions now.
    async fn trigger_automation(&self, entity_id: &str) -> Result<()>;

    // ========================================================================
    // Scripts
    // ========================================================================

    /// Lists `script.*` entities.
    async fn list_scripts(&self) -> Result<Vec<Entity>>;

    /// Returns a script's stored configuration.
    async fn get_script_config(&self, entity_id: &str) -> Result<Value>;

    /// Creates a script.
    async fn create_script(&self, script_id: &str, config: Value) -> Result<Value>;

    /// Replaces a script's configuration.
    async fn update_script(&self, script_id: &str, config: Value) -> Result<Value>;

    /// Deletes a script by object id.
    async fn delete_script(&self, script_id: &str) -> Result<()>;

    /// Runs a script, optionally with variables.
    async fn run_script(&self, entity_id: &str, variables: Option<Value>) -> Result<()>;

    // ========================================================================
    // Scenes
    // ========================================================================

    /// Lists `scene.*` entities.
    async fn list_scenes(&self) -> Result<Vec<Entity>>;

    /// Creates a scene.
    async fn create_scene(&self, config: Value) -> Result<Value>;

    /// Replaces a scene's configuration.
    async fn update_scene(&self, scene_id: &str, config: Value) -> Result<Value>;

    /// Deletes a scene by config id.
    async fn delete_scene(&self, scene_id: &str) -> Result<()>;

    /// Activates a scene.
    async fn activate_scene(&self, entity_id: &str) -> Result<()>;

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Lists entities of all five helper platforms.
    async fn list_helpers(&self) -> Result<Vec<Entity>>;

    /// Creates a helper.
    async fn create_helper(&self, kind: HelperKind, config: Value) -> Result<Value>;

    /// Updates a helper.
    async fn update_helper(&self, kind: HelperKind, helper_id: &str, config: Value) -> Result<Value>;

    /// Deletes a helper.
    async fn delete_helper(&self, kind: HelperKind, helper_id: &str) -> Result<()>;

    // ========================================================================
    // Registries
    // ========================================================================

    /// Lists the entity registry.
    async fn list_entity_registry(&self) -> Result<Vec<EntityEntry>>;

    /// Returns one entity registry entry.
    async fn get_entity_registry_entry(&self, entity_id: &str) -> Result<EntityEntry>;

    /// Updates one entity registry entry.
    async fn update_entity_registry_entry(
        &self,
        entity_id: &str,
        changes: Map<String, Value>,
    ) -> Result<EntityEntry>;

    /// Lists the device registry.
    async fn list_devices(&self) -> Result<Vec<DeviceEntry>>;

    /// Lists the area registry.
    async fn list_areas(&self) -> Result<Vec<AreaEntry>>;

    /// Lists the floor registry.
    async fn list_floors(&self) -> Result<Vec<FloorEntry>>;

    /// Lists the label registry.
    async fn list_labels(&self) -> Result<Vec<LabelEntry>>;

    // ========================================================================
    // Media
    // ========================================================================

    /// Browses a media player's library. `None` browses the root.
    async fn browse_media(
        &self,
        entity_id: &str,
        media_content_id: Option<&str>,
        media_content_type: Option<&str>,
    ) -> Result<BrowseMedia>;

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Returns aggregated statistics keyed by statistic id.
    async fn statistics_during_period(
        &self,
        query: StatisticsQuery,
    ) -> Result<BTreeMap<String, Vec<StatisticValue>>>;

    /// Lists recorded statistic ids, optionally only `mean` or `sum` ones.
    async fn list_statistic_ids(&self, statistic_type: Option<&str>) -> Result<Vec<StatisticMetadata>>;

    // ========================================================================
    // Targets
    // ========================================================================

    /// Expands a target into concrete entity, device and area ids.
    async fn extract_from_target(&self, target: Target, expand_group: bool) -> Result<TargetExtraction>;

    /// Returns trigger types applicable to a target.
    async fn get_triggers_for_target(&self, target: Target, expand_group: bool) -> Result<Vec<String>>;

    /// Returns condition types applicable to a target.
    async fn get_conditions_for_target(&self, target: Target, expand_group: bool) -> Result<Vec<String>>;

    /// Returns services applicable to a target.
    async fn get_services_for_target(&self, target: Target, expand_group: bool) -> Result<Vec<String>>;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Releases connections. Safe to call more than once.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
