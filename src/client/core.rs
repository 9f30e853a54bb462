//! Hybrid dispatcher.
//!
//! [`HybridClient`] routes every operation to the realtime socket except the
//! three config deletions, which go over HTTP.
//!
//! # Routing
//!
//! | Operation | Path | Contract |
//! |-----------|------|----------|
//! | `get_states` | socket | `get_states` |
//! | `get_state` | socket | `get_states`, then lookup |
//! | `set_state` | HTTP | `POST /api/states/{id}` |
//! | `call_service` | socket | `call_service` |
//! | `list_automations/scripts/scenes/helpers` | socket | `get_states`, then prefix filter |
//! | `delete_automation/script/scene` | HTTP | `DELETE /api/config/{kind}/config/{id}` |
//! | `trigger_automation` | socket | service `automation.trigger` |
//! | `run_script` | socket | service `script.turn_on` |
//! | `activate_scene` | socket | service `scene.turn_on` |
//! | helpers | socket | `{platform}/create`, `{platform}/update`, `{platform}/delete` |
//! | everything else | socket | typed [`Command`] |
//!
//! # Example
//!
//! ```no_run
//! use hass_bridge::{HomeAssistant, HybridClient};
//!
//! # async fn example() -> hass_bridge::Result<()> {
//! let client = HybridClient::builder()
//!     .url("http://homeassistant.local:8123")
//!     .token("long-lived-token")
//!     .connect()
//!     .await?;
//!
//! for script in client.list_scripts().await? {
//!     println!("{} = {}", script.entity_id, script.state);
//! }
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::{Error, Result};
use crate::identifiers::EntityId;
use crate::model::{
    AreaEntry, BrowseMedia, DeviceEntry, Entity, EntityEntry, FloorEntry, HassConfig, HelperKind,
    LabelEntry, ServiceCall, StateUpdate, StatisticMetadata, StatisticValue, StatisticsQuery,
    Target, TargetExtraction,
};
use crate::protocol::Command;
use crate::rest::RestClient;
use crate::transport::WsClient;

use super::builder::ClientBuilder;
use super::capability::HomeAssistant;

// ============================================================================
// Constants
// ============================================================================

const AUTOMATION_PREFIX: &str = "automation.";
const SCRIPT_PREFIX: &str = "script.";
const SCENE_PREFIX: &str = "scene.";

// ============================================================================
// HybridClient
// ============================================================================

/// Socket-first client with an HTTP fallback for config deletions.
///
/// Cheap to clone; clones share the socket.
#[derive(Clone)]
pub struct HybridClient {
    ws: WsClient,
    rest: RestClient,
}

impl fmt::Debug for HybridClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridClient")
            .field("ws", &self.ws)
            .field("rest", &self.rest)
            .finish()
    }
}

// ============================================================================
// HybridClient - Constructor
// ============================================================================

impl HybridClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Composes a client from an already connected socket and an HTTP client.
    #[inline]
    #[must_use]
    pub fn from_parts(ws: WsClient, rest: RestClient) -> Self {
        Self { ws, rest }
    }

    /// Returns the socket client.
    #[inline]
    #[must_use]
    pub fn ws(&self) -> &WsClient {
        &self.ws
    }

    /// Returns the HTTP client.
    #[inline]
    #[must_use]
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }
}

// ============================================================================
// HybridClient - Internal Helpers
// ============================================================================

impl HybridClient {
    /// Sends a typed command and decodes its result.
    async fn request<T: DeserializeOwned>(&self, command: Command) -> Result<T> {
        let value = self.ws.send(command).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Sends a command by name.
    async fn request_raw(&self, command_type: &str, params: Map<String, Value>) -> Result<Value> {
        self.ws.send_command(command_type, params).await
    }

    /// Fetches the snapshot and keeps entities matching any prefix.
    async fn list_by_prefix(&self, prefixes: &[&str]) -> Result<Vec<Entity>> {
        let states = self.get_states().await?;
        Ok(states
            .into_iter()
            .filter(|entity| prefixes.iter().any(|prefix| entity.has_prefix(prefix)))
            .collect())
    }

    /// Calls `domain.service` on one entity.
    async fn call_on_entity(
        &self,
        domain: &str,
        service: &str,
        entity_id: &str,
        data: Option<Value>,
    ) -> Result<()> {
        let entity_id = EntityId::parse(entity_id)?;
        let mut call = ServiceCall::new(domain, service)
            .with_target(Target::entities([entity_id.as_str()]));
        if let Some(data) = data {
            call = call.with_data(data);
        }
        self.call_service(call).await?;
        Ok(())
    }
}

// ============================================================================
// HomeAssistant Implementation
// ============================================================================

#[async_trait]
impl HomeAssistant for HybridClient {
    // ========================================================================
    // States
    // ========================================================================

    async fn get_states(&self) -> Result<Vec<Entity>> {
        self.request(Command::GetStates).await
    }

    async fn get_state(&self, entity_id: &str) -> Result<Entity> {
        let entity_id = EntityId::parse(entity_id)?;
        self.get_states()
            .await?
            .into_iter()
            .find(|entity| entity.entity_id == entity_id.as_str())
            .ok_or_else(|| Error::not_found(entity_id.as_str()))
    }

    async fn set_state(&self, entity_id: &str, update: StateUpdate) -> Result<Entity> {
        let entity_id = EntityId::parse(entity_id)?;
        self.rest.set_state(&entity_id, &update).await
    }

    async fn call_service(&self, call: ServiceCall) -> Result<Vec<Entity>> {
        let value = self
            .ws
            .send(Command::CallService {
                domain: call.domain,
                service: call.service,
                service_data: call.service_data,
                target: call.target.filter(|target| !target.is_empty()),
                return_response: call.return_response.then_some(true),
            })
            .await?;

        Ok(decode_changed_entities(value))
    }

    async fn get_config(&self) -> Result<HassConfig> {
        self.request(Command::GetConfig).await
    }

    async fn get_services(&self) -> Result<Map<String, Value>> {
        self.request(Command::GetServices).await
    }

    // ========================================================================
    // Automations
    // ========================================================================

    async fn list_automations(&self) -> Result<Vec<Entity>> {
        self.list_by_prefix(&[AUTOMATION_PREFIX]).await
    }

    async fn get_automation_config(&self, entity_id: &str) -> Result<Value> {
        self.ws
            .send(Command::AutomationConfig {
                entity_id: entity_id.to_string(),
            })
            .await
    }

    async fn create_automation(&self, config: Value) -> Result<Value> {
        self.ws.send(Command::CreateAutomation { config }).await
    }

    async fn update_automation(&self, automation_id: &str, config: Value) -> Result<Value> {
        self.ws
            .send(Command::UpdateAutomation {
                automation_id: automation_id.to_string(),
                config,
            })
            .await
    }

    async fn delete_automation(&self, automation_id: &str) -> Result<()> {
        self.rest.delete_automation(automation_id).await
    }

    async fn trigger_automation(&self, entity_id: &str) -> Result<()> {
        self.call_on_entity("automation", "trigger", entity_id, None)
            .await
    }

    // ========================================================================
    // Scripts
    // ========================================================================

    async fn list_scripts(&self) -> Result<Vec<Entity>> {
        self.list_by_prefix(&[SCRIPT_PREFIX]).await
    }

    async fn get_script_config(&self, entity_id: &str) -> Result<Value> {
        self.ws
            .send(Command::ScriptConfig {
                entity_id: entity_id.to_string(),
            })
            .await
    }

    async fn create_script(&self, script_id: &str, config: Value) -> Result<Value> {
        self.ws
            .send(Command::CreateScript {
                script_id: script_id.to_string(),
                config,
            })
            .await
    }

    async fn update_script(&self, script_id: &str, config: Value) -> Result<Value> {
        self.ws
            .send(Command::UpdateScript {
                script_id: script_id.to_string(),
                config,
            })
            .await
    }

    async fn delete_script(&self, script_id: &str) -> Result<()> {
        self.rest.delete_script(script_id).await
    }

    async fn run_script(&self, entity_id: &str, variables: Option<Value>) -> Result<()> {
        let data = variables.map(|variables| json!({ "variables": variables }));
        self.call_on_entity("script", "turn_on", entity_id, data)
            .await
    }

    // ========================================================================
    // Scenes
    // ========================================================================

    async fn list_scenes(&self) -> Result<Vec<Entity>> {
        self.list_by_prefix(&[SCENE_PREFIX]).await
    }

    async fn create_scene(&self, config: Value) -> Result<Value> {
        self.ws.send(Command::CreateScene { config }).await
    }

    async fn update_scene(&self, scene_id: &str, config: Value) -> Result<Value> {
        self.ws
            .send(Command::UpdateScene {
                scene_id: scene_id.to_string(),
                config,
            })
            .await
    }

    async fn delete_scene(&self, scene_id: &str) -> Result<()> {
        self.rest.delete_scene(scene_id).await
    }

    async fn activate_scene(&self, entity_id: &str) -> Result<()> {
        self.call_on_entity("scene", "turn_on", entity_id, None)
            .await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn list_helpers(&self) -> Result<Vec<Entity>> {
        let prefixes = HelperKind::ALL.map(HelperKind::prefix);
        self.list_by_prefix(&prefixes).await
    }

    async fn create_helper(&self, kind: HelperKind, config: Value) -> Result<Value> {
        let params = object_params(kind, config)?;
        self.request_raw(&format!("{kind}/create"), params).await
    }

    async fn update_helper(&self, kind: HelperKind, helper_id: &str, config: Value) -> Result<Value> {
        let mut params = object_params(kind, config)?;
        params.insert(kind.id_field(), Value::String(helper_id.to_string()));
        self.request_raw(&format!("{kind}/update"), params).await
    }

    async fn delete_helper(&self, kind: HelperKind, helper_id: &str) -> Result<()> {
        let mut params = Map::new();
        params.insert(kind.id_field(), Value::String(helper_id.to_string()));
        self.request_raw(&format!("{kind}/delete"), params).await?;
        Ok(())
    }

    // ========================================================================
    // Registries
    // ========================================================================

    async fn list_entity_registry(&self) -> Result<Vec<EntityEntry>> {
        self.request(Command::EntityRegistryList).await
    }

    async fn get_entity_registry_entry(&self, entity_id: &str) -> Result<EntityEntry> {
        self.request(Command::EntityRegistryGet {
            entity_id: entity_id.to_string(),
        })
        .await
    }

    async fn update_entity_registry_entry(
        &self,
        entity_id: &str,
        changes: Map<String, Value>,
    ) -> Result<EntityEntry> {
        let mut value = self
            .ws
            .send(Command::EntityRegistryUpdate {
                entity_id: entity_id.to_string(),
                changes,
            })
            .await?;

        // Newer hubs wrap the entry as {"entity_entry": {...}, ...}.
        let entry = value.get_mut("entity_entry").map(Value::take);
        Ok(serde_json::from_value(entry.unwrap_or(value))?)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceEntry>> {
        self.request(Command::DeviceRegistryList).await
    }

    async fn list_areas(&self) -> Result<Vec<AreaEntry>> {
        self.request(Command::AreaRegistryList).await
    }

    async fn list_floors(&self) -> Result<Vec<FloorEntry>> {
        self.request(Command::FloorRegistryList).await
    }

    async fn list_labels(&self) -> Result<Vec<LabelEntry>> {
        self.request(Command::LabelRegistryList).await
    }

    // ========================================================================
    // Media
    // ========================================================================

    async fn browse_media(
        &self,
        entity_id: &str,
        media_content_id: Option<&str>,
        media_content_type: Option<&str>,
    ) -> Result<BrowseMedia> {
        self.request(Command::BrowseMedia {
            entity_id: entity_id.to_string(),
            media_content_id: media_content_id.map(str::to_string),
            media_content_type: media_content_type.map(str::to_string),
        })
        .await
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    async fn statistics_during_period(
        &self,
        query: StatisticsQuery,
    ) -> Result<BTreeMap<String, Vec<StatisticValue>>> {
        if query.statistic_ids.is_empty() {
            return Err(Error::invalid_argument("at least one statistic id is required"));
        }
        self.request(Command::StatisticsDuringPeriod { query }).await
    }

    async fn list_statistic_ids(&self, statistic_type: Option<&str>) -> Result<Vec<StatisticMetadata>> {
        self.request(Command::ListStatisticIds {
            statistic_type: statistic_type.map(str::to_string),
        })
        .await
    }

    // ========================================================================
    // Targets
    // ========================================================================

    async fn extract_from_target(&self, target: Target, expand_group: bool) -> Result<TargetExtraction> {
        self.request(Command::ExtractFromTarget {
            target,
            expand_group,
        })
        .await
    }

    async fn get_triggers_for_target(&self, target: Target, expand_group: bool) -> Result<Vec<String>> {
        self.request(Command::TriggersForTarget {
            target,
            expand_group,
        })
        .await
    }

    async fn get_conditions_for_target(&self, target: Target, expand_group: bool) -> Result<Vec<String>> {
        self.request(Command::ConditionsForTarget {
            target,
            expand_group,
        })
        .await
    }

    async fn get_services_for_target(&self, target: Target, expand_group: bool) -> Result<Vec<String>> {
        self.request(Command::ServicesForTarget {
            target,
            expand_group,
        })
        .await
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    async fn close(&self) -> Result<()> {
        self.ws.close().await
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a `call_service` result as changed entities.
///
/// Hubs that answer with a bare context (or a service response object)
/// yield an empty list instead of an error.
fn decode_changed_entities(value: Value) -> Vec<Entity> {
    match serde_json::from_value::<Vec<Entity>>(value) {
        Ok(entities) => entities,
        Err(e) => {
            debug!(error = %e, "Service result carries no entity list");
            Vec::new()
        }
    }
}

/// Requires a helper config to be a JSON object.
fn object_params(kind: HelperKind, config: Value) -> Result<Map<String, Value>> {
    match config {
        Value::Object(params) => Ok(params),
        other => Err(Error::invalid_argument(format!(
            "{kind} config must be a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use url::Url;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::identifiers::AccessToken;
    use crate::transport::TransportOptions;
    use crate::transport::mock_hub::{HUB_TOKEN, MockHub, Reply};

    #[test]
    fn test_decode_changed_entities_list() {
        let value = json!([
            {"entity_id": "light.kitchen", "state": "on", "attributes": {}}
        ]);
        let entities = decode_changed_entities(value);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_id, "light.kitchen");
    }

    #[test]
    fn test_decode_changed_entities_tolerates_context_only() {
        let value = json!({"context": {"id": "01HX", "parent_id": null, "user_id": null}});
        assert!(decode_changed_entities(value).is_empty());
        assert!(decode_changed_entities(Value::Null).is_empty());
    }

    #[test]
    fn test_object_params_rejects_non_objects() {
        let err = object_params(HelperKind::InputBoolean, json!(["x"])).expect_err("reject");
        assert!(err.to_string().contains("input_boolean config must be a JSON object, got array"));

        let params = object_params(HelperKind::InputNumber, json!({"name": "Level", "min": 0}))
            .expect("object");
        assert_eq!(params["name"], "Level");
    }

    #[test]
    fn test_client_is_clone_send_sync() {
        fn assert_traits<T: Clone + Send + Sync + fmt::Debug>() {}
        assert_traits::<HybridClient>();
    }

    // ========================================================================
    // Dispatch against a live hub
    // ========================================================================

    fn snapshot() -> Value {
        json!([
            {
                "entity_id": "script.morning_routine",
                "state": "off",
                "attributes": {"friendly_name": "Morning Routine", "icon": "mdi:weather-sunny"}
            },
            {"entity_id": "script.goodnight", "state": "on", "attributes": {}},
            {"entity_id": "light.living_room", "state": "on", "attributes": {"brightness": 200}},
            {"entity_id": "input_boolean.guest_mode", "state": "off", "attributes": {}},
            {"entity_id": "input_number.target_temp", "state": "21", "attributes": {}},
            {"entity_id": "automation.porch", "state": "on", "attributes": {}}
        ])
    }

    fn snapshot_handler(frame: &Value) -> Reply {
        match frame["type"].as_str() {
            Some("get_states") => Reply::Ok(snapshot()),
            Some("call_service") => Reply::Ok(json!({"context": {"id": "01HX"}})),
            _ => Reply::Ok(Value::Null),
        }
    }

    async fn hybrid(hub: &MockHub, rest_url: &str) -> HybridClient {
        let options = TransportOptions::new().with_heartbeat_interval(Duration::ZERO);
        let ws = WsClient::connect(hub.url(), AccessToken::new(HUB_TOKEN), options)
            .await
            .expect("connect");
        let rest_url = Url::parse(rest_url).expect("url");
        let rest = RestClient::new(&rest_url, AccessToken::new(HUB_TOKEN), Duration::from_secs(5))
            .expect("rest");
        HybridClient::from_parts(ws, rest)
    }

    #[tokio::test]
    async fn test_list_scripts_filters_by_domain() {
        let hub = MockHub::with_handler(snapshot_handler).await;
        let client = hybrid(&hub, "http://127.0.0.1:9").await;

        let scripts = client.list_scripts().await.expect("list");
        let ids: Vec<_> = scripts.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["script.morning_routine", "script.goodnight"]);
        assert_eq!(scripts[0].friendly_name(), Some("Morning Routine"));
        assert_eq!(scripts[0].attributes["icon"], "mdi:weather-sunny");

        let helpers = client.list_helpers().await.expect("helpers");
        assert_eq!(helpers.len(), 2);

        assert!(client.list_scenes().await.expect("scenes").is_empty());
    }

    #[tokio::test]
    async fn test_get_state_lookup() {
        let hub = MockHub::with_handler(snapshot_handler).await;
        let client = hybrid(&hub, "http://127.0.0.1:9").await;

        let light = client.get_state("light.living_room").await.expect("found");
        assert_eq!(light.attributes["brightness"], 200);

        let err = client.get_state("light.attic").await.expect_err("missing");
        assert!(err.is_not_found());

        let err = client.get_state("not an id").await.expect_err("invalid");
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_call_service_tolerates_context_reply() {
        let hub = MockHub::with_handler(snapshot_handler).await;
        let client = hybrid(&hub, "http://127.0.0.1:9").await;

        let changed = client
            .call_service(ServiceCall::new("light", "turn_on").with_target(Target::new()))
            .await
            .expect("call");
        assert!(changed.is_empty());

        let frame = &hub.commands_of("call_service")[0];
        assert_eq!(frame["domain"], "light");
        assert_eq!(frame["service"], "turn_on");
        assert!(frame.get("target").is_none());
        assert!(frame.get("return_response").is_none());
    }

    #[tokio::test]
    async fn test_entity_actions_use_services() {
        let hub = MockHub::with_handler(snapshot_handler).await;
        let client = hybrid(&hub, "http://127.0.0.1:9").await;

        client.trigger_automation("automation.porch").await.expect("trigger");
        client
            .run_script("script.goodnight", Some(json!({"delay": 5})))
            .await
            .expect("run");
        client.activate_scene("scene.movie").await.expect("activate");

        let calls = hub.commands_of("call_service");
        let services: Vec<_> = calls
            .iter()
            .map(|c| format!("{}.{}", c["domain"].as_str().unwrap_or(""), c["service"].as_str().unwrap_or("")))
            .collect();
        assert_eq!(services, vec!["automation.trigger", "script.turn_on", "scene.turn_on"]);
        assert_eq!(calls[1]["service_data"], json!({"variables": {"delay": 5}}));
        assert_eq!(calls[2]["target"], json!({"entity_id": ["scene.movie"]}));
    }

    #[tokio::test]
    async fn test_helper_command_names() {
        let hub = MockHub::start().await;
        let client = hybrid(&hub, "http://127.0.0.1:9").await;

        client
            .create_helper(HelperKind::InputBoolean, json!({"name": "Guest mode"}))
            .await
            .expect("create");
        client
            .update_helper(HelperKind::InputNumber, "target_temp", json!({"max": 30}))
            .await
            .expect("update");
        client
            .delete_helper(HelperKind::InputSelect, "scene_picker")
            .await
            .expect("delete");

        let commands = hub.commands();
        assert_eq!(commands[0]["type"], "input_boolean/create");
        assert_eq!(commands[0]["name"], "Guest mode");
        assert_eq!(commands[1]["type"], "input_number/update");
        assert_eq!(commands[1]["input_number_id"], "target_temp");
        assert_eq!(commands[2]["type"], "input_select/delete");
        assert_eq!(commands[2]["input_select_id"], "scene_picker");
    }

    #[tokio::test]
    async fn test_delete_goes_over_http() {
        let hub = MockHub::start().await;
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/config/automation/config/porch_lights"))
            .and(header("authorization", format!("Bearer {HUB_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = hybrid(&hub, &server.uri()).await;
        client.delete_automation("porch_lights").await.expect("delete");

        assert!(hub.commands().is_empty());
    }

    #[tokio::test]
    async fn test_set_state_goes_over_http() {
        let hub = MockHub::start().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/states/input_boolean.guest_mode"))
            .and(header("authorization", format!("Bearer {HUB_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "entity_id": "input_boolean.guest_mode",
                "state": "on",
                "attributes": {}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = hybrid(&hub, &server.uri()).await;
        let entity = client
            .set_state("input_boolean.guest_mode", StateUpdate::new("on"))
            .await
            .expect("set");
        assert_eq!(entity.state, "on");

        let err = client
            .set_state("not an id", StateUpdate::new("on"))
            .await
            .expect_err("invalid");
        assert!(matches!(err, Error::InvalidArgument { .. }));

        assert!(hub.commands().is_empty());
    }

    #[tokio::test]
    async fn test_statistics_require_ids() {
        let hub = MockHub::start().await;
        let client = hybrid(&hub, "http://127.0.0.1:9").await;

        let query = StatisticsQuery::new("2024-05-01T00:00:00Z", Vec::<String>::new());
        let err = client.statistics_during_period(query).await.expect_err("empty ids");
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(hub.commands().is_empty());
    }

    #[tokio::test]
    async fn test_close_disconnects_socket() {
        let hub = MockHub::start().await;
        let client = hybrid(&hub, "http://127.0.0.1:9").await;

        client.close().await.expect("close");
        assert!(!client.ws().is_connected());

        let err = client.get_states().await.expect_err("closed");
        assert!(matches!(err, Error::NotConnected));
    }
}
