//! Fallback HTTP client.
//!
//! Used for the operations the realtime protocol does not cover. Every
//! request carries `Authorization: Bearer <token>`; there is no retry.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `delete_automation` | `DELETE /api/config/automation/config/{id}` |
//! | `delete_script` | `DELETE /api/config/script/config/{id}` |
//! | `delete_scene` | `DELETE /api/config/scene/config/{id}` |
//! | `set_state` | `POST /api/states/{entity_id}` |
//! | `api_status` | `GET /api/` |
//!
//! # Status Mapping
//!
//! | Status | Result |
//! |--------|--------|
//! | 200, 204 | `Ok` |
//! | 401 | [`Error::Unauthorized`] |
//! | 403 | [`Error::Forbidden`] |
//! | 404 | [`Error::NotFound`] carrying the id |
//! | other | [`Error::Http`] with the body or canonical reason |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{AccessToken, EntityId};
use crate::model::{Entity, StateUpdate};

// ============================================================================
// Constants
// ============================================================================

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Path of the realtime endpoint, stripped when deriving the REST base.
const WEBSOCKET_PATH: &str = "/api/websocket";

// ============================================================================
// ConfigKind
// ============================================================================

/// Stored configuration kinds deletable over HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigKind {
    Automation,
    Script,
    Scene,
}

impl ConfigKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Automation => "automation",
            Self::Script => "script",
            Self::Scene => "scene",
        }
    }
}

// ============================================================================
// RestClient
// ============================================================================

/// Stateless request/response client for the hub's HTTP API.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base: Url,
    token: AccessToken,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base", &self.base.as_str())
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Creates a client for `url` with a per-request `timeout`.
    ///
    /// `url` may be the hub's base URL or its `ws(s)` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unsupported scheme, or
    /// [`Error::Request`] if the HTTP client cannot be built.
    pub fn new(url: &Url, token: AccessToken, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_http_client(http, url, token)
    }

    /// Creates a client around an existing `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unsupported scheme.
    pub fn with_http_client(http: reqwest::Client, url: &Url, token: AccessToken) -> Result<Self> {
        Ok(Self {
            http,
            base: rest_base_url(url)?,
            token,
        })
    }

    /// Returns the REST base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // ========================================================================
    // Config Deletion
    // ========================================================================

    /// Deletes a stored automation by config id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no automation has this id; see the module
    /// table for other statuses.
    pub async fn delete_automation(&self, id: &str) -> Result<()> {
        self.delete_config(ConfigKind::Automation, id).await
    }

    /// Deletes a stored script by object id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no script has this id; see the module table
    /// for other statuses.
    pub async fn delete_script(&self, id: &str) -> Result<()> {
        self.delete_config(ConfigKind::Script, id).await
    }

    /// Deletes a stored scene by config id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no scene has this id; see the module table for
    /// other statuses.
    pub async fn delete_scene(&self, id: &str) -> Result<()> {
        self.delete_config(ConfigKind::Scene, id).await
    }

    async fn delete_config(&self, kind: ConfigKind, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} id must not be empty",
                kind.as_str()
            )));
        }

        let url = self.endpoint(&["api", "config", kind.as_str(), "config", id])?;
        debug!(kind = kind.as_str(), id, "Deleting stored config");

        let response = self
            .http
            .delete(url)
            .bearer_auth(self.token.expose())
            .send()
            .await?;

        check_status(response, id, &[StatusCode::OK, StatusCode::NO_CONTENT]).await?;
        Ok(())
    }

    // ========================================================================
    // States
    // ========================================================================

    /// Writes an entity's state and attributes.
    ///
    /// This sets the hub's record only; it does not command a device.
    ///
    /// # Errors
    ///
    /// See the module table; the hub answers 200 for an update and 201 for
    /// a newly created entity.
    pub async fn set_state(&self, entity_id: &EntityId, update: &StateUpdate) -> Result<Entity> {
        let url = self.endpoint(&["api", "states", entity_id.as_str()])?;
        debug!(entity_id = %entity_id, state = %update.state, "Writing state");

        let response = self
            .http
            .post(url)
            .bearer_auth(self.token.expose())
            .json(update)
            .send()
            .await?;

        let response = check_status(
            response,
            entity_id.as_str(),
            &[StatusCode::OK, StatusCode::CREATED],
        )
        .await?;

        Ok(response.json::<Entity>().await?)
    }

    /// Returns the hub's API status message (`"API running."`).
    ///
    /// # Errors
    ///
    /// See the module table.
    pub async fn api_status(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Status {
            message: String,
        }

        let url = self.endpoint(&["api", ""])?;
        let response = self
            .http
            .get(url)
            .bearer_auth(self.token.expose())
            .send()
            .await?;

        let response = check_status(response, "api", &[StatusCode::OK]).await?;
        Ok(response.json::<Status>().await?.message)
    }

    /// Appends percent-encoded `segments` to the base path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("base URL {} cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Derives the REST base URL from a hub URL.
///
/// `ws` becomes `http`, `wss` becomes `https`, and a trailing
/// `/api/websocket` is removed. `http(s)` URLs are kept as-is.
///
/// # Errors
///
/// Returns [`Error::Config`] for any other scheme.
pub fn rest_base_url(url: &Url) -> Result<Url> {
    let scheme = match url.scheme() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => {
            return Err(Error::config(format!(
                "unsupported URL scheme '{other}', expected http, https, ws or wss"
            )));
        }
    };

    let mut base = url.clone();
    base.set_scheme(scheme)
        .map_err(|()| Error::config(format!("cannot use scheme '{scheme}' for {url}")))?;

    let path = base.path().trim_end_matches('/').to_string();
    let path = path.strip_suffix(WEBSOCKET_PATH).unwrap_or(&path);
    base.set_path(if path.is_empty() { "/" } else { path });
    base.set_query(None);
    base.set_fragment(None);

    Ok(base)
}

/// Maps a response status to the crate error taxonomy.
async fn check_status(response: Response, resource: &str, accepted: &[StatusCode]) -> Result<Response> {
    let status = response.status();
    if accepted.contains(&status) {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    } else {
        body.trim().to_string()
    };

    warn!(status = status.as_u16(), resource, "HTTP request rejected");

    Err(match status {
        StatusCode::UNAUTHORIZED => Error::Unauthorized { message },
        StatusCode::FORBIDDEN => Error::Forbidden { message },
        StatusCode::NOT_FOUND => Error::not_found(resource),
        _ => Error::http(status.as_u16(), message),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> RestClient {
        let url = Url::parse(&server.uri()).expect("url");
        RestClient::new(&url, AccessToken::new("secret"), Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn test_rest_base_url_mapping() {
        let cases = [
            ("http://hass.local:8123", "http://hass.local:8123/"),
            ("ws://hass.local:8123/api/websocket", "http://hass.local:8123/"),
            ("wss://hass.example.com/api/websocket", "https://hass.example.com/"),
            ("https://proxy.example.com/ha/", "https://proxy.example.com/ha"),
        ];

        for (input, expected) in cases {
            let url = rest_base_url(&Url::parse(input).expect("url")).expect("map");
            assert_eq!(url.as_str(), expected, "input {input}");
        }
    }

    #[tokio::test]
    async fn test_delete_automation_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/config/automation/config/kitchen_lights"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client
            .delete_automation("kitchen_lights")
            .await
            .expect("delete");
    }

    #[tokio::test]
    async fn test_delete_no_content_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/config/script/config/goodnight"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.delete_script("goodnight").await.expect("delete");
    }

    #[tokio::test]
    async fn test_delete_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/config/automation/config/kitchen_lights"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Resource not found"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .delete_automation("kitchen_lights")
            .await
            .expect_err("should fail");

        assert!(err.is_not_found());
        assert!(err.to_string().contains("not found: kitchen_lights"));
    }

    #[tokio::test]
    async fn test_delete_auth_failures() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/config/scene/config/movie"))
            .respond_with(ResponseTemplate::new(401).set_body_string("401: Unauthorized"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/config/scene/config/party"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server).await;

        match client.delete_scene("movie").await {
            Err(Error::Unauthorized { message }) => assert_eq!(message, "401: Unauthorized"),
            other => panic!("unexpected: {other:?}"),
        }
        match client.delete_scene("party").await {
            Err(Error::Forbidden { message }) => assert_eq!(message, "Forbidden"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_other_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        match client.delete_automation("x").await {
            Err(Error::Http { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_encodes_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/config/automation/config/a%2Fb"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        client.delete_automation("a/b").await.expect("delete");
    }

    #[tokio::test]
    async fn test_delete_rejects_empty_id() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        let err = client.delete_automation("  ").await.expect_err("reject");
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_set_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/states/sensor.outside"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_json(json!({"state": "21.5", "attributes": {"unit_of_measurement": "°C"}})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "entity_id": "sensor.outside",
                "state": "21.5",
                "attributes": {"unit_of_measurement": "°C"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let entity_id = EntityId::parse("sensor.outside").expect("id");
        let update = StateUpdate::new("21.5").with_attribute("unit_of_measurement", "°C");

        let entity = client.set_state(&entity_id, &update).await.expect("set");
        assert_eq!(entity.state, "21.5");
        assert_eq!(entity.attributes["unit_of_measurement"], "°C");
    }

    #[tokio::test]
    async fn test_api_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "API running."})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert_eq!(client.api_status().await.expect("status"), "API running.");
    }

    #[test]
    fn test_debug_redacts_token() {
        let url = Url::parse("http://hass.local:8123").expect("url");
        let client = RestClient::new(&url, AccessToken::new("secret"), DEFAULT_HTTP_TIMEOUT).expect("client");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret"));
    }
}
