//! HTTP client for fetching ActivityPub actor documents.
//!
//! Requests are content-negotiated with `Accept: application/activity+json`
//! (https://www.w3.org/TR/activitypub/#retrieving-objects). The response is kept as
//! an opaque JSON object; only a few well-known members get accessors.

use crate::observe::{ObserverSlot, ResolveEvent, ResolveStage, SharedObserver};
use reqwest::{
    Client, Response,
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Standard ActivityPub content type for requests
pub const ACTIVITYPUB_CONTENT_TYPE: &str = "application/activity+json";

/// Error type for ActivityPub client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Failed with status: {0}")]
    StatusError(reqwest::StatusCode),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Result type for ActivityPub client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Configuration options for ActivityPub client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User agent sent with actor requests. Empty by default: some deployed
    /// servers answer differently once a non-empty agent shows up.
    pub user_agent: String,
    /// Value of the `Accept` header
    pub accept: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            accept: ACTIVITYPUB_CONTENT_TYPE.to_string(),
        }
    }
}

/// An ActivityPub actor as returned by its server.
///
/// The document is passed through untouched; serializing it yields the same
/// members the server sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorDocument(Map<String, Value>);

impl ActorDocument {
    /// The actor's `id`
    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    /// The actor's `type`, e.g. `Person` or `Service`
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn preferred_username(&self) -> Option<&str> {
        self.0.get("preferredUsername").and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// ActivityPub HTTP client for actor retrieval
#[derive(Debug, Clone)]
pub struct ActivityPubClient {
    client: Client,
    config: ClientConfig,
    observer: ObserverSlot,
}

impl ActivityPubClient {
    /// Create a new ActivityPub client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new ActivityPub client with the specified configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Self::with_client(client, config)
    }

    /// Create a client on top of an existing HTTP client, sharing its connection pool
    pub fn with_client(client: Client, config: ClientConfig) -> Result<Self> {
        let this = Self {
            client,
            config,
            observer: ObserverSlot::default(),
        };
        // Reject unusable header values up front instead of on the first request
        this.default_headers()?;
        Ok(this)
    }

    /// Report pipeline events to `observer`
    pub fn with_observer(mut self, observer: Option<SharedObserver>) -> Self {
        self.observer = ObserverSlot::new(observer);
        self
    }

    /// Get default headers for ActivityPub requests
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(&self.config.accept)?);
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.config.user_agent)?);
        Ok(headers)
    }

    /// Fetch an actor profile
    pub async fn fetch_actor(&self, actor_id: &Url) -> Result<ActorDocument> {
        match self.get_actor(actor_id).await {
            Ok(actor) => {
                self.observer
                    .emit(ResolveEvent::ActorFetched { url: actor_id });
                Ok(actor)
            }
            Err(err) => {
                self.report_failure(actor_id.as_str(), &err);
                Err(err)
            }
        }
    }

    /// Fetch an actor from an href taken out of a WebFinger document
    pub async fn fetch_actor_href(&self, href: &str) -> Result<ActorDocument> {
        let actor_id = match Url::parse(href) {
            Ok(actor_id) => actor_id,
            Err(err) => {
                let err = ClientError::from(err);
                self.report_failure(href, &err);
                return Err(err);
            }
        };
        self.fetch_actor(&actor_id).await
    }

    async fn get_actor(&self, actor_id: &Url) -> Result<ActorDocument> {
        let request = self
            .client
            .get(actor_id.clone())
            .headers(self.default_headers()?)
            .build()?;

        let response = self.client.execute(request).await?;
        self.handle_response(response).await
    }

    fn report_failure(&self, target: &str, error: &ClientError) {
        self.observer.emit(ResolveEvent::Failed {
            stage: ResolveStage::Actor,
            target,
            error,
        });
    }

    /// Helper method to handle responses and parse them
    async fn handle_response(&self, response: Response) -> Result<ActorDocument> {
        if !response.status().is_success() {
            return Err(ClientError::StatusError(response.status()));
        }

        let text = response.text().await?;
        let actor = serde_json::from_str::<ActorDocument>(&text)?;

        Ok(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_ACTOR: &str = r#"
        {
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Person",
            "id": "https://example.com/users/test",
            "name": "Test User",
            "preferredUsername": "test",
            "inbox": "https://example.com/users/test/inbox",
            "outbox": "https://example.com/users/test/outbox"
        }
        "#;

    #[tokio::test]
    async fn test_fetch_actor() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let m = server
            .mock("GET", "/users/test")
            .match_header("accept", ACTIVITYPUB_CONTENT_TYPE)
            .match_header("user-agent", "")
            .with_status(200)
            .with_header("content-type", "application/activity+json")
            .with_body(MOCK_ACTOR)
            .create_async()
            .await;

        let client = ActivityPubClient::new().unwrap();
        let url = Url::parse(&format!("{}/users/test", url)).unwrap();

        let actor = client.fetch_actor(&url).await.unwrap();

        assert_eq!(actor.kind(), Some("Person"));
        assert_eq!(actor.id(), Some("https://example.com/users/test"));
        assert_eq!(actor.preferred_username(), Some("test"));
        assert!(actor.as_map().contains_key("inbox"));
        assert!(actor.as_map().contains_key("outbox"));

        let expected: Value = serde_json::from_str(MOCK_ACTOR).unwrap();
        assert_eq!(actor.into_value(), expected);
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_custom_user_agent() {
        let mut server = mockito::Server::new_async().await;

        let m = server
            .mock("GET", "/users/test")
            .match_header("user-agent", "feditil-test/1.0")
            .with_status(200)
            .with_body(MOCK_ACTOR)
            .create_async()
            .await;

        let client = ActivityPubClient::with_config(ClientConfig {
            user_agent: "feditil-test/1.0".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();

        client
            .fetch_actor_href(&format!("{}/users/test", server.url()))
            .await
            .unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status() {
        let mut server = mockito::Server::new_async().await;

        let m = server
            .mock("GET", "/users/gone")
            .with_status(410)
            .create_async()
            .await;

        let client = ActivityPubClient::new().unwrap();
        let err = client
            .fetch_actor_href(&format!("{}/users/gone", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::StatusError(status) if status == reqwest::StatusCode::GONE
        ));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_failures_are_observed() {
        use crate::observe::testing::RecordingObserver;
        use std::sync::Arc;

        let mut server = mockito::Server::new_async().await;
        let m = server
            .mock("GET", "/users/gone")
            .with_status(410)
            .create_async()
            .await;

        let recorder = Arc::new(RecordingObserver::default());
        let client = ActivityPubClient::new()
            .unwrap()
            .with_observer(Some(recorder.clone()));
        let gone = format!("{}/users/gone", server.url());

        assert!(client.fetch_actor_href(&gone).await.is_err());
        assert!(client.fetch_actor_href("/users/relative").await.is_err());

        assert_eq!(
            recorder.labels(),
            vec![
                format!("failed:actor:{}", gone),
                "failed:actor:/users/relative".to_string(),
            ]
        );
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_object_body_is_rejected() {
        let mut server = mockito::Server::new_async().await;

        let m = server
            .mock("GET", "/users/test")
            .with_status(200)
            .with_body(r#"["not", "an", "actor"]"#)
            .create_async()
            .await;

        let client = ActivityPubClient::new().unwrap();
        let err = client
            .fetch_actor_href(&format!("{}/users/test", server.url()))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ParseError(_)));
        m.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_href() {
        let client = ActivityPubClient::new().unwrap();
        let err = client.fetch_actor_href("/users/relative").await.unwrap_err();
        assert!(matches!(err, ClientError::UrlError(_)));
    }

    #[test]
    fn test_invalid_header_config() {
        let err = ActivityPubClient::with_config(ClientConfig {
            user_agent: "bad\nagent".to_string(),
            ..ClientConfig::default()
        })
        .unwrap_err();

        assert!(matches!(err, ClientError::InvalidHeader(_)));
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.user_agent, "");
        assert_eq!(config.accept, ACTIVITYPUB_CONTENT_TYPE);
    }
}
