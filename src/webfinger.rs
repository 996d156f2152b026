//! WebFinger client implementation based on RFC 7033
//!
//! Builds the `/.well-known/webfinger` URL for a normalized identifier, fetches the
//! JSON Resource Descriptor (JRD) and selects links from it by relation and media type.
//! https://datatracker.ietf.org/doc/html/rfc7033

use crate::identifier::{IdentifierKind, NormalizedIdentifier};
use crate::observe::{ObserverSlot, ResolveEvent, ResolveStage, SharedObserver};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Error types specific to WebFinger operations
#[derive(Debug, Error)]
pub enum WebFingerError {
    #[error("Invalid resource URI: {0}")]
    InvalidResource(String),

    #[error("Failed to construct WebFinger URL: {0}")]
    UrlConstructionError(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error response: {0}")]
    HttpError(reqwest::StatusCode),
}

/// Result type for WebFinger operations
pub type Result<T> = std::result::Result<T, WebFingerError>;

/// Characters left as-is in the `resource` value: RFC 3986 unreserved plus `/`.
/// Everything else is percent-encoded, a space as `%20`.
const RESOURCE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Link object as defined in RFC 7033
///
/// Every member is optional; servers in the wild omit all of them at some point.
/// A `rel`, `type` or `href` that is not a string reads as absent, so one malformed
/// link does not make the whole document unreadable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    /// The "rel" parameter describes the type of resource being linked
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub rel: Option<String>,

    /// The "type" parameter contains the media type of the target resource
    #[serde(
        rename = "type",
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub type_: Option<String>,

    /// The "href" parameter contains the target URI
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub href: Option<String>,

    /// The "titles" parameter contains human-readable labels for the link
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titles: Option<Map<String, Value>>,

    /// The "properties" parameter contains additional information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,

    /// Members outside RFC 7033, such as OStatus "template"
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn string_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        _ => None,
    })
}

impl Link {
    /// Whether this link satisfies `filter`. A link without the filtered-on
    /// member never matches.
    pub fn matches(&self, filter: &LinkFilter<'_>) -> bool {
        let rel_ok = filter
            .rel
            .is_none_or(|rel| self.rel.as_deref() == Some(rel));
        let type_ok = filter
            .media_type
            .is_none_or(|media_type| self.type_.as_deref() == Some(media_type));
        rel_ok && type_ok
    }
}

/// Relation and media type constraints for link selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkFilter<'a> {
    pub rel: Option<&'a str>,
    pub media_type: Option<&'a str>,
}

impl<'a> LinkFilter<'a> {
    pub fn new(rel: Option<&'a str>, media_type: Option<&'a str>) -> Self {
        Self { rel, media_type }
    }

    /// The filter used to locate an ActivityPub actor
    pub fn activitypub_self() -> Self {
        Self::new(Some("self"), Some(crate::client::ACTIVITYPUB_CONTENT_TYPE))
    }
}

/// JSON Resource Descriptor (JRD) as defined in RFC 7033
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JrdResource {
    /// The "subject" parameter identifies the entity that the JRD describes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// The "aliases" parameter is an array of zero or more URI strings
    /// that identify the same entity as the "subject" URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,

    /// The "properties" parameter contains additional information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,

    /// The "links" parameter contains links related to the entity, in document order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,

    /// Any other top-level members the server sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JrdResource {
    /// Find the first link, in document order, that matches `filter`
    pub fn find_link(&self, filter: &LinkFilter<'_>) -> Option<&Link> {
        self.links
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|link| link.matches(filter))
    }

    /// Find all links that match `filter`, in document order
    pub fn find_links(&self, filter: &LinkFilter<'_>) -> Vec<&Link> {
        self.links
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|link| link.matches(filter))
            .collect()
    }

    /// The href of the first link that matches `filter` and has an href.
    /// Matching links without one are skipped.
    pub fn first_href(&self, filter: &LinkFilter<'_>) -> Option<&str> {
        self.links
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|link| link.matches(filter))
            .find_map(|link| link.href.as_deref())
    }
}

/// WebFinger client implementation
#[derive(Debug, Clone)]
pub struct WebFingerClient {
    client: Client,
    scheme: &'static str,
    observer: ObserverSlot,
}

impl WebFingerClient {
    /// Create a new WebFinger client
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new WebFinger client with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            scheme: "https",
            observer: ObserverSlot::default(),
        }
    }

    /// Send discovery requests over plain `http`. Only meant for local
    /// development servers.
    pub fn with_insecure_http(mut self, enabled: bool) -> Self {
        self.scheme = if enabled { "http" } else { "https" };
        self
    }

    /// Report pipeline events to `observer`
    pub fn with_observer(mut self, observer: Option<SharedObserver>) -> Self {
        self.observer = ObserverSlot::new(observer);
        self
    }

    /// Build the WebFinger URL for `identifier`.
    ///
    /// `acct:user@domain` is looked up at `domain`; an `http(s)` URL is looked up at
    /// its own host. The whole identifier becomes the percent-encoded `resource`
    /// query parameter.
    ///
    /// # Panics
    ///
    /// Panics if an `acct:` identifier has no `@` after its first character.
    /// Callers holding user input should check
    /// [`NormalizedIdentifier::discovery_host`] first.
    pub fn webfinger_url(&self, identifier: &NormalizedIdentifier) -> Result<Url> {
        let host = match identifier.kind() {
            IdentifierKind::Acct => match identifier.acct_parts() {
                Some((_, "")) => {
                    return Err(WebFingerError::InvalidResource(format!(
                        "acct URI has an empty domain: {}",
                        identifier
                    )));
                }
                Some((_, domain)) => domain.to_string(),
                None => panic!(
                    "acct identifier '{}' has no '@' separating user and domain",
                    identifier
                ),
            },
            IdentifierKind::Url => identifier.discovery_host().ok_or_else(|| {
                WebFingerError::InvalidResource(format!(
                    "Cannot extract host from URI: {}",
                    identifier
                ))
            })?,
        };

        let mut webfinger_url =
            Url::parse(&format!("{}://{}/.well-known/webfinger", self.scheme, host))?;
        // Not query_pairs_mut: form encoding turns a space into `+`
        webfinger_url.set_query(Some(&format!(
            "resource={}",
            utf8_percent_encode(identifier.as_str(), RESOURCE_ENCODE_SET)
        )));

        Ok(webfinger_url)
    }

    /// Perform a WebFinger lookup and return the parsed JRD
    pub async fn finger(&self, identifier: &NormalizedIdentifier) -> Result<JrdResource> {
        match self.lookup(identifier).await {
            Ok((webfinger_url, jrd)) => {
                self.observer.emit(ResolveEvent::DiscoveryQueried {
                    identifier,
                    url: &webfinger_url,
                });
                Ok(jrd)
            }
            Err(err) => {
                self.observer.emit(ResolveEvent::Failed {
                    stage: ResolveStage::Discovery,
                    target: identifier.as_str(),
                    error: &err,
                });
                Err(err)
            }
        }
    }

    async fn lookup(&self, identifier: &NormalizedIdentifier) -> Result<(Url, JrdResource)> {
        let webfinger_url = self.webfinger_url(identifier)?;

        let response = self.client.get(webfinger_url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(WebFingerError::HttpError(response.status()));
        }

        let body = response.text().await?;
        let jrd = serde_json::from_str::<JrdResource>(&body)?;

        Ok((webfinger_url, jrd))
    }

    /// Look up `identifier` and return the href of the first link matching `filter`.
    ///
    /// `Ok(None)` means the lookup worked but no usable link was found.
    pub async fn first_link_href(
        &self,
        identifier: &NormalizedIdentifier,
        filter: LinkFilter<'_>,
    ) -> Result<Option<String>> {
        let jrd = self.finger(identifier).await?;
        let href = jrd.first_href(&filter).map(str::to_string);

        self.observer.emit(ResolveEvent::LinkSelected {
            identifier,
            rel: filter.rel,
            media_type: filter.media_type,
            href: href.as_deref(),
        });

        Ok(href)
    }
}

impl Default for WebFingerClient {
    fn default() -> Self {
        Self::new()
    }
}
