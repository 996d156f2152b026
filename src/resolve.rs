//! Identity resolution: identifier → WebFinger → ActivityPub actor.
//!
//! [`Resolver`] chains the three stages. Each call is independent: nothing is
//! cached and nothing is retried, so a `Resolver` can be shared between tasks
//! resolving different identifiers at the same time.

use crate::client::{ActivityPubClient, ActorDocument, ClientConfig, ClientError};
use crate::identifier::{self, NormalizedIdentifier};
use crate::observe::{ObserverSlot, ResolveEvent, SharedObserver};
use crate::webfinger::{JrdResource, LinkFilter, WebFingerClient, WebFingerError};
use reqwest::Client;
use thiserror::Error;

/// Failure of one stage of a resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to set up HTTP clients: {0}")]
    Setup(#[source] ClientError),

    #[error("WebFinger discovery failed: {0}")]
    Discovery(#[from] WebFingerError),

    #[error("Actor fetch failed: {0}")]
    Actor(#[from] ClientError),
}

/// Result type for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Settings for building a [`Resolver`]
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Settings for the actor fetch
    pub client: ClientConfig,
    /// Use plain `http` for WebFinger discovery
    pub insecure_http: bool,
}

/// Resolves user-supplied identifiers to WebFinger documents and ActivityPub actors
#[derive(Debug, Clone)]
pub struct Resolver {
    webfinger: WebFingerClient,
    activitypub: ActivityPubClient,
    observer: ObserverSlot,
}

impl Resolver {
    /// Create a resolver with default settings and no observer
    pub fn new() -> Result<Self> {
        Self::with_config(ResolverConfig::default(), None)
    }

    /// Create a resolver. Both stages share one HTTP connection pool.
    pub fn with_config(config: ResolverConfig, observer: Option<SharedObserver>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .map_err(|err| ResolveError::Setup(err.into()))?;

        let webfinger = WebFingerClient::with_client(http.clone())
            .with_insecure_http(config.insecure_http)
            .with_observer(observer.clone());
        let activitypub = ActivityPubClient::with_client(http, config.client)
            .map_err(ResolveError::Setup)?
            .with_observer(observer.clone());

        Ok(Self {
            webfinger,
            activitypub,
            observer: ObserverSlot::new(observer),
        })
    }

    /// Normalize `candidate`, reporting the outcome to the observer.
    /// See [`identifier::normalize`] for the rules.
    pub fn normalize(&self, candidate: &str) -> Option<NormalizedIdentifier> {
        let normalized = identifier::normalize(candidate);
        self.observer.emit(ResolveEvent::Normalized {
            candidate,
            normalized: normalized.as_ref(),
        });
        normalized
    }

    /// Fetch the raw WebFinger document for `identifier`
    pub async fn webfinger(&self, identifier: &NormalizedIdentifier) -> Result<JrdResource> {
        Ok(self.webfinger.finger(identifier).await?)
    }

    /// Fetch the WebFinger document and return the first link href matching `filter`
    pub async fn first_link_href(
        &self,
        identifier: &NormalizedIdentifier,
        filter: LinkFilter<'_>,
    ) -> Result<Option<String>> {
        Ok(self.webfinger.first_link_href(identifier, filter).await?)
    }

    /// Resolve `identifier` to its ActivityPub actor.
    ///
    /// `Ok(None)` means discovery worked but advertised no
    /// `self`/`application/activity+json` link.
    pub async fn resolve_actor(
        &self,
        identifier: &NormalizedIdentifier,
    ) -> Result<Option<ActorDocument>> {
        let Some(href) = self
            .first_link_href(identifier, LinkFilter::activitypub_self())
            .await?
        else {
            return Ok(None);
        };

        let actor = self.activitypub.fetch_actor_href(&href).await?;
        Ok(Some(actor))
    }
}
