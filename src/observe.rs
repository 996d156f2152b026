//! Observation hooks for the resolution pipeline.
//!
//! The library never logs on its own. Callers that want to see what a
//! resolution is doing hand a [`ResolveObserver`] to the clients; the
//! [`TracingObserver`] forwards every event to `tracing`.

use crate::identifier::NormalizedIdentifier;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A state transition inside one resolution call
#[derive(Debug, Clone, Copy)]
pub enum ResolveEvent<'a> {
    /// The normalizer ran; `normalized` is `None` for unresolvable input
    Normalized {
        candidate: &'a str,
        normalized: Option<&'a NormalizedIdentifier>,
    },

    /// A WebFinger document was fetched and parsed
    DiscoveryQueried {
        identifier: &'a NormalizedIdentifier,
        url: &'a Url,
    },

    /// Link selection finished; `href` is `None` when nothing matched
    LinkSelected {
        identifier: &'a NormalizedIdentifier,
        rel: Option<&'a str>,
        media_type: Option<&'a str>,
        href: Option<&'a str>,
    },

    /// The actor document was fetched and parsed
    ActorFetched { url: &'a Url },

    /// A network stage failed; `target` is the identifier or actor URL involved
    Failed {
        stage: ResolveStage,
        target: &'a str,
        error: &'a (dyn Error + 'static),
    },
}

/// The pipeline stage a [`ResolveEvent::Failed`] comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStage {
    Discovery,
    Actor,
}

impl fmt::Display for ResolveStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolveStage::Discovery => "discovery",
            ResolveStage::Actor => "actor",
        })
    }
}

/// Receives [`ResolveEvent`]s as a resolution progresses
pub trait ResolveObserver: Send + Sync {
    fn observe(&self, event: &ResolveEvent<'_>);
}

/// Shared handle to an observer, as stored by the clients
pub type SharedObserver = Arc<dyn ResolveObserver>;

/// Observer that emits each event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ResolveObserver for TracingObserver {
    fn observe(&self, event: &ResolveEvent<'_>) {
        match event {
            ResolveEvent::Normalized {
                candidate,
                normalized,
            } => {
                tracing::trace!(
                    candidate = %candidate,
                    normalized = ?normalized.map(NormalizedIdentifier::as_str),
                    "Normalized identifier"
                );
            }
            ResolveEvent::DiscoveryQueried { identifier, url } => {
                tracing::debug!(identifier = %identifier, url = %url, "WebFinger document fetched");
            }
            ResolveEvent::LinkSelected {
                identifier,
                rel,
                media_type,
                href,
            } => {
                tracing::trace!(
                    identifier = %identifier,
                    rel = ?rel,
                    media_type = ?media_type,
                    href = ?href,
                    "Selected WebFinger link"
                );
            }
            ResolveEvent::ActorFetched { url } => {
                tracing::debug!(url = %url, "Actor document fetched");
            }
            ResolveEvent::Failed {
                stage,
                target,
                error,
            } => {
                tracing::debug!(stage = %stage, target = %target, error = %error, "Resolution failed");
            }
        }
    }
}

/// Optional observer slot used by the clients
#[derive(Clone, Default)]
pub(crate) struct ObserverSlot(Option<SharedObserver>);

impl ObserverSlot {
    pub(crate) fn new(observer: Option<SharedObserver>) -> Self {
        Self(observer)
    }

    pub(crate) fn emit(&self, event: ResolveEvent<'_>) {
        if let Some(observer) = &self.0 {
            observer.observe(&event);
        }
    }
}

impl fmt::Debug for ObserverSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() {
            "ObserverSlot(Some(..))"
        } else {
            "ObserverSlot(None)"
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records a short label for every event it sees
    #[derive(Default)]
    pub(crate) struct RecordingObserver {
        pub(crate) events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        pub(crate) fn labels(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ResolveObserver for RecordingObserver {
        fn observe(&self, event: &ResolveEvent<'_>) {
            let label = match event {
                ResolveEvent::Normalized {
                    normalized: Some(id),
                    ..
                } => format!("normalized:{}", id),
                ResolveEvent::Normalized {
                    candidate,
                    normalized: None,
                } => format!("unresolvable:{}", candidate),
                ResolveEvent::DiscoveryQueried { identifier, .. } => {
                    format!("discovery:{}", identifier)
                }
                ResolveEvent::LinkSelected { href, .. } => {
                    format!("link:{}", href.unwrap_or("-"))
                }
                ResolveEvent::ActorFetched { url } => format!("actor:{}", url),
                ResolveEvent::Failed { stage, target, .. } => {
                    format!("failed:{}:{}", stage, target)
                }
            };
            self.events.lock().unwrap().push(label);
        }
    }
}
