//! Fediverse identity resolution.
//!
//! Turns what a user types (a profile URL, an `acct:` URI or a `user@domain`
//! handle) into the matching WebFinger document and ActivityPub actor:
//!
//! 1. [`normalize`] canonicalizes the input, without network access
//! 2. [`WebFingerClient`] looks the identifier up via
//!    [WebFinger](https://datatracker.ietf.org/doc/html/rfc7033) and selects links
//! 3. [`ActivityPubClient`] fetches the actor the `self` link points at
//!
//! [`Resolver`] chains all three.
//!
//! ```no_run
//! # async fn run() -> Result<(), feditil::ResolveError> {
//! let resolver = feditil::Resolver::new()?;
//! if let Some(id) = resolver.normalize("@alice@example.social") {
//!     if let Some(actor) = resolver.resolve_actor(&id).await? {
//!         println!("{}", serde_json::to_string(&actor).unwrap());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod identifier;
pub mod observe;
pub mod resolve;
pub mod webfinger;

pub use client::{ACTIVITYPUB_CONTENT_TYPE, ActivityPubClient, ActorDocument, ClientConfig};
pub use identifier::{IdentifierKind, NormalizedIdentifier, normalize};
pub use observe::{ResolveEvent, ResolveObserver, ResolveStage, SharedObserver, TracingObserver};
pub use resolve::{ResolveError, Resolver, ResolverConfig};
pub use webfinger::{JrdResource, Link, LinkFilter, WebFingerClient};
