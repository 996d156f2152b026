//! Identifier normalization for Fediverse handles and profile URLs.
//!
//! Users type identities in many shapes: `https://example.social/users/alice`,
//! `acct:alice@example.social`, `alice@example.social` or `@alice@example.social`.
//! [`normalize`] maps all of them onto the two forms the rest of the crate accepts,
//! and rejects everything else without touching the network.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// `user@domain` with an optional leading `@`, nothing else.
static HANDLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@?([^@]+)@([^@]+)$").unwrap());

/// Which of the two accepted shapes a [`NormalizedIdentifier`] has
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// An `http://` or `https://` URL pointing at a profile or actor
    Url,
    /// An `acct:user@domain` discovery handle
    Acct,
}

/// An identifier in one of the two canonical forms.
///
/// Only [`normalize`] constructs these, so holding one means the string either
/// starts with `http://`/`https://` or with `acct:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedIdentifier(String);

impl NormalizedIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn kind(&self) -> IdentifierKind {
        if self.0.starts_with("acct:") {
            IdentifierKind::Acct
        } else {
            IdentifierKind::Url
        }
    }

    pub fn is_acct(&self) -> bool {
        self.kind() == IdentifierKind::Acct
    }

    /// Split an `acct:` identifier into `(user, domain)` at the first `@` after
    /// position 0. Returns `None` for URL identifiers and for handles without `@`.
    pub fn acct_parts(&self) -> Option<(&str, &str)> {
        if !self.is_acct() {
            return None;
        }
        let at = self.0[1..].find('@')? + 1;
        Some((&self.0["acct:".len()..at], &self.0[at + 1..]))
    }

    /// The authority the WebFinger request for this identifier is sent to.
    ///
    /// For `acct:user@domain` this is everything after the separating `@`
    /// (including any port). For URLs it is the host, plus the port when it is
    /// not the scheme default.
    pub fn discovery_host(&self) -> Option<String> {
        match self.kind() {
            IdentifierKind::Acct => self.acct_parts().map(|(_, domain)| domain.to_string()),
            IdentifierKind::Url => {
                let url = Url::parse(&self.0).ok()?;
                let host = url.host_str()?;
                Some(match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for NormalizedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a user-supplied identifier.
///
/// Rules, first match wins:
/// 1. `http://...` and `https://...` are returned unchanged
/// 2. `acct:...` is returned unchanged
/// 3. `user@domain` or `@user@domain` (exactly one separating `@`) becomes
///    `acct:user@domain`
///
/// Anything else yields `None`.
pub fn normalize(candidate: &str) -> Option<NormalizedIdentifier> {
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(NormalizedIdentifier(candidate.to_string()));
    }

    if candidate.starts_with("acct:") {
        return Some(NormalizedIdentifier(candidate.to_string()));
    }

    let captures = HANDLE_PATTERN.captures(candidate)?;
    Some(NormalizedIdentifier(format!(
        "acct:{}@{}",
        &captures[1], &captures[2]
    )))
}
