//! The `webfinger-resolve` and `actor-resolve` sub-commands
//!
//! Every identifier is handled on its own: a failure is logged and the batch
//! moves on to the next identifier. Successful lookups are written as one JSON
//! line each, in the order the identifiers were given.

use feditil::{NormalizedIdentifier, Resolver};
use futures::{StreamExt, stream};
use miette::{IntoDiagnostic, Result, miette};
use std::io::Write;
use tracing::{error, info};

/// What happened to a single identifier
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// Resolved; carries the JSON line to print
    Found(String),
    Unresolvable,
    NotFound,
    Failed,
}

/// Tally of a batch run
#[derive(Debug, Default, PartialEq)]
pub struct Summary {
    pub total: usize,
    pub failed: usize,
}

impl Summary {
    pub fn into_result(self) -> Result<()> {
        if self.failed == 0 {
            return Ok(());
        }
        Err(miette!(
            help = "Run with -v for details on each identifier",
            "{} of {} identifiers could not be resolved",
            self.failed,
            self.total
        ))
    }
}

/// Normalize `candidate` and make sure it can be looked up
fn prepare(resolver: &Resolver, candidate: &str) -> Option<NormalizedIdentifier> {
    info!("Resolving {}", candidate);

    match resolver.normalize(candidate) {
        Some(identifier) if identifier.discovery_host().is_some() => Some(identifier),
        _ => {
            error!("Not a resolvable identifier: {}", candidate);
            None
        }
    }
}

fn to_line<T: serde::Serialize>(candidate: &str, document: &T) -> Outcome {
    match serde_json::to_string(document) {
        Ok(line) => Outcome::Found(line),
        Err(e) => {
            error!("Failed serializing result for {}: {}", candidate, e);
            Outcome::Failed
        }
    }
}

/// Fetch the WebFinger document for one identifier
pub async fn webfinger_one(resolver: &Resolver, candidate: String) -> Outcome {
    let Some(identifier) = prepare(resolver, &candidate) else {
        return Outcome::Unresolvable;
    };

    match resolver.webfinger(&identifier).await {
        Ok(jrd) => to_line(&candidate, &jrd),
        Err(e) => {
            error!("Failed resolving {}: {}", identifier, e);
            Outcome::Failed
        }
    }
}

/// Fetch the ActivityPub actor for one identifier
pub async fn actor_one(resolver: &Resolver, candidate: String) -> Outcome {
    let Some(identifier) = prepare(resolver, &candidate) else {
        return Outcome::Unresolvable;
    };

    match resolver.resolve_actor(&identifier).await {
        Ok(Some(actor)) => to_line(&candidate, &actor),
        Ok(None) => {
            error!("No ActivityPub Actor found: {}", candidate);
            Outcome::NotFound
        }
        Err(e) => {
            error!("Failed resolving {}: {}", identifier, e);
            Outcome::Failed
        }
    }
}

/// Run `resolve_one` over `identifiers`, at most `concurrency` at a time, writing
/// results to `out` in input order.
pub async fn run_batch<F, Fut, W>(
    identifiers: &[String],
    concurrency: usize,
    resolve_one: F,
    out: &mut W,
) -> Result<Summary>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Outcome>,
    W: Write,
{
    let mut outcomes = stream::iter(identifiers.iter().cloned())
        .map(resolve_one)
        .buffered(concurrency.max(1));

    let mut summary = Summary::default();
    while let Some(outcome) = outcomes.next().await {
        summary.total += 1;
        match outcome {
            Outcome::Found(line) => {
                writeln!(out, "{}", line).into_diagnostic()?;
                out.flush().into_diagnostic()?;
            }
            Outcome::Unresolvable | Outcome::NotFound | Outcome::Failed => summary.failed += 1,
        }
    }

    Ok(summary)
}
