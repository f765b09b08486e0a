//! The validation stage: factory, concurrent runner, rebinder and invoker.
//!
//! # Responsibilities
//! - Capture an immutable schema map and option template once
//! - Merge the live request context into the options per invocation
//! - Launch one validation per configured section, all in flight at once
//! - Rebind each section as soon as its validation succeeds
//! - Run the continuation only when every section succeeded
//!
//! # Design Decisions
//! - Validations are multiplexed on the calling task, not spawned
//! - Stragglers are drained after a failure; their successes still rebind
//! - The surfaced error is the first failure to complete
//! - Rebound sections are not rolled back when the invocation fails

use std::future::Future;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::observability::metrics;
use crate::validation::context::RequestContext;
use crate::validation::error::ValidationError;
use crate::validation::options::ValidationOptions;
use crate::validation::section::{SchemaMap, Section};

/// Reusable validation stage built from a schema map and option template.
#[derive(Clone, Debug)]
pub struct Validator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    schemas: SchemaMap,
    options: ValidationOptions,
}

/// A failed invocation.
///
/// Carries the context as it stood when the stage gave up, so error handlers
/// can still observe sections that were rebound before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct Rejected {
    pub error: ValidationError,
    pub context: RequestContext,
}

impl Validator {
    /// Bind schemas and options. No work happens until the stage is invoked.
    pub fn new(schemas: SchemaMap, options: ValidationOptions) -> Self {
        Self {
            inner: Arc::new(Inner { schemas, options }),
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.inner.schemas.sections()
    }

    pub fn validates(&self, section: Section) -> bool {
        self.inner.schemas.contains(section)
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.inner.options
    }

    /// Validate every configured section of `ctx` concurrently and rebind
    /// each success onto it.
    ///
    /// Returns the first failure to complete. All validations run to
    /// completion regardless, so `ctx` may be partially rebound on error.
    /// Sections `ctx` already holds validated values for are not validated
    /// again.
    pub async fn validate(&self, ctx: &mut RequestContext) -> Result<(), ValidationError> {
        let options = self.inner.options.merged_with(ctx.state());
        let options = &options;

        let inputs: Vec<_> = self
            .inner
            .schemas
            .iter()
            .filter(|(section, _)| {
                let fresh = !ctx.is_validated(*section);
                if !fresh {
                    tracing::debug!(section = %section, "section already validated, skipping");
                }
                fresh
            })
            .map(|(section, schema)| (section, schema, ctx.section(section).clone()))
            .collect();

        let mut pending: FuturesUnordered<_> = inputs
            .into_iter()
            .map(|(section, schema, raw)| async move { (section, schema.validate(raw, options).await) })
            .collect();

        tracing::trace!(sections = pending.len(), "validating request sections");

        let mut first_error: Option<ValidationError> = None;
        while let Some((section, outcome)) = pending.next().await {
            match outcome {
                Ok(validated) => {
                    tracing::trace!(section = %section, source = ?section.source(), "section validated");
                    metrics::record_section(section, true);
                    ctx.rebind(section, validated);
                }
                Err(err) => {
                    metrics::record_section(section, false);
                    if first_error.is_none() {
                        tracing::debug!(section = %section, error = %err, "section rejected");
                        first_error = Some(err.in_section(section));
                    } else {
                        tracing::debug!(section = %section, error = %err, "discarding additional section error");
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Validate `ctx` and hand it to `next` on success.
    ///
    /// `next` runs exactly once when every section validates and never
    /// otherwise.
    pub async fn call<N, Fut>(&self, mut ctx: RequestContext, next: N) -> Result<Fut::Output, Rejected>
    where
        N: FnOnce(RequestContext) -> Fut,
        Fut: Future,
    {
        match self.validate(&mut ctx).await {
            Ok(()) => Ok(next(ctx).await),
            Err(error) => Err(Rejected { error, context: ctx }),
        }
    }
}
