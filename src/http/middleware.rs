//! Validation stage as axum middleware.
//!
//! # Responsibilities
//! - Read the configured sections off the incoming request
//! - Run the validator with the request's live context state
//! - Rebind validated sections onto the request before calling `next`
//! - Render rejections; expose the error to enclosing layers
//!
//! # Design Decisions
//! - The body is buffered only when the body section is validated
//! - Install with `route_layer` when path parameters are validated; route
//!   captures are only visible to route-level middleware
//! - Rejections carry the `ValidationError` and any already-rebound
//!   sections as response extensions

use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::LengthLimitError;
use serde_json::json;

use crate::http::extract::{ContextState, ValidatedRequest};
use crate::http::rebind;
use crate::observability::metrics;
use crate::validation::{RequestContext, Section, ValidationError, Validator};

/// Default cap on buffered request bodies (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// State for [`validate_request`].
///
/// ```ignore
/// let stage = ValidateRequest::new(validator);
/// Router::new()
///     .route("/users/{username}", post(handler))
///     .route_layer(axum::middleware::from_fn_with_state(stage, validate_request));
/// ```
#[derive(Clone, Debug)]
pub struct ValidateRequest {
    validator: Validator,
    body_limit: usize,
}

impl ValidateRequest {
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    async fn run(&self, request: Request<Body>) -> Result<Request<Body>, Response> {
        let (mut parts, mut body) = request.into_parts();

        let mut ctx = RequestContext::new();
        if let Some(ContextState(state)) = parts.extensions.get::<ContextState>() {
            ctx.state_mut().extend(state.clone());
        }

        let mut raw_body = None;
        if self.validator.validates(Section::Body) {
            let bytes = to_bytes(std::mem::replace(&mut body, Body::empty()), self.body_limit)
                .await
                .map_err(|e| {
                    tracing::debug!(error = %e, "failed to buffer request body");
                    if exceeded_limit(&e) {
                        StageError::PayloadTooLarge { limit: self.body_limit }.into_response()
                    } else {
                        StageError::BodyRead(e.to_string()).into_response()
                    }
                })?;
            raw_body = Some(
                rebind::parse_body(&parts.headers, &bytes)
                    .map_err(|reason| StageError::MalformedBody(reason).into_response())?,
            );
        }

        let sections: Vec<Section> = self.validator.sections().collect();
        for section in sections {
            let raw = match section {
                Section::Query => rebind::query_to_value(parts.uri.query()),
                Section::Headers => rebind::headers_to_value(&parts.headers),
                Section::Body => raw_body.take().unwrap_or_default(),
                Section::Params => rebind::params_to_value(&mut parts).await,
            };
            ctx.set_raw(section, raw);
        }

        if let Err(err) = self.validator.validate(&mut ctx).await {
            tracing::warn!(
                section = ?err.section(),
                error = %err,
                path = %parts.uri.path(),
                "Request rejected"
            );
            let mut response = StageError::Validation(err).into_response();
            response.extensions_mut().insert(validated_so_far(&parts, &ctx));
            return Err(response);
        }

        let rebound_body = rebind::apply(&ctx, &mut parts).map_err(IntoResponse::into_response)?;
        let validated = validated_so_far(&parts, &ctx);
        parts.extensions.insert(validated);
        let body = match rebound_body {
            Some(bytes) => Body::from(bytes),
            None => body,
        };
        Ok(Request::from_parts(parts, body))
    }
}

/// Sections validated by enclosing stages plus the ones `ctx` rebound.
fn validated_so_far(parts: &Parts, ctx: &RequestContext) -> ValidatedRequest {
    let mut validated = parts.extensions.get::<ValidatedRequest>().cloned().unwrap_or_default();
    validated.record(ctx);
    validated
}

/// Whether a buffering failure came from the body limit rather than the
/// connection.
fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

impl From<Validator> for ValidateRequest {
    fn from(validator: Validator) -> Self {
        Self::new(validator)
    }
}

/// Middleware function; install with `axum::middleware::from_fn_with_state`.
pub async fn validate_request(
    State(stage): State<ValidateRequest>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    match stage.run(request).await {
        Ok(request) => {
            metrics::record_stage(true, start);
            next.run(request).await
        }
        Err(response) => {
            metrics::record_stage(false, start);
            response
        }
    }
}

/// Ways the stage can refuse a request.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// The body stream failed before the limit was reached.
    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("failed to rebind validated {section}: {reason}")]
    Rebind { section: Section, reason: String },
}

impl IntoResponse for StageError {
    fn into_response(self) -> Response {
        match self {
            StageError::Validation(err) => {
                let body = json!({
                    "error": err.name(),
                    "message": err.message(),
                    "section": err.section(),
                    "details": err.details(),
                });
                let mut response = (StatusCode::BAD_REQUEST, Json(body)).into_response();
                response.extensions_mut().insert(err);
                response
            }
            StageError::PayloadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, self.to_string()).into_response(),
            StageError::MalformedBody(_) | StageError::BodyRead(_) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            StageError::Rebind { .. } => {
                tracing::error!(error = %self, "Failed to rebind validated request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to apply validated request").into_response()
            }
        }
    }
}
