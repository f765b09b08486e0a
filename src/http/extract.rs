//! Typed access to validated request data.
//!
//! # Responsibilities
//! - Carry live per-request values from earlier stages (`ContextState`)
//! - Expose every validated section as a request extension
//!   (`ValidatedRequest`)
//! - Deserialize single sections into handler types (`ValidQuery<T>`, ...)

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, Request, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::validation::{RequestContext, Section};

/// Values attached to the request by earlier stages, e.g. an authenticated
/// user id. Visible to schema defaults through the validation context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextState(pub Map<String, Value>);

impl ContextState {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Insert a value into the request's context state, creating it if needed.
    pub fn attach<B>(request: &mut Request<B>, key: impl Into<String>, value: impl Into<Value>) {
        let extensions = request.extensions_mut();
        match extensions.get_mut::<ContextState>() {
            Some(state) => state.insert(key, value),
            None => {
                let mut state = ContextState::default();
                state.insert(key, value);
                extensions.insert(state);
            }
        }
    }
}

/// Sections that passed validation for this request.
///
/// Attached to the request on success. On rejection it is attached to the
/// response instead, holding whatever sections were rebound before the
/// failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    headers: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl ValidatedRequest {
    pub fn from_context(ctx: &RequestContext) -> Self {
        let mut validated = Self::default();
        validated.record(ctx);
        validated
    }

    /// Fill in the sections `ctx` validated. Sections recorded by an
    /// enclosing stage are kept unless `ctx` validated them again.
    pub fn record(&mut self, ctx: &RequestContext) {
        for section in ctx.validated_sections() {
            *self.slot(section) = Some(ctx.section(section).clone());
        }
    }

    pub fn get(&self, section: Section) -> Option<&Value> {
        match section {
            Section::Query => self.query.as_ref(),
            Section::Headers => self.headers.as_ref(),
            Section::Body => self.body.as_ref(),
            Section::Params => self.params.as_ref(),
        }
    }

    pub fn query(&self) -> Option<&Value> {
        self.get(Section::Query)
    }

    pub fn headers(&self) -> Option<&Value> {
        self.get(Section::Headers)
    }

    pub fn body(&self) -> Option<&Value> {
        self.get(Section::Body)
    }

    pub fn params(&self) -> Option<&Value> {
        self.get(Section::Params)
    }

    /// Deserialize one validated section.
    pub fn deserialize<T: DeserializeOwned>(&self, section: Section) -> Result<T, ExtractRejection> {
        let value = self
            .get(section)
            .ok_or(ExtractRejection::NotValidated(section))?;
        T::deserialize(value).map_err(|source| ExtractRejection::Deserialize { section, source })
    }

    fn slot(&mut self, section: Section) -> &mut Option<Value> {
        match section {
            Section::Query => &mut self.query,
            Section::Headers => &mut self.headers,
            Section::Body => &mut self.body,
            Section::Params => &mut self.params,
        }
    }
}

/// Why a validated section could not be extracted.
#[derive(Debug, thiserror::Error)]
pub enum ExtractRejection {
    #[error("request did not pass through the validation stage")]
    MissingStage,

    #[error("section `{0}` is not validated on this route")]
    NotValidated(Section),

    #[error("validated {section} does not match the handler type: {source}")]
    Deserialize {
        section: Section,
        #[source]
        source: serde_json::Error,
    },
}

impl IntoResponse for ExtractRejection {
    fn into_response(self) -> Response {
        let status = match &self {
            ExtractRejection::MissingStage | ExtractRejection::NotValidated(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ExtractRejection::Deserialize { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        tracing::error!(error = %self, "validated extraction failed");
        (status, self.to_string()).into_response()
    }
}

impl<S> FromRequestParts<S> for ValidatedRequest
where
    S: Send + Sync,
{
    type Rejection = ExtractRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ValidatedRequest>()
            .cloned()
            .ok_or(ExtractRejection::MissingStage)
    }
}

macro_rules! section_extractor {
    ($(#[$doc:meta])* $name:ident, $section:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name<T>(pub T);

        impl<T, S> FromRequestParts<S> for $name<T>
        where
            T: DeserializeOwned,
            S: Send + Sync,
        {
            type Rejection = ExtractRejection;

            async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
                let validated = parts
                    .extensions
                    .get::<ValidatedRequest>()
                    .ok_or(ExtractRejection::MissingStage)?;
                validated.deserialize($section).map($name)
            }
        }
    };
}

section_extractor!(
    /// Validated query string.
    ValidQuery,
    Section::Query
);
section_extractor!(
    /// Validated headers, keyed by lowercase name.
    ValidHeaders,
    Section::Headers
);
section_extractor!(
    /// Validated body.
    ValidBody,
    Section::Body
);
section_extractor!(
    /// Validated path parameters.
    ValidParams,
    Section::Params
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        username: String,
        age: u32,
    }

    #[test]
    fn test_from_context_only_holds_validated_sections() {
        let mut ctx = RequestContext::new()
            .with_query(json!({"raw": true}))
            .with_body(json!({"username": "Peter", "age": "18"}));
        ctx.rebind(Section::Body, json!({"username": "Peter", "age": 18}));

        let validated = ValidatedRequest::from_context(&ctx);
        assert_eq!(validated.query(), None);
        assert_eq!(validated.body(), Some(&json!({"username": "Peter", "age": 18})));

        let user: User = validated.deserialize(Section::Body).unwrap();
        assert_eq!(user, User { username: "Peter".into(), age: 18 });
        assert!(matches!(
            validated.deserialize::<User>(Section::Query),
            Err(ExtractRejection::NotValidated(Section::Query))
        ));
    }

    #[test]
    fn test_record_keeps_enclosing_sections() {
        let mut outer = RequestContext::new();
        outer.rebind(Section::Query, json!({"page": 2}));
        let mut validated = ValidatedRequest::from_context(&outer);

        let mut inner = RequestContext::new();
        inner.rebind(Section::Params, json!({"username": "Pete"}));
        validated.record(&inner);

        assert_eq!(validated.query(), Some(&json!({"page": 2})));
        assert_eq!(validated.params(), Some(&json!({"username": "Pete"})));
        assert_eq!(validated.body(), None);
    }

    #[test]
    fn test_attach_context_state() {
        let mut request = Request::new(());
        ContextState::attach(&mut request, "userId", 7);
        ContextState::attach(&mut request, "defaultAge", 42);

        let state = request.extensions().get::<ContextState>().unwrap();
        assert_eq!(state.0.get("userId"), Some(&json!(7)));
        assert_eq!(state.0.get("defaultAge"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_typed_extractor() {
        let mut ctx = RequestContext::new();
        ctx.rebind(Section::Params, json!({"username": "Pete", "age": 3}));

        let (mut parts, ()) = Request::new(()).into_parts();
        parts.extensions.insert(ValidatedRequest::from_context(&ctx));

        let ValidParams(user) = ValidParams::<User>::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(user.username, "Pete");

        let missing = ValidBody::<User>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(missing, Err(ExtractRejection::NotValidated(Section::Body))));
    }
}
