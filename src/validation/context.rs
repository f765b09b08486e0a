//! Per-request context the validation stage reads from and rebinds onto.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::validation::section::Section;

/// The `request` part of the context: query string, headers and body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestData {
    query: Value,
    headers: Value,
    body: Value,
}

impl RequestData {
    pub fn query(&self) -> &Value {
        &self.query
    }

    pub fn headers(&self) -> &Value {
        &self.headers
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// Mutable per-request state passed through the pipeline.
///
/// `params` lives on the context itself; the other sections live on
/// [`RequestData`]. `state` holds values attached by earlier stages and is
/// visible to schema defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    request: RequestData,
    params: Value,
    state: Map<String, Value>,
    validated: BTreeSet<Section>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.request.query = query;
        self
    }

    pub fn with_headers(mut self, headers: Value) -> Self {
        self.request.headers = headers;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.request.body = body;
        self
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_state(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state.insert(key.into(), value.into());
        self
    }

    pub fn request(&self) -> &RequestData {
        &self.request
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state
    }

    /// Current value of a section: the validated value once rebound,
    /// the raw value before that.
    pub fn section(&self, section: Section) -> &Value {
        match section {
            Section::Params => &self.params,
            Section::Query => &self.request.query,
            Section::Headers => &self.request.headers,
            Section::Body => &self.request.body,
        }
    }

    /// Seed a section's raw value. Ignored once the section was rebound.
    pub fn set_raw(&mut self, section: Section, value: Value) {
        if self.validated.contains(&section) {
            tracing::debug!(section = %section, "ignoring raw write to validated section");
            return;
        }
        *self.slot(section) = value;
    }

    pub fn is_validated(&self, section: Section) -> bool {
        self.validated.contains(&section)
    }

    pub fn validated_sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.validated.iter().copied()
    }

    /// Replace a section with its validated value. The replacement is
    /// permanent for the life of the context; later rebinds are ignored.
    pub(crate) fn rebind(&mut self, section: Section, validated: Value) {
        if !self.validated.insert(section) {
            tracing::debug!(section = %section, "ignoring second rebind of validated section");
            return;
        }
        *self.slot(section) = validated;
    }

    fn slot(&mut self, section: Section) -> &mut Value {
        match section {
            Section::Params => &mut self.params,
            Section::Query => &mut self.request.query,
            Section::Headers => &mut self.request.headers,
            Section::Body => &mut self.request.body,
        }
    }
}
