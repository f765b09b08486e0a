//! Validation options and the per-invocation context merge.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options handed to every schema validation.
///
/// The configured value is an immutable template; each invocation derives
/// its own copy with [`ValidationOptions::merged_with`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Drop object keys the schema does not declare instead of rejecting them.
    pub strip_unknown: bool,

    /// Keep undeclared object keys instead of rejecting them.
    pub allow_unknown: bool,

    /// Stop at the first violated constraint.
    pub abort_early: bool,

    /// Coerce string input to the declared type (numbers, booleans).
    pub convert: bool,

    /// Extra values visible to schema defaults.
    pub context: Map<String, Value>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strip_unknown: false,
            allow_unknown: false,
            abort_early: true,
            convert: true,
            context: Map::new(),
        }
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strip_unknown(mut self, strip: bool) -> Self {
        self.strip_unknown = strip;
        self
    }

    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    pub fn abort_early(mut self, abort: bool) -> Self {
        self.abort_early = abort;
        self
    }

    pub fn convert(mut self, convert: bool) -> Self {
        self.convert = convert;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Copy of these options whose context is `live` overlaid with the
    /// configured context. Configured keys win over live keys of the same name.
    pub fn merged_with(&self, live: &Map<String, Value>) -> Self {
        let mut context = live.clone();
        for (key, value) in &self.context {
            context.insert(key.clone(), value.clone());
        }
        Self {
            context,
            ..self.clone()
        }
    }
}
