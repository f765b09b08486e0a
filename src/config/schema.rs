//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//!
//! ```toml
//! [listener]
//! bind_address = "127.0.0.1:8080"
//!
//! [options]
//! strip_unknown = true
//! context = { defaultUsername = "anonymous" }
//!
//! [[routes]]
//! path = "/users/{username}"
//! method = "POST"
//!
//! [routes.sections.params]
//! fields = [{ name = "username", type = "string", required = true, max = 4 }]
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::{ObjectSchema, ObjectSchemaConfig, Schema};
use crate::validation::{BuildError, SchemaMap, ValidationOptions, Validator};

/// Root configuration for the validation server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Body and deadline limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Validation options shared by routes without their own.
    pub options: ValidationOptions,

    /// Validated routes.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum buffered body size in bytes.
    pub max_body_bytes: usize,

    /// Deadline for the whole request, validation included, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// One validated route.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Axum route path, captures written as `{name}`.
    pub path: String,

    /// HTTP method; any method when absent.
    #[serde(default)]
    pub method: Option<String>,

    /// Replaces the shared options for this route.
    #[serde(default)]
    pub options: Option<ValidationOptions>,

    /// Schemas keyed by section name (query, headers, body, params).
    #[serde(default)]
    pub sections: BTreeMap<String, ObjectSchemaConfig>,
}

impl RouteConfig {
    /// Build this route's validator, falling back to `defaults` for options.
    pub fn validator(&self, defaults: &ValidationOptions) -> Result<Validator, BuildError> {
        let schemas = SchemaMap::from_named(self.sections.iter().map(|(name, schema)| {
            let schema: Arc<dyn Schema> = Arc::new(ObjectSchema::from(schema));
            (name.as_str(), schema)
        }))?;
        let options = self.options.clone().unwrap_or_else(|| defaults.clone());
        Ok(Validator::new(schemas, options))
    }
}
