//! Serde-declarable form of [`ObjectSchema`], used by route configuration.
//!
//! ```toml
//! [routes.sections.body]
//! fields = [
//!     { name = "username", type = "string", required = true, max = 32 },
//!     { name = "age", type = "number", default = { context = "defaultAge" } },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::object::{DefaultValue, Field, ObjectSchema};

/// Object schema declaration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObjectSchemaConfig {
    /// Keep undeclared keys.
    pub unknown: bool,

    /// Reject a missing section value.
    pub required: bool,

    /// Declared keys, checked in order.
    pub fields: Vec<FieldConfig>,
}

/// Field type names accepted in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Any,
    String,
    Number,
    Boolean,
    Object,
}

/// Default declaration: a literal or a context key.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultConfig {
    Value(Value),
    Context(String),
}

/// One declared key.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldConfig {
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultConfig>,

    /// Nested keys for `type = "object"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldConfig>,

    /// Keep undeclared nested keys for `type = "object"`.
    #[serde(default)]
    pub unknown: bool,
}

impl From<&DefaultConfig> for DefaultValue {
    fn from(config: &DefaultConfig) -> Self {
        match config {
            DefaultConfig::Value(value) => DefaultValue::Value(value.clone()),
            DefaultConfig::Context(key) => DefaultValue::Context(key.clone()),
        }
    }
}

impl From<&FieldConfig> for Field {
    fn from(config: &FieldConfig) -> Self {
        let mut field = match config.kind {
            FieldType::Any => Field::any(),
            FieldType::String => Field::string(),
            FieldType::Number => Field::number(),
            FieldType::Boolean => Field::boolean(),
            FieldType::Object => Field::object(
                config
                    .fields
                    .iter()
                    .fold(ObjectSchema::new().unknown(config.unknown), |schema, nested| {
                        schema.field(nested.name.clone(), Field::from(nested))
                    }),
            ),
        };
        if config.required {
            field = field.required();
        }
        if let Some(min) = config.min {
            field = field.min(min);
        }
        if let Some(max) = config.max {
            field = field.max(max);
        }
        match config.default.as_ref().map(DefaultValue::from) {
            Some(DefaultValue::Value(value)) => field.default_value(value),
            Some(DefaultValue::Context(key)) => field.default_context(key),
            None => field,
        }
    }
}

impl From<&ObjectSchemaConfig> for ObjectSchema {
    fn from(config: &ObjectSchemaConfig) -> Self {
        let schema = config
            .fields
            .iter()
            .fold(ObjectSchema::new().unknown(config.unknown), |schema, field| {
                schema.field(field.name.clone(), Field::from(field))
            });
        if config.required {
            schema.required()
        } else {
            schema
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationOptions;
    use serde_json::json;

    #[test]
    fn test_declared_schema_behaves_like_builder() {
        let config: ObjectSchemaConfig = toml::from_str(
            r#"
            fields = [
                { name = "username", type = "string", required = true, min = 1, max = 4 },
                { name = "age", type = "number", default = { context = "defaultAge" } },
                { name = "role", default = { value = "member" } },
                { name = "address", type = "object", fields = [
                    { name = "zip", type = "string", required = true },
                ] },
            ]
            "#,
        )
        .unwrap();
        assert_eq!(config.fields[0].kind, FieldType::String);
        assert_eq!(config.fields[2].kind, FieldType::Any);

        let schema = ObjectSchema::from(&config);
        let options = ValidationOptions::new().with_context("defaultAge", 42);

        let err = schema.check(&json!({"username": "Peter"}), &options).unwrap_err();
        assert_eq!(
            err.message(),
            "\"username\" length must be less than or equal to 4 characters long"
        );

        let err = schema
            .check(&json!({"username": "Pete", "address": {}}), &options)
            .unwrap_err();
        assert_eq!(err.message(), "\"address.zip\" is required");

        let ok = schema
            .check(&json!({"username": "Pete", "address": {"zip": "1000"}}), &options)
            .unwrap();
        assert_eq!(
            ok,
            json!({"username": "Pete", "age": 42, "role": "member", "address": {"zip": "1000"}})
        );
    }
}
