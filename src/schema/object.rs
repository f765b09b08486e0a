//! Built-in object schema.
//!
//! Covers the shapes request sections usually take: a flat or nested object
//! of strings, numbers and booleans with required flags, bounds and
//! defaults. Defaults may reference the validation context.

use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::{Map, Number, Value};

use crate::schema::Schema;
use crate::validation::{ErrorDetail, ValidationError, ValidationOptions};

/// Accepted value type of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Any,
    String,
    Number,
    Boolean,
    Object(ObjectSchema),
}

/// Value used when a field is absent.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// Literal value.
    Value(Value),
    /// Key looked up in `options.context`; no default when the key is missing.
    Context(String),
}

impl DefaultValue {
    fn resolve(&self, options: &ValidationOptions) -> Option<Value> {
        match self {
            DefaultValue::Value(value) => Some(value.clone()),
            DefaultValue::Context(key) => options.context.get(key).cloned(),
        }
    }
}

/// One declared object key.
#[derive(Debug, Clone)]
pub struct Field {
    kind: FieldKind,
    required: bool,
    min: Option<f64>,
    max: Option<f64>,
    default: Option<DefaultValue>,
}

impl Field {
    fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            min: None,
            max: None,
            default: None,
        }
    }

    pub fn any() -> Self {
        Self::of(FieldKind::Any)
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String)
    }

    pub fn number() -> Self {
        Self::of(FieldKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::of(FieldKind::Object(schema))
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Minimum string length or numeric value.
    pub fn min(mut self, min: impl Into<f64>) -> Self {
        self.min = Some(min.into());
        self
    }

    /// Maximum string length or numeric value.
    pub fn max(mut self, max: impl Into<f64>) -> Self {
        self.max = Some(max.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Default to `options.context[key]` when the field is absent.
    pub fn default_context(mut self, key: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Context(key.into()));
        self
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.min, self.max)
    }

    fn check(
        &self,
        raw: Option<&Value>,
        path: &[String],
        options: &ValidationOptions,
        errors: &mut Vec<ErrorDetail>,
    ) -> Option<Value> {
        let Some(raw) = raw else {
            let default = self.default.as_ref().and_then(|d| d.resolve(options));
            if default.is_none() && self.required {
                errors.push(detail(path, "any.required", format!("{} is required", label(path))));
            }
            return default;
        };

        match &self.kind {
            FieldKind::Any => Some(raw.clone()),
            FieldKind::String => self.check_string(raw, path, errors),
            FieldKind::Number => self.check_number(raw, path, options, errors),
            FieldKind::Boolean => check_boolean(raw, path, options, errors),
            FieldKind::Object(schema) => schema.check_object(raw, path, options, errors),
        }
    }

    fn check_string(&self, raw: &Value, path: &[String], errors: &mut Vec<ErrorDetail>) -> Option<Value> {
        let Value::String(s) = raw else {
            errors.push(detail(path, "string.base", format!("{} must be a string", label(path))));
            return None;
        };
        if s.is_empty() {
            errors.push(detail(path, "string.empty", format!("{} is not allowed to be empty", label(path))));
            return None;
        }

        let len = s.chars().count() as f64;
        if let Some(min) = self.min.filter(|min| len < *min) {
            errors.push(detail(
                path,
                "string.min",
                format!("{} length must be at least {} characters long", label(path), min),
            ));
            return None;
        }
        if let Some(max) = self.max.filter(|max| len > *max) {
            errors.push(detail(
                path,
                "string.max",
                format!("{} length must be less than or equal to {} characters long", label(path), max),
            ));
            return None;
        }
        Some(raw.clone())
    }

    fn check_number(
        &self,
        raw: &Value,
        path: &[String],
        options: &ValidationOptions,
        errors: &mut Vec<ErrorDetail>,
    ) -> Option<Value> {
        let parsed = match raw {
            Value::Number(n) => n.as_f64().map(|f| (f, raw.clone())),
            Value::String(s) if options.convert => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && !s.trim().is_empty())
                .and_then(|f| number_value(f).map(|v| (f, v))),
            _ => None,
        };
        let Some((n, value)) = parsed else {
            errors.push(detail(path, "number.base", format!("{} must be a number", label(path))));
            return None;
        };

        if let Some(min) = self.min.filter(|min| n < *min) {
            errors.push(detail(
                path,
                "number.min",
                format!("{} must be greater than or equal to {}", label(path), min),
            ));
            return None;
        }
        if let Some(max) = self.max.filter(|max| n > *max) {
            errors.push(detail(
                path,
                "number.max",
                format!("{} must be less than or equal to {}", label(path), max),
            ));
            return None;
        }
        Some(value)
    }
}

fn check_boolean(
    raw: &Value,
    path: &[String],
    options: &ValidationOptions,
    errors: &mut Vec<ErrorDetail>,
) -> Option<Value> {
    match raw {
        Value::Bool(_) => Some(raw.clone()),
        Value::String(s) if options.convert && s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
        Value::String(s) if options.convert && s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
        _ => {
            errors.push(detail(path, "boolean.base", format!("{} must be a boolean", label(path))));
            None
        }
    }
}

/// Integral values stay integers so `"18"` coerces to `18`, not `18.0`.
fn number_value(f: f64) -> Option<Value> {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE {
        Some(Value::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}

fn label(path: &[String]) -> String {
    if path.is_empty() {
        "\"value\"".to_string()
    } else {
        format!("\"{}\"", path.join("."))
    }
}

fn detail(path: &[String], kind: &str, message: String) -> ErrorDetail {
    ErrorDetail::new(message, path.to_vec(), kind)
}

fn child(path: &[String], key: &str) -> Vec<String> {
    let mut path = path.to_vec();
    path.push(key.to_string());
    path
}

/// Object with declared keys, checked in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: Vec<(String, Field)>,
    unknown: bool,
    required: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a key. Redeclaring a key replaces it in place.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name, field)),
        }
        self
    }

    /// Keep undeclared keys regardless of options.
    pub fn unknown(mut self, allow: bool) -> Self {
        self.unknown = allow;
        self
    }

    /// Reject a missing (null) value instead of passing it through.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> + '_ {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Synchronous validation of a whole value.
    pub fn check(&self, value: &Value, options: &ValidationOptions) -> Result<Value, ValidationError> {
        if value.is_null() {
            return if self.required {
                Err(ValidationError::from_details(vec![detail(
                    &[],
                    "any.required",
                    format!("{} is required", label(&[])),
                )]))
            } else {
                Ok(Value::Null)
            };
        }

        let mut errors = Vec::new();
        let validated = self.check_object(value, &[], options, &mut errors);
        match validated {
            Some(value) if errors.is_empty() => Ok(value),
            _ => Err(ValidationError::from_details(errors)),
        }
    }

    fn declares(&self, key: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == key)
    }

    fn check_object(
        &self,
        value: &Value,
        path: &[String],
        options: &ValidationOptions,
        errors: &mut Vec<ErrorDetail>,
    ) -> Option<Value> {
        let Value::Object(map) = value else {
            errors.push(detail(path, "object.base", format!("{} must be of type object", label(path))));
            return None;
        };

        let before = errors.len();
        let mut out = Map::new();
        for (name, field) in &self.fields {
            if let Some(v) = field.check(map.get(name), &child(path, name), options, errors) {
                out.insert(name.clone(), v);
            }
            if options.abort_early && errors.len() > before {
                return None;
            }
        }

        for (key, v) in map {
            if self.declares(key) {
                continue;
            }
            if self.unknown {
                out.insert(key.clone(), v.clone());
            } else if options.strip_unknown {
                continue;
            } else if options.allow_unknown {
                out.insert(key.clone(), v.clone());
            } else {
                let key_path = child(path, key);
                errors.push(detail(&key_path, "object.unknown", format!("{} is not allowed", label(&key_path))));
                if options.abort_early {
                    return None;
                }
            }
        }

        (errors.len() == before).then_some(Value::Object(out))
    }
}

impl Schema for ObjectSchema {
    fn validate<'a>(
        &'a self,
        value: Value,
        options: &'a ValidationOptions,
    ) -> BoxFuture<'a, Result<Value, ValidationError>> {
        future::ready(self.check(&value, options)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts() -> ValidationOptions {
        ValidationOptions::default()
    }

    fn message(schema: &ObjectSchema, value: Value, options: &ValidationOptions) -> String {
        schema.check(&value, options).unwrap_err().message().to_string()
    }

    #[test]
    fn test_required() {
        let schema = ObjectSchema::new().field("username", Field::string().required());
        assert_eq!(message(&schema, json!({}), &opts()), "\"username\" is required");
        assert_eq!(
            schema.check(&json!({"username": "Peter"}), &opts()).unwrap(),
            json!({"username": "Peter"})
        );
    }

    #[test]
    fn test_string_rules() {
        let schema = ObjectSchema::new().field("username", Field::string().min(2).max(4));
        assert_eq!(
            message(&schema, json!({"username": "Peter"}), &opts()),
            "\"username\" length must be less than or equal to 4 characters long"
        );
        assert_eq!(
            message(&schema, json!({"username": "P"}), &opts()),
            "\"username\" length must be at least 2 characters long"
        );
        assert_eq!(
            message(&schema, json!({"username": ""}), &opts()),
            "\"username\" is not allowed to be empty"
        );
        assert_eq!(
            message(&schema, json!({"username": 12}), &opts()),
            "\"username\" must be a string"
        );
    }

    #[test]
    fn test_number_conversion() {
        let schema = ObjectSchema::new().field("age", Field::number().min(0).max(150));
        assert_eq!(schema.check(&json!({"age": "18"}), &opts()).unwrap(), json!({"age": 18}));
        assert_eq!(schema.check(&json!({"age": "1.5"}), &opts()).unwrap(), json!({"age": 1.5}));
        assert_eq!(message(&schema, json!({"age": "abc"}), &opts()), "\"age\" must be a number");
        assert_eq!(
            message(&schema, json!({"age": "18"}), &opts().convert(false)),
            "\"age\" must be a number"
        );
        assert_eq!(
            message(&schema, json!({"age": -1}), &opts()),
            "\"age\" must be greater than or equal to 0"
        );
        assert_eq!(
            message(&schema, json!({"age": 151}), &opts()),
            "\"age\" must be less than or equal to 150"
        );
    }

    #[test]
    fn test_boolean_conversion() {
        let schema = ObjectSchema::new().field("active", Field::boolean());
        assert_eq!(schema.check(&json!({"active": "TRUE"}), &opts()).unwrap(), json!({"active": true}));
        assert_eq!(schema.check(&json!({"active": false}), &opts()).unwrap(), json!({"active": false}));
        assert_eq!(message(&schema, json!({"active": "yes"}), &opts()), "\"active\" must be a boolean");
    }

    #[test]
    fn test_unknown_keys() {
        let schema = ObjectSchema::new().field("username", Field::string());
        let input = json!({"username": "Peter", "isActive": true});

        assert_eq!(message(&schema, input.clone(), &opts()), "\"isActive\" is not allowed");
        assert_eq!(
            schema.check(&input, &opts().strip_unknown(true)).unwrap(),
            json!({"username": "Peter"})
        );
        assert_eq!(schema.check(&input, &opts().allow_unknown(true)).unwrap(), input);

        // An explicit schema flag wins over stripping.
        let open = schema.clone().unknown(true);
        assert_eq!(open.check(&input, &opts().strip_unknown(true)).unwrap(), input);
    }

    #[test]
    fn test_defaults() {
        let schema = ObjectSchema::new()
            .field("role", Field::string().default_value("member"))
            .field("username", Field::string().default_context("defaultUsername"))
            .field("age", Field::number().required().default_context("missing"));
        let options = opts().with_context("defaultUsername", "anonymous");

        assert_eq!(message(&schema, json!({}), &options), "\"age\" is required");
        assert_eq!(
            schema.check(&json!({"age": 3}), &options).unwrap(),
            json!({"role": "member", "username": "anonymous", "age": 3})
        );
    }

    #[test]
    fn test_nested_paths() {
        let schema = ObjectSchema::new().field(
            "address",
            Field::object(ObjectSchema::new().field("zip", Field::string().required())),
        );
        assert_eq!(message(&schema, json!({"address": {}}), &opts()), "\"address.zip\" is required");
        assert_eq!(
            message(&schema, json!({"address": "x"}), &opts()),
            "\"address\" must be of type object"
        );
    }

    #[test]
    fn test_collect_all_errors() {
        let schema = ObjectSchema::new()
            .field("username", Field::string().required())
            .field("age", Field::number().required());
        let err = schema.check(&json!({"extra": 1}), &opts().abort_early(false)).unwrap_err();
        assert_eq!(err.details().len(), 3);
        assert_eq!(
            err.message(),
            "\"username\" is required. \"age\" is required. \"extra\" is not allowed"
        );
        assert_eq!(err.details()[2].kind, "object.unknown");
        assert_eq!(err.details()[2].path, vec!["extra".to_string()]);
    }

    #[test]
    fn test_top_level_shape() {
        let schema = ObjectSchema::new();
        assert_eq!(schema.check(&Value::Null, &opts()).unwrap(), Value::Null);
        assert_eq!(message(&schema, json!([1]), &opts()), "\"value\" must be of type object");
        assert_eq!(
            message(&schema.required(), Value::Null, &opts()),
            "\"value\" is required"
        );
    }

    #[tokio::test]
    async fn test_async_contract() {
        let schema = ObjectSchema::new().field("username", Field::string().required());
        let options = opts();
        let validated = schema.validate(json!({"username": "Peter"}), &options).await.unwrap();
        assert_eq!(validated, json!({"username": "Peter"}));
    }
}
