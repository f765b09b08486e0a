//! Conversion between HTTP request parts and section values.
//!
//! # Responsibilities
//! - Read raw sections: query string, headers, body, path parameters
//! - Write validated sections back so downstream extractors only observe
//!   validated data
//!
//! # Design Decisions
//! - Repeated query keys become arrays; arrays re-encode as repeated keys
//! - Header values with several entries are joined with `", "`
//! - A validated header map keeps `host` and the body framing headers
//!   unless the validated object sets them
//! - An empty body reads as `{}`; a validated body is re-encoded as JSON

use axum::body::Bytes;
use axum::extract::{FromRequestParts, RawPathParams};
use axum::http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING},
    request::Parts,
    uri::PathAndQuery,
    HeaderMap, HeaderName, HeaderValue, Uri,
};
use serde_json::{Map, Value};

use crate::http::middleware::StageError;
use crate::validation::{RequestContext, Section};

/// Parse a query string into an object.
pub fn query_to_value(query: Option<&str>) -> Value {
    let mut map = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        append(&mut map, key.into_owned(), Value::String(value.into_owned()));
    }
    Value::Object(map)
}

/// Encode an object as a query string.
pub fn value_to_query(value: &Value) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    if let Value::Object(map) = value {
        for (key, value) in map {
            for item in flatten(value) {
                serializer.append_pair(key, &item);
            }
        }
    }
    serializer.finish()
}

/// Headers keyed by (lowercase) name.
pub fn headers_to_value(headers: &HeaderMap) -> Value {
    let map = headers
        .keys()
        .map(|name| {
            let joined = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), Value::String(joined))
        })
        .collect();
    Value::Object(map)
}

/// Rebuild a header map from a validated object.
pub fn value_to_headers(value: &Value) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    let Value::Object(map) = value else {
        return Ok(headers);
    };
    for (key, value) in map {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| format!("header `{key}`: {e}"))?;
        for item in flatten(value) {
            let value = HeaderValue::from_str(&item).map_err(|e| format!("header `{key}`: {e}"))?;
            headers.append(name.clone(), value);
        }
    }
    Ok(headers)
}

/// Parse a buffered body according to its content type.
///
/// JSON and urlencoded forms are parsed; other media types read as `{}`
/// and are left for the handler.
pub fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> Result<Value, String> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    let media_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase());

    match media_type.as_deref() {
        None | Some("application/json") => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
        Some(other) if other.ends_with("+json") => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
        Some("application/x-www-form-urlencoded") => {
            let form = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
            Ok(query_to_value(Some(form)))
        }
        Some(_) => Ok(Value::Object(Map::new())),
    }
}

/// Route-extracted path parameters. Empty when the route has none or the
/// stage was not installed as a route layer.
pub async fn params_to_value(parts: &mut Parts) -> Value {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => Value::Object(
            params
                .iter()
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect(),
        ),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "no path parameters available");
            Value::Object(Map::new())
        }
    }
}

/// Write validated query and headers onto `parts`. Returns the re-encoded
/// body when the body section was validated.
pub fn apply(ctx: &RequestContext, parts: &mut Parts) -> Result<Option<Bytes>, StageError> {
    if ctx.is_validated(Section::Query) {
        let query = value_to_query(ctx.request().query());
        parts.uri = with_query(&parts.uri, &query).map_err(|reason| StageError::Rebind {
            section: Section::Query,
            reason,
        })?;
    }

    if ctx.is_validated(Section::Headers) {
        let mut headers = value_to_headers(ctx.request().headers()).map_err(|reason| StageError::Rebind {
            section: Section::Headers,
            reason,
        })?;
        for name in [HOST, CONTENT_TYPE, CONTENT_LENGTH, TRANSFER_ENCODING] {
            if !headers.contains_key(&name) {
                for value in parts.headers.get_all(&name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        parts.headers = headers;
    }

    if !ctx.is_validated(Section::Body) {
        return Ok(None);
    }
    let body = serde_json::to_vec(ctx.request().body()).map_err(|e| StageError::Rebind {
        section: Section::Body,
        reason: e.to_string(),
    })?;
    parts.headers.remove(TRANSFER_ENCODING);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    Ok(Some(Bytes::from(body)))
}

fn with_query(uri: &Uri, query: &str) -> Result<Uri, String> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).map_err(|e| e.to_string())?);
    Uri::from_parts(parts).map_err(|e| e.to_string())
}

fn append(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}

/// Scalar renderings of a value; arrays expand, null renders nothing.
fn flatten(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items.iter().flat_map(flatten).collect(),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => vec![value.to_string()],
    }
}
