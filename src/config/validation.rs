//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and limits
//! - Check route paths, methods and section names
//! - Detect conflicting routes and contradictory field bounds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ConfigIssue>>
//! - Runs before config is accepted into the system

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;

use axum::http::Method;
use axum::routing::MethodFilter;

use crate::config::schema::{AppConfig, RouteConfig};
use crate::schema::FieldConfig;
use crate::validation::{BuildError, Section};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigIssue {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("limits.request_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("route path `{0}` must start with `/` and write captures as `{{name}}`")]
    RoutePath(String),

    #[error("route `{path}`: unsupported method `{method}`")]
    Method { path: String, method: String },

    #[error("route `{path}` is declared more than once for {method}")]
    DuplicateRoute { path: String, method: String },

    #[error("route `{path}`: {source}")]
    Section {
        path: String,
        #[source]
        source: BuildError,
    },

    #[error("route `{path}`: field with empty name in {section}")]
    EmptyFieldName { path: String, section: String },

    #[error("route `{path}`: field `{field}` declared more than once in {section}")]
    DuplicateField { path: String, section: String, field: String },

    #[error("route `{path}`: field `{field}` in {section} has min {min} greater than max {max}")]
    Bounds {
        path: String,
        section: String,
        field: String,
        min: f64,
        max: f64,
    },
}

/// Map a configured method name onto a routing filter.
pub fn method_filter(method: &str) -> Option<MethodFilter> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok()?;
    MethodFilter::try_from(method).ok()
}

/// Check a parsed configuration, collecting every issue found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ConfigIssue::BindAddress(config.listener.bind_address.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        issues.push(ConfigIssue::MetricsAddress(config.observability.metrics_address.clone()));
    }
    if config.limits.max_body_bytes == 0 {
        issues.push(ConfigIssue::ZeroBodyLimit);
    }
    if config.limits.request_timeout_secs == 0 {
        issues.push(ConfigIssue::ZeroTimeout);
    }

    for route in &config.routes {
        validate_route(route, &mut issues);
    }
    check_conflicts(&config.routes, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn validate_route(route: &RouteConfig, issues: &mut Vec<ConfigIssue>) {
    let legacy_capture = route
        .path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'));
    if !route.path.starts_with('/') || legacy_capture {
        issues.push(ConfigIssue::RoutePath(route.path.clone()));
    }

    if let Some(method) = &route.method {
        if method_filter(method).is_none() {
            issues.push(ConfigIssue::Method {
                path: route.path.clone(),
                method: method.clone(),
            });
        }
    }

    for (name, schema) in &route.sections {
        if let Err(source) = name.parse::<Section>() {
            issues.push(ConfigIssue::Section {
                path: route.path.clone(),
                source,
            });
            continue;
        }
        validate_fields(&route.path, name, &schema.fields, issues);
    }
}

fn validate_fields(path: &str, section: &str, fields: &[FieldConfig], issues: &mut Vec<ConfigIssue>) {
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.is_empty() {
            issues.push(ConfigIssue::EmptyFieldName {
                path: path.to_string(),
                section: section.to_string(),
            });
        } else if !seen.insert(field.name.as_str()) {
            issues.push(ConfigIssue::DuplicateField {
                path: path.to_string(),
                section: section.to_string(),
                field: field.name.clone(),
            });
        }

        if let (Some(min), Some(max)) = (field.min, field.max) {
            if min > max {
                issues.push(ConfigIssue::Bounds {
                    path: path.to_string(),
                    section: section.to_string(),
                    field: field.name.clone(),
                    min,
                    max,
                });
            }
        }

        if !field.fields.is_empty() {
            validate_fields(path, &format!("{section}.{}", field.name), &field.fields, issues);
        }
    }
}

/// Two routes on the same path conflict when their methods overlap; a route
/// without a method overlaps everything.
fn check_conflicts(routes: &[RouteConfig], issues: &mut Vec<ConfigIssue>) {
    let mut by_path: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for route in routes {
        let method = route
            .method
            .as_deref()
            .map(str::to_ascii_uppercase)
            .unwrap_or_else(|| "ANY".to_string());
        by_path.entry(route.path.as_str()).or_default().push(method);
    }

    for (path, methods) in by_path {
        let mut seen = HashSet::new();
        for method in &methods {
            let overlaps_any = methods.len() > 1 && method == "ANY";
            if !seen.insert(method.as_str()) || overlaps_any {
                issues.push(ConfigIssue::DuplicateRoute {
                    path: path.to_string(),
                    method: method.clone(),
                });
            }
        }
    }
}
