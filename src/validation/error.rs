//! Error taxonomy for the validation stage.
//!
//! A single externally visible kind, [`ValidationError`], is produced when a
//! section does not conform to its schema. [`BuildError`] only ever surfaces
//! while a validator is being assembled.

use serde::Serialize;

use crate::validation::section::Section;

/// One violated constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    /// Human-readable description, e.g. `"username" is required`.
    pub message: String,

    /// Path of the offending field inside the section.
    pub path: Vec<String>,

    /// Machine-readable constraint kind, e.g. `any.required`, `string.max`.
    pub kind: String,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>, path: Vec<String>, kind: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path,
            kind: kind.into(),
        }
    }
}

/// Raised when a section value does not satisfy its schema.
///
/// `message` describes the primary violated constraint (or all of them,
/// joined by `". "`, when early abort is disabled).
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    details: Vec<ErrorDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    section: Option<Section>,
}

impl ValidationError {
    /// Error name exposed to error handlers.
    pub const NAME: &'static str = "ValidationError";

    /// Error with a single free-form message.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            details: vec![ErrorDetail::new(message.clone(), Vec::new(), "custom")],
            message,
            section: None,
        }
    }

    /// Error built from one or more violated constraints.
    pub fn from_details(details: Vec<ErrorDetail>) -> Self {
        let message = details
            .iter()
            .map(|d| d.message.as_str())
            .collect::<Vec<_>>()
            .join(". ");
        Self {
            message,
            details,
            section: None,
        }
    }

    /// Tags the error with the section it was raised for.
    pub fn in_section(mut self, section: Section) -> Self {
        self.section = Some(section);
        self
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &[ErrorDetail] {
        &self.details
    }

    pub fn section(&self) -> Option<Section> {
        self.section
    }
}

/// Errors raised while assembling a validator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("unknown request section `{0}` (expected one of: query, headers, body, params)")]
    UnknownSection(String),
}
