//! Request sections and the schema map keyed by them.
//!
//! # Design Decisions
//! - The section set is closed; routing `params` to the context and every
//!   other section to the request is an exhaustive match, not a lookup
//! - Concurrent validations write to disjoint sections, so the key set
//!   must stay fixed to these four names

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;
use crate::validation::error::BuildError;

/// One validatable part of an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Query,
    Headers,
    Body,
    Params,
}

/// Where a section's value lives on the request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Top-level field of the context (route parameters).
    Context,
    /// Field of the context's request object.
    Request,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Query, Section::Headers, Section::Body, Section::Params];

    pub fn source(self) -> Source {
        match self {
            Section::Params => Source::Context,
            Section::Query | Section::Headers | Section::Body => Source::Request,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Query => "query",
            Section::Headers => "headers",
            Section::Body => "body",
            Section::Params => "params",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Section::Query),
            "headers" => Ok(Section::Headers),
            "body" => Ok(Section::Body),
            "params" => Ok(Section::Params),
            other => Err(BuildError::UnknownSection(other.to_string())),
        }
    }
}

/// Schemas keyed by section. Sections without a schema are left untouched.
#[derive(Clone, Default)]
pub struct SchemaMap {
    schemas: BTreeMap<Section, Arc<dyn Schema>>,
}

impl SchemaMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from string keys, rejecting anything that is not a known section.
    pub fn from_named<I, K>(entries: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = (K, Arc<dyn Schema>)>,
        K: AsRef<str>,
    {
        let mut map = Self::new();
        for (name, schema) in entries {
            let section = name.as_ref().parse()?;
            map.schemas.insert(section, schema);
        }
        Ok(map)
    }

    /// Set the schema for a section, replacing any previous one.
    pub fn insert(&mut self, section: Section, schema: impl Schema) {
        self.schemas.insert(section, Arc::new(schema));
    }

    pub fn with(mut self, section: Section, schema: impl Schema) -> Self {
        self.insert(section, schema);
        self
    }

    pub fn query(self, schema: impl Schema) -> Self {
        self.with(Section::Query, schema)
    }

    pub fn headers(self, schema: impl Schema) -> Self {
        self.with(Section::Headers, schema)
    }

    pub fn body(self, schema: impl Schema) -> Self {
        self.with(Section::Body, schema)
    }

    pub fn params(self, schema: impl Schema) -> Self {
        self.with(Section::Params, schema)
    }

    pub fn contains(&self, section: Section) -> bool {
        self.schemas.contains_key(&section)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.schemas.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Section, &Arc<dyn Schema>)> + '_ {
        self.schemas.iter().map(|(section, schema)| (*section, schema))
    }
}

impl fmt::Debug for SchemaMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.schemas.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ObjectSchema;

    #[test]
    fn test_source_routing() {
        assert_eq!(Section::Params.source(), Source::Context);
        assert_eq!(Section::Query.source(), Source::Request);
        assert_eq!(Section::Headers.source(), Source::Request);
        assert_eq!(Section::Body.source(), Source::Request);
    }

    #[test]
    fn test_parse_sections() {
        for section in Section::ALL {
            assert_eq!(section.as_str().parse::<Section>().unwrap(), section);
        }
        assert_eq!(
            "cookies".parse::<Section>(),
            Err(BuildError::UnknownSection("cookies".into()))
        );
        // Keys are case-sensitive, matching the request object's field names.
        assert!("Query".parse::<Section>().is_err());
    }

    #[test]
    fn test_from_named_rejects_unknown_keys() {
        let schema: Arc<dyn Schema> = Arc::new(ObjectSchema::new());
        let map = SchemaMap::from_named([("query", schema.clone()), ("params", schema.clone())]).unwrap();
        assert_eq!(map.sections().collect::<Vec<_>>(), vec![Section::Query, Section::Params]);

        let err = SchemaMap::from_named([("session", schema)]).unwrap_err();
        assert_eq!(err, BuildError::UnknownSection("session".into()));
    }

    #[test]
    fn test_builder_replaces_duplicates() {
        let map = SchemaMap::new()
            .body(ObjectSchema::new())
            .body(ObjectSchema::new().unknown(true));
        assert_eq!(map.len(), 1);
        assert!(map.contains(Section::Body));
        assert!(!map.contains(Section::Query));
    }
}
