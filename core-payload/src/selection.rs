//! Declarative field selection for the export payload parser.
//!
//! A [`FieldSelection`] tells the parser which tags mark record boundaries
//! and which child tags of a boundary are captured as record fields. Tags not
//! listed are skipped without disturbing boundary detection.

use std::collections::HashMap;

/// Which child tags of a boundary are captured as fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldList {
    /// Capture every child tag (wildcard mode).
    All,
    /// Capture only the named tags, in whatever order they appear.
    Named(Vec<String>),
}

impl FieldList {
    pub fn matches(&self, tag: &str) -> bool {
        match self {
            FieldList::All => true,
            FieldList::Named(names) => names.iter().any(|n| n == tag),
        }
    }
}

/// Capture rules for one boundary tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub fields: FieldList,

    /// Optional label for emitted records. When set, records read from this
    /// boundary carry this name instead of the wire tag name.
    pub record_name: Option<String>,
}

impl FieldSpec {
    pub fn all() -> Self {
        Self {
            fields: FieldList::All,
            record_name: None,
        }
    }

    pub fn named<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: FieldList::Named(fields.into_iter().map(Into::into).collect()),
            record_name: None,
        }
    }

    pub fn record_name(mut self, name: impl Into<String>) -> Self {
        self.record_name = Some(name.into());
        self
    }
}

/// Map from boundary tag name to capture rules. Immutable once handed to the
/// parser.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelection {
    entries: HashMap<String, FieldSpec>,
}

impl FieldSelection {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_entry(mut self, tag: impl Into<String>, spec: FieldSpec) -> Self {
        self.entries.insert(tag.into(), spec);
        self
    }

    pub fn get(&self, tag: &str) -> Option<&FieldSpec> {
        self.entries.get(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FieldSelection {
    /// The built-in selection for the platform's update-record group: every
    /// `sys_update_xml` element is a record and all of its child tags are
    /// captured.
    fn default() -> Self {
        Self::new().with_entry("sys_update_xml", FieldSpec::all())
    }
}
