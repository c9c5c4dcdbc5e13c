//! Flat record model produced by the export payload parser.

use serde::{Deserialize, Serialize};

/// A single field value inside a record.
///
/// `CData` marks verbatim content that was carried in a CDATA section and
/// must not be entity-decoded or re-escaped as ordinary text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    CData { cdata: String },
}

impl FieldValue {
    /// The field content regardless of carrier.
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::CData { cdata } => cdata,
        }
    }

    pub fn is_cdata(&self) -> bool {
        matches!(self, FieldValue::CData { .. })
    }
}

/// One flat record decoded from the export payload.
///
/// Field order is insertion order so that serialization is deterministic and
/// round trips reproduce the original field layout. `attributes` captures the
/// XML attributes of the record's boundary tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Boundary tag name this record was read from (or will be written as).
    pub name: String,

    fields: Vec<(String, FieldValue)>,

    attributes: Vec<(String, String)>,
}

impl Record {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Set a field, replacing any existing value under the same name.
    pub fn set_field(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn push_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    /// Boundary-tag attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_field_replaces_existing() {
        let mut record = Record::new("sys_script");
        record.set_field("name", FieldValue::Text("first".to_string()));
        record.set_field("name", FieldValue::Text("second".to_string()));

        assert_eq!(record.field_count(), 1);
        assert_eq!(record.get_field("name").unwrap().as_str(), "second");
    }

    #[test]
    fn test_field_order_is_insertion_order() {
        let mut record = Record::new("sys_script");
        record.set_field("zebra", FieldValue::Text("z".to_string()));
        record.set_field("alpha", FieldValue::Text("a".to_string()));

        let names: Vec<&str> = record.fields().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zebra", "alpha"]);
    }

    #[test]
    fn test_field_value_serde_shape() {
        let text = FieldValue::Text("plain".to_string());
        let cdata = FieldValue::CData {
            cdata: "verbatim".to_string(),
        };

        assert_eq!(serde_json::to_string(&text).unwrap(), r#""plain""#);
        assert_eq!(
            serde_json::to_string(&cdata).unwrap(),
            r#"{"cdata":"verbatim"}"#
        );
    }
}
