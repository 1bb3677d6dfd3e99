use std::fmt;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// Unique identifier of a file node (`FILE-NODE-id` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Text fields shown in a record panel, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    NodeId,
    Category,
    Company,
    ContactName,
    Phone,
    Cell,
    Email,
    Description,
    ContextNote,
    FilePath,
}

impl Field {
    pub const PANEL_ORDER: [Field; 10] = [
        Field::NodeId,
        Field::Category,
        Field::Company,
        Field::ContactName,
        Field::Phone,
        Field::Cell,
        Field::Email,
        Field::Description,
        Field::ContextNote,
        Field::FilePath,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::NodeId => "Node ID",
            Field::Category => "Category",
            Field::Company => "Company",
            Field::ContactName => "Contact Name",
            Field::Phone => "Phone",
            Field::Cell => "Cell",
            Field::Email => "Email",
            Field::Description => "Description",
            Field::ContextNote => "Context Note",
            Field::FilePath => "Location",
        }
    }

    pub fn wire_key(self) -> &'static str {
        match self {
            Field::NodeId => "FILE-NODE-id",
            Field::Category => "category",
            Field::Company => "company",
            Field::ContactName => "contact_name",
            Field::Phone => "phone",
            Field::Cell => "cell",
            Field::Email => "email",
            Field::Description => "description",
            Field::ContextNote => "context_note",
            Field::FilePath => "filepath",
        }
    }

    /// Identity and location come from the file system and are never edited
    /// from the review form.
    pub fn is_read_only(self) -> bool {
        matches!(self, Field::NodeId | Field::FilePath)
    }

    pub fn is_multiline(self) -> bool {
        matches!(self, Field::Description | Field::ContextNote)
    }
}

/// The editable part of a record. This is also the `fields` payload of an
/// update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValues {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub company: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contact_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cell: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub context_note: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub reviewed: bool,
}

impl FieldValues {
    /// Value of an editable field. Read-only fields live on `Record`.
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::Category => &self.category,
            Field::Company => &self.company,
            Field::ContactName => &self.contact_name,
            Field::Phone => &self.phone,
            Field::Cell => &self.cell,
            Field::Email => &self.email,
            Field::Description => &self.description,
            Field::ContextNote => &self.context_note,
            Field::NodeId | Field::FilePath => return None,
        };
        Some(value.as_str())
    }

    /// Returns false when `field` is read-only.
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> bool {
        let slot = match field {
            Field::Category => &mut self.category,
            Field::Company => &mut self.company,
            Field::ContactName => &mut self.contact_name,
            Field::Phone => &mut self.phone,
            Field::Cell => &mut self.cell,
            Field::Email => &mut self.email,
            Field::Description => &mut self.description,
            Field::ContextNote => &mut self.context_note,
            Field::NodeId | Field::FilePath => return false,
        };
        *slot = value.into();
        true
    }
}

/// A file node as returned inside `{ "fnode": ... }` query entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "FILE-NODE-id")]
    pub node_id: NodeId,
    #[serde(rename = "filepath", default, deserialize_with = "null_as_empty")]
    pub file_path: String,
    #[serde(flatten)]
    pub values: FieldValues,
}

impl Record {
    pub fn new(node_id: impl Into<NodeId>, file_path: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            file_path: file_path.into(),
            values: FieldValues::default(),
        }
    }

    pub fn with_value(mut self, field: Field, value: impl Into<String>) -> Self {
        self.values.set(field, value);
        self
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::NodeId => self.node_id.as_str(),
            Field::FilePath => &self.file_path,
            other => self.values.get(other).unwrap_or_default(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_wire() {
        let raw = json!({
            "FILE-NODE-id": "busCard-employment-serv_20250916",
            "category": "employment services",
            "contact_name": "Nadine Byers",
            "phone": "780-609-0660",
            "cell": null,
            "description": "Employment agency.",
            "filepath": "C:\\Users\\termi\\Dropbox\\2025_0916-busCard-EmploymentServ.pdf",
            "email": "nadine@abwes.com",
            "timestamp": "2025-09-16 3:08 PM",
            "size": "113 KB"
        });
        let record: Record = serde_json::from_value(raw).unwrap();
        assert_eq!(record.node_id.as_str(), "busCard-employment-serv_20250916");
        assert_eq!(record.value(Field::ContactName), "Nadine Byers");
        assert_eq!(record.value(Field::Cell), "");
        assert_eq!(record.value(Field::Company), "");
        assert!(!record.values.reviewed);
        assert!(record.file_path.ends_with("EmploymentServ.pdf"));
    }

    #[test]
    fn test_record_without_id_is_rejected() {
        let raw = json!({ "category": "x" });
        assert!(serde_json::from_value::<Record>(raw).is_err());
    }

    #[test]
    fn test_field_values_payload_uses_wire_keys() {
        let mut values = FieldValues::default();
        values.set(Field::ContextNote, "met at expo");
        values.reviewed = true;
        let payload = serde_json::to_value(&values).unwrap();
        assert_eq!(payload["context_note"], "met at expo");
        assert_eq!(payload["reviewed"], true);
        assert!(payload.get("FILE-NODE-id").is_none());
    }

    #[test]
    fn test_read_only_fields_cannot_be_set() {
        let mut values = FieldValues::default();
        assert!(!values.set(Field::NodeId, "other"));
        assert!(!values.set(Field::FilePath, "/tmp"));
        assert!(values.set(Field::Phone, "555-0000"));
        assert_eq!(values.get(Field::Phone), Some("555-0000"));
    }
}
