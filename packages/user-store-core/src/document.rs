//! User document model and field casting.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::object_id::ObjectId;

/// Stored user record.
///
/// Serialized with the store's key names: `_id` for the identifier and `__v`
/// for the revision marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier
    #[serde(rename = "_id")]
    pub id: ObjectId,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// User type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Revision marker
    #[serde(rename = "__v", default)]
    pub version: u32,
}

impl User {
    /// Creates a new document with a fresh identifier.
    pub fn new(fields: UserFields) -> Self {
        Self {
            id: ObjectId::new(),
            name: fields.name,
            kind: fields.kind,
            version: 0,
        }
    }

    /// Replaces every schema field with the submitted values.
    ///
    /// The identifier and revision marker are left untouched.
    pub fn replace(&mut self, fields: UserFields) {
        self.name = fields.name;
        self.kind = fields.kind;
    }
}

/// Schema fields accepted from a request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFields {
    pub name: Option<String>,
    pub kind: Option<String>,
}

impl UserFields {
    /// Builds fields from a JSON object, casting values to strings.
    ///
    /// Keys outside the schema (including `_id` and `__v`) are ignored.
    pub fn from_json(object: &Map<String, Value>) -> Result<Self, StoreError> {
        Ok(Self {
            name: cast_string("name", object.get("name"))?,
            kind: cast_string("type", object.get("type"))?,
        })
    }
}

fn cast_string(field: &str, value: Option<&Value>) -> Result<Option<String>, StoreError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(StoreError::Validation {
            field: field.to_string(),
            message: format!("Cast to string failed for value {}", other),
        }),
    }
}
