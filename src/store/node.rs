//! Content records and typed references between them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::actions::Origin;

/// Field key holding a reference's target type.
pub const REFERENCE_TYPE_KEY: &str = "typeName";

/// Field key holding a node's id.
pub const ID_KEY: &str = "id";

/// A single content record inside a content type.
///
/// `fields` always contains the normalized `id` as a string, so resolvers
/// can read every key (including `id`) from one map.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: String,
    type_name: String,
    fields: Map<String, Value>,
    pub(crate) origin: Origin,
}

impl Node {
    pub(crate) fn new(type_name: &str, id: String, mut fields: Map<String, Value>, origin: Origin) -> Self {
        fields.insert(ID_KEY.to_owned(), Value::String(id.clone()));
        Self {
            id,
            type_name: type_name.to_owned(),
            fields,
            origin,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Raw field value by its original data key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// `path` field, set explicitly or generated from the content type route.
    pub fn path(&self) -> Option<&str> {
        self.fields.get("path").and_then(Value::as_str)
    }

    /// Reference pointing at this node.
    pub fn reference(&self) -> Reference {
        Reference::new(&self.type_name, &self.id)
    }

    /// JSON view of the node, as exposed through the `JSON` scalar.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// A typed pointer `(typeName, id)` to a node.
///
/// Stored inside node fields as `{ "typeName": ..., "id": ... }` and resolved
/// lazily at query time. Creating a reference never checks that the target
/// exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "typeName")]
    pub type_name: String,
    pub id: String,
}

impl Reference {
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Recognize a stored reference: an object with exactly `typeName` and `id`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        if map.len() != 2 {
            return None;
        }
        let type_name = map.get(REFERENCE_TYPE_KEY)?.as_str()?;
        let id = match map.get(ID_KEY)? {
            Value::String(id) => id.clone(),
            Value::Number(id) => id.to_string(),
            _ => return None,
        };
        Some(Self::new(type_name, id))
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(REFERENCE_TYPE_KEY.to_owned(), Value::String(self.type_name.clone()));
        map.insert(ID_KEY.to_owned(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        reference.to_value()
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.type_name, self.id)
    }
}
