//! Items, primary keys and the typed `Record` abstraction

use crate::core::error::{NoteResult, ValidationError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A stored document: a JSON object keyed by attribute name
pub type Item = serde_json::Map<String, Value>;

/// Composite primary key (partition key + optional sort key)
///
/// Items sharing a partition are grouped together; the sort component
/// identifies an item within its partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub partition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl PrimaryKey {
    pub fn new(partition: impl Into<String>, sort: Option<impl Into<String>>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.map(Into::into),
        }
    }

    /// Key for a table without a sort key
    pub fn partition(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
        }
    }

    /// Key for a table with both key components
    pub fn composite(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: Some(sort.into()),
        }
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sort {
            Some(sort) => write!(f, "{}/{}", self.partition, sort),
            None => write!(f, "{}", self.partition),
        }
    }
}

/// Names of the key attributes of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub partition_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
}

impl KeySchema {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    pub fn with_sort(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: Some(sort_key.into()),
        }
    }

    /// Whether `attribute` is one of the key attributes
    pub fn is_key_attribute(&self, attribute: &str) -> bool {
        self.partition_key == attribute || self.sort_key.as_deref() == Some(attribute)
    }

    /// Check that `key` has exactly the components this schema declares
    pub fn validate_key(&self, table: &str, key: &PrimaryKey) -> Result<(), ValidationError> {
        if key.partition.is_empty() {
            return Err(ValidationError::invalid_key(
                table,
                format!("'{}' must not be empty", self.partition_key),
            ));
        }
        match (&self.sort_key, &key.sort) {
            (Some(name), None) => Err(ValidationError::invalid_key(
                table,
                format!("missing sort key '{}'", name),
            )),
            (Some(name), Some(sort)) if sort.is_empty() => Err(ValidationError::invalid_key(
                table,
                format!("'{}' must not be empty", name),
            )),
            (None, Some(_)) => Err(ValidationError::invalid_key(
                table,
                "table has no sort key",
            )),
            _ => Ok(()),
        }
    }

    /// Extract the primary key from an item's key attributes
    pub fn key_of(&self, table: &str, item: &Item) -> Result<PrimaryKey, ValidationError> {
        let partition = string_attribute(table, item, &self.partition_key)?;
        let sort = match &self.sort_key {
            Some(name) => Some(string_attribute(table, item, name)?),
            None => None,
        };
        let key = PrimaryKey { partition, sort };
        self.validate_key(table, &key)?;
        Ok(key)
    }

    /// Render a key back into its attribute form
    pub fn key_item(&self, key: &PrimaryKey) -> Item {
        let mut item = Item::new();
        item.insert(
            self.partition_key.clone(),
            Value::String(key.partition.clone()),
        );
        if let (Some(name), Some(sort)) = (&self.sort_key, &key.sort) {
            item.insert(name.clone(), Value::String(sort.clone()));
        }
        item
    }
}

fn string_attribute(table: &str, item: &Item, name: &str) -> Result<String, ValidationError> {
    match item.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ValidationError::invalid_key(
            table,
            format!("'{}' must be a string, got {}", name, other),
        )),
        None => Err(ValidationError::invalid_key(
            table,
            format!("missing key attribute '{}'", name),
        )),
    }
}

/// A typed record stored in a logical table
///
/// Implementors describe which table they live in and how their primary key
/// is laid out; the default conversions go through `serde_json`.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Logical table name (before environment namespacing)
    fn table() -> &'static str;

    /// Key attribute names
    fn key_schema() -> KeySchema;

    /// This record's primary key
    fn primary_key(&self) -> PrimaryKey;

    fn to_item(&self) -> NoteResult<Item> {
        match serde_json::to_value(self)? {
            Value::Object(item) => Ok(item),
            other => Err(ValidationError::InvalidJson {
                message: format!("{} must serialize to an object, got {}", Self::table(), other),
            }
            .into()),
        }
    }

    fn from_item(item: Item) -> NoteResult<Self> {
        Ok(serde_json::from_value(Value::Object(item))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notes_schema() -> KeySchema {
        KeySchema::with_sort("accountID", "noteID")
    }

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_key_requires_sort() {
        let schema = notes_schema();
        let err = schema
            .validate_key("notes", &PrimaryKey::partition("a1"))
            .unwrap_err();
        assert!(err.to_string().contains("noteID"));
        assert!(
            schema
                .validate_key("notes", &PrimaryKey::composite("a1", "n1"))
                .is_ok()
        );
    }

    #[test]
    fn test_validate_key_rejects_unexpected_sort() {
        let schema = KeySchema::new("accountID");
        assert!(
            schema
                .validate_key("accounts", &PrimaryKey::composite("a1", "x"))
                .is_err()
        );
    }

    #[test]
    fn test_validate_key_rejects_empty_components() {
        let schema = notes_schema();
        assert!(
            schema
                .validate_key("notes", &PrimaryKey::composite("", "n1"))
                .is_err()
        );
        assert!(
            schema
                .validate_key("notes", &PrimaryKey::composite("a1", ""))
                .is_err()
        );
    }

    #[test]
    fn test_key_of_extracts_components() {
        let schema = notes_schema();
        let key = schema
            .key_of(
                "notes",
                &item(json!({"accountID": "a1", "noteID": "n1", "title": "T"})),
            )
            .unwrap();
        assert_eq!(key, PrimaryKey::composite("a1", "n1"));
    }

    #[test]
    fn test_key_of_rejects_non_string_key() {
        let schema = notes_schema();
        let err = schema
            .key_of("notes", &item(json!({"accountID": 7, "noteID": "n1"})))
            .unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_key_item_round_trips_through_key_of() {
        let schema = notes_schema();
        let key = PrimaryKey::composite("a1", "n1");
        assert_eq!(schema.key_of("notes", &schema.key_item(&key)).unwrap(), key);
    }

    #[test]
    fn test_primary_key_display() {
        assert_eq!(PrimaryKey::composite("a1", "n1").to_string(), "a1/n1");
        assert_eq!(PrimaryKey::partition("a1").to_string(), "a1");
    }
}
