//! Key conditions, filters and pagination

use crate::core::error::{NoteResult, ValidationError};
use crate::core::item::{Item, PrimaryKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Byte budget of a single query/scan page (1 MiB)
///
/// Matches the page size of the managed document stores this layer targets.
/// Callers must follow continuation tokens rather than assume a single page.
pub const PAGE_BYTE_BUDGET: usize = 1024 * 1024;

/// Condition on the sort key of a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum SortCondition {
    Eq(String),
    BeginsWith(String),
    Between(String, String),
    Lt(String),
    Le(String),
    Gt(String),
    Ge(String),
}

impl SortCondition {
    /// Whether a sort key value satisfies this condition
    pub fn matches(&self, sort: &str) -> bool {
        match self {
            SortCondition::Eq(v) => sort == v,
            SortCondition::BeginsWith(prefix) => sort.starts_with(prefix.as_str()),
            SortCondition::Between(low, high) => sort >= low.as_str() && sort <= high.as_str(),
            SortCondition::Lt(v) => sort < v.as_str(),
            SortCondition::Le(v) => sort <= v.as_str(),
            SortCondition::Gt(v) => sort > v.as_str(),
            SortCondition::Ge(v) => sort >= v.as_str(),
        }
    }
}

/// Key condition of a query: one partition, optionally narrowed on sort key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCondition {
    pub partition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortCondition>,
    /// Ascending sort-key order when true
    #[serde(default = "default_forward")]
    pub scan_forward: bool,
}

fn default_forward() -> bool {
    true
}

impl KeyCondition {
    /// Every item in a partition
    pub fn partition(partition: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
            scan_forward: true,
        }
    }

    pub fn with_sort(mut self, sort: SortCondition) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Return items in descending sort-key order
    pub fn reverse(mut self) -> Self {
        self.scan_forward = false;
        self
    }

    pub fn validate(&self, table: &str) -> Result<(), ValidationError> {
        if self.partition.is_empty() {
            return Err(ValidationError::invalid_key(
                table,
                "query partition must not be empty",
            ));
        }
        Ok(())
    }

    pub fn matches(&self, key: &PrimaryKey) -> bool {
        if key.partition != self.partition {
            return false;
        }
        match (&self.sort, &key.sort) {
            (None, _) => true,
            (Some(cond), Some(sort)) => cond.matches(sort),
            (Some(_), None) => false,
        }
    }
}

/// Attribute-equality filter applied to scanned items
///
/// Every listed attribute must be present and equal for an item to pass. An
/// empty filter passes everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    conditions: Item,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `attribute == value`
    pub fn eq(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(attribute.into(), value.into());
        self
    }

    /// Build a filter from a JSON object such as `{"title": "T"}`
    pub fn from_value(value: Value) -> NoteResult<Self> {
        match value {
            Value::Object(conditions) => Ok(Self { conditions }),
            Value::Null => Ok(Self::default()),
            other => Err(ValidationError::InvalidJson {
                message: format!("filter must be an object, got {}", other),
            }
            .into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &Item {
        &self.conditions
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.conditions
            .iter()
            .all(|(attribute, expected)| item.get(attribute) == Some(expected))
    }
}

/// Opaque marker to resume a paginated read
///
/// Wraps the key attributes of the last item evaluated by the previous page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Build a token from the key attributes of the last evaluated item
    pub fn from_key_item(key: &Item) -> Self {
        Self(Value::Object(key.clone()).to_string())
    }

    /// Recover the key attributes stored in this token
    pub fn to_key_item(&self) -> NoteResult<Item> {
        match serde_json::from_str::<Value>(&self.0) {
            Ok(Value::Object(item)) => Ok(item),
            _ => Err(ValidationError::InvalidJson {
                message: "malformed continuation token".to_string(),
            }
            .into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContinuationToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Pagination parameters for a single page read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of items to evaluate
    pub limit: Option<usize>,
    /// Where the previous page stopped
    pub start: Option<ContinuationToken>,
}

impl PageRequest {
    pub fn first() -> Self {
        Self::default()
    }

    pub fn resume(start: Option<ContinuationToken>) -> Self {
        Self { limit: None, start }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit.max(1));
        self
    }
}

/// One page of a query or scan
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Present when more items may follow
    pub continuation: Option<ContinuationToken>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, continuation: Option<ContinuationToken>) -> Self {
        Self {
            items,
            continuation,
        }
    }

    pub fn is_last(&self) -> bool {
        self.continuation.is_none()
    }

    /// Convert every item, failing on the first conversion error
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            continuation: self.continuation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_conditions() {
        assert!(SortCondition::Eq("b".into()).matches("b"));
        assert!(SortCondition::BeginsWith("01".into()).matches("0123"));
        assert!(!SortCondition::BeginsWith("02".into()).matches("0123"));
        assert!(SortCondition::Between("b".into(), "d".into()).matches("c"));
        assert!(SortCondition::Between("b".into(), "d".into()).matches("d"));
        assert!(!SortCondition::Between("b".into(), "d".into()).matches("e"));
        assert!(SortCondition::Lt("b".into()).matches("a"));
        assert!(!SortCondition::Lt("b".into()).matches("b"));
        assert!(SortCondition::Le("b".into()).matches("b"));
        assert!(SortCondition::Gt("b".into()).matches("c"));
        assert!(SortCondition::Ge("b".into()).matches("b"));
    }

    #[test]
    fn test_key_condition_matches_partition_only() {
        let cond = KeyCondition::partition("a1");
        assert!(cond.matches(&PrimaryKey::composite("a1", "x")));
        assert!(!cond.matches(&PrimaryKey::composite("a2", "x")));
    }

    #[test]
    fn test_key_condition_with_sort_requires_sort_component() {
        let cond = KeyCondition::partition("a1").with_sort(SortCondition::Ge("m".into()));
        assert!(cond.matches(&PrimaryKey::composite("a1", "z")));
        assert!(!cond.matches(&PrimaryKey::composite("a1", "a")));
        assert!(!cond.matches(&PrimaryKey::partition("a1")));
    }

    #[test]
    fn test_key_condition_rejects_empty_partition() {
        assert!(KeyCondition::partition("").validate("notes").is_err());
    }

    #[test]
    fn test_filter_matches_all_conditions() {
        let filter = Filter::new().eq("title", "T").eq("pinned", true);
        let hit = json!({"title": "T", "pinned": true, "body": "B"});
        let miss = json!({"title": "T", "pinned": false});
        assert!(filter.matches(hit.as_object().unwrap()));
        assert!(!filter.matches(miss.as_object().unwrap()));
        assert!(Filter::new().matches(miss.as_object().unwrap()));
    }

    #[test]
    fn test_filter_from_value() {
        assert!(Filter::from_value(json!({"title": "T"})).is_ok());
        assert!(Filter::from_value(Value::Null).unwrap().is_empty());
        assert!(Filter::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn test_continuation_token_carries_key_attributes() {
        let key = json!({"accountID": "a1", "noteID": "n1"});
        let token = ContinuationToken::from_key_item(key.as_object().unwrap());
        assert_eq!(&token.to_key_item().unwrap(), key.as_object().unwrap());
        assert!(ContinuationToken::from("garbage".to_string()).to_key_item().is_err());
    }

    #[test]
    fn test_page_try_map() {
        let page = Page::new(vec![1, 2, 3], None);
        let doubled: Page<i32> = page.try_map(|n| Ok::<_, ()>(n * 2)).unwrap();
        assert_eq!(doubled.items, vec![2, 4, 6]);
        assert!(doubled.is_last());
    }
}
