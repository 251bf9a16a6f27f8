//! Storage client trait: the primitive operations a backend must provide

use crate::core::error::NoteResult;
use crate::core::item::{Item, KeySchema, PrimaryKey};
use crate::core::query::{Filter, KeyCondition, Page, PageRequest};
use async_trait::async_trait;

/// A resolved physical table
///
/// Produced once per store by combining the logical table name with the
/// deployment environment and application namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// Logical name used by application code (e.g. "notes")
    pub logical_name: String,
    /// Name of the table in the backend (e.g. "myapp-staging-notes")
    pub physical_name: String,
    pub schema: KeySchema,
}

/// Primitive item operations against a physical table
///
/// Implementations translate these calls into their backend's native
/// protocol. They must not retry internally; backend failures surface as
/// `NoteError::TransientIo` so the caller owns the retry policy.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Short backend name for logs and errors
    fn backend(&self) -> &'static str;

    /// Fetch the item at `key`
    async fn get_item(&self, table: &TableSpec, key: &PrimaryKey) -> NoteResult<Option<Item>>;

    /// Store `item`, replacing any item with the same key
    async fn put_item(&self, table: &TableSpec, item: Item) -> NoteResult<()>;

    /// Merge `patch` into the item at `key`
    ///
    /// Returns the merged item, or `None` when no item exists. Must not
    /// create an item.
    async fn update_item(
        &self,
        table: &TableSpec,
        key: &PrimaryKey,
        patch: Item,
    ) -> NoteResult<Option<Item>>;

    /// Remove the item at `key`; absent items are not an error
    async fn delete_item(&self, table: &TableSpec, key: &PrimaryKey) -> NoteResult<()>;

    /// Read one page of items matching `condition`
    async fn query(
        &self,
        table: &TableSpec,
        condition: &KeyCondition,
        page: &PageRequest,
    ) -> NoteResult<Page<Item>>;

    /// Read one page of the whole table, keeping items that pass `filter`
    async fn scan(
        &self,
        table: &TableSpec,
        filter: Option<&Filter>,
        page: &PageRequest,
    ) -> NoteResult<Page<Item>>;
}
