//! In-memory implementation of StorageClient for testing and development

use crate::core::client::{StorageClient, TableSpec};
use crate::core::error::{NoteError, NoteResult};
use crate::core::item::{Item, KeySchema, PrimaryKey};
use crate::core::query::{
    ContinuationToken, Filter, KeyCondition, PAGE_BYTE_BUDGET, Page, PageRequest,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

const BACKEND: &str = "memory";

type Table = BTreeMap<PrimaryKey, Item>;

/// In-memory storage client
///
/// Tables are created on first write and keyed by physical name, so stores
/// configured for different environments never see each other's items.
/// Pages honour the same byte budget as the managed store. Uses RwLock for
/// thread-safe access.
#[derive(Clone)]
pub struct InMemoryStorageClient {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    page_budget: usize,
}

impl InMemoryStorageClient {
    /// Create a new in-memory client with the standard page budget
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            page_budget: PAGE_BYTE_BUDGET,
        }
    }

    /// Override the per-page byte budget
    pub fn with_page_budget(mut self, bytes: usize) -> Self {
        self.page_budget = bytes.max(1);
        self
    }

    /// Number of items stored in a physical table
    pub fn item_count(&self, physical_name: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(physical_name).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Physical names of every table holding at least one item
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .read()
            .map(|tables| {
                tables
                    .iter()
                    .filter(|(_, items)| !items.is_empty())
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    fn read_page<'a>(
        &self,
        schema: &KeySchema,
        candidates: impl Iterator<Item = (&'a PrimaryKey, &'a Item)>,
        limit: Option<usize>,
        keep: impl Fn(&Item) -> bool,
    ) -> NoteResult<Page<Item>> {
        let mut items = Vec::new();
        let mut used = 0;
        let mut evaluated = 0;
        let mut last: Option<&PrimaryKey> = None;
        let mut candidates = candidates.peekable();

        while let Some(&(key, item)) = candidates.peek() {
            if limit.is_some_and(|limit| evaluated >= limit) {
                break;
            }
            let size = serde_json::to_vec(item)?.len();
            // A page always makes progress, even past the budget
            if evaluated > 0 && used + size > self.page_budget {
                break;
            }
            used += size;
            evaluated += 1;
            last = Some(key);
            if keep(item) {
                items.push(item.clone());
            }
            candidates.next();
        }

        let continuation = match (candidates.peek(), last) {
            (Some(_), Some(key)) => Some(ContinuationToken::from_key_item(&schema.key_item(key))),
            _ => None,
        };
        Ok(Page::new(items, continuation))
    }
}

impl Default for InMemoryStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error(e: impl std::fmt::Display) -> NoteError {
    NoteError::transient(BACKEND, format!("Failed to acquire lock: {}", e))
}

fn resume_key(table: &TableSpec, page: &PageRequest) -> NoteResult<Option<PrimaryKey>> {
    match &page.start {
        Some(token) => {
            let key_item = token.to_key_item()?;
            Ok(Some(table.schema.key_of(&table.logical_name, &key_item)?))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl StorageClient for InMemoryStorageClient {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    async fn get_item(&self, table: &TableSpec, key: &PrimaryKey) -> NoteResult<Option<Item>> {
        let tables = self.tables.read().map_err(lock_error)?;

        Ok(tables
            .get(&table.physical_name)
            .and_then(|items| items.get(key))
            .cloned())
    }

    async fn put_item(&self, table: &TableSpec, item: Item) -> NoteResult<()> {
        let key = table.schema.key_of(&table.logical_name, &item)?;
        let mut tables = self.tables.write().map_err(lock_error)?;

        tables
            .entry(table.physical_name.clone())
            .or_default()
            .insert(key, item);

        Ok(())
    }

    async fn update_item(
        &self,
        table: &TableSpec,
        key: &PrimaryKey,
        patch: Item,
    ) -> NoteResult<Option<Item>> {
        let mut tables = self.tables.write().map_err(lock_error)?;

        let Some(existing) = tables
            .get_mut(&table.physical_name)
            .and_then(|items| items.get_mut(key))
        else {
            return Ok(None);
        };
        for (attribute, value) in patch {
            existing.insert(attribute, value);
        }

        Ok(Some(existing.clone()))
    }

    async fn delete_item(&self, table: &TableSpec, key: &PrimaryKey) -> NoteResult<()> {
        let mut tables = self.tables.write().map_err(lock_error)?;

        if let Some(items) = tables.get_mut(&table.physical_name) {
            items.remove(key);
        }

        Ok(())
    }

    async fn query(
        &self,
        table: &TableSpec,
        condition: &KeyCondition,
        page: &PageRequest,
    ) -> NoteResult<Page<Item>> {
        let start = resume_key(table, page)?;
        let tables = self.tables.read().map_err(lock_error)?;
        let Some(items) = tables.get(&table.physical_name) else {
            return Ok(Page::new(Vec::new(), None));
        };

        let matching = items.iter().filter(|(key, _)| condition.matches(key));
        if condition.scan_forward {
            let candidates =
                matching.filter(|(key, _)| start.as_ref().is_none_or(|start| *key > start));
            self.read_page(&table.schema, candidates, page.limit, |_| true)
        } else {
            let candidates = matching
                .rev()
                .filter(|(key, _)| start.as_ref().is_none_or(|start| *key < start));
            self.read_page(&table.schema, candidates, page.limit, |_| true)
        }
    }

    async fn scan(
        &self,
        table: &TableSpec,
        filter: Option<&Filter>,
        page: &PageRequest,
    ) -> NoteResult<Page<Item>> {
        let start = resume_key(table, page)?;
        let tables = self.tables.read().map_err(lock_error)?;
        let Some(items) = tables.get(&table.physical_name) else {
            return Ok(Page::new(Vec::new(), None));
        };

        let candidates = items
            .iter()
            .filter(|(key, _)| start.as_ref().is_none_or(|start| *key > start));
        self.read_page(&table.schema, candidates, page.limit, |item| {
            filter.is_none_or(|f| f.matches(item))
        })
    }
}
