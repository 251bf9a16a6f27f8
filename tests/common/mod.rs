//! Shared test harness for storage clients and the notes stack
//!
//! Provides `Widget`, a `Record` with a composite key and a few value types,
//! a `FailingStorageClient` for error propagation tests, and helpers that
//! assemble stores, services and routers over the in-memory backend.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod store_contract;

use async_trait::async_trait;
use notegate::config::{Environment, StoreConfig};
use notegate::core::client::{StorageClient, TableSpec};
use notegate::core::error::{NoteError, NoteResult};
use notegate::core::item::{Item, KeySchema, PrimaryKey, Record};
use notegate::core::query::{Filter, KeyCondition, Page, PageRequest};
use notegate::core::store::ResourceStore;
use notegate::notes::NotesService;
use notegate::storage::InMemoryStorageClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const NAMESPACE: &str = "myapp";

// ---------------------------------------------------------------------------
// Widget: composite key, string/integer/list fields
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub shelf: String,
    #[serde(rename = "widgetID")]
    pub widget_id: String,
    pub label: String,
    pub count: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Record for Widget {
    fn table() -> &'static str {
        "widgets"
    }

    fn key_schema() -> KeySchema {
        KeySchema::with_sort("shelf", "widgetID")
    }

    fn primary_key(&self) -> PrimaryKey {
        PrimaryKey::composite(self.shelf.clone(), self.widget_id.clone())
    }
}

pub fn widget(shelf: &str, widget_id: &str, label: &str) -> Widget {
    Widget {
        shelf: shelf.to_string(),
        widget_id: widget_id.to_string(),
        label: label.to_string(),
        count: 1,
        tags: vec!["new".to_string()],
    }
}

// ---------------------------------------------------------------------------
// Stores and services
// ---------------------------------------------------------------------------

pub fn config(environment: Environment) -> StoreConfig {
    StoreConfig::new(NAMESPACE, environment).unwrap()
}

pub fn store<T: Record>(client: Arc<dyn StorageClient>) -> ResourceStore<T> {
    ResourceStore::new(&config(Environment::Testing), client).unwrap()
}

pub fn notes_service(client: Arc<dyn StorageClient>) -> NotesService {
    NotesService::new(store(client))
}

pub fn in_memory() -> Arc<InMemoryStorageClient> {
    Arc::new(InMemoryStorageClient::new())
}

// ---------------------------------------------------------------------------
// FailingStorageClient: every storage call fails as transient I/O
// ---------------------------------------------------------------------------

/// Storage client whose every call fails with `TransientIo`
#[derive(Debug, Default)]
pub struct FailingStorageClient {
    calls: AtomicUsize,
}

impl FailingStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> NoteResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(NoteError::transient("failing", "connection reset"))
    }
}

#[async_trait]
impl StorageClient for FailingStorageClient {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn get_item(&self, _table: &TableSpec, _key: &PrimaryKey) -> NoteResult<Option<Item>> {
        self.fail()
    }

    async fn put_item(&self, _table: &TableSpec, _item: Item) -> NoteResult<()> {
        self.fail()
    }

    async fn update_item(
        &self,
        _table: &TableSpec,
        _key: &PrimaryKey,
        _patch: Item,
    ) -> NoteResult<Option<Item>> {
        self.fail()
    }

    async fn delete_item(&self, _table: &TableSpec, _key: &PrimaryKey) -> NoteResult<()> {
        self.fail()
    }

    async fn query(
        &self,
        _table: &TableSpec,
        _condition: &KeyCondition,
        _page: &PageRequest,
    ) -> NoteResult<Page<Item>> {
        self.fail()
    }

    async fn scan(
        &self,
        _table: &TableSpec,
        _filter: Option<&Filter>,
        _page: &PageRequest,
    ) -> NoteResult<Page<Item>> {
        self.fail()
    }
}
