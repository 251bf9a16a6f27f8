//! Typed resource store over a `StorageClient`

use crate::config::StoreConfig;
use crate::core::client::{StorageClient, TableSpec};
use crate::core::error::{NoteError, NoteResult, ValidationError};
use crate::core::item::{Item, PrimaryKey, Record};
use crate::core::query::{ContinuationToken, Filter, KeyCondition, Page, PageRequest};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Outcome of a successful write
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult<T> {
    /// Physical table the item was written to
    pub table: String,
    pub key: PrimaryKey,
    /// The item as stored after the write
    pub item: T,
}

/// CRUD façade for one logical table
///
/// The physical table name is resolved once, at construction, from the
/// store configuration. Every operation delegates to the storage client
/// and surfaces its errors unchanged; nothing is retried here.
pub struct ResourceStore<T: Record> {
    client: Arc<dyn StorageClient>,
    table: TableSpec,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Record> Clone for ResourceStore<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            table: self.table.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Record> std::fmt::Debug for ResourceStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore")
            .field("backend", &self.client.backend())
            .field("table", &self.table)
            .finish()
    }
}

impl<T: Record> ResourceStore<T> {
    pub fn new(config: &StoreConfig, client: Arc<dyn StorageClient>) -> NoteResult<Self> {
        let table = config.resolve_table(T::table(), T::key_schema())?;
        tracing::debug!(
            table = %table.physical_name,
            backend = client.backend(),
            "Resource store ready"
        );
        Ok(Self {
            client,
            table,
            _phantom: PhantomData,
        })
    }

    /// The resolved physical table
    pub fn table(&self) -> &TableSpec {
        &self.table
    }

    fn validate_key(&self, key: &PrimaryKey) -> NoteResult<()> {
        self.table
            .schema
            .validate_key(&self.table.logical_name, key)
            .map_err(NoteError::from)
    }

    /// Fetch a record by its full primary key
    pub async fn get(&self, key: &PrimaryKey) -> NoteResult<T> {
        self.validate_key(key)?;
        tracing::debug!(table = %self.table.physical_name, key = %key, "get");
        match self.client.get_item(&self.table, key).await? {
            Some(item) => T::from_item(item),
            None => Err(NoteError::not_found(&self.table.logical_name, key.clone())),
        }
    }

    /// Read a single page of a query
    pub async fn query_page(
        &self,
        condition: &KeyCondition,
        page: PageRequest,
    ) -> NoteResult<Page<T>> {
        condition.validate(&self.table.logical_name)?;
        tracing::debug!(
            table = %self.table.physical_name,
            partition = %condition.partition,
            resumed = page.start.is_some(),
            "query page"
        );
        self.client
            .query(&self.table, condition, &page)
            .await?
            .try_map(T::from_item)
    }

    /// Lazily stream every record matching `condition`
    ///
    /// Pages are fetched on demand; continuation tokens are followed until
    /// the backend reports no more items.
    pub fn query(&self, condition: KeyCondition) -> BoxStream<'_, NoteResult<T>> {
        paginate(move |start| {
            let condition = condition.clone();
            async move { self.query_page(&condition, PageRequest::resume(start)).await }
        })
    }

    /// Collect every record matching `condition`
    pub async fn query_all(&self, condition: KeyCondition) -> NoteResult<Vec<T>> {
        self.query(condition).try_collect().await
    }

    /// Read a single page of a scan
    pub async fn scan_page(
        &self,
        filter: Option<&Filter>,
        page: PageRequest,
    ) -> NoteResult<Page<T>> {
        tracing::debug!(
            table = %self.table.physical_name,
            filtered = filter.is_some_and(|f| !f.is_empty()),
            resumed = page.start.is_some(),
            "scan page"
        );
        self.client
            .scan(&self.table, filter, &page)
            .await?
            .try_map(T::from_item)
    }

    /// Lazily stream every record in the table that passes `filter`
    pub fn scan(&self, filter: Option<Filter>) -> BoxStream<'_, NoteResult<T>> {
        paginate(move |start| {
            let filter = filter.clone();
            async move {
                self.scan_page(filter.as_ref(), PageRequest::resume(start))
                    .await
            }
        })
    }

    /// Collect every record in the table that passes `filter`
    pub async fn scan_all(&self, filter: Option<Filter>) -> NoteResult<Vec<T>> {
        self.scan(filter).try_collect().await
    }

    /// Store a record, replacing any record at the same key
    pub async fn put(&self, record: T) -> NoteResult<WriteResult<T>> {
        let key = record.primary_key();
        self.validate_key(&key)?;
        let item = record.to_item()?;
        let stored_key = self
            .table
            .schema
            .key_of(&self.table.logical_name, &item)?;
        if stored_key != key {
            return Err(ValidationError::invalid_key(
                &self.table.logical_name,
                format!("item attributes describe key '{}', not '{}'", stored_key, key),
            )
            .into());
        }

        tracing::debug!(table = %self.table.physical_name, key = %key, "put");
        self.client.put_item(&self.table, item).await?;
        Ok(WriteResult {
            table: self.table.physical_name.clone(),
            key,
            item: record,
        })
    }

    /// Partially update the record at `key`
    ///
    /// Fields missing from `patch` keep their stored values. Key attributes
    /// may appear in the patch only with their current values. The merged
    /// item must still decode as `T`; a patch that would break it is
    /// rejected before anything is written.
    pub async fn update(&self, key: &PrimaryKey, mut patch: Item) -> NoteResult<WriteResult<T>> {
        self.validate_key(key)?;
        let key_item = self.table.schema.key_item(key);
        for (attribute, expected) in &key_item {
            if let Some(value) = patch.remove(attribute) {
                if &value != expected {
                    return Err(ValidationError::invalid_key(
                        &self.table.logical_name,
                        format!("key attribute '{}' cannot be changed", attribute),
                    )
                    .into());
                }
            }
        }

        let mut current = self
            .client
            .get_item(&self.table, key)
            .await?
            .ok_or_else(|| NoteError::not_found(&self.table.logical_name, key.clone()))?;
        current.extend(patch.clone());
        T::from_item(current)?;

        tracing::debug!(
            table = %self.table.physical_name,
            key = %key,
            fields = patch.len(),
            "update"
        );
        let merged = self
            .client
            .update_item(&self.table, key, patch)
            .await?
            .ok_or_else(|| NoteError::not_found(&self.table.logical_name, key.clone()))?;

        Ok(WriteResult {
            table: self.table.physical_name.clone(),
            key: key.clone(),
            item: T::from_item(merged)?,
        })
    }

    /// Partially update from any serializable patch type
    ///
    /// `None` fields of the patch (serialized as null or skipped) are left
    /// untouched.
    pub async fn update_with<P: Serialize>(
        &self,
        key: &PrimaryKey,
        patch: &P,
    ) -> NoteResult<WriteResult<T>> {
        let patch = match serde_json::to_value(patch)? {
            Value::Object(fields) => fields.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            other => {
                return Err(ValidationError::InvalidJson {
                    message: format!("patch must be an object, got {}", other),
                }
                .into());
            }
        };
        self.update(key, patch).await
    }

    /// Delete the record at `key`; deleting a missing record succeeds
    pub async fn delete(&self, key: &PrimaryKey) -> NoteResult<()> {
        self.validate_key(key)?;
        tracing::debug!(table = %self.table.physical_name, key = %key, "delete");
        self.client.delete_item(&self.table, key).await
    }
}

enum Cursor {
    Start,
    Next(ContinuationToken),
    Done,
}

/// Turn a page fetcher into a flat stream of records
fn paginate<'a, T, F, Fut>(fetch: F) -> BoxStream<'a, NoteResult<T>>
where
    T: Send + 'a,
    F: Fn(Option<ContinuationToken>) -> Fut + Send + 'a,
    Fut: Future<Output = NoteResult<Page<T>>> + Send + 'a,
{
    stream::try_unfold((Cursor::Start, fetch), |(cursor, fetch)| async move {
        let start = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok::<_, NoteError>(None),
        };
        let page = fetch(start).await?;
        let next = match page.continuation {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };
        Ok::<_, NoteError>(Some((page.items, (next, fetch))))
    })
    .map_ok(|items| stream::iter(items.into_iter().map(Ok::<T, NoteError>)))
    .try_flatten()
    .boxed()
}
