//! Account-scoped note operations

use crate::core::error::{NoteResult, ValidationError};
use crate::core::item::Item;
use crate::core::key::KeyGenerator;
use crate::core::query::KeyCondition;
use crate::core::session::Account;
use crate::core::store::ResourceStore;
use crate::notes::model::{Note, NoteDraft, NotePatch};
use chrono::Utc;
use futures::{TryStreamExt, future};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

/// CRUD over the notes of one account at a time
///
/// Every method takes the acting account (as admitted by the session guard)
/// and derives the partition key from it, never from client input.
#[derive(Clone, Debug)]
pub struct NotesService {
    store: ResourceStore<Note>,
    keys: Arc<KeyGenerator>,
}

impl NotesService {
    pub fn new(store: ResourceStore<Note>) -> Self {
        Self {
            store,
            keys: Arc::new(KeyGenerator::new()),
        }
    }

    /// Share a key generator between services
    pub fn with_key_generator(mut self, keys: Arc<KeyGenerator>) -> Self {
        self.keys = keys;
        self
    }

    pub fn store(&self) -> &ResourceStore<Note> {
        &self.store
    }

    /// Create a note owned by `account`
    pub async fn create(&self, account: &Account, draft: NoteDraft) -> NoteResult<Note> {
        draft.validate()?;
        let note = Note {
            account_id: account.account_id.clone(),
            note_id: self.keys.next_key(),
            title: draft.title,
            body: draft.body,
            updated: Some(Utc::now()),
        };

        let written = self.store.put(note).await?;
        tracing::info!(
            account = %account.account_id,
            note = %written.key,
            table = %written.table,
            "Note created"
        );
        Ok(written.item)
    }

    /// Every note of `account`, oldest first
    pub async fn list(&self, account: &Account) -> NoteResult<Vec<Note>> {
        self.store
            .query_all(KeyCondition::partition(account.account_id.clone()))
            .await
    }

    /// Notes of `account` whose title matches exactly
    ///
    /// Only the account's own partition is read.
    pub async fn find_by_title(&self, account: &Account, title: &str) -> NoteResult<Vec<Note>> {
        self.store
            .query(KeyCondition::partition(account.account_id.clone()))
            .try_filter(|note| future::ready(note.title == title))
            .try_collect()
            .await
    }

    pub async fn read(&self, account: &Account, note_id: &str) -> NoteResult<Note> {
        self.store
            .get(&Note::key(account.account_id.clone(), note_id))
            .await
    }

    /// Apply `patch` to a note of `account`
    pub async fn update(
        &self,
        account: &Account,
        note_id: &str,
        patch: NotePatch,
    ) -> NoteResult<Note> {
        patch.validate()?;
        let mut fields: Item = match serde_json::to_value(&patch)? {
            Value::Object(fields) => fields,
            _ => {
                return Err(ValidationError::InvalidJson {
                    message: "note patch must be an object".to_string(),
                }
                .into());
            }
        };
        fields.insert("updated".to_string(), serde_json::to_value(Utc::now())?);

        let written = self
            .store
            .update(&Note::key(account.account_id.clone(), note_id), fields)
            .await?;
        tracing::info!(account = %account.account_id, note = %written.key, "Note updated");
        Ok(written.item)
    }

    /// Delete a note of `account`; deleting a missing note succeeds
    pub async fn remove(&self, account: &Account, note_id: &str) -> NoteResult<()> {
        self.store
            .delete(&Note::key(account.account_id.clone(), note_id))
            .await?;
        tracing::info!(account = %account.account_id, note = %note_id, "Note deleted");
        Ok(())
    }
}
