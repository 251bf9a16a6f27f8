//! Note records and the payloads used to create and edit them

use crate::core::item::{KeySchema, PrimaryKey, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A note owned by an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "accountID")]
    pub account_id: String,
    #[serde(rename = "noteID")]
    pub note_id: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl Note {
    pub fn key(account_id: impl Into<String>, note_id: impl Into<String>) -> PrimaryKey {
        PrimaryKey::composite(account_id, note_id)
    }
}

impl Record for Note {
    fn table() -> &'static str {
        "notes"
    }

    fn key_schema() -> KeySchema {
        KeySchema::with_sort("accountID", "noteID")
    }

    fn primary_key(&self) -> PrimaryKey {
        Note::key(self.account_id.clone(), self.note_id.clone())
    }
}

/// Fields a client supplies to create a note
///
/// Ownership and identity are assigned server-side; an `accountID` or
/// `noteID` in the request body is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate)]
pub struct NoteDraft {
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 100000, message = "body must be at most 100000 characters"))]
    pub body: String,
}

impl NoteDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Partial edit of a note; absent fields keep their stored values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100000, message = "body must be at most 100000 characters"))]
    pub body: Option<String>,
}
