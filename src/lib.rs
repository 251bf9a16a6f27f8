//! # Notegate
//!
//! Account-scoped notes over a key-value document store.
//!
//! ## Features
//!
//! - **Resource Store**: typed get/put/update/delete and lazily paginated
//!   query/scan over one logical table, namespaced per environment
//! - **Key Generator**: sortable 13-character Crockford base-32 keys
//! - **Session Guard**: admits sessions that carry an account
//! - **Request Pipeline**: ordered stages, first terminal response wins
//! - **Storage backends**: in-memory (default) and DynamoDB (`dynamodb` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use notegate::prelude::*;
//!
//! let config = StoreConfig::from_env()?;
//! let client = Arc::new(InMemoryStorageClient::new());
//! let notes = NotesService::new(ResourceStore::new(&config, client)?);
//!
//! NotesApp::new(notes).serve("127.0.0.1:3000").await?;
//! ```

pub mod config;
pub mod core;
pub mod logging;
pub mod notes;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        Account, ContinuationToken, Filter, GuardDecision, Item, KeyCondition, KeyGenerator,
        KeySchema, NoteError, NoteResult, Page, PageRequest, PrimaryKey, Record, ResourceStore,
        Session, SessionGuard, SortCondition, StorageClient, TableSpec, ValidationError,
        WriteResult, guard,
    };

    // === Config ===
    pub use crate::config::{Environment, StoreConfig};

    // === Notes ===
    pub use crate::notes::{Note, NoteDraft, NotePatch, NotesService};

    // === Server ===
    pub use crate::server::{
        GuardStage, HeaderSessionSource, NotesApp, Pipeline, RequestContext, Response,
        SessionSource, Stage, StageOutcome,
    };

    // === Storage ===
    #[cfg(feature = "dynamodb")]
    pub use crate::storage::DynamoDBStorageClient;
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryStorageClient;

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
