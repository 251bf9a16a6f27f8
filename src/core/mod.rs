//! Core module containing the key generator, resource store and session guard

pub mod client;
pub mod error;
pub mod item;
pub mod key;
pub mod query;
pub mod session;
pub mod store;

pub use client::{StorageClient, TableSpec};
pub use error::{NoteError, NoteResult, ValidationError};
pub use item::{Item, KeySchema, PrimaryKey, Record};
pub use key::{KeyGenerator, decode, generate};
pub use query::{ContinuationToken, Filter, KeyCondition, Page, PageRequest, SortCondition};
pub use session::{Account, GuardDecision, Session, SessionGuard, guard};
pub use store::{ResourceStore, WriteResult};
