//! The notes application: accounts own notes, every operation is scoped to
//! the acting account

pub mod model;
pub mod service;

pub use model::{Note, NoteDraft, NotePatch};
pub use service::NotesService;
