//! HTTP-facing side of the crate
//!
//! - `pipeline`: ordered stages with short-circuiting
//! - `stages`: the note stages
//! - `http`: axum router mapping requests onto pipelines

pub mod http;
pub mod pipeline;
pub mod stages;

pub use http::{AppState, HeaderSessionSource, NoteRoutes, NotesApp, SessionSource, router};
pub use pipeline::{
    GuardMode, GuardStage, Pipeline, RequestContext, Response, Stage, StageOutcome, run,
};
