//! Pipeline stages behind the note routes
//!
//! Each stage runs after the guard, so `ctx.account()` is always set when a
//! stage reaches the service. Stages always end the pipeline.

use crate::core::error::NoteResult;
use crate::notes::{NoteDraft, NotePatch, NotesService};
use crate::server::pipeline::{RequestContext, Response, Stage, StageOutcome};
use async_trait::async_trait;
use serde::Serialize;

/// Path parameter naming the note
pub const NOTE_ID_PARAM: &str = "note_id";
/// Optional query parameter narrowing `GET /notes` to one title
pub const TITLE_PARAM: &str = "title";

/// List wrapper returned by `GET /notes`
#[derive(Debug, Serialize)]
pub struct NoteList<T> {
    pub notes: Vec<T>,
    pub count: usize,
}

impl<T> NoteList<T> {
    pub fn new(notes: Vec<T>) -> Self {
        Self {
            count: notes.len(),
            notes,
        }
    }
}

/// `POST /notes`
#[derive(Debug, Clone)]
pub struct CreateNoteStage {
    notes: NotesService,
}

impl CreateNoteStage {
    pub fn new(notes: NotesService) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl Stage for CreateNoteStage {
    fn name(&self) -> &'static str {
        "create_note"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> NoteResult<StageOutcome> {
        let draft: NoteDraft = ctx.body_as()?;
        let note = self.notes.create(ctx.account()?, draft).await?;
        let location = format!("/notes/{}", note.note_id);
        Ok(StageOutcome::Terminal(
            Response::created(note)?.with_location(location),
        ))
    }
}

/// `GET /notes`, optionally filtered by `?title=`
#[derive(Debug, Clone)]
pub struct ListNotesStage {
    notes: NotesService,
}

impl ListNotesStage {
    pub fn new(notes: NotesService) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl Stage for ListNotesStage {
    fn name(&self) -> &'static str {
        "list_notes"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> NoteResult<StageOutcome> {
        let account = ctx.account()?;
        let notes = match ctx.params.get(TITLE_PARAM) {
            Some(title) => self.notes.find_by_title(account, title).await?,
            None => self.notes.list(account).await?,
        };
        Ok(StageOutcome::Terminal(Response::ok(NoteList::new(notes))?))
    }
}

/// `GET /notes/{note_id}`
#[derive(Debug, Clone)]
pub struct ReadNoteStage {
    notes: NotesService,
}

impl ReadNoteStage {
    pub fn new(notes: NotesService) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl Stage for ReadNoteStage {
    fn name(&self) -> &'static str {
        "read_note"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> NoteResult<StageOutcome> {
        let note = self
            .notes
            .read(ctx.account()?, ctx.param(NOTE_ID_PARAM)?)
            .await?;
        Ok(StageOutcome::Terminal(Response::ok(note)?))
    }
}

/// `PATCH /notes/{note_id}`
#[derive(Debug, Clone)]
pub struct UpdateNoteStage {
    notes: NotesService,
}

impl UpdateNoteStage {
    pub fn new(notes: NotesService) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl Stage for UpdateNoteStage {
    fn name(&self) -> &'static str {
        "update_note"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> NoteResult<StageOutcome> {
        let patch: NotePatch = ctx.body_as()?;
        let note = self
            .notes
            .update(ctx.account()?, ctx.param(NOTE_ID_PARAM)?, patch)
            .await?;
        Ok(StageOutcome::Terminal(Response::ok(note)?))
    }
}

/// `DELETE /notes/{note_id}`
#[derive(Debug, Clone)]
pub struct DeleteNoteStage {
    notes: NotesService,
}

impl DeleteNoteStage {
    pub fn new(notes: NotesService) -> Self {
        Self { notes }
    }
}

#[async_trait]
impl Stage for DeleteNoteStage {
    fn name(&self) -> &'static str {
        "delete_note"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> NoteResult<StageOutcome> {
        self.notes
            .remove(ctx.account()?, ctx.param(NOTE_ID_PARAM)?)
            .await?;
        Ok(StageOutcome::Terminal(Response::no_content()))
    }
}
