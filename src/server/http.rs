//! axum adapter: turns HTTP requests into pipeline runs
//!
//! Routes are mounted explicitly:
//! - GET    /notes             - list (optionally `?title=`)
//! - POST   /notes             - create
//! - GET    /notes/{note_id}   - read
//! - PATCH  /notes/{note_id}   - partial update
//! - DELETE /notes/{note_id}   - delete
//!
//! Each route runs the pipeline `[guard, <note stage>]`.

use crate::core::error::NoteError;
use crate::core::session::{Account, Session, SessionGuard};
use crate::notes::NotesService;
use crate::server::pipeline::{GuardMode, GuardStage, Pipeline, RequestContext, Response};
use crate::server::stages::{
    CreateNoteStage, DeleteNoteStage, ListNotesStage, NOTE_ID_PARAM, ReadNoteStage,
    UpdateNoteStage,
};
use anyhow::Result;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Header read by [`HeaderSessionSource`]
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Where the HTTP layer gets the session of a request from
///
/// Sessions are resolved, not authenticated, here: whoever issues them is
/// responsible for their integrity.
pub trait SessionSource: Send + Sync {
    fn session(&self, headers: &HeaderMap) -> Session;
}

/// Development session source: the account id travels in a plain header
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderSessionSource;

impl SessionSource for HeaderSessionSource {
    fn session(&self, headers: &HeaderMap) -> Session {
        headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Session::for_account(Account::new(id)))
            .unwrap_or_default()
    }
}

/// One pipeline per route
#[derive(Clone)]
pub struct NoteRoutes {
    pub list: Pipeline,
    pub create: Pipeline,
    pub read: Pipeline,
    pub update: Pipeline,
    pub delete: Pipeline,
}

impl NoteRoutes {
    pub fn new(notes: NotesService, guard: GuardStage) -> Self {
        let guarded = || Pipeline::new().stage(guard.clone());
        Self {
            list: guarded().stage(ListNotesStage::new(notes.clone())),
            create: guarded().stage(CreateNoteStage::new(notes.clone())),
            read: guarded().stage(ReadNoteStage::new(notes.clone())),
            update: guarded().stage(UpdateNoteStage::new(notes.clone())),
            delete: guarded().stage(DeleteNoteStage::new(notes)),
        }
    }
}

/// Builder for the notes HTTP application
///
/// # Example
///
/// ```ignore
/// let app = NotesApp::new(notes)
///     .with_session_source(HeaderSessionSource)
///     .build();
/// ```
pub struct NotesApp {
    notes: NotesService,
    sessions: Arc<dyn SessionSource>,
    guard: SessionGuard,
    mode: GuardMode,
}

impl NotesApp {
    pub fn new(notes: NotesService) -> Self {
        Self {
            notes,
            sessions: Arc::new(HeaderSessionSource),
            guard: SessionGuard::default(),
            mode: GuardMode::Redirect,
        }
    }

    pub fn with_session_source(mut self, sessions: impl SessionSource + 'static) -> Self {
        self.sessions = Arc::new(sessions);
        self
    }

    /// Where denied requests are redirected
    pub fn with_guard(mut self, guard: SessionGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Answer denied requests with 401 instead of a redirect
    pub fn rejecting_anonymous(mut self) -> Self {
        self.mode = GuardMode::Reject;
        self
    }

    /// Build the router
    pub fn build(self) -> Router {
        let guard = match self.mode {
            GuardMode::Redirect => GuardStage::redirect(),
            GuardMode::Reject => GuardStage::reject(),
        }
        .with_guard(self.guard);

        router(AppState {
            routes: Arc::new(NoteRoutes::new(self.notes, guard)),
            sessions: self.sessions,
        })
    }

    /// Serve the application with graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build();
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<NoteRoutes>,
    pub sessions: Arc<dyn SessionSource>,
}

/// Mount the note routes over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/{note_id}",
            get(read_note).patch(update_note).delete(delete_note),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn context(state: &AppState, headers: &HeaderMap) -> RequestContext {
    RequestContext::new(state.sessions.session(headers))
}

pub async fn list_notes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, NoteError> {
    let mut ctx = context(&state, &headers);
    ctx.params.extend(query);
    state.routes.list.run(ctx).await
}

pub async fn create_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, NoteError> {
    let ctx = context(&state, &headers).with_raw_body(body);
    state.routes.create.run(ctx).await
}

pub async fn read_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(note_id): Path<String>,
) -> Result<Response, NoteError> {
    let ctx = context(&state, &headers).with_param(NOTE_ID_PARAM, note_id);
    state.routes.read.run(ctx).await
}

pub async fn update_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(note_id): Path<String>,
    body: Bytes,
) -> Result<Response, NoteError> {
    let ctx = context(&state, &headers)
        .with_param(NOTE_ID_PARAM, note_id)
        .with_raw_body(body);
    state.routes.update.run(ctx).await
}

pub async fn delete_note(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(note_id): Path<String>,
) -> Result<Response, NoteError> {
    let ctx = context(&state, &headers).with_param(NOTE_ID_PARAM, note_id);
    state.routes.delete.run(ctx).await
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
