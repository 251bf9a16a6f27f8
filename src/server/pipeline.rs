//! Request pipeline: an ordered list of stages with short-circuiting
//!
//! Each stage either continues or produces a terminal response. The first
//! terminal response wins and later stages never run.
//!
//! ```text
//! RequestContext ──▶ [guard] ──Continue──▶ [write note] ──Terminal──▶ Response
//!                       │
//!                       └──Terminal(redirect "/")──▶ Response
//! ```

use crate::core::error::{NoteError, NoteResult, ValidationError};
use crate::core::session::{Account, GuardDecision, Session, SessionGuard};
use async_trait::async_trait;
use axum::Json;
use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Everything a stage may look at or record about a request
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub body: Value,
    /// Unparsed transport body; takes precedence over `body` once set
    pub raw_body: Option<Bytes>,
    pub params: HashMap<String, String>,
    pub session: Session,
    /// Set by the guard stage once the session is admitted
    pub account: Option<Account>,
}

impl RequestContext {
    pub fn new(session: Session) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            body: Value::Null,
            raw_body: None,
            params: HashMap::new(),
            session,
            account: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Attach the body as received; it is parsed only when a stage asks for it
    pub fn with_raw_body(mut self, raw: Bytes) -> Self {
        self.raw_body = Some(raw);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// A required path/query parameter
    pub fn param(&self, name: &str) -> NoteResult<&str> {
        self.params.get(name).map(String::as_str).ok_or_else(|| {
            ValidationError::MissingParam {
                param: name.to_string(),
            }
            .into()
        })
    }

    /// The account admitted by the guard
    pub fn account(&self) -> NoteResult<&Account> {
        self.account.as_ref().ok_or_else(|| NoteError::Unauthorized {
            message: "no guard admitted this request".to_string(),
            redirect: None,
        })
    }

    /// Deserialize the body into a typed payload
    pub fn body_as<T: serde::de::DeserializeOwned>(&self) -> NoteResult<T> {
        let body = match &self.raw_body {
            Some(raw) => parse_json_body(raw)?,
            None => self.body.clone(),
        };
        Ok(serde_json::from_value(body)?)
    }
}

/// An empty body is `null`; anything else must be JSON
fn parse_json_body(raw: &[u8]) -> NoteResult<Value> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(raw).map_err(|e| {
        ValidationError::InvalidJson {
            message: e.to_string(),
        }
        .into()
    })
}

/// Transport-neutral response
///
/// Carries data only: a JSON body, a redirect target and an updated session
/// for the transport to persist. Markup is the renderer's concern.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub json: Option<Value>,
    pub location: Option<String>,
    pub session: Option<Session>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            json: None,
            location: None,
            session: None,
        }
    }

    /// 200 with a JSON body
    pub fn ok(body: impl Serialize) -> NoteResult<Self> {
        Self::json(StatusCode::OK, body)
    }

    /// 201 with a JSON body
    pub fn created(body: impl Serialize) -> NoteResult<Self> {
        Self::json(StatusCode::CREATED, body)
    }

    pub fn json(status: StatusCode, body: impl Serialize) -> NoteResult<Self> {
        Ok(Self {
            json: Some(serde_json::to_value(body)?),
            ..Self::new(status)
        })
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// 302 to `location`
    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::new(StatusCode::FOUND)
        }
    }

    /// Error rendered as a response
    pub fn from_error(err: &NoteError) -> Self {
        Self {
            json: serde_json::to_value(err.to_response()).ok(),
            ..Self::new(err.status_code())
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() && self.location.is_some()
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut response = match self.json {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        };
        if let Some(location) = self.location.and_then(|l| HeaderValue::from_str(&l).ok()) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        // Persisting the session is left to a transport layer that reads it
        // back out of the extensions
        if let Some(session) = self.session {
            response.extensions_mut().insert(session);
        }
        response
    }
}

/// What a stage decided
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Hand control to the next stage
    Continue,
    /// Stop here with this response
    Terminal(Response),
}

/// One step of a request pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: &mut RequestContext) -> NoteResult<StageOutcome>;
}

/// Run `stages` in order against `ctx`
///
/// Stage errors are rendered where the user-visible outcome is fixed:
/// `Unauthorized` becomes a redirect (or a 401 when it carries no redirect
/// target), `NotFound` a 404 and `Validation` a 400. Every other error,
/// including running out of stages, is returned to the caller.
pub async fn run(stages: &[Arc<dyn Stage>], mut ctx: RequestContext) -> NoteResult<Response> {
    for stage in stages {
        match stage.handle(&mut ctx).await {
            Ok(StageOutcome::Continue) => continue,
            Ok(StageOutcome::Terminal(response)) => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    stage = stage.name(),
                    status = %response.status,
                    "Stage produced terminal response"
                );
                return Ok(response);
            }
            Err(err) => return render_error(&ctx, stage.name(), err),
        }
    }

    tracing::warn!(request_id = %ctx.request_id, "No stage handled request");
    Err(NoteError::UnhandledRequest {
        request_id: ctx.request_id,
    })
}

fn render_error(ctx: &RequestContext, stage: &str, err: NoteError) -> NoteResult<Response> {
    match err {
        NoteError::Unauthorized {
            redirect: Some(location),
            ..
        } => {
            tracing::info!(request_id = %ctx.request_id, stage, "Unauthorized, redirecting");
            Ok(Response::redirect(location))
        }
        err @ (NoteError::Unauthorized { .. }
        | NoteError::NotFound { .. }
        | NoteError::Validation(_)) => {
            tracing::info!(request_id = %ctx.request_id, stage, error = %err, "Request rejected");
            Ok(Response::from_error(&err))
        }
        err => {
            tracing::warn!(request_id = %ctx.request_id, stage, error = %err, "Stage failed");
            Err(err)
        }
    }
}

/// An ordered list of stages
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append a shared stage
    pub fn shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, ctx: RequestContext) -> NoteResult<Response> {
        run(&self.stages, ctx).await
    }
}

/// How the guard stage reports a denial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    /// Terminal redirect to the guard's target (browser routes)
    Redirect,
    /// `Unauthorized` error without redirect, rendered as 401 (API routes)
    Reject,
}

/// Pipeline stage wrapping the session guard
#[derive(Debug, Clone)]
pub struct GuardStage {
    guard: SessionGuard,
    mode: GuardMode,
}

impl GuardStage {
    /// Redirect denied requests home
    pub fn redirect() -> Self {
        Self {
            guard: SessionGuard::default(),
            mode: GuardMode::Redirect,
        }
    }

    /// Reject denied requests with 401
    pub fn reject() -> Self {
        Self {
            guard: SessionGuard::default(),
            mode: GuardMode::Reject,
        }
    }

    pub fn with_guard(mut self, guard: SessionGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }
}

#[async_trait]
impl Stage for GuardStage {
    fn name(&self) -> &'static str {
        "guard"
    }

    async fn handle(&self, ctx: &mut RequestContext) -> NoteResult<StageOutcome> {
        match (self.guard.check(&ctx.session), self.mode) {
            (GuardDecision::Allow(account), _) => {
                ctx.account = Some(account);
                Ok(StageOutcome::Continue)
            }
            (GuardDecision::Deny { redirect }, GuardMode::Redirect) => {
                Ok(StageOutcome::Terminal(Response::redirect(redirect)))
            }
            (GuardDecision::Deny { .. }, GuardMode::Reject) => Err(NoteError::Unauthorized {
                message: "session has no account".to_string(),
                redirect: None,
            }),
        }
    }
}
