//! HTTP inbound adapter that serves the generated page, its JSON twin and
//! live run events over SSE.

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context as AnyhowContext, Result};
use axum::response::sse::{Event, KeepAlive};
use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response, Sse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{PageChrome, PageView, RunSnapshot, RunStatus, SessionRunner, Submission},
    core::{
        domain::{ProgressEvent, WorkflowSchema},
        error::FieldError,
        form::{FormData, form_from_json},
        output::RenderedOutput,
        ports::PageRenderer,
    },
};

/// Server adapter that exposes a [`SessionRunner`] over HTTP.
pub struct ServerAdapter {
    runner: Arc<SessionRunner>,
    renderer: Arc<dyn PageRenderer>,
    chrome: PageChrome,
}

impl ServerAdapter {
    pub fn new(
        runner: Arc<SessionRunner>,
        renderer: Arc<dyn PageRenderer>,
        chrome: PageChrome,
    ) -> Self {
        Self {
            runner,
            renderer,
            chrome,
        }
    }

    /// Bind `host:port` and serve until the process stops.
    pub async fn run(self, host: &str, port: u16) -> Result<()> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("failed to bind {host}:{port}"))?;
        self.run_with_listener(listener).await
    }

    /// Serve on an existing listener (useful for tests).
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<()> {
        let workflow = self.runner.schema().workflow.clone();
        let router = self.into_router();
        match listener.local_addr() {
            Ok(addr) => log_listening(&workflow, addr),
            Err(_) => info!(%workflow, "flowviz listening"),
        }
        axum::serve(listener, router.into_make_service())
            .await
            .context("serve endpoint failed")
    }

    pub fn into_router(self) -> Router {
        build_router(Arc::new(ServeState {
            runner: self.runner,
            renderer: self.renderer,
            chrome: self.chrome,
        }))
    }
}

fn log_listening(workflow: &str, addr: SocketAddr) {
    info!(%workflow, %addr, "flowviz listening on http://{addr}");
}

struct ServeState {
    runner: Arc<SessionRunner>,
    renderer: Arc<dyn PageRenderer>,
    chrome: PageChrome,
}

impl ServeState {
    fn html(&self, view: &PageView) -> Response {
        match view.render(self.renderer.as_ref()) {
            Ok(body) => Html(body).into_response(),
            Err(err) => {
                tracing::error!(error = %err, "page rendering failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

/// How long an event stream waits for a submission to claim its run id.
const PENDING_GRACE: Duration = Duration::from_secs(30);
const KEEP_ALIVE: Duration = Duration::from_secs(15);

fn build_router(state: Arc<ServeState>) -> Router {
    Router::new()
        .route("/", get(page_handler).post(submit_handler))
        .route("/api/schema", get(schema_handler))
        .route("/api/run", post(run_handler))
        .route("/api/runs", post(start_handler))
        .route("/api/runs/{id}", get(snapshot_handler))
        .route("/api/runs/{id}/events", get(run_events_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `?run=<uuid>` lets the page pick the id it is already listening on.
#[derive(Debug, Default, Deserialize)]
struct RunQuery {
    run: Option<String>,
}

impl RunQuery {
    fn run_id(&self) -> Option<Uuid> {
        self.run.as_deref().and_then(|raw| Uuid::parse_str(raw.trim()).ok())
    }
}

async fn page_handler(State(state): State<Arc<ServeState>>) -> Response {
    let view = PageView::initial(state.runner.schema(), &state.chrome);
    state.html(&view)
}

async fn submit_handler(
    State(state): State<Arc<ServeState>>,
    Query(query): Query<RunQuery>,
    Form(form): Form<FormData>,
) -> Response {
    let submission = state.runner.submit_as(query.run_id(), &form).await;
    let view = PageView::after(state.runner.schema(), &state.chrome, &form, &submission);
    state.html(&view)
}

async fn schema_handler(State(state): State<Arc<ServeState>>) -> Json<WorkflowSchema> {
    Json(state.runner.schema().clone())
}

/// JSON shape of `POST /api/run`.
#[derive(Debug, Serialize)]
struct RunResponse {
    status: &'static str,
    run_id: Option<String>,
    outputs: Vec<RenderedOutput>,
    events: Vec<ProgressEvent>,
    errors: Vec<FieldError>,
    message: Option<String>,
}

async fn run_handler(
    State(state): State<Arc<ServeState>>,
    Query(query): Query<RunQuery>,
    Json(body): Json<Map<String, Value>>,
) -> (StatusCode, Json<RunResponse>) {
    let form = form_from_json(&state.runner.schema().inputs, &body);
    let submission = state.runner.submit_as(query.run_id(), &form).await;
    let status = submission.status();
    let (code, response) = match submission {
        Submission::Rejected { errors } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            RunResponse {
                status,
                run_id: None,
                outputs: Vec::new(),
                events: Vec::new(),
                errors,
                message: None,
            },
        ),
        Submission::Failed {
            run_id,
            message,
            events,
        } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            RunResponse {
                status,
                run_id: Some(run_id.to_string()),
                outputs: Vec::new(),
                events,
                errors: Vec::new(),
                message: Some(message),
            },
        ),
        Submission::Completed {
            run_id,
            outputs,
            events,
            ..
        } => (
            StatusCode::OK,
            RunResponse {
                status,
                run_id: Some(run_id.to_string()),
                outputs,
                events,
                errors: Vec::new(),
                message: None,
            },
        ),
    };
    (code, Json(response))
}

/// `POST /api/runs`: validates, starts the run in the background and answers 202.
async fn start_handler(
    State(state): State<Arc<ServeState>>,
    Json(body): Json<Map<String, Value>>,
) -> (StatusCode, Json<RunResponse>) {
    let form = form_from_json(&state.runner.schema().inputs, &body);
    let (code, status, run_id, errors) = match state.runner.start(&form) {
        Ok(run_id) => (StatusCode::ACCEPTED, "running", Some(run_id.to_string()), Vec::new()),
        Err(errors) => (StatusCode::UNPROCESSABLE_ENTITY, "rejected", None, errors),
    };
    let response = RunResponse {
        status,
        run_id,
        outputs: Vec::new(),
        events: Vec::new(),
        errors,
        message: None,
    };
    (code, Json(response))
}

async fn snapshot_handler(
    State(state): State<Arc<ServeState>>,
    Path(id): Path<String>,
) -> Response {
    match Uuid::parse_str(&id).ok().and_then(|run_id| state.runner.snapshot(run_id)) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown run").into_response(),
    }
}

/// SSE feed of one run: a `progress` event per workflow event, then one `done`
/// event carrying the final snapshot.
async fn run_events_handler(
    State(state): State<Arc<ServeState>>,
    Path(id): Path<String>,
) -> Response {
    let Ok(run_id) = Uuid::parse_str(&id) else {
        return (StatusCode::BAD_REQUEST, "invalid run id").into_response();
    };
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(forward_run(state.runner.watch(run_id), tx));
    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE).text("keep-alive"))
        .into_response()
}

async fn forward_run(mut feed: watch::Receiver<RunSnapshot>, tx: mpsc::Sender<Event>) {
    let mut sent = 0;
    loop {
        let snapshot = feed.borrow_and_update().clone();
        for event in snapshot.events.iter().skip(sent) {
            if tx.send(json_event("progress", event)).await.is_err() {
                return;
            }
        }
        sent = snapshot.events.len();
        if snapshot.status.is_finished() {
            let _ = tx.send(json_event("done", &snapshot)).await;
            return;
        }

        let changed = if snapshot.status == RunStatus::Pending {
            match tokio::time::timeout(PENDING_GRACE, feed.changed()).await {
                Ok(changed) => changed,
                Err(_) => {
                    tracing::debug!("no submission claimed the streamed run id");
                    return;
                }
            }
        } else {
            feed.changed().await
        };
        if changed.is_err() {
            return;
        }
    }
}

fn json_event(name: &str, data: &impl Serialize) -> Event {
    Event::default()
        .event(name)
        .json_data(data)
        .unwrap_or_else(|err| {
            tracing::error!(error = %err, "run event serialization failed");
            Event::default().comment("serialization_error")
        })
}

async fn health_handler() -> &'static str {
    "ok"
}
