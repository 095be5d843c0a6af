//! The UI session: validates submissions, runs the workflow, shapes the result.

use std::{any::Any, sync::Arc, time::Instant};

use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::application::runs::{RunFeed, RunRegistry, RunSnapshot, RunStatus};
use crate::core::{
    domain::{ProgressEvent, StartEvent, WorkflowSchema},
    error::{Error, FieldError, Result},
    form::{FormData, bind_start_event},
    introspect::introspect,
    output::{RenderedOutput, render_outputs},
    ports::{ProgressSink, Workflow},
};

/// What one form submission came to.
#[derive(Debug, Clone)]
pub enum Submission {
    /// The form did not validate; the workflow was not invoked.
    Rejected { errors: Vec<FieldError> },
    /// The workflow returned an error or panicked.
    Failed {
        run_id: Uuid,
        message: String,
        events: Vec<ProgressEvent>,
    },
    Completed {
        run_id: Uuid,
        outputs: Vec<RenderedOutput>,
        events: Vec<ProgressEvent>,
        elapsed_ms: u128,
    },
}

impl Submission {
    pub fn status(&self) -> &'static str {
        match self {
            Submission::Rejected { .. } => "rejected",
            Submission::Failed { .. } => "failed",
            Submission::Completed { .. } => "completed",
        }
    }
}

/// Holds the workflow and its read-only schema for the life of the server.
pub struct SessionRunner {
    workflow: Arc<dyn Workflow>,
    schema: Arc<WorkflowSchema>,
    debug: bool,
    runs: RunRegistry,
}

impl std::fmt::Debug for SessionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRunner")
            .field("workflow", &self.schema.workflow)
            .field("debug", &self.debug)
            .finish()
    }
}

impl SessionRunner {
    /// Introspects the workflow; unsupported declarations fail here, before anything is served.
    pub fn new(workflow: Arc<dyn Workflow>, debug: bool) -> Result<Self> {
        let schema = introspect(workflow.as_ref())?;
        tracing::debug!(
            workflow = %schema.workflow,
            inputs = schema.inputs.len(),
            outputs = schema.outputs.len(),
            "workflow introspected"
        );
        Ok(Self {
            workflow,
            schema: Arc::new(schema),
            debug,
            runs: RunRegistry::default(),
        })
    }

    pub fn schema(&self) -> &WorkflowSchema {
        &self.schema
    }

    pub async fn submit(&self, form: &FormData) -> Submission {
        self.submit_as(None, form).await
    }

    /// Like [`submit`](Self::submit), but publishes the run under `run_id`
    /// when nothing has run under it yet, so a subscriber can follow it live.
    pub async fn submit_as(&self, run_id: Option<Uuid>, form: &FormData) -> Submission {
        match bind_start_event(&self.schema.inputs, form) {
            Ok(start) => {
                let (run_id, feed) = self.runs.claim(run_id);
                self.run_with_feed(run_id, &feed, start).await
            }
            Err(err) => {
                tracing::info!(workflow = %self.schema.workflow, error = %err, "submission rejected");
                let errors = err.field_errors().to_vec();
                if run_id.is_some() {
                    let (_, feed) = self.runs.claim(run_id);
                    feed.send_modify(|snapshot| {
                        snapshot.status = RunStatus::Rejected;
                        snapshot.errors = errors.clone();
                    });
                }
                Submission::Rejected { errors }
            }
        }
    }

    /// Validates `form` and starts the run in the background.
    ///
    /// Returns the run id to follow through [`watch`](Self::watch).
    pub fn start(self: &Arc<Self>, form: &FormData) -> std::result::Result<Uuid, Vec<FieldError>> {
        let start = bind_start_event(&self.schema.inputs, form).map_err(|err| {
            tracing::info!(workflow = %self.schema.workflow, error = %err, "submission rejected");
            err.field_errors().to_vec()
        })?;
        let (run_id, feed) = self.runs.claim(None);
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            runner.run_with_feed(run_id, &feed, start).await;
        });
        Ok(run_id)
    }

    /// Live snapshots of `run_id`; unknown ids stay pending until a submission claims them.
    pub fn watch(&self, run_id: Uuid) -> watch::Receiver<RunSnapshot> {
        self.runs.subscribe(run_id)
    }

    pub fn snapshot(&self, run_id: Uuid) -> Option<RunSnapshot> {
        self.runs.snapshot(run_id)
    }

    /// Runs the workflow once and waits for its stop event.
    pub async fn execute(&self, start: StartEvent) -> Submission {
        let (run_id, feed) = self.runs.claim(None);
        self.run_with_feed(run_id, &feed, start).await
    }

    async fn run_with_feed(&self, run_id: Uuid, feed: &RunFeed, start: StartEvent) -> Submission {
        let span = tracing::info_span!("workflow_run", %run_id, workflow = %self.schema.workflow);
        let (sink, mut receiver) = ProgressSink::channel();
        let workflow = self.workflow.clone();
        let started = Instant::now();

        tracing::info!(parent: &span, "workflow run started");
        // TODO: add an opt-in run timeout; a workflow that never returns holds this request forever.
        let mut task =
            tokio::spawn(async move { workflow.run(start, sink).await }.instrument(span.clone()));

        let mut events = Vec::new();
        let joined = loop {
            tokio::select! {
                Some(event) = receiver.recv() => publish(feed, &mut events, event),
                joined = &mut task => break joined,
            }
        };
        while let Ok(event) = receiver.try_recv() {
            publish(feed, &mut events, event);
        }
        let elapsed_ms = started.elapsed().as_millis();

        let failure = match joined {
            Ok(Ok(stop)) => {
                tracing::info!(parent: &span, elapsed_ms, events = events.len(), "workflow run completed");
                let outputs = render_outputs(&self.schema.outputs, &stop);
                feed.send_modify(|snapshot| {
                    snapshot.status = RunStatus::Completed;
                    snapshot.outputs = outputs.clone();
                    snapshot.elapsed_ms = Some(elapsed_ms);
                });
                return Submission::Completed {
                    run_id,
                    outputs,
                    events,
                    elapsed_ms,
                };
            }
            Ok(Err(err)) => {
                let detail = if self.debug {
                    format!("{err:#}")
                } else {
                    err.to_string()
                };
                Error::Execution(detail)
            }
            Err(join_err) if join_err.is_panic() => Error::Execution(format!(
                "workflow panicked: {}",
                panic_message(join_err.into_panic())
            )),
            Err(join_err) => Error::Execution(format!("workflow task was cancelled: {join_err}")),
        };

        tracing::error!(parent: &span, elapsed_ms, error = %failure, "workflow run failed");
        let message = failure.to_string();
        feed.send_modify(|snapshot| {
            snapshot.status = RunStatus::Failed;
            snapshot.message = Some(message.clone());
            snapshot.elapsed_ms = Some(elapsed_ms);
        });
        Submission::Failed {
            run_id,
            message,
            events,
        }
    }
}

fn publish(feed: &RunFeed, events: &mut Vec<ProgressEvent>, event: ProgressEvent) {
    tracing::debug!(event = %event.name, "progress event");
    feed.send_modify(|snapshot| snapshot.events.push(event.clone()));
    events.push(event);
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
