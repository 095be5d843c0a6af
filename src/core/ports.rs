//! Seams between the adapter core and the things it drives or is driven by.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::core::{
    domain::{EventDecl, ProgressEvent, StartEvent, StopEvent},
    error::Result,
};

/// A workflow the UI can be generated for.
///
/// The declared events are queried once at startup; `run` is awaited once per
/// form submission.
#[async_trait]
pub trait Workflow: Send + Sync {
    /// Display name, used as the page title.
    fn name(&self) -> &str;

    /// The fields a run needs.
    fn start_event(&self) -> EventDecl;

    /// The fields a run produces. Defaults to a plain `result`.
    fn stop_event(&self) -> EventDecl {
        EventDecl::plain_stop()
    }

    /// Executes one run to completion.
    async fn run(&self, start: StartEvent, progress: ProgressSink) -> anyhow::Result<StopEvent>;
}

/// Write side of a run's event stream.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything, for running workflows outside the UI.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, name: impl Into<String>, payload: impl Serialize) {
        let Some(tx) = &self.tx else {
            return;
        };
        let name = name.into();
        let payload = serde_json::to_value(payload).unwrap_or_else(|err| {
            tracing::warn!(event = %name, error = %err, "progress payload not serializable");
            Value::Null
        });
        if tx.send(ProgressEvent { name, payload }).is_err() {
            tracing::debug!("progress receiver dropped");
        }
    }
}

/// Abstraction for rendering the generated page.
pub trait PageRenderer: Send + Sync {
    /// Render a registered template with the given data.
    fn render(&self, template_name: &str, data: &Value) -> Result<String>;
}

/// Abstraction over an LLM used by the bundled completion workflow.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn emitted_events_reach_the_receiver_in_order() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.emit("InfoMessage", json!({"msg": "Hello, world"}));
        sink.emit("InfoMessage", json!({"msg": "second"}));
        drop(sink);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.name, "InfoMessage");
        assert_eq!(first.payload["msg"], "Hello, world");
        assert_eq!(rx.try_recv().unwrap().payload["msg"], "second");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disabled_sink_ignores_events() {
        ProgressSink::disabled().emit("ignored", 1);
    }
}
