use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::core::{
    domain::{DeclaredType, EventDecl, FieldDecl, StartEvent, StopEvent},
    ports::{ProgressSink, Workflow},
};

/// Writes a few messages to the event stream, then returns a plain result.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamingWorkflow;

#[derive(Debug, Serialize)]
struct InfoMessage<'a> {
    msg: &'a str,
}

#[async_trait]
impl Workflow for StreamingWorkflow {
    fn name(&self) -> &str {
        "StreamingWorkflow"
    }

    fn start_event(&self) -> EventDecl {
        EventDecl::new("QueryEvent")
            .doc("The `query` parameter will be shown as an input text box in the UI.")
            .field(FieldDecl::new("query", DeclaredType::Text))
    }

    async fn run(&self, start: StartEvent, progress: ProgressSink) -> anyhow::Result<StopEvent> {
        let query = start.str("query").unwrap_or_default();
        for msg in ["Hello, world", "I am an info message"] {
            progress.emit("InfoMessage", InfoMessage { msg });
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        progress.emit("ErrorMessage", InfoMessage {
            msg: "There was an error",
        });
        Ok(StopEvent::result(format!("Finish: {query}")))
    }
}
