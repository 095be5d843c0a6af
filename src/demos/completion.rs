use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::core::{
    domain::{DeclaredType, EventDecl, FieldDecl, StartEvent, StopEvent},
    ports::{LlmClient, ProgressSink, Workflow},
};

/// Sends the query to an LLM and returns the answer as `result`.
pub struct CompletionWorkflow {
    llm: Option<Arc<dyn LlmClient>>,
}

impl CompletionWorkflow {
    /// Without a client the workflow still introspects but every run fails.
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Workflow for CompletionWorkflow {
    fn name(&self) -> &str {
        "CompletionWorkflow"
    }

    fn start_event(&self) -> EventDecl {
        EventDecl::new("QueryEvent")
            .doc("Ask the configured model anything.")
            .field(FieldDecl::new("query", DeclaredType::Text))
    }

    async fn run(&self, start: StartEvent, progress: ProgressSink) -> anyhow::Result<StopEvent> {
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| anyhow!("no LLM client configured; pass --api-key"))?;
        let query = start.str("query").unwrap_or_default();
        progress.emit("Prompting", serde_json::json!({ "chars": query.chars().count() }));
        let answer = llm.complete(query).await?;
        Ok(StopEvent::result(answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{Error, Result};
    use serde_json::{Map, json};

    struct Canned(&'static str);

    #[async_trait]
    impl LlmClient for Canned {
        async fn complete(&self, prompt: &str) -> Result<String> {
            if prompt == "fail" {
                return Err(Error::Execution("rate limited".into()));
            }
            Ok(format!("{} {prompt}", self.0))
        }
    }

    fn start(query: &str) -> StartEvent {
        let mut fields = Map::new();
        fields.insert("query".into(), json!(query));
        StartEvent::from_map(fields)
    }

    #[tokio::test]
    async fn returns_the_completion_as_result() {
        let workflow = CompletionWorkflow::new(Some(Arc::new(Canned("echo:"))));
        let stop = workflow
            .run(start("hello"), ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(stop.get("result").unwrap(), "echo: hello");
    }

    #[tokio::test]
    async fn llm_errors_propagate() {
        let workflow = CompletionWorkflow::new(Some(Arc::new(Canned(""))));
        let err = workflow
            .run(start("fail"), ProgressSink::disabled())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn missing_client_fails_the_run() {
        let err = CompletionWorkflow::new(None)
            .run(start("hello"), ProgressSink::disabled())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no LLM client"));
    }
}
