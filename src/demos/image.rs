use anyhow::{Context, ensure};
use async_trait::async_trait;
use serde::Deserialize;

use crate::core::{
    domain::{DeclaredType, EventDecl, FieldDecl, StartEvent, StopEvent},
    ports::{ProgressSink, Workflow},
};

const DEFAULT_IMAGE_SERVICE: &str = "https://picsum.photos";

/// Turns a query into an image URL from a seeded placeholder service.
#[derive(Debug, Clone)]
pub struct ImageDrawWorkflow {
    service: String,
    size: u32,
}

impl Default for ImageDrawWorkflow {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_SERVICE, 1024)
    }
}

impl ImageDrawWorkflow {
    pub fn new(service: impl Into<String>, size: u32) -> Self {
        Self {
            service: service.into().trim_end_matches('/').to_string(),
            size,
        }
    }

    fn image_url(&self, query: &str) -> String {
        format!(
            "{}/seed/{}/{size}/{size}",
            self.service,
            seed(query),
            size = self.size
        )
    }
}

#[derive(Debug, Deserialize)]
struct QueryEvent {
    query: String,
}

#[async_trait]
impl Workflow for ImageDrawWorkflow {
    fn name(&self) -> &str {
        "ImageDrawWorkflow"
    }

    fn start_event(&self) -> EventDecl {
        EventDecl::new("QueryEvent")
            .doc("The `query` parameter will be shown as an input text box in the UI.")
            .field(FieldDecl::new("query", DeclaredType::Text).help("What should be drawn?"))
    }

    fn stop_event(&self) -> EventDecl {
        EventDecl::new("ImageDrawn")
            .doc("The `image` parameter will be shown as an image coming from an url in the UI.")
            .field(FieldDecl::new("image", DeclaredType::Url))
    }

    async fn run(&self, start: StartEvent, progress: ProgressSink) -> anyhow::Result<StopEvent> {
        let QueryEvent { query } = start.into_typed::<QueryEvent>().context("reading the query")?;
        ensure!(
            query.chars().any(char::is_alphanumeric),
            "query must contain at least one letter or digit"
        );
        progress.emit("Drawing", serde_json::json!({ "query": query }));
        Ok(StopEvent::from_map(
            [("image".to_string(), self.image_url(&query).into())]
                .into_iter()
                .collect(),
        ))
    }
}

/// Lowercase alphanumeric words joined with `-`.
fn seed(query: &str) -> String {
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
