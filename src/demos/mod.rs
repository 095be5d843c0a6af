//! Workflows bundled with the binary.

mod analysis;
mod completion;
mod image;
mod stream;

use std::sync::Arc;

use clap::ValueEnum;

pub use analysis::AnalysisWorkflow;
pub use completion::CompletionWorkflow;
pub use image::ImageDrawWorkflow;
pub use stream::StreamingWorkflow;

use crate::core::ports::{LlmClient, Workflow};

/// Bundled workflow selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DemoKind {
    Analysis,
    Image,
    Stream,
    Completion,
}

/// Builds the workflow for `kind`; only the completion demo uses `llm`.
pub fn build(kind: DemoKind, llm: Option<Arc<dyn LlmClient>>) -> Arc<dyn Workflow> {
    match kind {
        DemoKind::Analysis => Arc::new(AnalysisWorkflow),
        DemoKind::Image => Arc::new(ImageDrawWorkflow::default()),
        DemoKind::Stream => Arc::new(StreamingWorkflow),
        DemoKind::Completion => Arc::new(CompletionWorkflow::new(llm)),
    }
}
