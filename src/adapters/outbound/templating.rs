use handlebars::Handlebars;
use serde_json::Value;
use std::sync::Arc;

use crate::application::page::PAGE_TEMPLATE;
use crate::core::error::{Error as CoreError, Result};
use crate::core::ports::PageRenderer;

const PAGE_SOURCE: &str = include_str!("../../../templates/page.hbs");

#[derive(Clone)]
pub struct HandlebarsRenderer {
    engine: Arc<Handlebars<'static>>,
}

impl HandlebarsRenderer {
    /// Builds a renderer with the bundled page template registered.
    pub fn new() -> Result<Self> {
        Self::with_page_template(PAGE_SOURCE)
    }

    pub fn with_page_template(source: &str) -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars
            .register_template_string(PAGE_TEMPLATE, source)
            .map_err(|e| CoreError::TemplateRendering(e.to_string()))?;
        Ok(Self {
            engine: Arc::new(handlebars),
        })
    }
}

impl PageRenderer for HandlebarsRenderer {
    fn render(&self, template_name: &str, data: &Value) -> Result<String> {
        self.engine
            .render(template_name, data)
            .map_err(|e| CoreError::TemplateRendering(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        application::{PageChrome, PageView, Submission},
        config::Theme,
        core::{
            domain::{DeclaredType, EventDecl, FieldDecl, WorkflowSchema},
            form::FormData,
            domain::StopEvent,
            introspect::{OutputWidget, describe_event},
            output::{RenderedOutput, render_outputs},
        },
    };
    use serde_json::json;
    use uuid::Uuid;

    fn schema() -> WorkflowSchema {
        WorkflowSchema {
            workflow: "ImageDrawWorkflow".into(),
            description: Some("Draws what you ask for.".into()),
            inputs: describe_event(
                &EventDecl::new("QueryEvent")
                    .field(FieldDecl::new("query", DeclaredType::Text))
                    .field(FieldDecl::new("hd", DeclaredType::Boolean))
                    .field(FieldDecl::new("size", DeclaredType::choice(["small", "large"])))
                    .field(FieldDecl::new("count", DeclaredType::Integer))
                    .field(FieldDecl::new("when", DeclaredType::Date))
                    .field(FieldDecl::new("tags", DeclaredType::List))
                    .field(FieldDecl::new("source", DeclaredType::Url)),
            )
            .unwrap(),
            outputs: describe_event(
                &EventDecl::new("ImageDrawn").field(FieldDecl::new("image", DeclaredType::Url)),
            )
            .unwrap(),
        }
    }

    fn chrome() -> PageChrome {
        PageChrome {
            title: "ImageDrawWorkflow".into(),
            theme: Theme::Bootstrap,
            debug: false,
        }
    }

    #[test]
    fn renders_one_widget_per_input() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let html = PageView::initial(&schema(), &chrome()).render(&renderer).unwrap();
        assert!(html.contains("<title>ImageDrawWorkflow</title>"));
        assert!(html.contains("Draws what you ask for."));
        assert!(html.contains(r#"<input type="text" class="form-control" id="input-query" name="query""#));
        assert!(html.contains(r#"<input type="checkbox" class="form-check-input" id="input-hd" name="hd""#));
        assert!(html.contains(r#"<select class="form-select" id="input-size" name="size""#));
        assert!(html.contains(r#"type="number" class="form-control" id="input-count" name="count" step="1""#));
        assert!(html.contains(r#"<input type="date" class="form-control" id="input-when" name="when""#));
        assert!(html.contains(r#"<textarea class="form-control font-monospace" id="input-tags" name="tags" rows="3""#));
        assert!(html.contains(r#"<input type="url" class="form-control" id="input-source" name="source""#));
        assert!(html.contains("bootstrap.min.css"));
    }

    #[test]
    fn completed_page_shows_image_output() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let submission = Submission::Completed {
            run_id: Uuid::new_v4(),
            outputs: vec![RenderedOutput {
                name: "image".into(),
                label: "Image".into(),
                widget: OutputWidget::Image,
                text: Some("https://img.example/dog.png".into()),
                src: Some("https://img.example/dog.png".into()),
                columns: vec![],
                rows: vec![],
            }],
            events: vec![],
            elapsed_ms: 5,
        };
        let html = PageView::after(&schema(), &chrome(), &FormData::new(), &submission)
            .render(&renderer)
            .unwrap();
        assert!(html.contains(r#"<img id="output-image" src="https://img.example/dog.png""#));
    }

    #[test]
    fn table_output_renders_header_and_cells() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let outputs = describe_event(
            &EventDecl::new("Report").field(FieldDecl::new("data_table", DeclaredType::Table)),
        )
        .unwrap();
        let stop = StopEvent::from_typed(&json!({
            "data_table": [{"Category": "<b>A</b>", "Value": 10}]
        }))
        .unwrap();
        let submission = Submission::Completed {
            run_id: Uuid::new_v4(),
            outputs: render_outputs(&outputs, &stop),
            events: vec![],
            elapsed_ms: 1,
        };
        let html = PageView::after(&schema(), &chrome(), &FormData::new(), &submission)
            .render(&renderer)
            .unwrap();
        assert!(html.contains(r#"<table id="output-data_table" class="table table-striped table-sm""#));
        assert!(html.contains("<th scope=\"col\">Category</th>"));
        assert!(html.contains("<td>&lt;b&gt;A&lt;/b&gt;</td>"));
        assert!(html.contains("<td>10</td>"));
    }

    #[test]
    fn escapes_workflow_supplied_text() {
        let renderer = HandlebarsRenderer::new().unwrap();
        let submission = Submission::Failed {
            run_id: Uuid::new_v4(),
            message: "<script>alert(1)</script>".into(),
            events: vec![],
        };
        let html = PageView::after(&schema(), &chrome(), &FormData::new(), &submission)
            .render(&renderer)
            .unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn custom_template_renders_data() {
        let renderer = HandlebarsRenderer::with_page_template("Hello {{title}}").unwrap();
        let html = renderer.render(PAGE_TEMPLATE, &json!({"title": "there"})).unwrap();
        assert_eq!(html, "Hello there");
    }

    #[test]
    fn invalid_template_is_reported() {
        let err = HandlebarsRenderer::with_page_template("{{#if title}}unclosed").err().unwrap();
        assert!(matches!(err, CoreError::TemplateRendering(_)));
    }
}
