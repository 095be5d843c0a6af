//! View model for the generated page.

use serde::Serialize;
use serde_json::Value;

use crate::{
    application::session::Submission,
    config::Theme,
    core::{
        domain::{FieldDescriptor, ProgressEvent, WorkflowSchema},
        error::{Error, FieldError, Result},
        form::FormData,
        introspect::{InputWidget, input_widget},
        output::{RenderedOutput, empty_outputs},
        ports::PageRenderer,
    },
};

pub const PAGE_TEMPLATE: &str = "page";

/// Page-level settings that do not change between submissions.
#[derive(Debug, Clone)]
pub struct PageChrome {
    pub title: String,
    pub theme: Theme,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    pub title: String,
    pub description: Option<String>,
    pub theme: &'static str,
    pub stylesheet: String,
    pub debug: bool,
    pub inputs: Vec<InputView>,
    pub outputs: Vec<RenderedOutput>,
    pub banner: Option<Banner>,
    pub events: Vec<String>,
    pub run_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputView {
    pub name: String,
    pub label: String,
    pub help: Option<String>,
    pub required: bool,
    pub kind: &'static str,
    pub step: Option<&'static str>,
    pub rows: Option<u8>,
    pub options: Vec<OptionView>,
    pub value: String,
    pub checked: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptionView {
    pub value: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Banner {
    pub level: &'static str,
    pub message: String,
}

impl PageView {
    /// The page before any submission: inputs show their declared defaults.
    pub fn initial(schema: &WorkflowSchema, chrome: &PageChrome) -> Self {
        Self {
            title: chrome.title.clone(),
            description: schema.description.clone(),
            theme: chrome.theme.as_str(),
            stylesheet: chrome.theme.stylesheet_url(),
            debug: chrome.debug,
            inputs: schema
                .inputs
                .iter()
                .map(|d| input_view(d, default_text(d), &[]))
                .collect(),
            outputs: empty_outputs(&schema.outputs),
            banner: None,
            events: Vec::new(),
            run_id: None,
        }
    }

    /// The page after a submission.
    ///
    /// Rejected submissions echo the submitted values with inline errors; any other
    /// outcome clears the form back to its defaults.
    pub fn after(
        schema: &WorkflowSchema,
        chrome: &PageChrome,
        form: &FormData,
        submission: &Submission,
    ) -> Self {
        let mut view = Self::initial(schema, chrome);
        match submission {
            Submission::Rejected { errors } => {
                view.inputs = schema
                    .inputs
                    .iter()
                    .map(|d| {
                        let submitted = form.get(&d.name).cloned().unwrap_or_default();
                        input_view(d, submitted, errors)
                    })
                    .collect();
                view.banner = Some(Banner {
                    level: "warning",
                    message: "Please fix the highlighted fields.".into(),
                });
            }
            Submission::Failed {
                run_id,
                message,
                events,
            } => {
                view.banner = Some(Banner {
                    level: "danger",
                    message: message.clone(),
                });
                view.events = format_events(events);
                view.run_id = Some(run_id.to_string());
            }
            Submission::Completed {
                run_id,
                outputs,
                events,
                elapsed_ms,
            } => {
                view.outputs = outputs.clone();
                view.events = format_events(events);
                view.run_id = Some(run_id.to_string());
                if chrome.debug {
                    view.banner = Some(Banner {
                        level: "success",
                        message: format!("Run {run_id} finished in {elapsed_ms} ms"),
                    });
                }
            }
        }
        view
    }

    pub fn render(&self, renderer: &dyn PageRenderer) -> Result<String> {
        let data = serde_json::to_value(self)
            .map_err(|e| Error::TemplateRendering(format!("page view not serializable: {e}")))?;
        renderer.render(PAGE_TEMPLATE, &data)
    }
}

fn input_view(descriptor: &FieldDescriptor, value: String, errors: &[FieldError]) -> InputView {
    let widget = input_widget(&descriptor.field_type);
    let (step, rows, options) = match &widget {
        InputWidget::NumberInput { step } => (Some(*step), None, Vec::new()),
        InputWidget::JsonArea { rows } => (None, Some(*rows), Vec::new()),
        InputWidget::Dropdown { options } => (
            None,
            None,
            options
                .iter()
                .map(|option| OptionView {
                    value: option.clone(),
                    selected: *option == value,
                })
                .collect(),
        ),
        _ => (None, None, Vec::new()),
    };
    let checked = matches!(widget, InputWidget::Checkbox)
        && matches!(value.to_ascii_lowercase().as_str(), "on" | "true" | "1" | "yes");
    InputView {
        name: descriptor.name.clone(),
        label: descriptor.label.clone(),
        help: descriptor.help.clone(),
        required: descriptor.required,
        kind: widget.kind(),
        step,
        rows,
        options,
        value,
        checked,
        error: errors
            .iter()
            .find(|e| e.field == descriptor.name)
            .map(|e| e.reason.clone()),
    }
}

fn default_text(descriptor: &FieldDescriptor) -> String {
    match &descriptor.default {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn format_events(events: &[ProgressEvent]) -> Vec<String> {
    events
        .iter()
        .map(|event| format!("{}: {}", event.name, event.payload))
        .collect()
}
