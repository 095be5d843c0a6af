//! Maps a workflow's declared events onto UI fields and widgets.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::core::{
    domain::{DeclaredType, EventDecl, FieldDecl, FieldDescriptor, FieldType, WorkflowSchema},
    error::{Error, Result},
    form::{DATE_FORMAT, is_http_url, is_row_list},
    ports::Workflow,
};

/// Widget used to collect a start-event field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputWidget {
    TextBox,
    UrlBox,
    NumberInput { step: &'static str },
    Checkbox,
    Dropdown { options: Vec<String> },
    DatePicker,
    JsonArea { rows: u8 },
}

impl InputWidget {
    pub fn kind(&self) -> &'static str {
        match self {
            InputWidget::TextBox => "text_box",
            InputWidget::UrlBox => "url_box",
            InputWidget::NumberInput { .. } => "number_input",
            InputWidget::Checkbox => "checkbox",
            InputWidget::Dropdown { .. } => "dropdown",
            InputWidget::DatePicker => "date_picker",
            InputWidget::JsonArea { .. } => "json_area",
        }
    }
}

/// Widget used to show a stop-event field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputWidget {
    TextArea,
    Image,
    Number,
    Flag,
    Label,
    JsonBlock,
    Table,
}

impl OutputWidget {
    pub fn kind(self) -> &'static str {
        match self {
            OutputWidget::TextArea => "text_area",
            OutputWidget::Image => "image",
            OutputWidget::Number => "number",
            OutputWidget::Flag => "flag",
            OutputWidget::Label => "label",
            OutputWidget::JsonBlock => "json_block",
            OutputWidget::Table => "table",
        }
    }
}

pub fn input_widget(field_type: &FieldType) -> InputWidget {
    match field_type {
        FieldType::Text => InputWidget::TextBox,
        FieldType::Url => InputWidget::UrlBox,
        FieldType::Integer => InputWidget::NumberInput { step: "1" },
        FieldType::Decimal => InputWidget::NumberInput { step: "any" },
        FieldType::Boolean => InputWidget::Checkbox,
        FieldType::Choice { options } => InputWidget::Dropdown {
            options: options.clone(),
        },
        FieldType::Date => InputWidget::DatePicker,
        FieldType::List => InputWidget::JsonArea { rows: 3 },
        FieldType::Object => InputWidget::JsonArea { rows: 4 },
        FieldType::Table => InputWidget::JsonArea { rows: 6 },
    }
}

pub fn output_widget(field_type: &FieldType) -> OutputWidget {
    match field_type {
        FieldType::Text => OutputWidget::TextArea,
        FieldType::Url => OutputWidget::Image,
        FieldType::Integer | FieldType::Decimal => OutputWidget::Number,
        FieldType::Boolean => OutputWidget::Flag,
        FieldType::Choice { .. } | FieldType::Date => OutputWidget::Label,
        FieldType::List | FieldType::Object => OutputWidget::JsonBlock,
        FieldType::Table => OutputWidget::Table,
    }
}

/// Queries the workflow's declared events and validates every field.
pub fn introspect(workflow: &dyn Workflow) -> Result<WorkflowSchema> {
    let start = workflow.start_event();
    let stop = workflow.stop_event();
    let inputs = describe_event(&start)?;
    let mut outputs = describe_event(&stop)?;
    if outputs.is_empty() {
        outputs.push(FieldDescriptor {
            name: "result".into(),
            label: label_for("result"),
            field_type: FieldType::Text,
            help: None,
            required: false,
            default: None,
        });
    }
    Ok(WorkflowSchema {
        workflow: workflow.name().to_string(),
        description: start.doc.clone(),
        inputs,
        outputs,
    })
}

/// Produces the ordered descriptors of one event, rejecting anything unsupported.
pub fn describe_event(event: &EventDecl) -> Result<Vec<FieldDescriptor>> {
    let mut seen = HashSet::new();
    let mut descriptors = Vec::with_capacity(event.fields.len());
    for field in &event.fields {
        let name = field.name.trim();
        if name.is_empty() {
            return Err(Error::config(format!(
                "event '{}' declares a field without a name",
                event.name
            )));
        }
        if !seen.insert(name.to_string()) {
            return Err(Error::config_field(
                name,
                format!("declared more than once in event '{}'", event.name),
            ));
        }
        descriptors.push(describe_field(field)?);
    }
    Ok(descriptors)
}

fn describe_field(field: &FieldDecl) -> Result<FieldDescriptor> {
    let name = field.name.trim();
    let field_type = resolve_type(name, &field.declared)?;
    if let Some(default) = &field.default {
        check_default(name, &field_type, default)?;
    }
    Ok(FieldDescriptor {
        name: name.to_string(),
        label: label_for(name),
        field_type,
        help: field.help.clone(),
        required: field.required && field.default.is_none(),
        default: field.default.clone(),
    })
}

fn resolve_type(name: &str, declared: &DeclaredType) -> Result<FieldType> {
    let resolved = match declared {
        DeclaredType::Text | DeclaredType::Any => FieldType::Text,
        DeclaredType::Url => FieldType::Url,
        DeclaredType::Integer => FieldType::Integer,
        DeclaredType::Decimal => FieldType::Decimal,
        DeclaredType::Boolean => FieldType::Boolean,
        DeclaredType::Date => FieldType::Date,
        DeclaredType::List => FieldType::List,
        DeclaredType::Object => FieldType::Object,
        DeclaredType::Table => FieldType::Table,
        DeclaredType::Choice { options } => {
            if options.is_empty() {
                return Err(Error::config_field(name, "choice declares no options"));
            }
            let mut unique = HashSet::new();
            if let Some(dup) = options.iter().find(|option| !unique.insert(option.as_str())) {
                return Err(Error::config_field(
                    name,
                    format!("choice option '{dup}' is listed twice"),
                ));
            }
            FieldType::Choice {
                options: options.clone(),
            }
        }
        DeclaredType::Other { name: type_name } => {
            return Err(Error::config_field(
                name,
                format!("unsupported field type '{type_name}'"),
            ));
        }
    };
    Ok(resolved)
}

fn check_default(name: &str, field_type: &FieldType, default: &Value) -> Result<()> {
    let fits = match field_type {
        FieldType::Text => default.is_string(),
        FieldType::Url => default.as_str().is_some_and(is_http_url),
        FieldType::Date => default
            .as_str()
            .is_some_and(|value| NaiveDate::parse_from_str(value, DATE_FORMAT).is_ok()),
        FieldType::Integer => default.is_i64(),
        FieldType::Decimal => default.is_number(),
        FieldType::Boolean => default.is_boolean(),
        FieldType::Choice { options } => default
            .as_str()
            .is_some_and(|value| options.iter().any(|option| option == value)),
        FieldType::List => default.is_array(),
        FieldType::Object => default.is_object(),
        FieldType::Table => is_row_list(default),
    };
    if fits {
        Ok(())
    } else {
        Err(Error::config_field(
            name,
            format!("default {default} does not fit type '{}'", field_type.as_str()),
        ))
    }
}

/// "number_of_points" -> "Number of points".
pub fn label_for(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
