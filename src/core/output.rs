use serde::Serialize;
use serde_json::Value;

use crate::core::{
    domain::{FieldDescriptor, StopEvent},
    form::{is_http_url, is_row_list},
    introspect::{OutputWidget, output_widget},
};

/// One stop-event field, ready for the page template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedOutput {
    pub name: String,
    pub label: String,
    pub widget: OutputWidget,
    pub text: Option<String>,
    pub src: Option<String>,
    /// Header and cells of a table output, in first-seen column order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<String>>,
}

/// Output widgets before anything has run.
pub fn empty_outputs(outputs: &[FieldDescriptor]) -> Vec<RenderedOutput> {
    outputs
        .iter()
        .map(|descriptor| RenderedOutput {
            name: descriptor.name.clone(),
            label: descriptor.label.clone(),
            widget: output_widget(&descriptor.field_type),
            text: None,
            src: None,
            columns: Vec::new(),
            rows: Vec::new(),
        })
        .collect()
}

pub fn render_outputs(outputs: &[FieldDescriptor], stop: &StopEvent) -> Vec<RenderedOutput> {
    // A plain stop event that carries something other than `result` is shown whole.
    let whole = (outputs.len() == 1 && outputs[0].name == "result" && stop.get("result").is_none()
        && !stop.fields().is_empty())
    .then(|| Value::Object(stop.fields().clone()));

    outputs
        .iter()
        .map(|descriptor| {
            let value = whole.as_ref().or_else(|| stop.get(&descriptor.name));
            render_one(descriptor, value)
        })
        .collect()
}

fn render_one(descriptor: &FieldDescriptor, value: Option<&Value>) -> RenderedOutput {
    let mut rendered = RenderedOutput {
        name: descriptor.name.clone(),
        label: descriptor.label.clone(),
        widget: output_widget(&descriptor.field_type),
        text: None,
        src: None,
        columns: Vec::new(),
        rows: Vec::new(),
    };
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return rendered;
    };

    match rendered.widget {
        OutputWidget::Image => match value.as_str().filter(|url| is_http_url(url)) {
            Some(url) => {
                rendered.src = Some(url.to_string());
                rendered.text = Some(url.to_string());
            }
            None => {
                rendered.widget = OutputWidget::JsonBlock;
                rendered.text = Some(pretty(value));
            }
        },
        OutputWidget::Flag => {
            rendered.text = Some(match value.as_bool() {
                Some(true) => "Yes".to_string(),
                Some(false) => "No".to_string(),
                None => plain(value),
            });
        }
        OutputWidget::Table => match value.as_array().filter(|_| is_row_list(value)) {
            Some(records) => {
                let (columns, rows) = tabulate(records);
                rendered.text = Some(format!("{} rows", rows.len()));
                rendered.columns = columns;
                rendered.rows = rows;
            }
            None => {
                rendered.widget = OutputWidget::JsonBlock;
                rendered.text = Some(pretty(value));
            }
        },
        OutputWidget::JsonBlock => rendered.text = Some(pretty(value)),
        OutputWidget::TextArea | OutputWidget::Number | OutputWidget::Label => {
            rendered.text = Some(plain(value));
        }
    }
    rendered
}

fn tabulate(records: &[Value]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut columns: Vec<String> = Vec::new();
    for record in records.iter().filter_map(Value::as_object) {
        for key in record.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    let rows = records
        .iter()
        .filter_map(Value::as_object)
        .map(|record| {
            columns
                .iter()
                .map(|column| match record.get(column) {
                    None | Some(Value::Null) => String::new(),
                    Some(cell) => plain(cell),
                })
                .collect()
        })
        .collect();
    (columns, rows)
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        domain::{DeclaredType, EventDecl, FieldDecl},
        introspect::describe_event,
    };
    use serde_json::{Map, json};

    fn outputs(fields: &[(&str, DeclaredType)]) -> Vec<FieldDescriptor> {
        let event = fields
            .iter()
            .fold(EventDecl::new("Out"), |event, (name, declared)| {
                event.field(FieldDecl::new(*name, declared.clone()))
            });
        describe_event(&event).unwrap()
    }

    fn stop(value: Value) -> StopEvent {
        let Value::Object(map) = value else {
            panic!("object expected")
        };
        StopEvent::from_map(map)
    }

    #[test]
    fn url_output_becomes_an_image_source() {
        let rendered = render_outputs(
            &outputs(&[("image", DeclaredType::Url)]),
            &stop(json!({"image": "https://placehold.co/600x400.png"})),
        );
        assert_eq!(rendered[0].widget, OutputWidget::Image);
        assert_eq!(
            rendered[0].src.as_deref(),
            Some("https://placehold.co/600x400.png")
        );
    }

    #[test]
    fn non_http_url_never_lands_in_an_image_source() {
        let rendered = render_outputs(
            &outputs(&[("image", DeclaredType::Url)]),
            &stop(json!({"image": "javascript:alert(1)"})),
        );
        assert_eq!(rendered[0].widget, OutputWidget::JsonBlock);
        assert!(rendered[0].src.is_none());
        assert_eq!(rendered[0].text.as_deref(), Some("\"javascript:alert(1)\""));
    }

    #[test]
    fn formats_scalars_and_structures() {
        let rendered = render_outputs(
            &outputs(&[
                ("summary", DeclaredType::Text),
                ("count", DeclaredType::Integer),
                ("ok", DeclaredType::Boolean),
                ("when", DeclaredType::Date),
                ("items", DeclaredType::List),
            ]),
            &stop(json!({
                "summary": "done",
                "count": 3,
                "ok": false,
                "when": "2024-05-01",
                "items": ["a"]
            })),
        );
        let texts: Vec<_> = rendered.iter().map(|r| r.text.clone().unwrap()).collect();
        assert_eq!(texts, ["done", "3", "No", "2024-05-01", "[\n  \"a\"\n]"]);
    }

    #[test]
    fn missing_fields_render_empty() {
        let rendered = render_outputs(
            &outputs(&[("summary", DeclaredType::Text)]),
            &StopEvent::from_map(Map::new()),
        );
        assert!(rendered[0].text.is_none());
        assert_eq!(rendered, empty_outputs(&outputs(&[("summary", DeclaredType::Text)])));
    }

    #[test]
    fn plain_result_without_result_field_shows_whole_event() {
        let rendered = render_outputs(
            &outputs(&[("result", DeclaredType::Text)]),
            &stop(json!({"number": 9})),
        );
        assert_eq!(rendered[0].text.as_deref(), Some("{\"number\":9}"));
    }

    #[test]
    fn table_output_lists_rows_under_the_union_of_columns() {
        let rendered = render_outputs(
            &outputs(&[("data_table", DeclaredType::Table)]),
            &stop(json!({"data_table": [
                {"Category": "A", "Value": 0},
                {"Category": "B", "Value": 10, "Note": "late"},
                {"Value": null}
            ]})),
        );
        let table = &rendered[0];
        assert_eq!(table.widget, OutputWidget::Table);
        assert_eq!(table.columns, ["Category", "Value", "Note"]);
        assert_eq!(
            table.rows,
            [vec!["A", "0", ""], vec!["B", "10", "late"], vec!["", "", ""]]
        );
        assert_eq!(table.text.as_deref(), Some("3 rows"));
    }

    #[test]
    fn table_output_without_row_objects_falls_back_to_json() {
        let rendered = render_outputs(
            &outputs(&[("data_table", DeclaredType::Table)]),
            &stop(json!({"data_table": [1, 2]})),
        );
        assert_eq!(rendered[0].widget, OutputWidget::JsonBlock);
        assert!(rendered[0].columns.is_empty());
        assert_eq!(rendered[0].text.as_deref(), Some("[\n  1,\n  2\n]"));
    }
}
