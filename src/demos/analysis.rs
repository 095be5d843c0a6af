use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{
    domain::{DeclaredType, EventDecl, FieldDecl, StartEvent, StopEvent},
    form::DATE_FORMAT,
    ports::{ProgressSink, Workflow},
};

/// Summarizes its inputs and tabulates the categories; exercises most widgets.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalysisWorkflow;

#[derive(Debug, Deserialize)]
struct AnalysisRequest {
    text: String,
    number_of_points: i64,
    date: String,
    use_line_chart: bool,
    chart_style: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct AnalysisResult {
    summary: String,
    analysis_date: String,
    processed_categories: Vec<String>,
    data_table: Vec<TableRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TableRow {
    category: String,
    value: i64,
    date: String,
}

#[async_trait]
impl Workflow for AnalysisWorkflow {
    fn name(&self) -> &str {
        "AnalysisWorkflow"
    }

    fn start_event(&self) -> EventDecl {
        EventDecl::new("AnalysisRequest")
            .doc("Input event with various data types.")
            .field(FieldDecl::new("text", DeclaredType::Text))
            .field(FieldDecl::new("number_of_points", DeclaredType::Integer).default_value(json!(100)))
            .field(FieldDecl::new("date", DeclaredType::Date))
            .field(FieldDecl::new("use_line_chart", DeclaredType::Boolean).default_value(json!(true)))
            .field(
                FieldDecl::new("chart_style", DeclaredType::choice(["line", "bar", "scatter"]))
                    .optional(),
            )
            .field(
                FieldDecl::new("categories", DeclaredType::List)
                    .help(r#"JSON list, e.g. ["A", "B"]"#)
                    .default_value(json!([])),
            )
            .field(
                FieldDecl::new("properties", DeclaredType::Object)
                    .help("Per-category notes as a JSON object")
                    .default_value(json!({})),
            )
    }

    fn stop_event(&self) -> EventDecl {
        EventDecl::new("AnalysisResult")
            .field(FieldDecl::new("summary", DeclaredType::Text))
            .field(FieldDecl::new("analysis_date", DeclaredType::Date))
            .field(FieldDecl::new("processed_categories", DeclaredType::List))
            .field(FieldDecl::new("data_table", DeclaredType::Table))
    }

    async fn run(&self, start: StartEvent, _progress: ProgressSink) -> anyhow::Result<StopEvent> {
        let request: AnalysisRequest = start.into_typed()?;
        let style = request
            .chart_style
            .as_deref()
            .unwrap_or(if request.use_line_chart { "line" } else { "bar" });
        let processed_categories = request
            .categories
            .iter()
            .map(|category| match request.properties.get(category) {
                Some(note) => format!("{category}: {note}"),
                None => format!("{category}: No property"),
            })
            .collect();
        let data_table = tabulate(&request.categories, &request.date)?;
        let result = AnalysisResult {
            summary: format!(
                "Analyzed {} with {} data points on {} ({style} chart)",
                request.text, request.number_of_points, request.date
            ),
            analysis_date: chrono::Local::now().date_naive().format(DATE_FORMAT).to_string(),
            processed_categories,
            data_table,
        };
        Ok(StopEvent::from_typed(&result)?)
    }
}

/// Every category twice, with values stepping by ten and dates by one day.
fn tabulate(categories: &[String], date: &str) -> anyhow::Result<Vec<TableRow>> {
    let start = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .with_context(|| format!("date '{date}' is not YYYY-MM-DD"))?;
    categories
        .iter()
        .chain(categories)
        .enumerate()
        .map(|(i, category)| {
            let day = start
                .checked_add_days(Days::new(i as u64))
                .context("date out of range")?;
            Ok(TableRow {
                category: category.clone(),
                value: i as i64 * 10,
                date: day.format(DATE_FORMAT).to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        form::{FormData, bind_start_event},
        introspect::introspect,
    };

    fn submit(pairs: &[(&str, &str)]) -> StartEvent {
        let schema = introspect(&AnalysisWorkflow).unwrap();
        let form: FormData = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        bind_start_event(&schema.inputs, &form).unwrap()
    }

    #[tokio::test]
    async fn summarizes_submitted_values() {
        let start = submit(&[
            ("text", "Sample analysis"),
            ("date", "2024-03-01"),
            ("use_line_chart", "on"),
            ("categories", r#"["Category A", "Category C"]"#),
            ("properties", r#"{"Category A": "Important"}"#),
        ]);
        let stop = AnalysisWorkflow
            .run(start, ProgressSink::disabled())
            .await
            .unwrap();
        assert_eq!(
            stop.get("summary").unwrap(),
            "Analyzed Sample analysis with 100 data points on 2024-03-01 (line chart)"
        );
        assert_eq!(
            stop.get("processed_categories").unwrap(),
            &json!(["Category A: Important", "Category C: No property"])
        );
        assert_eq!(stop.get("analysis_date").unwrap().as_str().unwrap().len(), 10);

        let table = stop.get("data_table").unwrap().as_array().unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(
            table[3],
            json!({"Category": "Category C", "Value": 30, "Date": "2024-03-04"})
        );
    }

    #[tokio::test]
    async fn unchecked_box_and_explicit_style() {
        let start = submit(&[
            ("text", "x"),
            ("date", "2024-03-01"),
            ("number_of_points", "5"),
            ("chart_style", "scatter"),
        ]);
        assert_eq!(start.get("use_line_chart"), Some(&json!(false)));
        let stop = AnalysisWorkflow
            .run(start, ProgressSink::disabled())
            .await
            .unwrap();
        let summary = stop.get("summary").unwrap().as_str().unwrap();
        assert!(summary.contains("5 data points"));
        assert!(summary.ends_with("(scatter chart)"));
        assert_eq!(stop.get("data_table"), Some(&json!([])));
    }
}
