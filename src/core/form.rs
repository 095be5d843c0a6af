//! Binds submitted form values to a start event.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Number, Value};

use crate::core::{
    domain::{FieldDescriptor, FieldType, StartEvent},
    error::{Error, FieldError, Result},
};

/// Raw submitted values keyed by field name.
pub type FormData = HashMap<String, String>;

static HTTP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)https?://[^\s/?#:@]+(:\d+)?([/?#]\S*)?$").expect("valid url regex")
});

/// Wire format of date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn is_http_url(value: &str) -> bool {
    HTTP_URL.is_match(value.trim())
}

/// True for a JSON list whose entries are all objects.
pub fn is_row_list(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|rows| rows.iter().all(Value::is_object))
}

/// Validates every declared input and builds the start event.
///
/// All field errors are collected before failing.
pub fn bind_start_event(inputs: &[FieldDescriptor], form: &FormData) -> Result<StartEvent> {
    let mut fields = Map::new();
    let mut errors = Vec::new();
    for descriptor in inputs {
        let raw = form.get(&descriptor.name).map(String::as_str);
        match bind_field(descriptor, raw) {
            Ok(Some(value)) => {
                fields.insert(descriptor.name.clone(), value);
            }
            Ok(None) => {}
            Err(reason) => errors.push(FieldError::new(&descriptor.name, reason)),
        }
    }
    if errors.is_empty() {
        Ok(StartEvent::from_map(fields))
    } else {
        Err(Error::Validation(errors))
    }
}

/// Converts a JSON submission into form strings so both entry points share one set of rules.
///
/// Unlike an HTML checkbox, a boolean key left out of the JSON body takes its
/// declared default instead of `false`.
pub fn form_from_json(inputs: &[FieldDescriptor], values: &Map<String, Value>) -> FormData {
    let mut form: FormData = values
        .iter()
        .filter_map(|(name, value)| {
            let raw = match value {
                Value::Null => return None,
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(_) | Value::Object(_) => value.to_string(),
            };
            Some((name.clone(), raw))
        })
        .collect();
    for descriptor in inputs {
        if descriptor.field_type != FieldType::Boolean || form.contains_key(&descriptor.name) {
            continue;
        }
        if let Some(Value::Bool(flag)) = &descriptor.default {
            form.insert(descriptor.name.clone(), flag.to_string());
        }
    }
    form
}

fn bind_field(
    descriptor: &FieldDescriptor,
    raw: Option<&str>,
) -> std::result::Result<Option<Value>, String> {
    if descriptor.field_type == FieldType::Boolean {
        return parse_flag(raw.unwrap_or("")).map(|flag| Some(Value::Bool(flag)));
    }

    let raw = raw.map(str::trim).filter(|value| !value.is_empty());
    let Some(raw) = raw else {
        if descriptor.required {
            return Err("is required".into());
        }
        return Ok(descriptor.default.clone());
    };

    let value = match &descriptor.field_type {
        FieldType::Text => Value::String(raw.to_string()),
        FieldType::Url => {
            if !is_http_url(raw) {
                return Err("expected an http(s) URL".into());
            }
            Value::String(raw.to_string())
        }
        FieldType::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected a whole number, got '{raw}'"))?,
        FieldType::Decimal => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("expected a number, got '{raw}'"))?,
        FieldType::Choice { options } => {
            if !options.iter().any(|option| option == raw) {
                return Err(format!(
                    "'{raw}' is not one of: {}",
                    options.join(", ")
                ));
            }
            Value::String(raw.to_string())
        }
        FieldType::Date => NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map(|date| Value::String(date.format(DATE_FORMAT).to_string()))
            .map_err(|_| format!("expected a date as YYYY-MM-DD, got '{raw}'"))?,
        FieldType::List => match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Array(_)) => value,
            _ => return Err("expected a JSON list".into()),
        },
        FieldType::Object => match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => value,
            _ => return Err("expected a JSON object".into()),
        },
        FieldType::Table => match serde_json::from_str::<Value>(raw) {
            Ok(value) if is_row_list(&value) => value,
            _ => return Err("expected a JSON list of row objects".into()),
        },
        FieldType::Boolean => unreachable!("handled above"),
    };
    Ok(Some(value))
}

fn parse_flag(raw: &str) -> std::result::Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "off" | "false" | "0" | "no" => Ok(false),
        "on" | "true" | "1" | "yes" => Ok(true),
        other => Err(format!("expected a checkbox value, got '{other}'")),
    }
}
