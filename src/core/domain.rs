//! Value types shared by the introspector, the form binder and the session runner.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::core::error::{Error, Result};

/// Type tag a workflow attaches to one of its event fields.
///
/// `Other` carries whatever the workflow names for types the adapter has no
/// widget for; introspection rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeclaredType {
    Text,
    Url,
    Integer,
    Decimal,
    Boolean,
    Choice { options: Vec<String> },
    Date,
    List,
    Object,
    /// Rows of a data frame, as a JSON list of objects.
    Table,
    Any,
    Other { name: String },
}

impl DeclaredType {
    pub fn choice<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DeclaredType::Choice {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn other(name: impl Into<String>) -> Self {
        DeclaredType::Other { name: name.into() }
    }
}

/// One field of a declared start or stop event.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub declared: DeclaredType,
    pub help: Option<String>,
    pub required: bool,
    pub default: Option<Value>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, declared: DeclaredType) -> Self {
        Self {
            name: name.into(),
            declared,
            help: None,
            required: true,
            default: None,
        }
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Declares a default value; a field with a default is never required.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.required = false;
        self
    }
}

/// The capability a workflow reports for its start or stop event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDecl {
    pub name: String,
    pub doc: Option<String>,
    pub fields: Vec<FieldDecl>,
}

impl EventDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
            fields: Vec::new(),
        }
    }

    /// A stop event that only carries a free-form `result`.
    pub fn plain_stop() -> Self {
        Self::new("StopEvent")
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

/// Supported field types after introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Url,
    Integer,
    Decimal,
    Boolean,
    Choice { options: Vec<String> },
    Date,
    List,
    Object,
    Table,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Url => "url",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::Boolean => "boolean",
            FieldType::Choice { .. } => "choice",
            FieldType::Date => "date",
            FieldType::List => "list",
            FieldType::Object => "object",
            FieldType::Table => "table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub field_type: FieldType,
    pub help: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Everything the UI needs to know about a workflow, derived once at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSchema {
    pub workflow: String,
    pub description: Option<String>,
    pub inputs: Vec<FieldDescriptor>,
    pub outputs: Vec<FieldDescriptor>,
}

/// Values handed to a workflow run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StartEvent {
    fields: Map<String, Value>,
}

impl StartEvent {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Deserializes the event into the workflow's own input struct.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields))
            .map_err(|err| Error::Execution(format!("start event does not fit: {err}")))
    }
}

/// Values a workflow run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StopEvent {
    fields: Map<String, Value>,
}

impl StopEvent {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Stop event for workflows that declare a plain `result`.
    pub fn result(value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("result".into(), value.into());
        Self { fields }
    }

    pub fn from_typed<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(other) => Err(Error::Execution(format!(
                "stop event must serialize to an object, got {other}"
            ))),
            Err(err) => Err(Error::Execution(format!(
                "stop event failed to serialize: {err}"
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Intermediate event a workflow writes to its stream while running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub name: String,
    pub payload: Value,
}
