use std::fmt;

use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

#[derive(Debug)]
pub enum Error {
    /// The workflow declares something the adapter cannot render.
    Config { field: Option<String>, message: String },
    /// Submitted values did not satisfy the start event's fields.
    Validation(Vec<FieldError>),
    /// The workflow itself failed or panicked.
    Execution(String),
    /// An error occurred while rendering the page template.
    TemplateRendering(String),
    /// A generic system or unknown error.
    System(String),
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            field: None,
            message: message.into(),
        }
    }

    pub fn config_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Error::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config {
                field: Some(field),
                message,
            } => write!(f, "Configuration error in field '{field}': {message}"),
            Error::Config {
                field: None,
                message,
            } => write!(f, "Configuration error: {message}"),
            Error::Validation(errors) => {
                let joined = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "Validation error: {joined}")
            }
            Error::Execution(msg) => write!(f, "Workflow failed: {msg}"),
            Error::TemplateRendering(msg) => write!(f, "Template error: {msg}"),
            Error::System(msg) => write!(f, "System error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_field() {
        let err = Error::config_field("chart", "unsupported type 'Figure'");
        assert_eq!(
            err.to_string(),
            "Configuration error in field 'chart': unsupported type 'Figure'"
        );
    }

    #[test]
    fn validation_error_lists_every_field() {
        let err = Error::Validation(vec![
            FieldError::new("query", "is required"),
            FieldError::new("age", "expected a whole number"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation error: query: is required; age: expected a whole number"
        );
        assert_eq!(err.field_errors().len(), 2);
    }
}
