use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating the environment configuration.
///
/// Every variant is a startup failure: the host process is expected to abort
/// rather than serve traffic with a partial configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{var} is not valid JSON: {source}")]
    Json {
        var: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{var} must hold a JSON object")]
    NotAnObject { var: String },
    #[error("{var}.{key} must be a string, number or boolean")]
    NonScalarJson { var: String, key: String },
    #[error("Config validation error: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),
    #[error("PORT {value:?} is not a valid listening port")]
    InvalidListenPort { value: String },
}

impl ConfigError {
    /// Field errors carried by a validation failure, empty for other variants.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub constraint: Constraint,
}

impl FieldError {
    pub(crate) fn new(field: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            field: field.into(),
            constraint,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Constraint::Required => write!(f, "\"{}\" is required", self.field),
            Constraint::Empty => write!(f, "\"{}\" is not allowed to be empty", self.field),
            Constraint::NotAllowed => write!(f, "\"{}\" is not allowed", self.field),
            Constraint::Port => write!(
                f,
                "\"{}\" must be a number between 0 and 65535",
                self.field
            ),
            Constraint::OneOf(allowed) => write!(
                f,
                "\"{}\" must be one of [{}]",
                self.field,
                allowed.join(", ")
            ),
        }
    }
}

/// The rule a field failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Required,
    Empty,
    /// Key outside the configuration schema.
    NotAllowed,
    Port,
    OneOf(&'static [&'static str]),
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_every_field() {
        let error = ConfigError::Validation(vec![
            FieldError::new("PORT", Constraint::Required),
            FieldError::new("DATABASE_PORT", Constraint::Port),
        ]);

        let message = error.to_string();
        assert!(message.starts_with("Config validation error:"));
        assert!(message.contains("\"PORT\" is required"));
        assert!(message.contains("\"DATABASE_PORT\" must be a number"));
        assert_eq!(error.field_errors().len(), 2);
    }

    #[test]
    fn one_of_lists_allowed_values() {
        let error = FieldError::new("LOG_FORMAT", Constraint::OneOf(&["text", "json"]));
        assert_eq!(error.to_string(), "\"LOG_FORMAT\" must be one of [text, json]");
    }

    #[test]
    fn unknown_keys_read_as_not_allowed() {
        let error = FieldError::new(String::from("FOO"), Constraint::NotAllowed);
        assert_eq!(error.to_string(), "\"FOO\" is not allowed");
    }

    #[test]
    fn non_validation_errors_have_no_field_errors() {
        let error = ConfigError::InvalidListenPort {
            value: "abc".into(),
        };
        assert!(error.field_errors().is_empty());
        assert!(error.to_string().contains("\"abc\""));
    }
}
