use thiserror::Error;

use crate::validate::ValidationError;

/// Errors surfaced when checking a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One or more validation checks failed.
    #[error("configuration is not valid: {}", summarize(.0))]
    Invalid(Vec<ValidationError>),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
