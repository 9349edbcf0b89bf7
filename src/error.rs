//! Error types for the Paramgrid command line.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid override '{0}': expected ID=VALUE")]
    InvalidOverride(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
}

/// Split `ID=VALUE`. The id may not be empty; the value may.
pub fn parse_override(text: &str) -> Result<(String, String), CliError> {
    match text.split_once('=') {
        Some((id, value)) if !id.trim().is_empty() => Ok((id.trim().to_string(), value.to_string())),
        _ => Err(CliError::InvalidOverride(text.to_string())),
    }
}
