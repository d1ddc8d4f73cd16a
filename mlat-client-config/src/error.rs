// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for mlat-client-config

use thiserror::Error;

/// Result type alias for mlat-client-config operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur while loading templates, collecting answers or
/// committing the configuration artifact
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Answer was empty where a value is required
    #[error("A value is required")]
    EmptyValue,

    /// Answer is not 0 or a port in 1024..=65535
    #[error("Invalid port number: {value}")]
    InvalidPort { value: String },

    /// Answer is not a decimal number
    #[error("Invalid number: {value}")]
    InvalidNumber { value: String },

    /// Answer is not an acceptable non-root user name
    #[error("Invalid user name: {value}")]
    InvalidUsername { value: String },

    /// Answer to a select prompt is not one of its choices
    #[error("'{value}' is not one of: {choices}")]
    InvalidChoice { value: String, choices: String },

    /// Answer contains a line break or other control character, which the
    /// one-line-per-variable artifact cannot hold
    #[error("Value must be a single line without control characters")]
    InvalidCharacter,

    /// Answer to a boolean prompt could not be parsed
    #[error("Expected yes or no, got '{value}'")]
    InvalidBoolean { value: String },

    /// The template set is corrupt; no prompting may happen
    #[error("Malformed template '{key}': {message}")]
    MalformedTemplate { key: String, message: String },

    /// Template file not found
    #[error("Template file not found: {path}")]
    TemplatesNotFound { path: String },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid tool configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Line in the configuration artifact could not be parsed
    #[error("Artifact parse error on line {line}: {message}")]
    ArtifactParse { line: usize, message: String },

    /// A non-interactive front end could not produce an acceptable answer
    #[error("No acceptable answer for '{key}': {message}")]
    Unanswered { key: String, message: String },

    /// The operator closed input before the questionnaire finished
    #[error("Configuration aborted at '{key}'")]
    Aborted { key: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Temporary artifact could not be moved into place
    #[error("Failed to replace artifact: {0}")]
    PersistError(#[from] tempfile::PersistError),
}

impl ConfigError {
    /// Whether the error is an operator-facing validation failure that the
    /// driver recovers from by re-prompting
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ConfigError::EmptyValue
                | ConfigError::InvalidPort { .. }
                | ConfigError::InvalidNumber { .. }
                | ConfigError::InvalidUsername { .. }
                | ConfigError::InvalidChoice { .. }
                | ConfigError::InvalidBoolean { .. }
                | ConfigError::InvalidCharacter
        )
    }
}
