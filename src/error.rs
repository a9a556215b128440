use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ScopeError {
    #[error("invalid study name: {0}")]
    InvalidStudyName(String),

    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("missing config file dge-scope.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("study request failed: {0}")]
    StudyHttp(String),

    #[error("study server returned status {status}: {message}")]
    StudyStatus { status: u16, message: String },

    #[error("study not found: {0}")]
    StudyNotFound(String),

    #[error("failed to parse study {study}: {message}")]
    StudyParse { study: String, message: String },

    #[error("missing data for study {study}: {field} has {actual} entries, expected {expected}")]
    StudyShape {
        study: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("enrichment request failed: {0}")]
    EnrichHttp(String),

    #[error("enrichment API returned status {status}: {message}")]
    EnrichStatus { status: u16, message: String },

    #[error("failed to parse enrichment response: {0}")]
    EnrichParse(String),

    #[error(
        "malformed enrichment result {result_type}: {field} has {actual} entries, expected {expected}"
    )]
    EnrichShape {
        result_type: String,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
