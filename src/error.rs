use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to read metrics file {path}: {source}")]
    MetricsRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed metrics file {path} (line {line}): {message}")]
    MalformedMetrics {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("Unrecognized {kind} policy: '{value}'")]
    InvalidPolicy { kind: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Record identifier '{0}' is not numeric")]
    InvalidRecordId(String),
}

pub type DoseResult<T> = Result<T, DoseError>;
