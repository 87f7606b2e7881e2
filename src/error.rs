// src/error.rs

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupeError {
    /// A malformed row in one of the input files. `row` is 1-based.
    #[error("parse error in {path} at row {row}: {reason}")]
    Parse {
        path: String,
        row: u64,
        reason: String,
    },

    /// Invalid or incompatible options, reported before any stage runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DedupeResult<T> = Result<T, DedupeError>;

impl DedupeError {
    pub fn parse(path: &Path, row: u64, reason: impl Into<String>) -> Self {
        DedupeError::Parse {
            path: path.display().to_string(),
            row,
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        DedupeError::Configuration(msg.into())
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        DedupeError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
