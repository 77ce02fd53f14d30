//! Error types for the collection run.
//!
//! Every failure is fatal to the run. The only exception is a per-dimension
//! subgroup that cannot be fitted, which is recorded as an explicit outcome
//! instead (see [`crate::models::DimOutcome`]).

use crate::analysis::correlation::FitError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while collecting statistics.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Invalid configuration or arguments.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Filesystem read or write failure.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV input or failure writing CSV output.
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// An expected column is absent from a metric file.
    #[error("Schema error: column '{column}' not found in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A cell in a metric column could not be parsed as a number.
    #[error("Schema error: invalid value '{value}' in column '{column}' at row {row} of {}", path.display())]
    InvalidValue {
        path: PathBuf,
        column: String,
        row: usize,
        value: String,
    },

    /// Reference and other metric tables are not paired row by row.
    #[error("Schema error: {} has {other} rows but the reference table has {reference}", path.display())]
    RowCountMismatch {
        path: PathBuf,
        reference: usize,
        other: usize,
    },

    /// A model directory lacks a metric file that the run expects.
    #[error("Missing metric file '{file}' in model directory {}", model_dir.display())]
    MissingMetricFile { model_dir: PathBuf, file: String },

    /// A model directory carries a different metric set than the first one.
    #[error("Model directory {} has metrics [{found}], expected [{expected}]", model_dir.display())]
    InconsistentMetrics {
        model_dir: PathBuf,
        expected: String,
        found: String,
    },

    /// The JSON run summary could not be serialized.
    #[error("Failed to serialize run summary: {0}")]
    Json(#[from] serde_json::Error),

    /// The correlation function could not be computed.
    #[error("Fit error: {0}")]
    Fit(#[from] FitError),
}

impl CollectError {
    /// Create a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an Io error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a Csv error for the given path.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_metric_file_names_file() {
        let err = CollectError::MissingMetricFile {
            model_dir: PathBuf::from("/runs/beta_vae_s01"),
            file: "collected-dci-mean.csv".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("collected-dci-mean.csv"));
        assert!(msg.contains("/runs/beta_vae_s01"));
    }

    #[test]
    fn test_fit_error_converts() {
        let err: CollectError = FitError::InsufficientData {
            required: 2,
            actual: 1,
        }
        .into();
        assert!(matches!(err, CollectError::Fit(_)));
        assert!(err.to_string().contains("required 2"));
    }
}
