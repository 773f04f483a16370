//! Error types for the relation-discovery pipeline.
//!
//! Structured errors using thiserror, split by concern: configuration
//! errors are fatal at startup, pipeline errors are fatal for the category
//! pair being processed. Every pipeline error carries a stable taxonomy
//! tag that the driver puts in logs and failure summaries.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating startup configuration.
///
/// These are the only errors that produce a non-zero exit code.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {reason}")]
    Invalid { reason: String },

    #[error("Missing input file '{path}': {source}")]
    MissingInput {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Malformed categories table '{path}' at line {line}: expected 'cat1 cat2 score' columns"
    )]
    MalformedCategories { path: PathBuf, line: usize },

    #[error("Failed to load settings: {0}")]
    Settings(#[from] figment::Error),
}

/// Main error type for pipeline execution.
///
/// A pipeline error aborts the current category pair; the driver logs it
/// with the pair name and continues with the next pair.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage was about to run without one of its declared file inputs.
    #[error("Stage '{stage}' is missing required file '{name}'")]
    MissingFile { stage: String, name: String },

    /// A stage was about to run without one of its declared data inputs.
    #[error("Stage '{stage}' is missing required data '{name}'")]
    MissingData { stage: String, name: String },

    /// A lookup hit a key that is not in the state bag.
    #[error("Required data '{name}' is not in the pipeline state")]
    DataAbsent { name: String },

    /// A lookup hit a key that is not in the file registry.
    #[error("Required file '{name}' is not in the pipeline state")]
    FileAbsent { name: String },

    /// A data key held a different kind of value than the stage expected.
    #[error("Data '{name}' holds {found} where {expected} was expected")]
    DataType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Malformed SVO line {line} in '{path}': {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Arithmetic failure: {reason}")]
    Arithmetic { reason: String },

    #[error(
        "Context count {count} exceeds the configured cap of {cap}; \
         raise limits.max_contexts or tighten the preprocessing filters"
    )]
    ContextCap { count: usize, cap: usize },

    #[error("Inconsistent cache entry '{path}': {reason}")]
    Cache { path: PathBuf, reason: String },

    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stage was constructed with a parameter outside its domain.
    #[error("Invalid stage parameter: {reason}")]
    StageConfig { reason: String },
}

impl PipelineError {
    /// Stable taxonomy tag for logs and pair failure reports.
    pub fn taxonomy(&self) -> &'static str {
        match self {
            Self::MissingFile { .. }
            | Self::MissingData { .. }
            | Self::DataAbsent { .. }
            | Self::FileAbsent { .. }
            | Self::DataType { .. } => "dependency",
            Self::Parse { .. } => "parse",
            Self::Arithmetic { .. } => "arithmetic",
            Self::ContextCap { .. } => "resource",
            Self::Cache { .. } => "cache",
            Self::FileRead { .. } | Self::FileWrite { .. } => "io",
            Self::StageConfig { .. } => "config",
        }
    }
}

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias for pipeline execution.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_tags_are_stable() {
        let e = PipelineError::MissingFile {
            stage: "Svo_to_memory".into(),
            name: "svo".into(),
        };
        assert_eq!(e.taxonomy(), "dependency");

        let e = PipelineError::Parse {
            path: PathBuf::from("corpus.svo"),
            line: 7,
            reason: "expected 4 tab-separated fields, found 3".into(),
        };
        assert_eq!(e.taxonomy(), "parse");
        assert!(e.to_string().contains("line 7"));

        let e = PipelineError::ContextCap {
            count: 30_000,
            cap: 20_000,
        };
        assert_eq!(e.taxonomy(), "resource");
    }
}
