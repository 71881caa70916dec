//! Error types for the follow-metrics pipeline.
//!
//! Two families live here. [`PipelineError`] is fatal: it is raised when a
//! stage cannot read or write one of its inputs/outputs and is propagated to
//! the binary, which exits non-zero. [`Failure`] is recoverable: a single node,
//! record or metric could not be computed, the affected cell stays null, and
//! the failure is collected into the run report.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors raised at stage boundaries.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// IO errors, tagged with the path that was being accessed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required input file or directory does not exist
    #[error("Missing required input: {0}")]
    MissingInput(PathBuf),

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Config(String),

    /// YAML (de)serialization of config or run report failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization of profiles or final tables failed
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Stage snapshot could not be encoded or decoded
    #[error("Snapshot error in {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    /// A column was joined twice into the feature table
    #[error("Column {0} already exists in the feature table")]
    DuplicateColumn(String),

    /// The two final tables ended up with different column sets
    #[error("Final tables disagree on columns: only in first {only_first:?}, only in second {only_second:?}")]
    SchemaMismatch {
        only_first: Vec<String>,
        only_second: Vec<String>,
    },
}

impl PipelineError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Reasons a single metric could not be produced for a subgraph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    #[error("graph has no vertices")]
    EmptyGraph,

    #[error("graph has no edges")]
    NoEdges,

    #[error("thread pool could not be built: {0}")]
    ThreadPool(String),
}

/// A recoverable failure, recorded in the run report instead of aborting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// A node has no (or incomplete) profile data and received defaults.
    AttributionGap { user: String, detail: String },

    /// A whole metric failed for one subgraph; its column is omitted.
    MetricComputation {
        metric: String,
        subgraph: String,
        reason: String,
    },

    /// A per-node computation referenced a node it could not resolve.
    NodeLookup { user: String, context: String },

    /// An edge-list line could not be parsed and was skipped.
    MalformedRecord {
        file: String,
        line: usize,
        reason: String,
    },
}

impl Failure {
    pub fn metric(metric: &str, subgraph: &str, error: &MetricError) -> Self {
        Failure::MetricComputation {
            metric: metric.to_string(),
            subgraph: subgraph.to_string(),
            reason: error.to_string(),
        }
    }

    /// Short label used when summarizing failures by kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::AttributionGap { .. } => "attribution_gap",
            Failure::MetricComputation { .. } => "metric_computation",
            Failure::NodeLookup { .. } => "node_lookup",
            Failure::MalformedRecord { .. } => "malformed_record",
        }
    }
}

#[cfg(test)]
mod test_error {
    use super::*;

    #[test]
    fn test_failure_kind_labels() {
        let gap = Failure::AttributionGap {
            user: "7".to_string(),
            detail: "no profile".to_string(),
        };
        assert_eq!(gap.kind(), "attribution_gap");

        let metric = Failure::metric("overall_reciprocity", "B (exclusive) Graph", &MetricError::NoEdges);
        assert_eq!(metric.kind(), "metric_computation");
        match metric {
            Failure::MetricComputation { reason, .. } => assert_eq!(reason, "graph has no edges"),
            other => panic!("unexpected failure {:?}", other),
        }
    }

    #[test]
    fn test_failure_yaml_is_tagged() {
        let failure = Failure::NodeLookup {
            user: "42".to_string(),
            context: "out_2hop".to_string(),
        };
        let yaml = serde_yaml::to_string(&failure).unwrap();
        assert!(yaml.contains("kind: node_lookup"));
        assert!(yaml.contains("context: out_2hop"));
        let decoded: Failure = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(decoded, failure);
    }
}
