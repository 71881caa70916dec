//! Pipeline configuration.
//!
//! Every field has a default so a missing config file yields the fixed-path
//! batch layout. The YAML file only needs to name the values it overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::types::Corpus;

/// Buffer size used for every buffered reader over edge-list files.
pub const READ_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Default config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "follow_metrics.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathConfig,
    pub corpora: CorpusConfig,
    pub builder: BuilderConfig,
    pub metrics: MetricsConfig,
    /// Draw indicatif progress bars for long loops.
    pub show_progress: bool,
}

/// Fixed input/output locations of each stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub edge_list_dir: PathBuf,
    pub profile_table: PathBuf,
    pub graph_snapshot: PathBuf,
    /// String-rendered node attributes written next to the graph snapshot.
    pub node_attributes: PathBuf,
    pub feature_table_snapshot: PathBuf,
    pub metrics_report: PathBuf,
    pub run_report: PathBuf,
    pub final_dir: PathBuf,
    pub log_dir: PathBuf,
}

/// Label and column prefix of one exclusive corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSpec {
    /// Value of the profile `corpus` field that selects this corpus.
    pub label: String,
    /// Prefix attached to every metric column computed on this corpus.
    pub prefix: String,
    /// Human readable subgraph name used in logs and the metrics report.
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub a: CorpusSpec,
    pub b: CorpusSpec,
    pub both_label: String,
    pub neither_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Drop every node that has no profile record instead of defaulting it.
    pub restrict_to_profiled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Hop bound of the neighborhood counters.
    pub nhop_cutoff: usize,
    /// Also emit the breadth-first neighborhood size columns.
    pub bfs_neighborhood: bool,
    /// Sample this many node/neighbor-pair trials for the average clustering
    /// coefficient instead of computing it exactly.
    pub clustering_trials: Option<usize>,
    pub clustering_seed: u64,
    /// Worker threads for betweenness centrality.
    pub thread_num: usize,
    /// Reproduce the historical output where corpus B's betweenness column
    /// held degree centrality.
    pub legacy_betweenness_quirk: bool,
    pub triad_census: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            paths: PathConfig::default(),
            corpora: CorpusConfig::default(),
            builder: BuilderConfig::default(),
            metrics: MetricsConfig::default(),
            show_progress: true,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            edge_list_dir: PathBuf::from("data/processed/user_following"),
            profile_table: PathBuf::from("data/processed/user_profiles.json"),
            graph_snapshot: PathBuf::from("data/processed/follow_graph.bin"),
            node_attributes: PathBuf::from("data/processed/user_attributes.json"),
            feature_table_snapshot: PathBuf::from("data/processed/network_metrics_by_user.bin"),
            metrics_report: PathBuf::from("data/processed/network_metrics.txt"),
            run_report: PathBuf::from("data/processed/run_report.yaml"),
            final_dir: PathBuf::from("data/final"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            a: CorpusSpec {
                label: "a".to_string(),
                prefix: "a_".to_string(),
                name: "A (exclusive) Graph".to_string(),
            },
            b: CorpusSpec {
                label: "b".to_string(),
                prefix: "b_".to_string(),
                name: "B (exclusive) Graph".to_string(),
            },
            both_label: "both".to_string(),
            neither_label: "neither".to_string(),
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            restrict_to_profiled: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            nhop_cutoff: 2,
            bfs_neighborhood: false,
            clustering_trials: None,
            clustering_seed: 115,
            thread_num: 1,
            legacy_betweenness_quirk: false,
            triad_census: true,
        }
    }
}

impl CorpusConfig {
    /// Maps a raw profile label onto a [`Corpus`]; `None` for unknown labels.
    pub fn parse_label(&self, raw: &str) -> Option<Corpus> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case(&self.a.label) {
            Some(Corpus::A)
        } else if raw.eq_ignore_ascii_case(&self.b.label) {
            Some(Corpus::B)
        } else if raw.eq_ignore_ascii_case(&self.both_label) {
            Some(Corpus::Both)
        } else if raw.eq_ignore_ascii_case(&self.neither_label) {
            Some(Corpus::Neither)
        } else {
            None
        }
    }

    /// Label and prefix of an exclusive corpus. `Both` and `Neither` have none.
    pub fn spec(&self, corpus: Corpus) -> Option<&CorpusSpec> {
        match corpus {
            Corpus::A => Some(&self.a),
            Corpus::B => Some(&self.b),
            Corpus::Both | Corpus::Neither => None,
        }
    }
}

impl PipelineConfig {
    /// Reads the YAML config at `path`.
    ///
    /// # Returns
    ///
    /// `None` when the file does not exist. The config is not validated, so
    /// command-line overrides can be applied before [`Self::validate`].
    pub fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let config: PipelineConfig = serde_yaml::from_str(&text)?;
        Ok(Some(config))
    }

    pub fn validate(&self) -> Result<()> {
        let a = &self.corpora.a;
        let b = &self.corpora.b;
        if a.prefix.is_empty() || b.prefix.is_empty() {
            return Err(PipelineError::Config("corpus prefixes must not be empty".to_string()));
        }
        // Column ownership is decided by prefix, so neither may shadow the other.
        if a.prefix.starts_with(&b.prefix) || b.prefix.starts_with(&a.prefix) {
            return Err(PipelineError::Config(format!(
                "corpus prefixes {:?} and {:?} overlap",
                a.prefix, b.prefix
            )));
        }
        let labels = [&a.label, &b.label, &self.corpora.both_label, &self.corpora.neither_label];
        for (i, left) in labels.iter().enumerate() {
            for right in labels.iter().skip(i + 1) {
                if left.eq_ignore_ascii_case(right) {
                    return Err(PipelineError::Config(format!("corpus label {:?} is used twice", left)));
                }
            }
        }
        if self.metrics.thread_num == 0 {
            return Err(PipelineError::Config("metrics.thread_num must be at least 1".to_string()));
        }
        if self.metrics.clustering_trials == Some(0) {
            return Err(PipelineError::Config("metrics.clustering_trials must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_config {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.metrics.nhop_cutoff, 2);
        assert_eq!(config.metrics.clustering_seed, 115);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "metrics:\n  thread_num: 4\ncorpora:\n  a:\n    label: latinx\n    prefix: l_\n    name: Latinx\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.metrics.thread_num, 4);
        assert_eq!(config.metrics.nhop_cutoff, 2);
        assert_eq!(config.corpora.a.prefix, "l_");
        assert_eq!(config.corpora.b.prefix, "b_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlapping_prefixes_rejected() {
        let mut config = PipelineConfig::default();
        config.corpora.b.prefix = "a_x_".to_string();
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_parse_label() {
        let corpora = CorpusConfig::default();
        assert_eq!(corpora.parse_label(" A "), Some(Corpus::A));
        assert_eq!(corpora.parse_label("both"), Some(Corpus::Both));
        assert_eq!(corpora.parse_label("Neither"), Some(Corpus::Neither));
        assert_eq!(corpora.parse_label("c"), None);
    }

    #[test]
    fn test_read_missing_file() {
        assert_eq!(PipelineConfig::read(Path::new("/definitely/not/here.yaml")).unwrap(), None);
    }

    #[test]
    fn test_read_does_not_validate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("follow_metrics.yaml");
        std::fs::write(&path, "metrics:\n  thread_num: 0\n").unwrap();
        let mut config = PipelineConfig::read(&path).unwrap().unwrap();
        assert!(config.validate().is_err());
        config.metrics.thread_num = 2;
        assert!(config.validate().is_ok());
    }
}
