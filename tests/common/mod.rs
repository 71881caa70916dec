//! Shared fixtures for the pipeline integration tests

#![allow(dead_code)] // Not every test file uses every fixture

use std::fs;
use std::path::{Path, PathBuf};

use follow_metrics::config::PipelineConfig;
use tempfile::TempDir;

/// A throwaway data directory laid out like the production one.
pub struct Workspace {
    pub dir: TempDir,
    pub config: PipelineConfig,
}

impl Workspace {
    /// Creates an empty workspace whose config points every path inside it.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = dir.path();
        let mut config = PipelineConfig::default();
        config.paths.edge_list_dir = root.join("processed/user_following");
        config.paths.profile_table = root.join("processed/user_profiles.json");
        config.paths.graph_snapshot = root.join("processed/follow_graph.bin");
        config.paths.node_attributes = root.join("processed/user_attributes.json");
        config.paths.feature_table_snapshot = root.join("processed/network_metrics_by_user.bin");
        config.paths.metrics_report = root.join("processed/network_metrics.txt");
        config.paths.run_report = root.join("processed/run_report.yaml");
        config.paths.final_dir = root.join("final");
        config.paths.log_dir = root.join("logs");
        config.show_progress = false;
        Self { dir, config }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes one edge-list file named `name` into the edge-list directory.
    pub fn write_edges(&self, name: &str, content: &str) -> PathBuf {
        fs::create_dir_all(&self.config.paths.edge_list_dir).expect("create edge dir");
        let path = self.config.paths.edge_list_dir.join(name);
        fs::write(&path, content).expect("write edge file");
        path
    }

    /// Writes the profile table from `(user, corpus label)` pairs.
    pub fn write_profiles(&self, labels: &[(&str, &str)]) {
        let records: Vec<serde_json::Value> = labels
            .iter()
            .map(|(user, corpus)| {
                serde_json::json!({
                    "id_str": user,
                    "corpus": corpus,
                    "followers_count": 10,
                    "status_count": 5,
                    "screen_name": format!("user_{}", user),
                    "years_old": 2.5,
                    "verified": 0,
                })
            })
            .collect();
        let path = &self.config.paths.profile_table;
        fs::create_dir_all(path.parent().expect("profile dir")).expect("create profile dir");
        fs::write(path, serde_json::to_string(&records).expect("encode profiles")).expect("write profiles");
    }

    /// Writes the four-user scenario: 1, 2 in corpus A and 3, 4 in corpus B
    /// with edges 1->2, 2->1, 2->3, 3->4.
    pub fn write_four_node_scenario(&self) {
        self.write_edges("part_000.txt", "1 2\n2 1 3\n");
        self.write_edges("part_001.txt", "3 4\n");
        self.write_profiles(&[("1", "a"), ("2", "a"), ("3", "b"), ("4", "b")]);
    }

    /// Parsed final table of the corpus with `label`.
    pub fn read_final(&self, label: &str) -> Vec<serde_json::Value> {
        let path = self
            .config
            .paths
            .final_dir
            .join(format!("{}_exclusive_users_metrics.json", label));
        let text = fs::read_to_string(path).expect("read final table");
        serde_json::from_str(&text).expect("parse final table")
    }
}

/// Column names of a JSON record, sorted.
pub fn record_keys(record: &serde_json::Value) -> Vec<String> {
    let mut keys: Vec<String> = record.as_object().expect("record object").keys().cloned().collect();
    keys.sort();
    keys
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
