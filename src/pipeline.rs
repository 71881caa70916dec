//! Stage orchestration.
//!
//! Each stage reads its input from the previous stage's snapshot (or from
//! memory when running `all`) and writes its own output at the stage
//! boundary. Recoverable failures of every stage are gathered into a single
//! [`RunReport`].

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::algorithms::partition::partition;
use crate::config::{PipelineConfig, READ_BUFFER_SIZE};
use crate::error::{PipelineError, Result};
use crate::finalize::finalize;
use crate::graph_builder::{build_follow_graph, write_node_attributes};
use crate::measure_stage;
use crate::metrics_engine::{MetricsEngine, NodeMetric};
use crate::report::{append_metrics_report, RunReport};
use crate::table::FeatureTable;
use crate::types::FollowGraph;

/// Which part of the pipeline to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Task {
    /// Every stage, in memory, writing all snapshots and outputs
    All,
    /// Build the follow graph and write its snapshot
    Graph,
    /// Compute metrics from the graph snapshot
    Metrics,
    /// Split the feature table snapshot into the final tables
    Finalize,
}

impl Task {
    pub fn name(self) -> &'static str {
        match self {
            Task::All => "all",
            Task::Graph => "graph",
            Task::Metrics => "metrics",
            Task::Finalize => "finalize",
        }
    }
}

/// Writes `value` to `path` as a bincode snapshot.
pub fn save_snapshot<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, value).map_err(|e| PipelineError::Snapshot {
        path: path.to_path_buf(),
        source: e,
    })?;
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    info!("Snapshot written to {}", path.display());
    Ok(())
}

/// Reads a bincode snapshot written by [`save_snapshot`].
///
/// # Errors
///
/// [`PipelineError::MissingInput`] when the snapshot does not exist, so a
/// stage run out of order reports which earlier stage is missing.
pub fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let value = bincode::deserialize_from(BufReader::with_capacity(READ_BUFFER_SIZE, file)).map_err(|e| {
        PipelineError::Snapshot {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    info!("Snapshot loaded from {}", path.display());
    Ok(value)
}

/// Runs pipeline tasks under one configuration.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs `task` and writes the run report.
    ///
    /// The run report is written even when a stage fails, so failures
    /// collected before the fatal error are not lost.
    pub fn run(&self, task: Task) -> Result<RunReport> {
        info!("Starting task {}", task.name());
        let mut report = RunReport::new(task.name());
        let outcome = self.run_stages(task, &mut report);
        report.write_yaml(&self.config.paths.run_report)?;
        outcome?;
        if !report.failures.is_empty() {
            warn!(
                "Task {} finished with {} recoverable failures, see {}",
                task.name(),
                report.failures.len(),
                self.config.paths.run_report.display()
            );
        }
        info!("Task {} done", task.name());
        Ok(report)
    }

    fn run_stages(&self, task: Task, report: &mut RunReport) -> Result<()> {
        match task {
            Task::Graph => {
                self.graph_stage(report)?;
            }
            Task::Metrics => {
                let graph: FollowGraph = load_snapshot(&self.config.paths.graph_snapshot)?;
                self.metrics_stage(&graph, task, report)?;
            }
            Task::Finalize => {
                let table: FeatureTable = load_snapshot(&self.config.paths.feature_table_snapshot)?;
                self.finalize_stage(&table)?;
            }
            Task::All => {
                let graph = self.graph_stage(report)?;
                let table = self.metrics_stage(&graph, task, report)?;
                self.finalize_stage(&table)?;
            }
        }
        Ok(())
    }

    /// Builds the follow graph and writes its snapshot and node attributes.
    pub fn graph_stage(&self, report: &mut RunReport) -> Result<FollowGraph> {
        let paths = &self.config.paths;
        let (graph, failures) = measure_stage!("graph", {
            build_follow_graph(
                &paths.edge_list_dir,
                &paths.profile_table,
                &self.config.corpora,
                self.config.builder.restrict_to_profiled,
                self.config.show_progress,
            )
        })?;
        report.extend(failures);
        save_snapshot(&paths.graph_snapshot, &graph)?;
        write_node_attributes(&graph, &paths.node_attributes)?;
        Ok(graph)
    }

    /// Partitions the graph, computes the feature table, appends the metrics
    /// report section and writes the table snapshot.
    pub fn metrics_stage(&self, graph: &FollowGraph, task: Task, report: &mut RunReport) -> Result<FeatureTable> {
        let paths = &self.config.paths;
        let run = measure_stage!("metrics", {
            let partition = partition(graph, &self.config.corpora);
            MetricsEngine::new(self.config.metrics.clone(), self.config.corpora.clone())
                .with_progress(self.config.show_progress)
                .run(graph, &partition)
        })?;
        report.extend(run.failures);
        append_metrics_report(&paths.metrics_report, task.name(), &run.reports)?;
        save_snapshot(&paths.feature_table_snapshot, &run.table)?;
        Ok(run.table)
    }

    /// Writes the two final per-corpus tables.
    pub fn finalize_stage(&self, table: &FeatureTable) -> Result<Vec<PathBuf>> {
        let metric_columns: Vec<&str> = NodeMetric::suite(self.config.metrics.bfs_neighborhood)
            .into_iter()
            .map(NodeMetric::column)
            .collect();
        let (a, b) = measure_stage!("finalize", { finalize(table, &self.config.corpora, &metric_columns) })?;
        let final_dir = &self.config.paths.final_dir;
        Ok(vec![a.write_json(final_dir)?, b.write_json(final_dir)?])
    }
}
