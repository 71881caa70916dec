//! Human-readable metrics report and machine-readable run report.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Failure, PipelineError, Result};
use crate::metrics_engine::{AverageClustering, SubgraphReport};
use crate::util::{generate_timestamp_us, report_timestamp};

/// Renders one metrics-report section.
///
/// # Arguments
///
/// * `task` - Name of the task that produced the section, shown in the header
/// * `timestamp` - Wall-clock time shown in the header
/// * `reports` - One entry per exclusive subgraph
pub fn render_metrics_section(task: &str, timestamp: &str, reports: &[SubgraphReport]) -> String {
    let separator = format!("{}\n\n", "#".repeat(78));
    let mut text = separator.clone();
    text.push_str(&format!("Metrics added {} from {}\n\n", timestamp, task));
    text.push_str(&separator);

    for report in reports {
        let summary = &report.summary;
        text.push_str(&format!(
            "Name: {}\nType: DiGraph\nNumber of nodes: {}\nNumber of edges: {}\n\
             Average in degree: {:>8.4}\nAverage out degree: {:>8.4}\n\n",
            summary.name, summary.nodes, summary.edges, summary.avg_in_degree, summary.avg_out_degree
        ));
    }
    for report in reports {
        let name = &report.summary.name;
        let line = match &report.average_clustering {
            Some(AverageClustering {
                value,
                trials: Some(trials),
            }) => format!("{} average cluster coeff (approximate, {} trials): {}", name, trials, value),
            Some(AverageClustering { value, trials: None }) => format!("{} average cluster coeff: {}", name, value),
            None => format!("{} average cluster coeff: n/a", name),
        };
        text.push_str(&line);
        text.push_str("\n\n");
    }
    for report in reports {
        text.push_str(&format!("{} Density: {}\n\n", report.summary.name, report.summary.density));
    }
    for report in reports {
        let value = report
            .overall_reciprocity
            .map_or_else(|| "n/a".to_string(), |value| value.to_string());
        text.push_str(&format!("{} overall reciprocity: {}\n\n", report.summary.name, value));
    }
    for report in reports {
        let Some(census) = &report.triad_census else {
            continue;
        };
        text.push_str(&format!("{} Triadic Census:\n", report.summary.name));
        for (triad, count) in census.iter() {
            text.push_str(&format!("{} : {}\n", triad, count));
        }
        text.push_str("\n\n");
    }
    text
}

/// Appends a metrics-report section to `path`, creating the file and its
/// parent directory if needed. Earlier sections are never rewritten.
pub fn append_metrics_report(path: &Path, task: &str, reports: &[SubgraphReport]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let section = render_metrics_section(task, &report_timestamp(), reports);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipelineError::io(path, e))?;
    file.write_all(section.as_bytes()).map_err(|e| PipelineError::io(path, e))?;
    info!("Appended metrics for {} subgraphs to {}", reports.len(), path.display());
    Ok(())
}

/// Structured record of one pipeline run.
///
/// # Fields
///
/// * `run_id` - Microsecond timestamp taken when the run started
/// * `task` - Task that was executed
/// * `started_at` - Human readable start time
/// * `failure_counts` - Number of failures per failure kind
/// * `failures` - Every recoverable failure, in the order it was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: u64,
    pub task: String,
    pub started_at: String,
    pub failure_counts: FxHashMap<String, usize>,
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub fn new(task: &str) -> Self {
        Self {
            run_id: generate_timestamp_us(),
            task: task.to_string(),
            started_at: report_timestamp(),
            failure_counts: FxHashMap::default(),
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, failure: Failure) {
        *self.failure_counts.entry(failure.kind().to_string()).or_insert(0) += 1;
        self.failures.push(failure);
    }

    pub fn extend(&mut self, failures: impl IntoIterator<Item = Failure>) {
        for failure in failures {
            self.record(failure);
        }
    }

    pub fn count(&self, kind: &str) -> usize {
        self.failure_counts.get(kind).copied().unwrap_or(0)
    }

    /// Overwrites `path` with this report as YAML.
    pub fn write_yaml(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).map_err(|e| PipelineError::io(path, e))?;
        info!(
            "Run report with {} failures written to {}",
            self.failures.len(),
            path.display()
        );
        Ok(())
    }
}
