//! Per-user metric computation over the two exclusive corpus subgraphs.
//!
//! The engine computes one suite of node metrics per subgraph, plus the
//! cross-corpus counts over the full follow graph, and folds everything into
//! a single [`FeatureTable`]. Every metric is computed as a tagged
//! [`MetricOutcome`]: a failing metric is recorded and its column omitted
//! while the remaining metrics still run.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithms::betweenness::{betweenness_centrality, BetweennessConfig};
use crate::algorithms::clustering::{approximate_average_clustering, average_undirected_clustering, directed_clustering};
use crate::algorithms::cross_corpus::{count_cross_corpus, CrossCorpusCounts, PREDS_IN_OTHER, SUCCESSORS_IN_OTHER};
use crate::algorithms::degree::{
    degree_centrality, in_degree, in_degree_centrality, out_degree, out_degree_centrality,
};
use crate::algorithms::neighborhood::{neighborhood_for_user, NeighborhoodKind};
use crate::algorithms::partition::Partition;
use crate::algorithms::reciprocity::{node_reciprocity, overall_reciprocity};
use crate::algorithms::summary::{summarize, GraphSummary};
use crate::algorithms::triads::{triadic_census, TriadCensus};
use crate::config::{CorpusConfig, MetricsConfig};
use crate::error::{Failure, MetricError, Result};
use crate::table::{FeatureTable, MetricColumn};
use crate::types::graph_query::{Direction, GraphQuery};
use crate::types::{Corpus, CorpusSubGraph, FollowGraph};
use crate::util::progress_bar;

/// A node-level metric computed on each exclusive subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeMetric {
    Clustering,
    InDegree,
    OutDegree,
    DegreeCentrality,
    InDegreeCentrality,
    OutDegreeCentrality,
    Betweenness,
    Reciprocity,
    OutNhop,
    InNhop,
    OutNhopBfs,
    InNhopBfs,
}

impl NodeMetric {
    /// Column name before the corpus prefix is attached.
    pub fn column(self) -> &'static str {
        match self {
            NodeMetric::Clustering => "clustering",
            NodeMetric::InDegree => "in_deg",
            NodeMetric::OutDegree => "out_deg",
            NodeMetric::DegreeCentrality => "deg_central",
            NodeMetric::InDegreeCentrality => "in_deg_central",
            NodeMetric::OutDegreeCentrality => "out_deg_central",
            NodeMetric::Betweenness => "bet_central",
            NodeMetric::Reciprocity => "reciprocity",
            NodeMetric::OutNhop => "out_2hop",
            NodeMetric::InNhop => "in_2hop",
            NodeMetric::OutNhopBfs => "out_2hop_bfs",
            NodeMetric::InNhopBfs => "in_2hop_bfs",
        }
    }

    /// The metrics computed per subgraph, in column order.
    pub fn suite(bfs_neighborhood: bool) -> Vec<NodeMetric> {
        let mut suite = vec![
            NodeMetric::Clustering,
            NodeMetric::InDegree,
            NodeMetric::OutDegree,
            NodeMetric::DegreeCentrality,
            NodeMetric::InDegreeCentrality,
            NodeMetric::OutDegreeCentrality,
            NodeMetric::Betweenness,
            NodeMetric::Reciprocity,
            NodeMetric::OutNhop,
            NodeMetric::InNhop,
        ];
        if bfs_neighborhood {
            suite.push(NodeMetric::OutNhopBfs);
            suite.push(NodeMetric::InNhopBfs);
        }
        suite
    }
}

/// Result of computing one metric on one subgraph.
#[derive(Debug, Clone)]
pub enum MetricOutcome {
    /// The column was produced. `failures` lists users whose cell stayed null.
    Computed {
        column: MetricColumn,
        failures: Vec<Failure>,
    },
    /// The whole metric failed; no column is emitted.
    Failed(Failure),
}

/// Average clustering of the undirected projection, with how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageClustering {
    pub value: f64,
    /// Number of sampling trials, `None` for the exact computation
    pub trials: Option<usize>,
}

/// Whole-subgraph statistics written to the metrics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubgraphReport {
    pub summary: GraphSummary,
    pub average_clustering: Option<AverageClustering>,
    pub overall_reciprocity: Option<f64>,
    pub triad_census: Option<TriadCensus>,
}

/// Everything the metrics stage produces.
#[derive(Debug, Clone)]
pub struct MetricsRun {
    pub table: FeatureTable,
    pub reports: Vec<SubgraphReport>,
    pub failures: Vec<Failure>,
}

/// Computes node metrics and subgraph statistics.
///
/// # Fields
///
/// * `config` - Metric parameters (n-hop cutoff, clustering sampling, threads)
/// * `corpora` - Column prefixes and subgraph names of the two corpora
/// * `show_progress` - Draw a progress bar over the per-node loops
pub struct MetricsEngine {
    config: MetricsConfig,
    corpora: CorpusConfig,
    show_progress: bool,
}

impl MetricsEngine {
    pub fn new(config: MetricsConfig, corpora: CorpusConfig) -> Self {
        Self {
            config,
            corpora,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Runs the whole metrics stage.
    ///
    /// # Implementation Details
    ///
    /// 1. Seeds the table with one row per exclusively labeled user of `graph`
    /// 2. Joins the cross-corpus counts computed on the full graph
    /// 3. For corpus A then B, computes the node metric suite on its subgraph
    ///    and joins each successful column under the corpus prefix
    /// 4. Collects the subgraph statistics for the metrics report
    ///
    /// # Errors
    ///
    /// Only table merge errors are fatal; metric failures are returned in
    /// [`MetricsRun::failures`].
    pub fn run(&self, graph: &FollowGraph, partition: &Partition) -> Result<MetricsRun> {
        let mut failures = Vec::new();

        let mut table = FeatureTable::from_rows(graph.vertex_list().into_iter().filter_map(|vertex| {
            graph
                .corpus(vertex)
                .filter(|corpus| corpus.is_exclusive())
                .map(|corpus| (graph.user_id(vertex).to_string(), corpus))
        }));
        info!("Feature table seeded with {} exclusive users", table.len());

        let cross = count_cross_corpus(graph);
        let (preds, successors) = cross_columns(&cross);
        table = table.left_join(&preds)?.left_join(&successors)?;
        failures.extend(cross.failures);

        let mut reports = Vec::new();
        for corpus in [Corpus::A, Corpus::B] {
            let Some(subgraph) = partition.subgraph(corpus) else {
                continue;
            };
            let prefix = self.corpora.spec(corpus).map(|spec| spec.prefix.as_str()).unwrap_or_default();
            let members: Vec<String> = graph
                .vertices_with_corpus(corpus)
                .into_iter()
                .map(|vertex| graph.user_id(vertex).to_string())
                .collect();

            info!("Computing node metrics for {} ({} vertices)", subgraph.name, subgraph.vertex_count());
            for metric in NodeMetric::suite(self.config.bfs_neighborhood) {
                match self.compute(metric, subgraph, &members) {
                    MetricOutcome::Computed {
                        mut column,
                        failures: node_failures,
                    } => {
                        column.name = format!("{}{}", prefix, column.name);
                        debug!("{}: {} values", column.name, column.len());
                        table = table.left_join(&column)?;
                        failures.extend(node_failures);
                    }
                    MetricOutcome::Failed(failure) => {
                        warn!("Metric {} failed on {}: {:?}", metric.column(), subgraph.name, failure);
                        failures.push(failure);
                    }
                }
            }

            let (report, report_failures) = self.subgraph_report(subgraph);
            failures.extend(report_failures);
            reports.push(report);
        }

        info!(
            "Feature table has {} rows and {} columns ({} failures)",
            table.len(),
            table.columns().len(),
            failures.len()
        );
        Ok(MetricsRun {
            table,
            reports,
            failures,
        })
    }

    /// Computes one node metric on `subgraph`.
    ///
    /// # Arguments
    ///
    /// * `metric` - Which metric to compute
    /// * `subgraph` - Exclusive corpus subgraph the metric runs on
    /// * `members` - Users labeled with the subgraph's corpus in the full
    ///   graph; the n-hop counters look each of them up in `subgraph`
    pub fn compute(&self, metric: NodeMetric, subgraph: &CorpusSubGraph, members: &[String]) -> MetricOutcome {
        let name = metric.column();
        if subgraph.vertex_count() == 0 {
            return MetricOutcome::Failed(Failure::metric(name, &subgraph.name, &MetricError::EmptyGraph));
        }
        let computed = |column: MetricColumn| MetricOutcome::Computed {
            column,
            failures: Vec::new(),
        };

        match metric {
            NodeMetric::Clustering => computed(dense_column(name, subgraph, directed_clustering(subgraph))),
            NodeMetric::InDegree => computed(dense_column(name, subgraph, in_degree(subgraph))),
            NodeMetric::OutDegree => computed(dense_column(name, subgraph, out_degree(subgraph))),
            NodeMetric::DegreeCentrality => computed(dense_column(name, subgraph, degree_centrality(subgraph))),
            NodeMetric::InDegreeCentrality => computed(dense_column(name, subgraph, in_degree_centrality(subgraph))),
            NodeMetric::OutDegreeCentrality => {
                computed(dense_column(name, subgraph, out_degree_centrality(subgraph)))
            }
            NodeMetric::Betweenness => {
                if self.config.legacy_betweenness_quirk && subgraph.corpus == Corpus::B {
                    warn!(
                        "legacy_betweenness_quirk is set: {} of {} holds degree centrality",
                        name, subgraph.name
                    );
                    return computed(dense_column(name, subgraph, degree_centrality(subgraph)));
                }
                let config = BetweennessConfig {
                    thread_num: self.config.thread_num,
                    normalized: true,
                };
                match betweenness_centrality(subgraph, &config) {
                    Ok(scores) => computed(dense_column(name, subgraph, scores)),
                    Err(e) => MetricOutcome::Failed(Failure::metric(name, &subgraph.name, &e)),
                }
            }
            NodeMetric::Reciprocity => {
                computed(MetricColumn::from_vertex_values(name, subgraph, node_reciprocity(subgraph)))
            }
            NodeMetric::OutNhop => self.neighborhood(name, subgraph, members, Direction::Outbound, NeighborhoodKind::Legacy),
            NodeMetric::InNhop => self.neighborhood(name, subgraph, members, Direction::Inbound, NeighborhoodKind::Legacy),
            NodeMetric::OutNhopBfs => self.neighborhood(name, subgraph, members, Direction::Outbound, NeighborhoodKind::Bfs),
            NodeMetric::InNhopBfs => self.neighborhood(name, subgraph, members, Direction::Inbound, NeighborhoodKind::Bfs),
        }
    }

    fn neighborhood(
        &self,
        name: &str,
        subgraph: &CorpusSubGraph,
        members: &[String],
        direction: Direction,
        kind: NeighborhoodKind,
    ) -> MetricOutcome {
        let mut column = MetricColumn::new(name);
        let mut failures = Vec::new();
        let pb = progress_bar(
            members.len() as u64,
            &format!("{} {}", subgraph.name, name),
            self.show_progress,
        );
        for user_id in members {
            match neighborhood_for_user(subgraph, user_id, self.config.nhop_cutoff, direction, kind) {
                Ok(count) => column.insert(user_id.as_str(), count),
                Err(failure) => {
                    warn!("Skipping {} for user {}: not in {}", name, user_id, subgraph.name);
                    failures.push(failure);
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        MetricOutcome::Computed { column, failures }
    }

    /// Whole-subgraph statistics. Statistics that cannot be computed are left
    /// out of the report and returned as failures.
    pub fn subgraph_report(&self, subgraph: &CorpusSubGraph) -> (SubgraphReport, Vec<Failure>) {
        let mut failures = Vec::new();

        let clustering = match self.config.clustering_trials {
            Some(trials) => approximate_average_clustering(subgraph, trials, self.config.clustering_seed)
                .map(|value| AverageClustering {
                    value,
                    trials: Some(trials),
                }),
            None => average_undirected_clustering(subgraph).map(|value| AverageClustering { value, trials: None }),
        };
        let average_clustering = match clustering {
            Ok(clustering) => Some(clustering),
            Err(e) => {
                warn!("Average clustering failed on {}: {}", subgraph.name, e);
                failures.push(Failure::metric("average_clustering", &subgraph.name, &e));
                None
            }
        };

        let overall = match overall_reciprocity(subgraph) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Overall reciprocity failed on {}: {}", subgraph.name, e);
                failures.push(Failure::metric("overall_reciprocity", &subgraph.name, &e));
                None
            }
        };

        let triad_census = self.config.triad_census.then(|| triadic_census(subgraph));

        let report = SubgraphReport {
            summary: summarize(subgraph, &subgraph.name),
            average_clustering,
            overall_reciprocity: overall,
            triad_census,
        };
        (report, failures)
    }
}

/// Column over every vertex of `graph`, one value per vertex.
fn dense_column<G, T>(name: &str, graph: &G, values: Vec<T>) -> MetricColumn
where
    G: GraphQuery,
    T: Into<crate::table::Value>,
{
    MetricColumn::from_vertex_values(name, graph, values.into_iter().map(Some).collect())
}

fn cross_columns(cross: &CrossCorpusCounts) -> (MetricColumn, MetricColumn) {
    let mut preds = MetricColumn::new(PREDS_IN_OTHER);
    let mut successors = MetricColumn::new(SUCCESSORS_IN_OTHER);
    for (user_id, counts) in cross.counts.iter() {
        preds.insert(user_id.as_str(), counts.preds_in_other);
        successors.insert(user_id.as_str(), counts.successors_in_other);
    }
    (preds, successors)
}
