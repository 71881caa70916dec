use serde::{Deserialize, Serialize};

use crate::types::graph_query::GraphQuery;

/// Whole-graph statistics written to the metrics report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub name: String,
    pub nodes: usize,
    pub edges: usize,
    pub avg_in_degree: f64,
    pub avg_out_degree: f64,
    pub density: f64,
}

/// Directed density `m / (n (n - 1))`, 0 for graphs with at most one vertex.
pub fn density<G: GraphQuery>(graph: &G) -> f64 {
    let n = graph.vertex_count();
    if n <= 1 {
        return 0.0;
    }
    graph.edge_count() as f64 / (n as f64 * (n as f64 - 1.0))
}

/// Summarizes `graph` under `name`. Average degrees are 0 for an empty graph.
pub fn summarize<G: GraphQuery>(graph: &G, name: &str) -> GraphSummary {
    let nodes = graph.vertex_count();
    let edges = graph.edge_count();
    // Every edge adds one in-degree and one out-degree
    let avg_degree = if nodes == 0 { 0.0 } else { edges as f64 / nodes as f64 };
    GraphSummary {
        name: name.to_string(),
        nodes,
        edges,
        avg_in_degree: avg_degree,
        avg_out_degree: avg_degree,
        density: density(graph),
    }
}

#[cfg(test)]
mod test_summary {
    use super::*;
    use crate::test_support::plain_graph;

    #[test]
    fn test_summary_of_small_graph() {
        let graph = plain_graph(&[("1", "2"), ("2", "1"), ("2", "3"), ("3", "4")]);
        let summary = summarize(&graph, "sample");
        assert_eq!(summary.nodes, 4);
        assert_eq!(summary.edges, 4);
        assert_eq!(summary.avg_in_degree, 1.0);
        assert_eq!(summary.avg_out_degree, 1.0);
        assert!((summary.density - 4.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_graph_summary() {
        let summary = summarize(&plain_graph(&[]), "empty");
        assert_eq!(summary.nodes, 0);
        assert_eq!(summary.avg_in_degree, 0.0);
        assert_eq!(summary.density, 0.0);
    }
}
