use rustc_hash::FxHashSet;

use crate::error::MetricError;
use crate::types::graph_query::{Direction, GraphQuery, VertexIdx};

/// Reciprocity of every vertex: the share of its in/out ties that are
/// mutual, `2 * |pred ∩ succ| / (|pred| + |succ|)`.
///
/// Self-loops are left out of both neighbor sets. A vertex with no
/// neighbors at all has undefined reciprocity and yields `None`.
pub fn node_reciprocity<G: GraphQuery>(graph: &G) -> Vec<Option<f64>> {
    graph
        .vertex_list()
        .into_iter()
        .map(|vertex| {
            let preds: FxHashSet<VertexIdx> = graph
                .read_neighbor(vertex, Direction::Inbound)
                .iter()
                .copied()
                .filter(|n| *n != vertex)
                .collect();
            let succs: FxHashSet<VertexIdx> = graph
                .read_neighbor(vertex, Direction::Outbound)
                .iter()
                .copied()
                .filter(|n| *n != vertex)
                .collect();
            let total = preds.len() + succs.len();
            if total == 0 {
                return None;
            }
            let mutual = preds.intersection(&succs).count();
            Some(2.0 * mutual as f64 / total as f64)
        })
        .collect()
}

/// Share of edges whose reverse edge also exists.
///
/// A self-loop counts towards the edge total but is never mutual.
///
/// # Errors
///
/// [`MetricError::NoEdges`] when the graph has no edges.
pub fn overall_reciprocity<G: GraphQuery>(graph: &G) -> Result<f64, MetricError> {
    let edges = graph.edge_count();
    if edges == 0 {
        return Err(MetricError::NoEdges);
    }
    let mut mutual = 0usize;
    for src in graph.vertex_list() {
        for &dst in graph.read_neighbor(src, Direction::Outbound) {
            if dst != src && graph.has_edge(dst, src) {
                mutual += 1;
            }
        }
    }
    Ok(mutual as f64 / edges as f64)
}

#[cfg(test)]
mod test_reciprocity {
    use super::*;
    use crate::algorithms::partition::partition;
    use crate::config::CorpusConfig;
    use crate::test_support::{four_node_graph, plain_graph};

    #[test]
    fn test_all_mutual_graph() {
        let graph = plain_graph(&[("1", "2"), ("2", "1"), ("2", "3"), ("3", "2")]);
        assert_eq!(node_reciprocity(&graph), vec![Some(1.0), Some(1.0), Some(1.0)]);
        assert_eq!(overall_reciprocity(&graph), Ok(1.0));
    }

    #[test]
    fn test_no_mutual_edges() {
        let graph = plain_graph(&[("1", "2"), ("2", "3"), ("3", "1")]);
        assert_eq!(node_reciprocity(&graph), vec![Some(0.0), Some(0.0), Some(0.0)]);
        assert_eq!(overall_reciprocity(&graph), Ok(0.0));
    }

    #[test]
    fn test_four_node_subgraphs() {
        let graph = four_node_graph();
        let partition = partition(&graph, &CorpusConfig::default());
        assert_eq!(node_reciprocity(&partition.a), vec![Some(1.0), Some(1.0)]);
        assert_eq!(node_reciprocity(&partition.b), vec![Some(0.0), Some(0.0)]);
    }

    #[test]
    fn test_isolated_and_self_loop_vertices() {
        let mut builder = crate::graph_builder::GraphBuilder::new();
        builder.add_edge("1", "1");
        builder.add_edge("1", "2");
        builder.add_edge("2", "1");
        builder.add_vertex("3");
        let graph = builder.into_graph();

        assert_eq!(node_reciprocity(&graph), vec![Some(1.0), Some(1.0), None]);
        // Two of the three edges are mutual; the self-loop is not
        let overall = overall_reciprocity(&graph).unwrap();
        assert!((overall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(overall_reciprocity(&plain_graph(&[])), Err(MetricError::NoEdges));
    }

    #[test]
    fn test_self_loop_is_not_a_mutual_tie() {
        let mut builder = crate::graph_builder::GraphBuilder::new();
        builder.add_edge("1", "1");
        builder.add_edge("1", "2");
        builder.add_edge("3", "3");
        let graph = builder.into_graph();

        assert_eq!(node_reciprocity(&graph), vec![Some(0.0), Some(0.0), None]);
    }
}
