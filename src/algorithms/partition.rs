use tracing::info;

use crate::config::CorpusConfig;
use crate::types::graph_query::{GraphQuery, VertexIdx};
use crate::types::{Corpus, CorpusSubGraph, FollowGraph, UserId};

/// The follow graph split into its two exclusive corpus subgraphs.
///
/// # Fields
///
/// * `a` - Induced subgraph over users labeled exclusively `A`
/// * `b` - Induced subgraph over users labeled exclusively `B`
/// * `excluded` - Users labeled `both` or `neither`, in vertex order
#[derive(Debug, Clone)]
pub struct Partition {
    pub a: CorpusSubGraph,
    pub b: CorpusSubGraph,
    pub excluded: Vec<UserId>,
}

impl Partition {
    pub fn subgraph(&self, corpus: Corpus) -> Option<&CorpusSubGraph> {
        match corpus {
            Corpus::A => Some(&self.a),
            Corpus::B => Some(&self.b),
            Corpus::Both | Corpus::Neither => None,
        }
    }
}

/// Partitions the follow graph by corpus label.
///
/// Every vertex lands in exactly one of A-only, B-only or excluded. Each
/// exclusive subgraph keeps the edges of the follow graph whose two endpoints
/// carry its label.
pub fn partition(graph: &FollowGraph, corpora: &CorpusConfig) -> Partition {
    let mut a_vertices = Vec::<VertexIdx>::new();
    let mut b_vertices = Vec::<VertexIdx>::new();
    let mut excluded = Vec::<UserId>::new();

    for vertex in graph.vertex_list() {
        match graph.corpus(vertex) {
            Some(Corpus::A) => a_vertices.push(vertex),
            Some(Corpus::B) => b_vertices.push(vertex),
            _ => excluded.push(graph.user_id(vertex).to_string()),
        }
    }

    let a = graph.induce_subgraph(&a_vertices, Corpus::A, &corpora.a.name);
    let b = graph.induce_subgraph(&b_vertices, Corpus::B, &corpora.b.name);
    info!(
        "Partitioned follow graph: {} has {} vertices/{} edges, {} has {} vertices/{} edges, {} excluded",
        a.name,
        a.vertex_count(),
        a.edge_count(),
        b.name,
        b.vertex_count(),
        b.edge_count(),
        excluded.len()
    );

    Partition { a, b, excluded }
}

#[cfg(test)]
mod test_partition {
    use rustc_hash::FxHashSet;

    use super::*;
    use crate::test_support::labeled_graph;

    #[test]
    fn test_partition_is_disjoint_and_total() {
        let graph = labeled_graph(
            &[("1", "2"), ("2", "3"), ("3", "4"), ("4", "5"), ("5", "1"), ("6", "1")],
            &[("1", "a"), ("2", "a"), ("3", "b"), ("4", "both"), ("5", "b")],
        );
        let partition = partition(&graph, &CorpusConfig::default());

        let a: FxHashSet<&str> = partition.a.vertex_list.iter().map(String::as_str).collect();
        let b: FxHashSet<&str> = partition.b.vertex_list.iter().map(String::as_str).collect();
        assert!(a.is_disjoint(&b));
        assert_eq!(a.len() + b.len() + partition.excluded.len(), graph.vertex_count());
        assert_eq!(partition.excluded, vec!["4".to_string(), "6".to_string()]);

        // Only 1->2 stays in A; 3 and 5 have no direct edge in B
        assert_eq!(partition.a.edge_count(), 1);
        assert_eq!(partition.b.edge_count(), 0);
    }

    #[test]
    fn test_partition_is_deterministic() {
        let edges = [("1", "2"), ("2", "1"), ("2", "3"), ("3", "4")];
        let labels = [("1", "a"), ("2", "a"), ("3", "b"), ("4", "b")];
        let first = partition(&labeled_graph(&edges, &labels), &CorpusConfig::default());
        let second = partition(&labeled_graph(&edges, &labels), &CorpusConfig::default());
        assert_eq!(first.a, second.a);
        assert_eq!(first.b, second.b);
        assert!(first.subgraph(Corpus::Both).is_none());
    }
}
