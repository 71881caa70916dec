//! Graph fixtures shared by the unit tests.

use crate::config::CorpusConfig;
use crate::graph_builder::GraphBuilder;
use crate::types::profile::{ProfileTable, UserProfile};
use crate::types::FollowGraph;

/// Builds a follow graph from `(src, dst)` edges and labels users through
/// `(user, corpus label)` profile records. Unlisted users default to
/// `neither`.
pub(crate) fn labeled_graph(edges: &[(&str, &str)], labels: &[(&str, &str)]) -> FollowGraph {
    let mut builder = GraphBuilder::new();
    for (src, dst) in edges {
        builder.add_edge(src, dst);
    }
    for (user, _) in labels {
        builder.add_vertex(user);
    }
    let profiles = ProfileTable::from_records(labels.iter().map(|(user, corpus)| UserProfile {
        id_str: Some(serde_json::json!(user)),
        corpus: Some(corpus.to_string()),
        ..UserProfile::default()
    }));
    builder.attach_profiles(&profiles, &CorpusConfig::default(), false);
    builder.into_graph()
}

/// Users 1, 2 in A and 3, 4 in B with edges 1->2, 2->1, 2->3, 3->4.
pub(crate) fn four_node_graph() -> FollowGraph {
    labeled_graph(
        &[("1", "2"), ("2", "1"), ("2", "3"), ("3", "4")],
        &[("1", "a"), ("2", "a"), ("3", "b"), ("4", "b")],
    )
}

/// Builds an unlabeled graph from edges; every user is `neither`.
pub(crate) fn plain_graph(edges: &[(&str, &str)]) -> FollowGraph {
    let mut builder = GraphBuilder::new();
    for (src, dst) in edges {
        builder.add_edge(src, dst);
    }
    builder.into_graph()
}
