use tracing::{info, warn};

use crate::error::Failure;
use crate::types::graph_query::{Direction, GraphQuery, VertexIdx};
use crate::types::{Corpus, FollowGraph, UserId};

/// Column holding the number of predecessors in the other exclusive corpus.
pub const PREDS_IN_OTHER: &str = "preds_in_other";

/// Column holding the number of successors in the other exclusive corpus.
pub const SUCCESSORS_IN_OTHER: &str = "successors_in_other";

/// Cross-corpus adjacency counts for one exclusively labeled user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossCounts {
    pub preds_in_other: u64,
    pub successors_in_other: u64,
}

/// Output of [`count_cross_corpus`].
///
/// `counts` holds one entry per exclusively labeled user whose counts could
/// be computed, in vertex order. Users whose computation failed are absent
/// from `counts` and described in `failures`.
#[derive(Debug, Clone, Default)]
pub struct CrossCorpusCounts {
    pub counts: Vec<(UserId, CrossCounts)>,
    pub failures: Vec<Failure>,
}

/// Counts `vertex`'s neighbors (in `direction`) that belong to an exclusive
/// corpus different from `corpus`.
///
/// Neighbors labeled `both` are ignored. Neighbors labeled `neither` count,
/// since they are not in `vertex`'s own corpus.
fn count_other(
    graph: &FollowGraph,
    vertex: VertexIdx,
    corpus: Corpus,
    direction: Direction,
) -> Result<u64, VertexIdx> {
    let mut count = 0u64;
    for &neighbor in graph.read_neighbor(vertex, direction) {
        let neighbor_corpus = graph.corpus(neighbor).ok_or(neighbor)?;
        if neighbor_corpus == Corpus::Both {
            continue;
        }
        if neighbor_corpus != corpus {
            count += 1;
        }
    }
    Ok(count)
}

/// Computes `preds_in_other` and `successors_in_other` for every user of the
/// full follow graph whose corpus is A or B.
///
/// Users labeled `both` or `neither` get no entry. A user whose neighbors
/// cannot be resolved is logged, recorded as a node-lookup failure and left
/// out; the remaining users are still counted.
pub fn count_cross_corpus(graph: &FollowGraph) -> CrossCorpusCounts {
    let mut result = CrossCorpusCounts::default();

    for vertex in graph.vertex_list() {
        let user_id = graph.user_id(vertex);
        let corpus = match graph.corpus(vertex) {
            Some(corpus) if corpus.is_exclusive() => corpus,
            Some(_) => continue,
            None => {
                warn!("No corpus for user {} in follow graph", user_id);
                result.failures.push(Failure::NodeLookup {
                    user: user_id.to_string(),
                    context: "cross-corpus count: missing corpus".to_string(),
                });
                continue;
            }
        };

        let preds = count_other(graph, vertex, corpus, Direction::Inbound);
        let successors = count_other(graph, vertex, corpus, Direction::Outbound);
        match (preds, successors) {
            (Ok(preds_in_other), Ok(successors_in_other)) => result.counts.push((
                user_id.to_string(),
                CrossCounts {
                    preds_in_other,
                    successors_in_other,
                },
            )),
            (Err(neighbor), _) | (_, Err(neighbor)) => {
                warn!(
                    "Error counting other-corpus neighbors of user {}: neighbor {} has no attributes",
                    user_id, neighbor
                );
                result.failures.push(Failure::NodeLookup {
                    user: user_id.to_string(),
                    context: format!("cross-corpus count: neighbor index {} unresolved", neighbor),
                });
            }
        }
    }

    info!(
        "Counted other-corpus neighbors for {} users ({} failures)",
        result.counts.len(),
        result.failures.len()
    );
    result
}

#[cfg(test)]
mod test_cross_corpus {
    use super::*;
    use crate::test_support::{four_node_graph, labeled_graph};

    fn counts_of(result: &CrossCorpusCounts, user: &str) -> Option<CrossCounts> {
        result.counts.iter().find(|(id, _)| id == user).map(|(_, counts)| *counts)
    }

    #[test]
    fn test_four_node_scenario() {
        let graph = four_node_graph();
        let result = count_cross_corpus(&graph);
        assert!(result.failures.is_empty());
        assert_eq!(result.counts.len(), 4);
        assert_eq!(counts_of(&result, "2").unwrap().successors_in_other, 1);
        assert_eq!(counts_of(&result, "3").unwrap().preds_in_other, 1);
        assert_eq!(
            counts_of(&result, "1").unwrap(),
            CrossCounts { preds_in_other: 0, successors_in_other: 0 }
        );
    }

    #[test]
    fn test_both_users_are_neither_counted_nor_counting() {
        let graph = labeled_graph(
            &[("1", "9"), ("9", "1"), ("3", "9"), ("9", "3"), ("1", "3")],
            &[("1", "a"), ("3", "b"), ("9", "both")],
        );
        let result = count_cross_corpus(&graph);
        assert!(counts_of(&result, "9").is_none());
        // 9 is adjacent to both 1 and 3 but contributes nothing
        assert_eq!(
            counts_of(&result, "1").unwrap(),
            CrossCounts { preds_in_other: 0, successors_in_other: 1 }
        );
        assert_eq!(
            counts_of(&result, "3").unwrap(),
            CrossCounts { preds_in_other: 1, successors_in_other: 0 }
        );
    }

    #[test]
    fn test_neither_neighbors_count_as_other() {
        let graph = labeled_graph(&[("1", "7")], &[("1", "a")]);
        let result = count_cross_corpus(&graph);
        // 7 has no profile, so it defaults to neither and gets no entry itself
        assert_eq!(result.counts.len(), 1);
        assert_eq!(counts_of(&result, "1").unwrap().successors_in_other, 1);
    }
}
