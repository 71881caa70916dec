//! Bounded-hop neighborhood counters.
//!
//! Two different quantities live here and are reported under different
//! column names:
//!
//! - [`legacy_nhop`] is the historical n-hop count. It adds the degree of the
//!   vertex to the count of its *first* neighbor only, so it is neither a
//!   neighborhood size nor a path count.
//! - [`bfs_neighborhood_size`] is the true number of distinct vertices within
//!   `cutoff` hops.

use std::collections::VecDeque;

use crate::error::Failure;
use crate::types::graph_query::{Direction, GraphQuery, VertexIdx};

/// The legacy n-hop count.
///
/// `0` if `cutoff == 0` or the vertex has no neighbor in `direction`;
/// otherwise `degree + legacy_nhop(first_neighbor, cutoff - 1)`, where the
/// first neighbor is the first one in edge insertion order.
pub fn legacy_nhop<G: GraphQuery>(graph: &G, vertex: VertexIdx, cutoff: usize, direction: Direction) -> u64 {
    let mut total = 0u64;
    let mut current = vertex;
    for _ in 0..cutoff {
        let neighbors = graph.read_neighbor(current, direction);
        let Some(&first) = neighbors.first() else {
            break;
        };
        total += neighbors.len() as u64;
        current = first;
    }
    total
}

/// Number of distinct vertices reachable from `vertex` in `1..=cutoff` hops
/// along `direction`, not counting `vertex` itself.
pub fn bfs_neighborhood_size<G: GraphQuery>(graph: &G, vertex: VertexIdx, cutoff: usize, direction: Direction) -> u64 {
    if cutoff == 0 || !graph.has_vertex(vertex) {
        return 0;
    }
    let mut depth = vec![usize::MAX; graph.vertex_count()];
    let mut queue = VecDeque::new();
    depth[vertex as usize] = 0;
    queue.push_back(vertex);

    let mut reached = 0u64;
    while let Some(current) = queue.pop_front() {
        let current_depth = depth[current as usize];
        if current_depth == cutoff {
            continue;
        }
        for &neighbor in graph.read_neighbor(current, direction) {
            if depth[neighbor as usize] == usize::MAX {
                depth[neighbor as usize] = current_depth + 1;
                reached += 1;
                queue.push_back(neighbor);
            }
        }
    }
    reached
}

/// Which neighborhood measure to evaluate for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborhoodKind {
    Legacy,
    Bfs,
}

/// Resolves `user_id` in `graph` and evaluates the chosen measure.
///
/// # Errors
///
/// A [`Failure::NodeLookup`] when the user is not a vertex of `graph`.
pub fn neighborhood_for_user<G: GraphQuery>(
    graph: &G,
    user_id: &str,
    cutoff: usize,
    direction: Direction,
    kind: NeighborhoodKind,
) -> Result<u64, Failure> {
    let vertex = graph.lookup(user_id).ok_or_else(|| Failure::NodeLookup {
        user: user_id.to_string(),
        context: format!("{:?} neighborhood ({:?}, cutoff {})", kind, direction, cutoff),
    })?;
    Ok(match kind {
        NeighborhoodKind::Legacy => legacy_nhop(graph, vertex, cutoff, direction),
        NeighborhoodKind::Bfs => bfs_neighborhood_size(graph, vertex, cutoff, direction),
    })
}

#[cfg(test)]
mod test_neighborhood {
    use super::*;
    use crate::test_support::plain_graph;

    #[test]
    fn test_no_successors_gives_zero() {
        let graph = plain_graph(&[("1", "2")]);
        let two = graph.lookup("2").unwrap();
        assert_eq!(legacy_nhop(&graph, two, 2, Direction::Outbound), 0);
        assert_eq!(legacy_nhop(&graph, two, 2, Direction::Inbound), 1);
        assert_eq!(legacy_nhop(&graph, two, 0, Direction::Inbound), 0);
    }

    #[test]
    fn test_legacy_follows_first_neighbor_only() {
        // 1 follows 2 and 3; 2 follows 4; 3 follows 5 and 6
        let graph = plain_graph(&[("1", "2"), ("1", "3"), ("2", "4"), ("3", "5"), ("3", "6")]);
        let one = graph.lookup("1").unwrap();
        // deg(1) + deg(2) = 2 + 1, ignoring 3's successors
        assert_eq!(legacy_nhop(&graph, one, 2, Direction::Outbound), 3);
        // The real 2-hop neighborhood is {2, 3, 4, 5, 6}
        assert_eq!(bfs_neighborhood_size(&graph, one, 2, Direction::Outbound), 5);
    }

    #[test]
    fn test_legacy_counts_revisits_on_cycles() {
        let graph = plain_graph(&[("1", "2"), ("2", "1")]);
        let one = graph.lookup("1").unwrap();
        assert_eq!(legacy_nhop(&graph, one, 3, Direction::Outbound), 3);
        assert_eq!(bfs_neighborhood_size(&graph, one, 3, Direction::Outbound), 1);
    }

    #[test]
    fn test_lookup_failure_for_unknown_user() {
        let graph = plain_graph(&[("1", "2")]);
        assert_eq!(
            neighborhood_for_user(&graph, "1", 2, Direction::Outbound, NeighborhoodKind::Legacy),
            Ok(1)
        );
        match neighborhood_for_user(&graph, "9", 2, Direction::Outbound, NeighborhoodKind::Bfs) {
            Err(Failure::NodeLookup { user, .. }) => assert_eq!(user, "9"),
            other => panic!("unexpected result {:?}", other),
        }
    }
}
