use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;

use crate::error::MetricError;
use crate::types::graph_query::{Direction, GraphQuery, VertexIdx};

/// Neighbor set of `vertex` in one direction, without the vertex itself.
fn neighbor_set<G: GraphQuery>(graph: &G, vertex: VertexIdx, direction: Direction) -> FxHashSet<VertexIdx> {
    graph
        .read_neighbor(vertex, direction)
        .iter()
        .copied()
        .filter(|n| *n != vertex)
        .collect()
}

/// Local clustering coefficient of every vertex of a directed graph.
///
/// Directed triangles are counted over all four orientation combinations of
/// the two edges `i–j` and `i–k` closing through `j–k` (Fagiolo, 2007):
///
/// `c_i = T_i / (2 * (d_tot * (d_tot - 1) - 2 * d_bi))`
///
/// where `d_tot` is in + out degree and `d_bi` is the number of reciprocated
/// neighbors. Self-loops are ignored, and `c_i = 0` when `T_i = 0`.
pub fn directed_clustering<G: GraphQuery>(graph: &G) -> Vec<f64> {
    let preds: Vec<FxHashSet<VertexIdx>> = graph
        .vertex_list()
        .into_iter()
        .map(|v| neighbor_set(graph, v, Direction::Inbound))
        .collect();
    let succs: Vec<FxHashSet<VertexIdx>> = graph
        .vertex_list()
        .into_iter()
        .map(|v| neighbor_set(graph, v, Direction::Outbound))
        .collect();

    graph
        .vertex_list()
        .into_iter()
        .map(|i| {
            let ipreds = &preds[i as usize];
            let isuccs = &succs[i as usize];

            // j runs over predecessors then successors; a reciprocated
            // neighbor is visited twice on purpose.
            let mut triangles = 0usize;
            for &j in ipreds.iter().chain(isuccs.iter()) {
                let jpreds = &preds[j as usize];
                let jsuccs = &succs[j as usize];
                triangles += ipreds.intersection(jpreds).count()
                    + ipreds.intersection(jsuccs).count()
                    + isuccs.intersection(jpreds).count()
                    + isuccs.intersection(jsuccs).count();
            }

            let total_degree = ipreds.len() + isuccs.len();
            let bidirectional = ipreds.intersection(isuccs).count();
            let possible = (total_degree * total_degree.saturating_sub(1)) as f64 - 2.0 * bidirectional as f64;
            if triangles == 0 || possible <= 0.0 {
                0.0
            } else {
                triangles as f64 / (2.0 * possible)
            }
        })
        .collect()
}

/// Sorted neighbor lists of the undirected projection, self-loops removed.
fn undirected_adjacency<G: GraphQuery>(graph: &G) -> Vec<Vec<VertexIdx>> {
    graph
        .vertex_list()
        .into_iter()
        .map(|v| {
            let mut neighbors: Vec<VertexIdx> = graph
                .read_neighbor(v, Direction::Outbound)
                .iter()
                .chain(graph.read_neighbor(v, Direction::Inbound).iter())
                .copied()
                .filter(|n| *n != v)
                .collect();
            neighbors.sort_unstable();
            neighbors.dedup();
            neighbors
        })
        .collect()
}

/// Exact average clustering coefficient of the undirected projection.
///
/// Vertices with fewer than two neighbors contribute 0 to the average.
///
/// # Errors
///
/// [`MetricError::EmptyGraph`] when the graph has no vertices.
pub fn average_undirected_clustering<G: GraphQuery>(graph: &G) -> Result<f64, MetricError> {
    let n = graph.vertex_count();
    if n == 0 {
        return Err(MetricError::EmptyGraph);
    }
    let adjacency = undirected_adjacency(graph);
    let sets: Vec<FxHashSet<VertexIdx>> = adjacency.iter().map(|nbrs| nbrs.iter().copied().collect()).collect();

    let mut total = 0.0;
    for (v, neighbors) in adjacency.iter().enumerate() {
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        // Each closed pair is seen once from each endpoint
        let mut links = 0usize;
        for u in neighbors.iter() {
            links += sets[*u as usize].iter().filter(|w| sets[v].contains(w)).count();
        }
        let triangles = links / 2;
        total += 2.0 * triangles as f64 / (k * (k - 1)) as f64;
    }
    Ok(total / n as f64)
}

/// Sampled estimate of the average clustering coefficient of the undirected
/// projection.
///
/// Each trial draws a random vertex and, if it has at least two neighbors,
/// two distinct random neighbors; the estimate is the fraction of trials whose
/// neighbor pair is itself connected. The generator is seeded so repeated runs
/// give the same estimate.
///
/// # Errors
///
/// [`MetricError::EmptyGraph`] when the graph has no vertices.
pub fn approximate_average_clustering<G: GraphQuery>(graph: &G, trials: usize, seed: u64) -> Result<f64, MetricError> {
    let n = graph.vertex_count();
    if n == 0 {
        return Err(MetricError::EmptyGraph);
    }
    if trials == 0 {
        return Ok(0.0);
    }
    let adjacency = undirected_adjacency(graph);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut closed = 0usize;
    for _ in 0..trials {
        let neighbors = &adjacency[rng.gen_range(0..n)];
        if neighbors.len() < 2 {
            continue;
        }
        let picked = rand::seq::index::sample(&mut rng, neighbors.len(), 2);
        let (u, w) = (neighbors[picked.index(0)], neighbors[picked.index(1)]);
        if adjacency[w as usize].binary_search(&u).is_ok() {
            closed += 1;
        }
    }
    Ok(closed as f64 / trials as f64)
}

#[cfg(test)]
mod test_clustering {
    use super::*;
    use crate::test_support::plain_graph;

    #[test]
    fn test_directed_cycle_triangle() {
        // A 3-cycle: every vertex has d_tot = 2, d_bi = 0 and two directed triangles
        let graph = plain_graph(&[("1", "2"), ("2", "3"), ("3", "1")]);
        let clustering = directed_clustering(&graph);
        for c in clustering {
            assert!((c - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_complete_mutual_triangle() {
        let graph = plain_graph(&[("1", "2"), ("2", "1"), ("2", "3"), ("3", "2"), ("1", "3"), ("3", "1")]);
        for c in directed_clustering(&graph) {
            assert!((c - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_open_path_has_zero_clustering() {
        let graph = plain_graph(&[("1", "2"), ("2", "3"), ("2", "2")]);
        assert_eq!(directed_clustering(&graph), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_average_undirected_clustering() {
        // Triangle 1-2-3 plus pendant 4 attached to 3
        let graph = plain_graph(&[("1", "2"), ("2", "3"), ("3", "1"), ("4", "3")]);
        let average = average_undirected_clustering(&graph).unwrap();
        // c1 = c2 = 1, c3 = 1/3, c4 = 0
        assert!((average - (1.0 + 1.0 + 1.0 / 3.0) / 4.0).abs() < 1e-12);
        assert_eq!(average_undirected_clustering(&plain_graph(&[])), Err(MetricError::EmptyGraph));
    }

    #[test]
    fn test_approximate_clustering_is_seeded() {
        let graph = plain_graph(&[("1", "2"), ("2", "3"), ("3", "1"), ("4", "3")]);
        let first = approximate_average_clustering(&graph, 2000, 115).unwrap();
        let second = approximate_average_clustering(&graph, 2000, 115).unwrap();
        assert_eq!(first, second);
        assert!((0.0..=1.0).contains(&first));

        // In a complete triangle every sampled pair is closed
        let triangle = plain_graph(&[("1", "2"), ("2", "3"), ("3", "1")]);
        assert_eq!(approximate_average_clustering(&triangle, 500, 7).unwrap(), 1.0);
    }
}
