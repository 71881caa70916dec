use std::collections::VecDeque;

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::error::MetricError;
use crate::types::graph_query::{Direction, GraphQuery, VertexIdx};

/// Configuration for betweenness centrality.
///
/// # Fields
///
/// * `thread_num` - Number of threads used to sweep source vertices
/// * `normalized` - Scale by `1 / ((n - 1)(n - 2))`
#[derive(Clone, Debug)]
pub struct BetweennessConfig {
    pub thread_num: usize,
    pub normalized: bool,
}

impl Default for BetweennessConfig {
    fn default() -> Self {
        Self {
            thread_num: 1,
            normalized: true,
        }
    }
}

/// Reusable per-source buffers for Brandes' algorithm.
struct SourceState {
    stack: Vec<VertexIdx>,
    queue: VecDeque<VertexIdx>,
    predecessors: Vec<Vec<VertexIdx>>,
    sigma: Vec<f64>,
    distance: Vec<i64>,
    delta: Vec<f64>,
}

impl SourceState {
    fn new(n: usize) -> Self {
        Self {
            stack: Vec::with_capacity(n),
            queue: VecDeque::with_capacity(n),
            predecessors: vec![Vec::new(); n],
            sigma: vec![0.0; n],
            distance: vec![-1; n],
            delta: vec![0.0; n],
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.queue.clear();
        for preds in self.predecessors.iter_mut() {
            preds.clear();
        }
        self.sigma.iter_mut().for_each(|s| *s = 0.0);
        self.distance.iter_mut().for_each(|d| *d = -1);
        self.delta.iter_mut().for_each(|d| *d = 0.0);
    }
}

/// Adds the dependencies of `source` on every other vertex into `scores`.
///
/// One BFS from `source` counts shortest paths (`sigma`) and records
/// shortest-path predecessors; vertices are then popped in order of
/// non-increasing distance to accumulate dependencies.
fn accumulate_source<G: GraphQuery>(graph: &G, source: VertexIdx, state: &mut SourceState, scores: &mut [f64]) {
    state.reset();
    let s = source as usize;
    state.sigma[s] = 1.0;
    state.distance[s] = 0;
    state.queue.push_back(source);

    while let Some(v) = state.queue.pop_front() {
        state.stack.push(v);
        let v_dist = state.distance[v as usize];
        for &w in graph.read_neighbor(v, Direction::Outbound) {
            let wi = w as usize;
            if state.distance[wi] < 0 {
                state.distance[wi] = v_dist + 1;
                state.queue.push_back(w);
            }
            if state.distance[wi] == v_dist + 1 {
                state.sigma[wi] += state.sigma[v as usize];
                state.predecessors[wi].push(v);
            }
        }
    }

    while let Some(w) = state.stack.pop() {
        let wi = w as usize;
        let coefficient = (1.0 + state.delta[wi]) / state.sigma[wi];
        for &v in state.predecessors[wi].iter() {
            state.delta[v as usize] += state.sigma[v as usize] * coefficient;
        }
        if w != source {
            scores[wi] += state.delta[wi];
        }
    }
}

/// Exact betweenness centrality of every vertex of a directed, unweighted
/// graph (Brandes, 2001).
///
/// Sources are split across a rayon pool of `thread_num` threads; each worker
/// folds into its own score vector and the vectors are summed at the end, so
/// no state is shared between workers.
///
/// # Errors
///
/// [`MetricError::ThreadPool`] if the pool cannot be created.
pub fn betweenness_centrality<G>(graph: &G, config: &BetweennessConfig) -> Result<Vec<f64>, MetricError>
where
    G: GraphQuery + Sync,
{
    let n = graph.vertex_count();
    if n == 0 {
        return Ok(Vec::new());
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(config.thread_num.max(1))
        .build()
        .map_err(|e| MetricError::ThreadPool(e.to_string()))?;

    let mut scores = pool.install(|| {
        graph
            .vertex_list()
            .par_iter()
            .fold(
                || (SourceState::new(n), vec![0.0; n]),
                |(mut state, mut partial), &source| {
                    accumulate_source(graph, source, &mut state, &mut partial);
                    (state, partial)
                },
            )
            .map(|(_, partial)| partial)
            .reduce(
                || vec![0.0; n],
                |mut left, right| {
                    for (l, r) in left.iter_mut().zip(right) {
                        *l += r;
                    }
                    left
                },
            )
    });

    if config.normalized && n > 2 {
        let scale = 1.0 / ((n as f64 - 1.0) * (n as f64 - 2.0));
        scores.iter_mut().for_each(|score| *score *= scale);
    }
    Ok(scores)
}

#[cfg(test)]
mod test_betweenness {
    use super::*;
    use crate::test_support::plain_graph;

    fn close(left: &[f64], right: &[f64]) -> bool {
        left.len() == right.len() && left.iter().zip(right).all(|(l, r)| (l - r).abs() < 1e-9)
    }

    #[test]
    fn test_directed_path() {
        // 1 -> 2 -> 3: only 2 lies on a shortest path (1 to 3)
        let graph = plain_graph(&[("1", "2"), ("2", "3")]);
        let raw = betweenness_centrality(&graph, &BetweennessConfig { thread_num: 1, normalized: false }).unwrap();
        assert!(close(&raw, &[0.0, 1.0, 0.0]));
        let normalized = betweenness_centrality(&graph, &BetweennessConfig::default()).unwrap();
        assert!(close(&normalized, &[0.0, 0.5, 0.0]));
    }

    #[test]
    fn test_split_shortest_paths() {
        // Two equal shortest paths from 1 to 4 share the dependency
        let graph = plain_graph(&[("1", "2"), ("1", "3"), ("2", "4"), ("3", "4")]);
        let raw = betweenness_centrality(&graph, &BetweennessConfig { thread_num: 1, normalized: false }).unwrap();
        assert!(close(&raw, &[0.0, 0.5, 0.5, 0.0]));
    }

    #[test]
    fn test_thread_count_does_not_change_result() {
        let graph = plain_graph(&[
            ("1", "2"), ("2", "3"), ("3", "4"), ("4", "1"), ("2", "5"), ("5", "3"), ("1", "3"),
        ]);
        let single = betweenness_centrality(&graph, &BetweennessConfig { thread_num: 1, normalized: true }).unwrap();
        let multi = betweenness_centrality(&graph, &BetweennessConfig { thread_num: 4, normalized: true }).unwrap();
        assert!(close(&single, &multi));
    }

    #[test]
    fn test_empty_graph() {
        let graph = plain_graph(&[]);
        assert!(betweenness_centrality(&graph, &BetweennessConfig::default()).unwrap().is_empty());
    }
}
