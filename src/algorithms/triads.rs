use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::graph_query::{Direction, GraphQuery, VertexIdx};

/// The 16 triad types of the MAN classification, in canonical order.
pub const TRIAD_NAMES: [&str; 16] = [
    "003", "012", "102", "021D", "021U", "021C", "111D", "111U", "030T", "030C", "201", "120D", "120U", "120C",
    "210", "300",
];

/// Maps a 6-bit triad code to its 1-based position in [`TRIAD_NAMES`].
const TRICODES: [usize; 64] = [
    1, 2, 2, 3, 2, 4, 6, 8, 2, 6, 5, 7, 3, 8, 7, 11, 2, 6, 4, 8, 5, 9, 9, 13, 6, 10, 9, 14, 7, 14, 12, 15, 2, 5, 6,
    7, 6, 9, 10, 14, 4, 9, 9, 12, 8, 13, 14, 15, 3, 7, 8, 11, 7, 12, 14, 15, 8, 14, 13, 15, 11, 15, 15, 16,
];

/// Count of every triad type in a directed graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriadCensus {
    counts: [u64; 16],
}

impl TriadCensus {
    /// Count of the triad type `name`, `None` for an unknown name.
    pub fn get(&self, name: &str) -> Option<u64> {
        TRIAD_NAMES
            .iter()
            .position(|triad| *triad == name)
            .map(|position| self.counts[position])
    }

    /// `(name, count)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        TRIAD_NAMES.iter().copied().zip(self.counts.iter().copied())
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Six-bit code of the triad `(v, u, w)`, one bit per possible arc.
fn tricode(succs: &[FxHashSet<VertexIdx>], v: VertexIdx, u: VertexIdx, w: VertexIdx) -> usize {
    let arcs = [(v, u, 1), (u, v, 2), (v, w, 4), (w, v, 8), (u, w, 16), (w, u, 32)];
    arcs.iter()
        .filter(|(src, dst, _)| succs[*src as usize].contains(dst))
        .map(|(_, _, bit)| *bit)
        .sum()
}

/// Triadic census of a directed graph (Batagelj and Mrvar, 2001).
///
/// Only connected triads are enumerated, each exactly once, using vertex
/// index as the canonical order. Dyadic triads are added per connected pair
/// by formula, and the empty triads are the remainder of `C(n, 3)`.
/// Self-loops are ignored.
///
/// # Implementation Details
///
/// 1. For each vertex `v` and each neighbor `u > v`, the candidate third
///    vertices are the union of both neighborhoods minus `u` and `v`
/// 2. A candidate `w` is counted when `w > u`, or when `v < w < u` and `w` is
///    not adjacent to `v` (otherwise the triad is found from another pair)
/// 3. Every vertex outside the union forms a dyadic triad with `(v, u)`
pub fn triadic_census<G: GraphQuery>(graph: &G) -> TriadCensus {
    let n = graph.vertex_count();
    let succs: Vec<FxHashSet<VertexIdx>> = graph
        .vertex_list()
        .into_iter()
        .map(|v| {
            graph
                .read_neighbor(v, Direction::Outbound)
                .iter()
                .copied()
                .filter(|w| *w != v)
                .collect()
        })
        .collect();
    let neighbor_sets: Vec<FxHashSet<VertexIdx>> = graph
        .vertex_list()
        .into_iter()
        .map(|v| {
            graph
                .read_neighbor(v, Direction::Outbound)
                .iter()
                .chain(graph.read_neighbor(v, Direction::Inbound).iter())
                .copied()
                .filter(|w| *w != v)
                .collect()
        })
        .collect();

    let mut census = TriadCensus::default();
    for v in graph.vertex_list() {
        let v_neighbors = &neighbor_sets[v as usize];
        for &u in v_neighbors.iter() {
            if u <= v {
                continue;
            }
            let mut candidates: FxHashSet<VertexIdx> = v_neighbors.union(&neighbor_sets[u as usize]).copied().collect();
            candidates.remove(&u);
            candidates.remove(&v);

            for &w in candidates.iter() {
                if u < w || (v < w && w < u && !v_neighbors.contains(&w)) {
                    let code = tricode(&succs, v, u, w);
                    census.counts[TRICODES[code] - 1] += 1;
                }
            }

            let dyadic = (n - candidates.len() - 2) as u64;
            let mutual = succs[v as usize].contains(&u) && succs[u as usize].contains(&v);
            census.counts[if mutual { 2 } else { 1 }] += dyadic;
        }
    }

    let all_triads = u64::try_from(triad_count(n)).unwrap_or_else(|_| {
        warn!("Triad count of {} vertices exceeds u64, saturating 003", n);
        u64::MAX
    });
    let connected = census.total();
    census.counts[0] = all_triads.saturating_sub(connected);
    census
}

/// Number of vertex triples, `n choose 3`.
fn triad_count(n: usize) -> u128 {
    let n = n as u128;
    if n < 3 {
        0
    } else {
        n * (n - 1) * (n - 2) / 6
    }
}
