use crate::types::graph_query::{Direction, GraphQuery};

/// Raw in-degree of every vertex.
pub fn in_degree<G: GraphQuery>(graph: &G) -> Vec<u64> {
    degrees(graph, Direction::Inbound)
}

/// Raw out-degree of every vertex.
pub fn out_degree<G: GraphQuery>(graph: &G) -> Vec<u64> {
    degrees(graph, Direction::Outbound)
}

fn degrees<G: GraphQuery>(graph: &G, direction: Direction) -> Vec<u64> {
    graph
        .vertex_list()
        .into_iter()
        .map(|vertex| graph.degree(vertex, direction) as u64)
        .collect()
}

/// Normalization factor `1 / (n - 1)`. A graph with at most one vertex
/// gets centrality 1 for every vertex, so the factor is irrelevant there.
fn scale<G: GraphQuery>(graph: &G) -> Option<f64> {
    let n = graph.vertex_count();
    if n <= 1 {
        None
    } else {
        Some(1.0 / (n as f64 - 1.0))
    }
}

fn centrality<G, F>(graph: &G, raw_degree: F) -> Vec<f64>
where
    G: GraphQuery,
    F: Fn(u32) -> usize,
{
    match scale(graph) {
        None => vec![1.0; graph.vertex_count()],
        Some(s) => graph
            .vertex_list()
            .into_iter()
            .map(|vertex| raw_degree(vertex) as f64 * s)
            .collect(),
    }
}

/// Degree centrality: `(in + out) / (n - 1)`.
pub fn degree_centrality<G: GraphQuery>(graph: &G) -> Vec<f64> {
    centrality(graph, |vertex| {
        graph.degree(vertex, Direction::Inbound) + graph.degree(vertex, Direction::Outbound)
    })
}

/// In-degree centrality: `in / (n - 1)`.
pub fn in_degree_centrality<G: GraphQuery>(graph: &G) -> Vec<f64> {
    centrality(graph, |vertex| graph.degree(vertex, Direction::Inbound))
}

/// Out-degree centrality: `out / (n - 1)`.
pub fn out_degree_centrality<G: GraphQuery>(graph: &G) -> Vec<f64> {
    centrality(graph, |vertex| graph.degree(vertex, Direction::Outbound))
}
