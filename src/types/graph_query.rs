use serde::{Deserialize, Serialize};

/// Dense vertex index, local to the graph or subgraph that issued it.
pub type VertexIdx = u32;

/// Which adjacency of a vertex to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Vertices this vertex follows (successors).
    Outbound,
    /// Vertices following this vertex (predecessors).
    Inbound,
}

/// A trait that defines query operations for follow graphs and their views.
///
/// Every metric algorithm in this crate is written against this trait, so the
/// same code runs over the full follow graph and over an exclusive corpus
/// subgraph.
///
/// Vertices are addressed by dense [`VertexIdx`] values in `0..vertex_count()`.
/// Neighbor slices keep the order in which edges were first seen, which some
/// algorithms (the legacy n-hop count) depend on.
pub trait GraphQuery {
    /// Number of vertices in this graph component.
    fn vertex_count(&self) -> usize;

    /// Number of directed edges in this graph component.
    fn edge_count(&self) -> usize;

    /// Retrieves the neighbors of a vertex in the given direction.
    ///
    /// # Parameters
    ///
    /// * `vertex` - The vertex whose neighbors are being queried.
    /// * `direction` - Successors (`Outbound`) or predecessors (`Inbound`).
    ///
    /// # Returns
    ///
    /// A slice of neighbor indexes; empty if the vertex is out of range.
    fn read_neighbor(&self, vertex: VertexIdx, direction: Direction) -> &[VertexIdx];

    /// Resolves a user id to its vertex index in this component.
    fn lookup(&self, user_id: &str) -> Option<VertexIdx>;

    /// User id of a vertex. Panics if `vertex` is out of range.
    fn user_id(&self, vertex: VertexIdx) -> &str;

    /// Checks if a specific vertex exists in the graph component.
    fn has_vertex(&self, vertex: VertexIdx) -> bool {
        (vertex as usize) < self.vertex_count()
    }

    /// Determines if an edge `src -> dst` exists.
    fn has_edge(&self, src: VertexIdx, dst: VertexIdx) -> bool {
        self.read_neighbor(src, Direction::Outbound).contains(&dst)
    }

    /// Number of neighbors in the given direction.
    fn degree(&self, vertex: VertexIdx, direction: Direction) -> usize {
        self.read_neighbor(vertex, direction).len()
    }

    /// Retrieves a list of all vertices in this graph component.
    fn vertex_list(&self) -> Vec<VertexIdx> {
        (0..self.vertex_count() as VertexIdx).collect()
    }
}
