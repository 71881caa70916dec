use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::types::graph_query::{Direction, GraphQuery, VertexIdx};

pub mod graph_query;
pub mod profile;

/// Opaque user identifier as it appears in the edge lists and profile table.
pub type UserId = String;

/// Screen name assigned to users without profile data.
pub const UNKNOWN_SCREEN_NAME: &str = "None, Error";

/// Community label attached to every user node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Corpus {
    A,
    B,
    Both,
    Neither,
}

impl Corpus {
    /// True for the two labels that own an exclusive subgraph.
    pub fn is_exclusive(self) -> bool {
        matches!(self, Corpus::A | Corpus::B)
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Corpus::A => "A",
            Corpus::B => "B",
            Corpus::Both => "both",
            Corpus::Neither => "neither",
        };
        write!(f, "{}", label)
    }
}

/// Profile attributes attached to a user node at graph-build time.
///
/// Fields stay typed inside the pipeline; [`NodeAttributes::export_fields`]
/// renders them as text for export formats that only carry strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    pub corpus: Corpus,
    pub followers_count: u64,
    pub status_count: u64,
    pub screen_name: String,
    pub account_age_years: f64,
    pub verified: bool,
}

impl Default for NodeAttributes {
    fn default() -> Self {
        Self {
            corpus: Corpus::Neither,
            followers_count: 0,
            status_count: 0,
            screen_name: UNKNOWN_SCREEN_NAME.to_string(),
            account_age_years: 0.0,
            verified: false,
        }
    }
}

impl NodeAttributes {
    /// String rendering of every attribute, in a stable field order.
    /// `verified` is written as `"1"` / `"0"`.
    pub fn export_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("corpus", self.corpus.to_string()),
            ("followers", self.followers_count.to_string()),
            ("status_count", self.status_count.to_string()),
            ("screen_name", self.screen_name.clone()),
            ("account_age_years", self.account_age_years.to_string()),
            ("verified", if self.verified { "1" } else { "0" }.to_string()),
        ]
    }
}

/// The directed follow graph of record.
///
/// An edge `u -> v` means "u follows v". Vertices are interned into dense
/// indexes in first-seen order, and both adjacency directions keep edge
/// insertion order. The graph is only mutated by the builder; every later
/// stage reads it through [`GraphQuery`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowGraph {
    /// User id of each vertex, indexed by `VertexIdx`
    vertex_ids: Vec<UserId>,

    /// Reverse mapping from user id to vertex index
    vertex_index: FxHashMap<UserId, VertexIdx>,

    /// Profile attributes of each vertex
    attributes: Vec<NodeAttributes>,

    /// Successor lists (who each vertex follows)
    successors: Vec<Vec<VertexIdx>>,

    /// Predecessor lists (who follows each vertex)
    predecessors: Vec<Vec<VertexIdx>>,

    edge_count: usize,
}

impl FollowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of `user_id`, inserting a new vertex with default
    /// attributes if it has not been seen yet.
    pub(crate) fn intern(&mut self, user_id: &str) -> VertexIdx {
        if let Some(&vertex) = self.vertex_index.get(user_id) {
            return vertex;
        }
        let vertex = self.vertex_ids.len() as VertexIdx;
        self.vertex_ids.push(user_id.to_string());
        self.vertex_index.insert(user_id.to_string(), vertex);
        self.attributes.push(NodeAttributes::default());
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        vertex
    }

    /// Appends the edge `src -> dst`. The caller guarantees it is not a
    /// duplicate.
    pub(crate) fn push_edge(&mut self, src: VertexIdx, dst: VertexIdx) {
        self.successors[src as usize].push(dst);
        self.predecessors[dst as usize].push(src);
        self.edge_count += 1;
    }

    pub(crate) fn set_attributes(&mut self, vertex: VertexIdx, attributes: NodeAttributes) {
        self.attributes[vertex as usize] = attributes;
    }

    pub fn attributes(&self, vertex: VertexIdx) -> Option<&NodeAttributes> {
        self.attributes.get(vertex as usize)
    }

    pub fn corpus(&self, vertex: VertexIdx) -> Option<Corpus> {
        self.attributes(vertex).map(|attributes| attributes.corpus)
    }

    /// All vertices labeled `corpus`, in vertex order.
    pub fn vertices_with_corpus(&self, corpus: Corpus) -> Vec<VertexIdx> {
        self.attributes
            .iter()
            .enumerate()
            .filter(|(_, attributes)| attributes.corpus == corpus)
            .map(|(vertex, _)| vertex as VertexIdx)
            .collect()
    }

    /// Builds a new graph holding only the vertices accepted by `keep` and the
    /// edges between them. Vertex and edge order are preserved.
    pub fn retain_vertices<F>(&self, keep: F) -> FollowGraph
    where
        F: Fn(&str) -> bool,
    {
        let mut retained = FollowGraph::new();
        let mut mapping: Vec<Option<VertexIdx>> = vec![None; self.vertex_ids.len()];
        for (vertex, user_id) in self.vertex_ids.iter().enumerate() {
            if keep(user_id) {
                let new_vertex = retained.intern(user_id);
                retained.set_attributes(new_vertex, self.attributes[vertex].clone());
                mapping[vertex] = Some(new_vertex);
            }
        }
        for (src, successors) in self.successors.iter().enumerate() {
            let Some(new_src) = mapping[src] else { continue };
            for dst in successors {
                if let Some(new_dst) = mapping[*dst as usize] {
                    retained.push_edge(new_src, new_dst);
                }
            }
        }
        retained
    }

    /// Induces the subgraph over `vertices` (indexes of this graph).
    ///
    /// The subgraph keeps every edge of this graph whose two endpoints are
    /// both in `vertices`. Local vertex indexes follow the order of
    /// `vertices`, and neighbor lists keep this graph's edge order.
    ///
    /// # Implementation Details
    ///
    /// 1. Maps each selected parent vertex to its local index
    /// 2. For each selected vertex, filters its successors and predecessors
    ///    down to selected vertices and appends them to the CSR arrays
    /// 3. Records the CSR offsets so that vertex `i`'s neighbors live in
    ///    `neighbors[offsets[i]..offsets[i + 1]]`
    pub fn induce_subgraph(&self, vertices: &[VertexIdx], corpus: Corpus, name: &str) -> CorpusSubGraph {
        // Parent index -> local index, None for vertices outside the subgraph
        let mut local_of: Vec<Option<VertexIdx>> = vec![None; self.vertex_ids.len()];
        let mut vertex_list = Vec::with_capacity(vertices.len());
        let mut vertex_index = FxHashMap::default();
        for &vertex in vertices {
            if local_of[vertex as usize].is_some() {
                continue;
            }
            let local = vertex_list.len() as VertexIdx;
            local_of[vertex as usize] = Some(local);
            let user_id = self.vertex_ids[vertex as usize].clone();
            vertex_index.insert(user_id.clone(), local);
            vertex_list.push(user_id);
        }

        let mut out_offsets = Vec::with_capacity(vertex_list.len() + 1);
        let mut out_neighbors = Vec::new();
        let mut in_offsets = Vec::with_capacity(vertex_list.len() + 1);
        let mut in_neighbors = Vec::new();
        out_offsets.push(0);
        in_offsets.push(0);

        for user_id in vertex_list.iter() {
            let parent = self.vertex_index[user_id] as usize;
            out_neighbors.extend(self.successors[parent].iter().filter_map(|n| local_of[*n as usize]));
            out_offsets.push(out_neighbors.len());
            in_neighbors.extend(self.predecessors[parent].iter().filter_map(|n| local_of[*n as usize]));
            in_offsets.push(in_neighbors.len());
        }

        CorpusSubGraph {
            name: name.to_string(),
            corpus,
            vertex_list,
            vertex_index,
            out_offsets,
            out_neighbors,
            in_offsets,
            in_neighbors,
        }
    }
}

impl GraphQuery for FollowGraph {
    fn vertex_count(&self) -> usize {
        self.vertex_ids.len()
    }

    fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn read_neighbor(&self, vertex: VertexIdx, direction: Direction) -> &[VertexIdx] {
        let adjacency = match direction {
            Direction::Outbound => &self.successors,
            Direction::Inbound => &self.predecessors,
        };
        adjacency.get(vertex as usize).map(Vec::as_slice).unwrap_or(&[])
    }

    fn lookup(&self, user_id: &str) -> Option<VertexIdx> {
        self.vertex_index.get(user_id).copied()
    }

    fn user_id(&self, vertex: VertexIdx) -> &str {
        &self.vertex_ids[vertex as usize]
    }
}

/// A node-induced view of the follow graph over one exclusive corpus.
///
/// Stored in CSR (Compressed Sparse Row) form for both directions. The view
/// is derived once per run from the [`FollowGraph`] and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusSubGraph {
    /// Name used in logs and in the metrics report
    pub name: String,

    /// The exclusive corpus this view was induced for
    pub corpus: Corpus,

    /// User id of each local vertex
    pub vertex_list: Vec<UserId>,

    /// Maps user ids to local vertex indexes
    pub vertex_index: FxHashMap<UserId, VertexIdx>,

    /// Successors of local vertex `i` are `out_neighbors[out_offsets[i]..out_offsets[i + 1]]`
    pub out_offsets: Vec<usize>,
    pub out_neighbors: Vec<VertexIdx>,

    /// Predecessors, laid out like the successors
    pub in_offsets: Vec<usize>,
    pub in_neighbors: Vec<VertexIdx>,
}

impl GraphQuery for CorpusSubGraph {
    fn vertex_count(&self) -> usize {
        self.vertex_list.len()
    }

    fn edge_count(&self) -> usize {
        self.out_neighbors.len()
    }

    fn read_neighbor(&self, vertex: VertexIdx, direction: Direction) -> &[VertexIdx] {
        let (offsets, neighbors) = match direction {
            Direction::Outbound => (&self.out_offsets, &self.out_neighbors),
            Direction::Inbound => (&self.in_offsets, &self.in_neighbors),
        };
        let vertex = vertex as usize;
        if vertex + 1 >= offsets.len() {
            return &[];
        }
        &neighbors[offsets[vertex]..offsets[vertex + 1]]
    }

    fn lookup(&self, user_id: &str) -> Option<VertexIdx> {
        self.vertex_index.get(user_id).copied()
    }

    fn user_id(&self, vertex: VertexIdx) -> &str {
        &self.vertex_list[vertex as usize]
    }
}
