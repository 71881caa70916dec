//! Graph algorithms run over the follow graph and its corpus subgraphs.
//!
//! Per-node algorithms return one value per vertex, indexed by the local
//! [`VertexIdx`](crate::types::graph_query::VertexIdx) of the graph they ran
//! on. Turning those vectors into named, id-keyed columns is the job of the
//! metrics engine.

pub mod betweenness;
pub mod clustering;
pub mod cross_corpus;
pub mod degree;
pub mod neighborhood;
pub mod partition;
pub mod reciprocity;
pub mod summary;
pub mod triads;
