//! Per-user structural metrics over a directed follow graph that spans two
//! user corpora.
//!
//! The pipeline builds the follow graph from edge lists and a profile table,
//! splits it into the two exclusive corpus subgraphs, computes node metrics
//! and cross-corpus counts into one feature table, and finally writes one
//! metrics table per corpus.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod finalize;
pub mod graph_builder;
pub mod io_status;
pub mod metrics_engine;
pub mod pipeline;
pub mod report;
pub mod table;
pub mod types;
pub mod util;

#[cfg(test)]
pub(crate) mod test_support;
