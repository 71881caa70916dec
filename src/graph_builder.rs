//! Construction of the follow graph from edge-list files and the profile
//! table.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use tracing::{debug, info, warn};

use crate::config::{CorpusConfig, READ_BUFFER_SIZE};
use crate::error::{Failure, PipelineError, Result};
use crate::types::graph_query::{Direction, GraphQuery, VertexIdx};
use crate::types::profile::ProfileTable;
use crate::types::FollowGraph;
use crate::util::progress_bar;

/// One parsed edge-list line: a source user and the users it follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord<'a> {
    pub source: &'a str,
    pub destinations: Vec<&'a str>,
}

/// Parses one edge-list line of the form `<src> <dst1> <dst2> ...`.
///
/// The scraper that produced these files wrote a separator before the first
/// destination, which leaves an empty token right after the source id; that
/// token and any other empty token are discarded.
///
/// # Returns
///
/// * `Ok(None)` - the line is blank
/// * `Ok(Some(record))` - the line parsed
/// * `Err(reason)` - the line is malformed and must be skipped
pub fn parse_edge_record(line: &str) -> std::result::Result<Option<EdgeRecord<'_>>, String> {
    let line = line.trim_end_matches(&['\n', '\r'][..]);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let mut tokens = line.split(' ');
    let source = tokens.next().unwrap_or("").trim();
    if source.is_empty() {
        return Err("line starts with a separator, no source id".to_string());
    }
    if !is_valid_id(source) {
        return Err(format!("invalid source id {:?}", source));
    }
    let mut destinations = Vec::new();
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if !is_valid_id(token) {
            return Err(format!("invalid destination id {:?}", token));
        }
        destinations.push(token);
    }
    Ok(Some(EdgeRecord { source, destinations }))
}

fn is_valid_id(token: &str) -> bool {
    token.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Incrementally builds a [`FollowGraph`].
///
/// Edges are deduplicated, vertices are interned in first-seen order and
/// every recoverable problem is recorded as a [`Failure`].
pub struct GraphBuilder {
    graph: FollowGraph,
    edge_set: FxHashSet<(VertexIdx, VertexIdx)>,
    failures: Vec<Failure>,
    show_progress: bool,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: FollowGraph::new(),
            edge_set: FxHashSet::default(),
            failures: Vec::new(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Adds the edge `src -> dst`, creating both vertices if needed.
    ///
    /// # Returns
    ///
    /// `true` if the edge was new, `false` if it was already present.
    pub fn add_edge(&mut self, src: &str, dst: &str) -> bool {
        let src = self.graph.intern(src);
        let dst = self.graph.intern(dst);
        if self.edge_set.insert((src, dst)) {
            self.graph.push_edge(src, dst);
            true
        } else {
            false
        }
    }

    /// Adds a vertex without edges.
    pub fn add_vertex(&mut self, user_id: &str) -> VertexIdx {
        self.graph.intern(user_id)
    }

    /// Adds one parsed edge record to the graph.
    pub fn add_record(&mut self, record: &EdgeRecord<'_>) {
        self.add_vertex(record.source);
        for destination in record.destinations.iter() {
            self.add_edge(record.source, destination);
        }
    }

    /// Reads every line of one edge-list file.
    ///
    /// Malformed lines are skipped and recorded; a file that cannot be opened
    /// is returned as an error so the caller can decide whether to continue.
    ///
    /// # Returns
    ///
    /// The number of records added from this file.
    pub fn read_edge_file(&mut self, path: &Path) -> Result<usize> {
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
        let file_name = path.display().to_string();
        let mut added = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Stopped reading {} at line {}: {}", file_name, line_no + 1, e);
                    self.failures.push(Failure::MalformedRecord {
                        file: file_name.clone(),
                        line: line_no + 1,
                        reason: e.to_string(),
                    });
                    break;
                }
            };
            match parse_edge_record(&line) {
                Ok(Some(record)) => {
                    self.add_record(&record);
                    added += 1;
                }
                Ok(None) => {}
                Err(reason) => {
                    debug!("Skipping line {} of {}: {}", line_no + 1, file_name, reason);
                    self.failures.push(Failure::MalformedRecord {
                        file: file_name.clone(),
                        line: line_no + 1,
                        reason,
                    });
                }
            }
        }
        Ok(added)
    }

    /// Reads every `*.txt` file of `dir`, in file-name order.
    ///
    /// A missing directory is fatal. A file that cannot be read is logged and
    /// skipped.
    pub fn read_edge_dir(&mut self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(PipelineError::MissingInput(dir.to_path_buf()));
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| PipelineError::io(dir, e))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
            .collect();
        files.sort();

        info!("Reading {} edge-list files from {}", files.len(), dir.display());
        let pb = progress_bar(files.len() as u64, "Graph Loading.", self.show_progress);
        for path in files.iter() {
            match self.read_edge_file(path) {
                Ok(added) => debug!("{}: {} records", path.display(), added),
                Err(e) => warn!("Skipping edge file: {}", e),
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        info!(
            "Finished building follow graph: {} vertices, {} edges",
            self.graph.vertex_count(),
            self.graph.edge_count()
        );
        Ok(())
    }

    /// Attaches profile attributes to every vertex.
    ///
    /// Vertices without a profile record keep the defaults of
    /// [`crate::types::NodeAttributes`] and are recorded as attribution gaps. When
    /// `restrict_to_profiled` is set, those vertices are removed instead.
    pub fn attach_profiles(&mut self, profiles: &ProfileTable, corpora: &CorpusConfig, restrict_to_profiled: bool) {
        if restrict_to_profiled {
            let before = self.graph.vertex_count();
            self.graph = self.graph.retain_vertices(|user_id| profiles.contains(user_id));
            let graph = &self.graph;
            self.edge_set = graph
                .vertex_list()
                .into_iter()
                .flat_map(move |src| {
                    graph
                        .read_neighbor(src, Direction::Outbound)
                        .iter()
                        .map(move |dst| (src, *dst))
                })
                .collect();
            info!(
                "Pared follow graph down to profiled users: {} -> {} vertices",
                before,
                self.graph.vertex_count()
            );
        }

        let mut gaps = 0usize;
        for vertex in self.graph.vertex_list() {
            let user_id = self.graph.user_id(vertex).to_string();
            let (attributes, defaulted) = match profiles.get(&user_id) {
                Some(profile) => profile.to_attributes(corpora),
                None => {
                    gaps += 1;
                    self.failures.push(Failure::AttributionGap {
                        user: user_id,
                        detail: "no profile record".to_string(),
                    });
                    continue;
                }
            };
            if !defaulted.is_empty() {
                debug!("User {} defaulted fields {:?}", user_id, defaulted);
                // A missing corpus label changes which subgraph the user lands in
                if defaulted.contains(&"corpus") {
                    self.failures.push(Failure::AttributionGap {
                        user: user_id,
                        detail: "corpus label missing or unknown".to_string(),
                    });
                }
            }
            self.graph.set_attributes(vertex, attributes);
        }
        if gaps > 0 {
            warn!("{} users have no profile record and were given default attributes", gaps);
        }
    }

    /// Failures recorded so far.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn into_graph(self) -> FollowGraph {
        self.graph
    }

    pub fn finish(self) -> (FollowGraph, Vec<Failure>) {
        (self.graph, self.failures)
    }
}

/// Builds the complete follow graph from an edge-list directory and a profile
/// table file.
pub fn build_follow_graph(
    edge_list_dir: &Path,
    profile_table: &Path,
    corpora: &CorpusConfig,
    restrict_to_profiled: bool,
    show_progress: bool,
) -> Result<(FollowGraph, Vec<Failure>)> {
    let profiles = ProfileTable::load(profile_table)?;
    info!("Loaded {} profile records", profiles.len());
    let mut builder = GraphBuilder::new().with_progress(show_progress);
    builder.read_edge_dir(edge_list_dir)?;
    builder.attach_profiles(&profiles, corpora, restrict_to_profiled);
    Ok(builder.finish())
}

/// Writes every node's attributes to `path` as a JSON array of records, one
/// `id` plus the string-rendered [`NodeAttributes::export_fields`] per user.
pub fn write_node_attributes(graph: &FollowGraph, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let records: Vec<serde_json::Value> = graph
        .vertex_list()
        .into_iter()
        .filter_map(|vertex| {
            let attributes = graph.attributes(vertex)?;
            let mut record = serde_json::Map::new();
            record.insert("id".to_string(), serde_json::Value::from(graph.user_id(vertex)));
            for (name, value) in attributes.export_fields() {
                record.insert(name.to_string(), serde_json::Value::from(value));
            }
            Some(serde_json::Value::Object(record))
        })
        .collect();

    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &records).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    info!("Wrote attributes of {} users to {}", records.len(), path.display());
    Ok(())
}
