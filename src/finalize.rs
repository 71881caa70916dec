//! Splits the merged feature table into one final table per exclusive corpus.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use tracing::{info, warn};

use crate::config::CorpusConfig;
use crate::error::{PipelineError, Result};
use crate::table::{ColumnSource, FeatureTable};
use crate::types::Corpus;

/// The final metrics table of one exclusive corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalTable {
    pub corpus: Corpus,
    /// Corpus label, used in the output file name
    pub label: String,
    pub table: FeatureTable,
}

impl FinalTable {
    pub fn file_name(&self) -> String {
        format!("{}_exclusive_users_metrics.json", self.label)
    }

    /// Writes the table as a JSON array of records into `dir`.
    ///
    /// # Returns
    ///
    /// The path of the written file.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        let path = dir.join(self.file_name());
        let file = File::create(&path).map_err(|e| PipelineError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.table.to_json_records()).map_err(|e| {
            PipelineError::Json {
                path: path.clone(),
                source: e,
            }
        })?;
        writer.flush().map_err(|e| PipelineError::io(&path, e))?;
        info!("Wrote {} rows to {}", self.table.len(), path.display());
        Ok(path)
    }
}

/// Columns kept for the corpus owning `own_prefix`, in final order: every
/// column no corpus owns, then `metric_columns` with the prefix stripped once,
/// then any other own column. The other corpus's columns are dropped. A metric
/// column the table lacks is kept with no source, so its cells are null.
fn kept_columns(
    table: &FeatureTable,
    own_prefix: &str,
    other_prefix: &str,
    metric_columns: &[&str],
) -> Result<Vec<ColumnSource>> {
    let mut kept: Vec<ColumnSource> = Vec::new();
    let mut own: Vec<ColumnSource> = Vec::new();
    for column in table.columns() {
        if let Some(stripped) = column.strip_prefix(own_prefix) {
            own.push(ColumnSource {
                output: stripped.to_string(),
                source: Some(column.clone()),
            });
        } else if !column.starts_with(other_prefix) {
            kept.push(ColumnSource {
                output: column.clone(),
                source: Some(column.clone()),
            });
        }
    }
    for name in metric_columns {
        match own.iter().position(|source| source.output == *name) {
            Some(i) => kept.push(own.remove(i)),
            None => {
                warn!("No {}{} column in the feature table, writing nulls", own_prefix, name);
                kept.push(ColumnSource {
                    output: name.to_string(),
                    source: None,
                });
            }
        }
    }
    kept.extend(own);

    let mut seen = FxHashSet::default();
    for source in &kept {
        if !seen.insert(source.output.as_str()) {
            return Err(PipelineError::DuplicateColumn(source.output.clone()));
        }
    }
    Ok(kept)
}

/// Names in `left` that are missing from `right`, in `left`'s order.
fn missing_from(left: &[ColumnSource], right: &[ColumnSource]) -> Vec<String> {
    let right: FxHashSet<&str> = right.iter().map(|source| source.output.as_str()).collect();
    left.iter()
        .filter(|source| !right.contains(source.output.as_str()))
        .map(|source| source.output.clone())
        .collect()
}

/// Builds the final A and B tables from the merged feature table.
///
/// # Arguments
///
/// * `table` - The merged feature table with prefixed corpus columns
/// * `corpora` - Labels and prefixes of the two corpora
/// * `metric_columns` - Unprefixed names of the node metric suite. Both final
///   tables carry every one of them, null where the metric failed for that
///   corpus
///
/// # Returns
///
/// `(A table, B table)`. Each holds only the rows labeled with its corpus and
/// both share the same columns in the same order.
///
/// # Errors
///
/// [`PipelineError::SchemaMismatch`] when a prefixed column outside the
/// metric suite exists for one corpus only; [`PipelineError::DuplicateColumn`]
/// when a stripped column name collides with a shared column.
pub fn finalize(
    table: &FeatureTable,
    corpora: &CorpusConfig,
    metric_columns: &[&str],
) -> Result<(FinalTable, FinalTable)> {
    let a_columns = kept_columns(table, &corpora.a.prefix, &corpora.b.prefix, metric_columns)?;
    let b_columns = kept_columns(table, &corpora.b.prefix, &corpora.a.prefix, metric_columns)?;

    let only_a = missing_from(&a_columns, &b_columns);
    let only_b = missing_from(&b_columns, &a_columns);
    if !only_a.is_empty() || !only_b.is_empty() {
        return Err(PipelineError::SchemaMismatch {
            only_first: only_a,
            only_second: only_b,
        });
    }

    let a = FinalTable {
        corpus: Corpus::A,
        label: corpora.a.label.clone(),
        table: table.project(|corpus| corpus == Corpus::A, &a_columns),
    };
    let b = FinalTable {
        corpus: Corpus::B,
        label: corpora.b.label.clone(),
        table: table.project(|corpus| corpus == Corpus::B, &b_columns),
    };
    info!(
        "Finalized {} {} rows and {} {} rows over {} columns",
        a.table.len(),
        a.label,
        b.table.len(),
        b.label,
        a.table.columns().len()
    );
    Ok((a, b))
}

#[cfg(test)]
mod test_finalize {
    use super::*;
    use crate::table::{MetricColumn, Value};

    fn merged_table(columns: &[&str]) -> FeatureTable {
        let mut table = FeatureTable::from_rows(vec![
            ("1".to_string(), Corpus::A),
            ("2".to_string(), Corpus::A),
            ("3".to_string(), Corpus::B),
        ]);
        for name in columns {
            let mut column = MetricColumn::new(*name);
            column.insert("1", 1u64);
            column.insert("3", 3u64);
            table = table.left_join(&column).unwrap();
        }
        table
    }

    fn names(table: &FinalTable) -> FxHashSet<String> {
        table.table.columns().iter().cloned().collect()
    }

    #[test]
    fn test_split_strips_prefix_and_drops_other_corpus() {
        let table = merged_table(&["preds_in_other", "successors_in_other", "a_in_deg", "b_in_deg"]);
        let (a, b) = finalize(&table, &CorpusConfig::default(), &["in_deg"]).unwrap();

        assert_eq!(a.table.row_ids(), &["1".to_string(), "2".to_string()]);
        assert_eq!(b.table.row_ids(), &["3".to_string()]);
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.table.columns(), &["preds_in_other", "successors_in_other", "in_deg"].map(String::from));
        assert_eq!(a.table.get("1", "in_deg"), Some(Value::Int(1)));
        assert_eq!(b.table.get("3", "in_deg"), Some(Value::Int(3)));
        assert_eq!(a.file_name(), "a_exclusive_users_metrics.json");
    }

    #[test]
    fn test_prefix_is_stripped_once() {
        // "a_a_rank" keeps its inner "a_"
        let table = merged_table(&["a_a_rank", "b_a_rank"]);
        let (a, _) = finalize(&table, &CorpusConfig::default(), &[]).unwrap();
        assert_eq!(a.table.columns(), &["a_rank".to_string()]);
    }

    #[test]
    fn test_failed_metric_becomes_null_column() {
        // Corpus B lost its in_2hop column; A lost clustering
        let table = merged_table(&["a_in_deg", "a_in_2hop", "b_clustering", "b_in_deg"]);
        let suite = ["clustering", "in_deg", "in_2hop"];
        let (a, b) = finalize(&table, &CorpusConfig::default(), &suite).unwrap();

        assert_eq!(a.table.columns(), &suite.map(String::from));
        assert_eq!(b.table.columns(), a.table.columns());
        assert_eq!(a.table.get("1", "clustering"), None);
        assert_eq!(a.table.get("1", "in_2hop"), Some(Value::Int(1)));
        assert_eq!(b.table.get("3", "clustering"), Some(Value::Int(3)));
        assert_eq!(b.table.get("3", "in_2hop"), None);
    }

    #[test]
    fn test_empty_corpus_gets_full_schema() {
        let table = merged_table(&["preds_in_other", "a_in_deg", "a_out_deg"]);
        let (a, b) = finalize(&table, &CorpusConfig::default(), &["in_deg", "out_deg"]).unwrap();
        assert_eq!(b.table.columns(), a.table.columns());
        assert_eq!(b.table.get("3", "preds_in_other"), Some(Value::Int(3)));
        assert_eq!(b.table.get("3", "out_deg"), None);
    }

    #[test]
    fn test_column_outside_suite_mismatch() {
        let table = merged_table(&["a_in_deg", "b_in_deg", "a_in_2hop_bfs"]);
        match finalize(&table, &CorpusConfig::default(), &["in_deg"]) {
            Err(PipelineError::SchemaMismatch { only_first, only_second }) => {
                assert_eq!(only_first, vec!["in_2hop_bfs".to_string()]);
                assert!(only_second.is_empty());
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_stripped_name_collides_with_shared_column() {
        let table = merged_table(&["in_deg", "a_in_deg", "b_in_deg"]);
        match finalize(&table, &CorpusConfig::default(), &["in_deg"]) {
            Err(PipelineError::DuplicateColumn(name)) => assert_eq!(name, "in_deg"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let table = merged_table(&["a_in_deg", "b_in_deg"]);
        let (a, _) = finalize(&table, &CorpusConfig::default(), &["in_deg"]).unwrap();
        let path = a.write_json(&dir.path().join("final")).unwrap();

        let records: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(records.as_array().unwrap().len(), 2);
        assert_eq!(records[0]["in_deg"], 1);
        assert!(records[1]["in_deg"].is_null());
    }
}
