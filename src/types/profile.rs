//! Profile-attribute input.
//!
//! The profile table is an external JSON export whose column types drifted
//! over time (ids as numbers or strings, counts as floats, `verified` as bool,
//! `0`/`1` or text). Records are therefore read loosely and converted into the
//! typed [`NodeAttributes`] once, at graph-build time.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::config::CorpusConfig;
use crate::error::{PipelineError, Result};
use crate::types::{Corpus, NodeAttributes, UserId};

/// One raw row of the profile table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id_str: Option<JsonValue>,
    /// Numeric id; older exports carry only this one.
    #[serde(default)]
    pub id: Option<JsonValue>,
    #[serde(default)]
    pub corpus: Option<String>,
    #[serde(default)]
    pub followers_count: Option<JsonValue>,
    #[serde(default)]
    pub status_count: Option<JsonValue>,
    #[serde(default)]
    pub screen_name: Option<String>,
    #[serde(default, alias = "years_old")]
    pub account_age_years: Option<JsonValue>,
    #[serde(default)]
    pub verified: Option<JsonValue>,
}

/// Profile rows keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct ProfileTable {
    records: FxHashMap<UserId, UserProfile>,
}

impl UserProfile {
    /// The record's user id as a string, if it has a usable one. `id_str` wins
    /// over `id`, whose large values may have lost precision as floats.
    pub fn user_id(&self) -> Option<UserId> {
        self.id_str
            .as_ref()
            .and_then(as_user_id)
            .or_else(|| self.id.as_ref().and_then(as_user_id))
    }

    /// Converts the raw record into typed attributes.
    ///
    /// # Returns
    ///
    /// The attributes plus the names of fields that were missing or unusable
    /// and therefore took their default value.
    pub fn to_attributes(&self, corpora: &CorpusConfig) -> (NodeAttributes, Vec<&'static str>) {
        let mut attributes = NodeAttributes::default();
        let mut defaulted = Vec::new();

        match self.corpus.as_deref().and_then(|raw| corpora.parse_label(raw)) {
            Some(corpus) => attributes.corpus = corpus,
            None => defaulted.push("corpus"),
        }
        match self.followers_count.as_ref().and_then(as_count) {
            Some(count) => attributes.followers_count = count,
            None => defaulted.push("followers_count"),
        }
        match self.status_count.as_ref().and_then(as_count) {
            Some(count) => attributes.status_count = count,
            None => defaulted.push("status_count"),
        }
        match &self.screen_name {
            Some(name) if !name.is_empty() => attributes.screen_name = name.clone(),
            _ => defaulted.push("screen_name"),
        }
        match self.account_age_years.as_ref().and_then(JsonValue::as_f64) {
            Some(age) if age.is_finite() => attributes.account_age_years = age,
            _ => defaulted.push("account_age_years"),
        }
        match self.verified.as_ref().and_then(as_flag) {
            Some(flag) => attributes.verified = flag,
            None => defaulted.push("verified"),
        }

        (attributes, defaulted)
    }
}

impl ProfileTable {
    pub fn from_records(records: impl IntoIterator<Item = UserProfile>) -> Self {
        let mut table = FxHashMap::default();
        for record in records {
            if let Some(user_id) = record.user_id() {
                table.insert(user_id, record);
            }
        }
        Self { records: table }
    }

    /// Reads a JSON array of profile records from `path`.
    ///
    /// A missing file is fatal for the graph stage.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingInput(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        let records: Vec<UserProfile> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| PipelineError::Json { path: path.to_path_buf(), source })?;
        let total = records.len();
        let table = Self::from_records(records);
        if table.len() < total {
            tracing::warn!("{} profile records had no usable id", total - table.len());
        }
        Ok(table)
    }

    pub fn get(&self, user_id: &str) -> Option<&UserProfile> {
        self.records.get(user_id)
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.records.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn as_user_id(value: &JsonValue) -> Option<UserId> {
    match value {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => n.as_u64().map(|id| id.to_string()),
        _ => None,
    }
}

fn as_count(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        JsonValue::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn as_flag(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0),
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod test_profile {
    use super::*;

    fn parse(json: &str) -> Vec<UserProfile> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_loose_fields_are_typed() {
        let records = parse(
            r#"[{"id_str": "11", "corpus": "A", "followers_count": 12.0, "status_count": "40",
                 "screen_name": "eleven", "years_old": 3.5, "verified": 1}]"#,
        );
        let (attributes, defaulted) = records[0].to_attributes(&CorpusConfig::default());
        assert!(defaulted.is_empty());
        assert_eq!(attributes.corpus, Corpus::A);
        assert_eq!(attributes.followers_count, 12);
        assert_eq!(attributes.status_count, 40);
        assert_eq!(attributes.screen_name, "eleven");
        assert_eq!(attributes.account_age_years, 3.5);
        assert!(attributes.verified);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let records = parse(r#"[{"id": 12, "corpus": "martian", "verified": "maybe"}]"#);
        assert_eq!(records[0].user_id().as_deref(), Some("12"));
        let (attributes, defaulted) = records[0].to_attributes(&CorpusConfig::default());
        assert_eq!(attributes, NodeAttributes::default());
        assert_eq!(
            defaulted,
            vec!["corpus", "followers_count", "status_count", "screen_name", "account_age_years", "verified"]
        );
    }

    #[test]
    fn test_id_str_preferred_over_id() {
        let records = parse(
            r#"[{"id": 11, "id_str": "11", "corpus": "a"},
                {"id": 1.1e18, "id_str": "1100000000000000001", "corpus": "b"},
                {"id": 13, "id_str": null}]"#,
        );
        assert_eq!(records[0].user_id().as_deref(), Some("11"));
        assert_eq!(records[1].user_id().as_deref(), Some("1100000000000000001"));
        assert_eq!(records[2].user_id().as_deref(), Some("13"));
    }

    #[test]
    fn test_table_skips_records_without_id() {
        let table = ProfileTable::from_records(parse(r#"[{"id_str": ""}, {"id_str": "3"}]"#));
        assert_eq!(table.len(), 1);
        assert!(table.contains("3"));
    }
}
