//! Change records as they arrive on the commit stream.
//!
//! Field names follow the raw stream source (`commit_hash`,
//! `author_date_unix_timestamp`, `is_buggy_commit`, ...). Records are
//! immutable once read; label corrections live in the verifier's index.

use crate::id::CommitId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Fix linkage supplied by the fix-linkage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixLinkage {
    /// Unix timestamp of the first fix that references this change, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_fix_date: Option<i64>,

    /// Earlier commits this change fixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fixes: Vec<CommitId>,
}

/// One code change from the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "commit_hash")]
    pub commit_id: CommitId,

    #[serde(
        rename = "author_date_unix_timestamp",
        deserialize_with = "deserialize_timestamp"
    )]
    pub timestamp: i64,

    /// `None` when the stream does not know the label yet.
    #[serde(
        rename = "is_buggy_commit",
        default,
        deserialize_with = "deserialize_label"
    )]
    pub is_buggy: Option<bool>,

    #[serde(default)]
    pub message: String,

    #[serde(rename = "code", default)]
    pub code_diff: String,

    #[serde(rename = "features", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub feature_vector: BTreeMap<String, f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<FixLinkage>,
}

impl ChangeRecord {
    /// Create a record with empty message, diff, and features.
    pub fn new(commit_id: impl Into<CommitId>, timestamp: i64, is_buggy: Option<bool>) -> Self {
        Self {
            commit_id: commit_id.into(),
            timestamp,
            is_buggy,
            message: String::new(),
            code_diff: String::new(),
            feature_vector: BTreeMap::new(),
            project: None,
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: FixLinkage) -> Self {
        self.fix = Some(fix);
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// True only for records the stream labels buggy.
    pub fn is_labeled_buggy(&self) -> bool {
        self.is_buggy == Some(true)
    }

    /// Ground truth for evaluation. Unknown labels count as clean.
    pub fn ground_truth(&self) -> bool {
        self.is_buggy.unwrap_or(false)
    }

    /// Date of the first linked fix, when the fix-linkage collaborator knows one.
    pub fn first_fix_date(&self) -> Option<i64> {
        self.fix.as_ref().and_then(|f| f.first_fix_date)
    }

    /// Commits this change fixes.
    pub fn fixed_commits(&self) -> &[CommitId] {
        self.fix.as_ref().map(|f| f.fixes.as_slice()).unwrap_or(&[])
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLabel {
    Bool(bool),
    Int(i64),
    Float(f64),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawNumber::deserialize(deserializer)? {
        RawNumber::Int(v) => Ok(v),
        RawNumber::Float(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        RawNumber::Float(v) => Err(serde::de::Error::custom(format!(
            "timestamp must be a whole number of seconds, got {v}"
        ))),
    }
}

fn deserialize_label<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawLabel> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawLabel::Bool(b)) => Ok(Some(b)),
        Some(RawLabel::Int(0)) => Ok(Some(false)),
        Some(RawLabel::Int(1)) => Ok(Some(true)),
        Some(RawLabel::Float(v)) if v.is_nan() => Ok(None),
        Some(RawLabel::Float(v)) if v == 0.0 => Ok(Some(false)),
        Some(RawLabel::Float(v)) if v == 1.0 => Ok(Some(true)),
        Some(RawLabel::Int(v)) => Err(serde::de::Error::custom(format!(
            "is_buggy_commit must be 0 or 1, got {v}"
        ))),
        Some(RawLabel::Float(v)) => Err(serde::de::Error::custom(format!(
            "is_buggy_commit must be 0 or 1, got {v}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stream_field_names() {
        let line = r#"{"commit_hash":"c1","author_date_unix_timestamp":1600000000,
            "is_buggy_commit":1,"message":"fix npe","code":"+a","features":{"la":3.0}}"#;
        let rec: ChangeRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.commit_id, CommitId::from("c1"));
        assert_eq!(rec.timestamp, 1_600_000_000);
        assert_eq!(rec.is_buggy, Some(true));
        assert_eq!(rec.code_diff, "+a");
        assert_eq!(rec.feature_vector.get("la"), Some(&3.0));
        assert!(rec.fix.is_none());
    }

    #[test]
    fn label_accepts_bool_int_float_and_null() {
        for (raw, expected) in [
            ("true", Some(true)),
            ("false", Some(false)),
            ("0", Some(false)),
            ("1.0", Some(true)),
            ("null", None),
        ] {
            let line = format!(
                r#"{{"commit_hash":"c","author_date_unix_timestamp":1,"is_buggy_commit":{raw}}}"#
            );
            let rec: ChangeRecord = serde_json::from_str(&line).unwrap();
            assert_eq!(rec.is_buggy, expected, "label {raw}");
        }
    }

    #[test]
    fn missing_label_is_unknown() {
        let rec: ChangeRecord =
            serde_json::from_str(r#"{"commit_hash":"c","author_date_unix_timestamp":5}"#).unwrap();
        assert_eq!(rec.is_buggy, None);
        assert!(!rec.ground_truth());
        assert!(!rec.is_labeled_buggy());
    }

    #[test]
    fn rejects_out_of_range_label() {
        let line = r#"{"commit_hash":"c","author_date_unix_timestamp":1,"is_buggy_commit":2}"#;
        assert!(serde_json::from_str::<ChangeRecord>(line).is_err());
    }

    #[test]
    fn float_timestamp_must_be_whole() {
        let ok = r#"{"commit_hash":"c","author_date_unix_timestamp":12.0}"#;
        assert_eq!(serde_json::from_str::<ChangeRecord>(ok).unwrap().timestamp, 12);
        let bad = r#"{"commit_hash":"c","author_date_unix_timestamp":12.5}"#;
        assert!(serde_json::from_str::<ChangeRecord>(bad).is_err());
    }

    #[test]
    fn fix_linkage_accessors() {
        let line = r#"{"commit_hash":"f","author_date_unix_timestamp":9,
            "fix":{"first_fix_date":20,"fixes":["a","b"]}}"#;
        let rec: ChangeRecord = serde_json::from_str(line).unwrap();
        assert_eq!(rec.first_fix_date(), Some(20));
        assert_eq!(rec.fixed_commits().len(), 2);
        assert!(ChangeRecord::new("x", 1, None).fixed_commits().is_empty());
    }
}
