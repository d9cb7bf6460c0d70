//! Commit stream loading.
//!
//! A stream file holds one JSON change record per line, ordered by author
//! timestamp. The loader enforces ordering and id uniqueness once, up
//! front.

use jf_common::{ChangeRecord, CommitId, Error, Result};
use std::collections::HashSet;
use std::io::BufRead;
use std::ops::Range;
use std::path::Path;

/// Which part of a stream file to simulate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFilter {
    /// Keep only records whose `project` matches (records without one are kept).
    pub project: Option<String>,
    /// First position (after project filtering) to keep.
    pub start: Option<usize>,
    /// One past the last position to keep.
    pub end: Option<usize>,
}

/// An ordered, duplicate-free sequence of change records.
#[derive(Debug, Clone, Default)]
pub struct ChangeStream {
    records: Vec<ChangeRecord>,
}

impl ChangeStream {
    /// Build a stream, rejecting duplicates and timestamp regressions.
    pub fn from_records(records: Vec<ChangeRecord>) -> Result<Self> {
        let mut seen: HashSet<&CommitId> = HashSet::with_capacity(records.len());
        let mut last: Option<i64> = None;

        for rec in &records {
            if let Some(prev) = last {
                if rec.timestamp < prev {
                    return Err(Error::TimestampRegression {
                        commit_id: rec.commit_id.to_string(),
                        timestamp: rec.timestamp,
                        last: prev,
                    });
                }
            }
            last = Some(rec.timestamp);

            if !seen.insert(&rec.commit_id) {
                return Err(Error::DuplicateCommit {
                    commit_id: rec.commit_id.to_string(),
                });
            }
        }

        Ok(Self { records })
    }

    /// Load a JSON-lines stream file.
    pub fn load_jsonl(path: &Path, filter: &StreamFilter) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::parse_jsonl(std::io::BufReader::new(file), filter)
    }

    /// Parse JSON-lines from any reader. Blank lines are skipped.
    pub fn parse_jsonl<R: BufRead>(reader: R, filter: &StreamFilter) -> Result<Self> {
        let mut records = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let rec: ChangeRecord = serde_json::from_str(trimmed)
                .map_err(|e| Error::InvalidStream(format!("line {}: {}", lineno + 1, e)))?;
            if let (Some(want), Some(have)) = (&filter.project, &rec.project) {
                if want != have {
                    continue;
                }
            }
            records.push(rec);
        }

        let start = filter.start.unwrap_or(0).min(records.len());
        let end = filter.end.unwrap_or(records.len()).clamp(start, records.len());
        records.truncate(end);
        records.drain(..start);

        Self::from_records(records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn slice(&self, range: Range<usize>) -> &[ChangeRecord] {
        &self.records[range]
    }

    /// Ground-truth labels in stream order (unknown counts as clean).
    pub fn ground_truth(&self) -> Vec<bool> {
        self.records.iter().map(ChangeRecord::ground_truth).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, ts: i64, buggy: u8, project: &str) -> String {
        format!(
            r#"{{"commit_hash":"{id}","author_date_unix_timestamp":{ts},"is_buggy_commit":{buggy},"project":"{project}"}}"#
        )
    }

    #[test]
    fn parses_in_order() {
        let text = [line("a", 1, 0, "p"), line("b", 2, 1, "p"), String::new()].join("\n");
        let stream = ChangeStream::parse_jsonl(text.as_bytes(), &StreamFilter::default()).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.records()[1].commit_id, CommitId::from("b"));
        assert_eq!(stream.ground_truth(), vec![false, true]);
    }

    #[test]
    fn project_filter_and_slice() {
        let text = [
            line("a", 1, 0, "p"),
            line("x", 1, 0, "q"),
            line("b", 2, 0, "p"),
            line("c", 3, 1, "p"),
            line("d", 4, 0, "p"),
        ]
        .join("\n");
        let filter = StreamFilter {
            project: Some("p".into()),
            start: Some(1),
            end: Some(3),
        };
        let stream = ChangeStream::parse_jsonl(text.as_bytes(), &filter).unwrap();
        let ids: Vec<&str> = stream.records().iter().map(|r| r.commit_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn rejects_out_of_order() {
        let text = [line("a", 5, 0, "p"), line("b", 4, 0, "p")].join("\n");
        let err = ChangeStream::parse_jsonl(text.as_bytes(), &StreamFilter::default()).unwrap_err();
        assert!(matches!(err, Error::TimestampRegression { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn rejects_duplicates() {
        let text = [line("a", 1, 0, "p"), line("a", 2, 0, "p")].join("\n");
        let err = ChangeStream::parse_jsonl(text.as_bytes(), &StreamFilter::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateCommit { .. }));
    }

    #[test]
    fn bad_line_reports_line_number() {
        let text = format!("{}\n{{oops", line("a", 1, 0, "p"));
        let err = ChangeStream::parse_jsonl(text.as_bytes(), &StreamFilter::default()).unwrap_err();
        match err {
            Error::InvalidStream(msg) => assert!(msg.starts_with("line 2"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn slice_past_end_is_empty() {
        let text = line("a", 1, 0, "p");
        let filter = StreamFilter {
            start: Some(10),
            ..Default::default()
        };
        let stream = ChangeStream::parse_jsonl(text.as_bytes(), &filter).unwrap();
        assert!(stream.is_empty());
    }
}
